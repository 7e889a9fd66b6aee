//! Shared HTTP client for the bank API

use reqwest::{RequestBuilder, Response};
use std::time::Duration;
use url::Url;

use crate::core::ApiError;

/// Thin wrapper around one pooled `reqwest::Client` and the API base URL
#[derive(Debug, Clone)]
pub struct BankClient {
    http: reqwest::Client,
    base_url: Url,
}

impl BankClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(concat!("bankreport/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Transport)?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL under the base URL.
    ///
    /// Each segment is percent-encoded on its own, so an account number can
    /// never escape its path segment.
    pub fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> Url {
        let mut url = self.base_url.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        url
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url)
    }

    pub fn post(&self, url: Url) -> RequestBuilder {
        self.http.post(url)
    }

    /// Send a request and turn any non-2xx status into `ApiError::Status`
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        Ok(response)
    }
}
