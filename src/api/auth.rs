//! Credential exchange
//!
//! Two one-shot requests, always in this order:
//! 1. `POST /login` with the user's credentials and a Basic client header, giving a refresh token
//! 2. `POST /token` with the refresh token, giving a short-lived access token
//!
//! An [`AccessToken`] can only come out of step 2, and step 2 needs a
//! [`RefreshToken`], so the ordering is enforced by the types.

use base64::Engine;
use serde::Deserialize;

use super::BankClient;
use crate::config::Credentials;
use crate::core::{AuthError, AuthStage};

/// Long-lived token returned by `/login`
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefreshToken(<redacted>)")
    }
}

/// Short-lived bearer token returned by `/token`
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    #[cfg(test)]
    pub(crate) fn for_tests(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// `Basic base64(client_id:secret)`, standard alphabet with padding
pub fn basic_authorization(client_id: &str, secret: &str) -> String {
    let raw = format!("{}:{}", client_id, secret);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(raw.as_bytes())
    )
}

/// Exchange login and password for a refresh token
pub async fn exchange_credentials_for_refresh_token(
    client: &BankClient,
    credentials: &Credentials,
) -> Result<RefreshToken, AuthError> {
    let stage = AuthStage::Login;
    let request_failed = |source| AuthError::Request { stage, source };

    tracing::debug!("POST /login for user {}", credentials.login);

    let body = serde_json::json!({
        "user": credentials.login,
        "password": credentials.password,
    });

    let request = client
        .post(client.endpoint(&["login"]))
        .header(
            "Authorization",
            basic_authorization(&credentials.client_id, &credentials.secret),
        )
        .json(&body);

    let response = client.send(request).await.map_err(request_failed)?;
    let parsed: LoginResponse = response
        .json()
        .await
        .map_err(|e| request_failed(e.into()))?;

    match parsed.refresh_token {
        Some(token) if !token.is_empty() => Ok(RefreshToken(token)),
        _ => Err(AuthError::MissingToken {
            stage,
            field: "refresh_token",
        }),
    }
}

/// Exchange a refresh token for an access token
pub async fn exchange_refresh_token_for_access_token(
    client: &BankClient,
    refresh_token: &RefreshToken,
) -> Result<AccessToken, AuthError> {
    let stage = AuthStage::TokenExchange;
    let request_failed = |source| AuthError::Request { stage, source };

    tracing::debug!("POST /token");

    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token.secret()),
    ];

    let request = client.post(client.endpoint(&["token"])).form(&form);

    let response = client.send(request).await.map_err(request_failed)?;
    let parsed: TokenResponse = response
        .json()
        .await
        .map_err(|e| request_failed(e.into()))?;

    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken(token)),
        _ => Err(AuthError::MissingToken {
            stage,
            field: "access_token",
        }),
    }
}
