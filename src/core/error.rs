//! Error taxonomy for the bank API
//!
//! Every network-calling function returns one of these instead of swallowing
//! failures. The command layer decides how to log them and which exit code to use.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single HTTP exchange with the bank API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::Malformed(e.to_string())
        } else {
            ApiError::Transport(e)
        }
    }
}

/// Which half of the credential exchange failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Login,
    TokenExchange,
}

impl std::fmt::Display for AuthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStage::Login => write!(f, "login"),
            AuthStage::TokenExchange => write!(f, "token exchange"),
        }
    }
}

/// Credential or token exchange failed; no token was produced
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{stage} request failed: {source}")]
    Request {
        stage: AuthStage,
        #[source]
        source: ApiError,
    },

    #[error("{stage} response did not contain a {field}")]
    MissingToken {
        stage: AuthStage,
        field: &'static str,
    },
}

impl AuthError {
    pub fn stage(&self) -> AuthStage {
        match self {
            AuthError::Request { stage, .. } | AuthError::MissingToken { stage, .. } => *stage,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AuthError::Request { source, .. } if source.is_timeout())
    }
}

/// A page request failed part-way through a paginated collection
#[derive(Debug, Error)]
#[error("fetching {resource} failed on page {page} after {fetched} item(s): {source}")]
pub struct PaginationError {
    /// Human-readable resource label, e.g. `accounts`
    pub resource: String,
    /// Page number whose request failed (1-based)
    pub page: u32,
    /// Items collected from earlier pages
    pub fetched: usize,
    #[source]
    pub source: ApiError,
}

/// Stage-tagged failure of a report run
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] ApiError),

    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("account fetch failed: {0}")]
    Accounts(#[source] PaginationError),

    #[error("transaction fetch failed for account {acc_number}: {source}")]
    Transactions {
        acc_number: String,
        #[source]
        source: PaginationError,
    },

    #[error("report is incomplete: transactions failed for {} account(s): {}", .failed.len(), .failed.join(", "))]
    Incomplete { failed: Vec<String> },
}

impl ReportError {
    /// Short name of the stage that failed, for logs
    pub fn stage(&self) -> String {
        match self {
            ReportError::Client(_) => "client setup".to_string(),
            ReportError::Auth(e) => e.stage().to_string(),
            ReportError::Accounts(_) => "account fetch".to_string(),
            ReportError::Transactions { acc_number, .. } => {
                format!("transaction fetch for account {}", acc_number)
            }
            ReportError::Incomplete { .. } => "transaction fetch".to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ReportError::Client(e) => e.is_timeout(),
            ReportError::Auth(e) => e.is_timeout(),
            ReportError::Accounts(e) => e.source.is_timeout(),
            ReportError::Transactions { source, .. } => source.source.is_timeout(),
            ReportError::Incomplete { .. } => false,
        }
    }
}
