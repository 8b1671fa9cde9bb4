// Error types for the MoltBoard GitHub layer.
// Crate errors (config, IO, JSON) and the GitHub failure taxonomy callers branch on.

use serde::{Serialize, Serializer, ser::SerializeStruct};
use thiserror::Error;

/// Seconds to wait when GitHub throttles us without a reset header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum MoltError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MoltError>;

/// Stable error code surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimit,
    AuthError,
    NotFound,
    NoToken,
    ApiError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::NoToken => "NO_TOKEN",
            ErrorCode::ApiError => "API_ERROR",
        }
    }

    /// HTTP status a route handler answers with when this error stands alone.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::RateLimit => 429,
            ErrorCode::AuthError => 401,
            ErrorCode::NotFound => 404,
            ErrorCode::NoToken => 400,
            ErrorCode::ApiError => 502,
        }
    }
}

/// A classified GitHub failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GitHubError {
    #[error("GitHub API rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("GitHub authentication failed: {0}")]
    Auth(String),

    #[error("GitHub resource not found: {0}")]
    NotFound(String),

    #[error("No GitHub token configured")]
    NoToken,

    #[error("GitHub API error: {0}")]
    Api(String),
}

impl GitHubError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GitHubError::RateLimit { .. } => ErrorCode::RateLimit,
            GitHubError::Auth(_) => ErrorCode::AuthError,
            GitHubError::NotFound(_) => ErrorCode::NotFound,
            GitHubError::NoToken => ErrorCode::NoToken,
            GitHubError::Api(_) => ErrorCode::ApiError,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GitHubError::RateLimit { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GitHubError::RateLimit { .. })
    }

    /// Classify a non-2xx status.
    ///
    /// `retry_after_secs` is only consulted for throttling responses and falls
    /// back to [`DEFAULT_RETRY_AFTER_SECS`]. `message` is whatever the response
    /// body said, if anything.
    pub fn from_status(status: u16, retry_after_secs: Option<u64>, message: Option<String>) -> Self {
        match status {
            403 | 429 => GitHubError::RateLimit {
                retry_after_secs: retry_after_secs.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            },
            401 => GitHubError::Auth(
                message.unwrap_or_else(|| "token invalid or missing permission".to_string()),
            ),
            404 => GitHubError::NotFound(message.unwrap_or_else(|| "Not Found".to_string())),
            status => GitHubError::Api(message.unwrap_or_else(|| format!("HTTP {}", status))),
        }
    }
}

impl Serialize for GitHubError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let retry_after = self.retry_after_secs();
        let mut state =
            serializer.serialize_struct("GitHubError", if retry_after.is_some() { 3 } else { 2 })?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("message", &self.to_string())?;
        if let Some(secs) = retry_after {
            state.serialize_field("retryAfter", &secs)?;
        }
        state.end()
    }
}
