// GitHub API HTTP client.
// Handles authentication, rate-limit bookkeeping, and response classification.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    Client, Response,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::{GitHubError, MoltError, Result};

use super::rate_limit::{RateLimitTracker, reset_header_ms};
use super::types::RateLimitInfo;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// A decoded successful response plus the rate-limit headers it carried.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub rate_limit: RateLimitInfo,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// GitHub API client with rate limit tracking.
///
/// The token is supplied per request so a single client (and its tracker)
/// can serve every caller in the process.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    rate_limit: Arc<RateLimitTracker>,
}

impl GitHubClient {
    pub fn new(base_url: &str, timeout: Duration, rate_limit: Arc<RateLimitTracker>) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("moltboard"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(MoltError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limit,
        })
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// GET an endpoint and decode its JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<ApiResponse<T>, GitHubError> {
        if token.is_empty() {
            return Err(GitHubError::NoToken);
        }

        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, ?params, "GitHub request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "GitHub request failed");
                GitHubError::Api(e.to_string())
            })?;

        let rate_limit = self.update_rate_limit(&response);
        let response = self.check_response(response).await?;
        let data = response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::Api(format!("invalid response body: {}", e)))?;

        Ok(ApiResponse { data, rate_limit })
    }

    /// Feed the response headers to the tracker.
    fn update_rate_limit(&self, response: &Response) -> RateLimitInfo {
        let remaining = header_i64(response, "x-ratelimit-remaining");
        let reset = header_i64(response, "x-ratelimit-reset");

        self.rate_limit
            .record_response(response.status().as_u16(), remaining, reset);

        RateLimitInfo {
            remaining,
            reset_at: reset.and_then(reset_header_ms),
        }
    }

    /// Check response status and convert errors.
    async fn check_response(
        &self,
        response: Response,
    ) -> std::result::Result<Response, GitHubError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.is_empty());

        let error = GitHubError::from_status(
            status.as_u16(),
            self.rate_limit.retry_after_secs(),
            message,
        );
        warn!(%url, status = status.as_u16(), code = error.code().as_str(), "GitHub error response");
        Err(error)
    }
}

fn header_i64(response: &Response, name: &str) -> Option<i64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
