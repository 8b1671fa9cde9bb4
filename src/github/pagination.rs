// Paginated fetch engine.
// Walks a list endpoint page by page while watching the remaining quota.

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{DEFAULT_RETRY_AFTER_SECS, GitHubError};

use super::client::GitHubClient;
use super::types::RateLimitInfo;

/// Hard cap on pages per logical query.
pub const MAX_PAGES: u32 = 10;

/// Largest page size GitHub accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Quota floor for the cached project list query.
pub const LIST_QUOTA_FLOOR: i64 = 10;

/// Quota floor for the uncached issues primitive.
pub const PRIMITIVE_QUOTA_FLOOR: i64 = 5;

/// Paging limits for one logical query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub per_page: u32,
    pub max_pages: u32,
    /// Stop before the next page once the remaining quota drops below this.
    pub min_remaining: i64,
}

impl PageOptions {
    pub fn new(per_page: u32, max_pages: u32, min_remaining: i64) -> Self {
        Self {
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            max_pages: max_pages.clamp(1, MAX_PAGES),
            min_remaining,
        }
    }
}

impl Default for PageOptions {
    fn default() -> Self {
        Self::new(MAX_PER_PAGE, MAX_PAGES, PRIMITIVE_QUOTA_FLOOR)
    }
}

/// Outcome of a paginated query.
///
/// `error` may be set alongside items when a later page failed after
/// earlier pages succeeded.
#[derive(Debug, Clone)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pages_fetched: u32,
    pub has_more: bool,
    pub rate_limit: RateLimitInfo,
    pub error: Option<GitHubError>,
}

impl<T> Paginated<T> {
    fn failed(error: GitHubError, rate_limit: RateLimitInfo) -> Self {
        Self {
            items: Vec::new(),
            pages_fetched: 0,
            has_more: false,
            rate_limit,
            error: Some(error),
        }
    }

    pub fn is_partial(&self) -> bool {
        self.pages_fetched > 0 && self.error.is_some()
    }
}

impl GitHubClient {
    /// Fetch every page of `endpoint`, mapping raw entries through `map`.
    ///
    /// Entries for which `map` returns `None` are dropped. Pages are requested
    /// strictly in order; pagination ends on a short page, the page cap, a low
    /// remaining quota, or an error.
    pub async fn paginate<R, T, F>(
        &self,
        token: &str,
        endpoint: &str,
        params: &[(&str, String)],
        options: PageOptions,
        mut map: F,
    ) -> Paginated<T>
    where
        R: DeserializeOwned,
        F: FnMut(R) -> Option<T>,
    {
        let tracker = self.rate_limit();
        if tracker.is_rate_limited() {
            let retry_after_secs = tracker
                .retry_after_secs()
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            debug!(endpoint, retry_after_secs, "skipping request during rate limit window");
            return Paginated::failed(
                GitHubError::RateLimit { retry_after_secs },
                tracker.snapshot(),
            );
        }

        let mut items = Vec::new();
        let mut pages_fetched = 0;
        let mut has_more = false;
        let mut rate_limit = tracker.snapshot();

        for page in 1..=options.max_pages {
            let mut page_params = params.to_vec();
            page_params.push(("per_page", options.per_page.to_string()));
            page_params.push(("page", page.to_string()));

            let response = match self
                .get_json::<Vec<R>>(token, endpoint, &page_params)
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    if pages_fetched > 0 {
                        warn!(
                            endpoint,
                            page,
                            collected = items.len(),
                            code = error.code().as_str(),
                            "pagination stopped early, returning partial results"
                        );
                    }
                    return Paginated {
                        items,
                        pages_fetched,
                        has_more: pages_fetched > 0,
                        rate_limit: tracker.snapshot(),
                        error: Some(error),
                    };
                }
            };

            pages_fetched += 1;
            rate_limit = response.rate_limit;
            let raw_count = response.data.len();
            items.extend(response.data.into_iter().filter_map(&mut map));
            debug!(endpoint, page, raw_count, total = items.len(), "fetched page");

            if raw_count < options.per_page as usize {
                has_more = false;
                break;
            }

            has_more = true;
            if let Some(remaining) = rate_limit.remaining {
                if remaining < options.min_remaining {
                    warn!(
                        endpoint,
                        page,
                        remaining,
                        floor = options.min_remaining,
                        "remaining quota below floor, stopping pagination"
                    );
                    break;
                }
            }
        }

        Paginated {
            items,
            pages_fetched,
            has_more,
            rate_limit,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_options_are_clamped() {
        let options = PageOptions::new(500, 50, LIST_QUOTA_FLOOR);
        assert_eq!(options.per_page, MAX_PER_PAGE);
        assert_eq!(options.max_pages, MAX_PAGES);

        let options = PageOptions::new(0, 0, 0);
        assert_eq!(options.per_page, 1);
        assert_eq!(options.max_pages, 1);
    }

    #[test]
    fn test_default_options() {
        let options = PageOptions::default();
        assert_eq!(options.per_page, 100);
        assert_eq!(options.max_pages, 10);
        assert_eq!(options.min_remaining, PRIMITIVE_QUOTA_FLOOR);
    }

    #[test]
    fn test_partial_flag() {
        let mut result: Paginated<u32> =
            Paginated::failed(GitHubError::NoToken, RateLimitInfo::default());
        assert!(!result.is_partial());

        result.pages_fetched = 2;
        result.items = vec![1, 2];
        assert!(result.is_partial());
    }
}
