// Public query operations.
// Cache-first repository lookups and issue listings behind one shared service.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{self, CacheEntry, ISSUES_TTL, METADATA_TTL, ResponseCache, paths};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{DEFAULT_RETRY_AFTER_SECS, GitHubError, Result};

use super::client::GitHubClient;
use super::pagination::{
    LIST_QUOTA_FLOOR, MAX_PAGES, MAX_PER_PAGE, PRIMITIVE_QUOTA_FLOOR, PageOptions, Paginated,
};
use super::rate_limit::RateLimitTracker;
use super::types::{Issue, RateLimitInfo, RawIssue, RawRepository, RepositoryMetadata, StateFilter};

/// Uniform envelope returned by every query.
///
/// `data` and `error` are exclusive except for partial pagination, where
/// both are set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub error: Option<GitHubError>,
    pub cached: bool,
    pub rate_limited: bool,
}

impl<T> QueryResult<T> {
    fn fresh(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            cached: false,
            rate_limited: false,
        }
    }

    fn failed(error: GitHubError) -> Self {
        Self {
            rate_limited: error.is_rate_limit(),
            data: None,
            error: Some(error),
            cached: false,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }

    /// Status a route handler answers with.
    ///
    /// Anything that carries data is a 200 so the UI can still render it.
    pub fn http_status(&self) -> u16 {
        match (&self.data, &self.error) {
            (Some(_), _) => 200,
            (None, Some(error)) => error.code().http_status(),
            (None, None) => 200,
        }
    }
}

/// Options for an issue listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueQuery {
    pub state: StateFilter,
    pub per_page: u32,
    pub max_pages: u32,
    /// Overrides the operation's default quota floor.
    pub min_remaining: Option<i64>,
}

impl Default for IssueQuery {
    fn default() -> Self {
        Self {
            state: StateFilter::Open,
            per_page: MAX_PER_PAGE,
            max_pages: MAX_PAGES,
            min_remaining: None,
        }
    }
}

impl IssueQuery {
    /// Distinguishes listings of the same repository that differ in filter or paging.
    fn cache_key_suffix(&self, default_floor: i64) -> String {
        let options = self.page_options(default_floor);
        format!(
            "state={}&per_page={}&max_pages={}&min_remaining={}",
            self.state.as_str(),
            options.per_page,
            options.max_pages,
            options.min_remaining
        )
    }

    fn page_options(&self, default_floor: i64) -> PageOptions {
        PageOptions::new(
            self.per_page,
            self.max_pages,
            self.min_remaining.unwrap_or(default_floor),
        )
    }
}

/// Issues collected by one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueList {
    pub issues: Vec<Issue>,
    pub has_more: bool,
    pub pages_fetched: u32,
    pub rate_limit: RateLimitInfo,
}

impl From<Paginated<Issue>> for QueryResult<IssueList> {
    fn from(result: Paginated<Issue>) -> Self {
        let Paginated {
            items,
            pages_fetched,
            has_more,
            rate_limit,
            error,
        } = result;

        if pages_fetched == 0 {
            return QueryResult::failed(
                error.unwrap_or_else(|| GitHubError::Api("no pages fetched".to_string())),
            );
        }

        QueryResult {
            rate_limited: error.as_ref().is_some_and(GitHubError::is_rate_limit),
            data: Some(IssueList {
                issues: items,
                has_more,
                pages_fetched,
                rate_limit,
            }),
            error,
            cached: false,
        }
    }
}

/// Shared GitHub access service.
///
/// Owns the rate-limit tracker and both caches; construct one per process
/// (or per test) and share it behind an `Arc`.
pub struct GitHubService {
    client: GitHubClient,
    tracker: Arc<RateLimitTracker>,
    clock: Arc<dyn Clock>,
    metadata: ResponseCache<RepositoryMetadata>,
    project_issues: ResponseCache<IssueList>,
}

impl GitHubService {
    pub fn new(base_url: &str, timeout: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let tracker = Arc::new(RateLimitTracker::new(clock.clone()));
        let client = GitHubClient::new(base_url, timeout, tracker.clone())?;

        Ok(Self {
            client,
            tracker,
            metadata: ResponseCache::new(clock.clone()),
            project_issues: ResponseCache::new(clock.clone()),
            clock,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base_url,
            config.http_timeout,
            Arc::new(SystemClock),
        )
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.tracker
    }

    pub fn rate_limit_status(&self) -> RateLimitInfo {
        self.tracker.snapshot()
    }

    pub fn metadata_cache(&self) -> &ResponseCache<RepositoryMetadata> {
        &self.metadata
    }

    pub fn issues_cache(&self) -> &ResponseCache<IssueList> {
        &self.project_issues
    }

    pub fn clear_caches(&self) {
        self.metadata.clear();
        self.project_issues.clear();
    }

    /// Look up a repository, cache first.
    pub async fn fetch_repository_metadata(
        &self,
        owner: &str,
        repo: &str,
        token: Option<&str>,
    ) -> QueryResult<RepositoryMetadata> {
        let Some(token) = usable_token(token) else {
            return QueryResult::failed(GitHubError::NoToken);
        };

        let key = paths::repo_key(owner, repo);
        let now = self.clock.now_ms();
        let cached = self.metadata.get(&key);

        if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(now, METADATA_TTL)) {
            debug!(%key, "repository metadata served from cache");
            return cached_metadata(
                &key,
                entry.payload.clone(),
                entry.within_rate_limit_window(now),
            );
        }

        let live = if self.tracker.is_rate_limited() {
            Err(GitHubError::RateLimit {
                retry_after_secs: self
                    .tracker
                    .retry_after_secs()
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            })
        } else {
            self.client
                .get_json::<RawRepository>(token, &format!("/repos/{}/{}", owner, repo), &[])
                .await
                .map(|response| RepositoryMetadata::from(response.data))
        };

        match live {
            Ok(metadata) => {
                self.metadata
                    .put(key, Some(metadata.clone()), self.tracker.blocked_until());
                QueryResult::fresh(metadata)
            }
            Err(GitHubError::NotFound(message)) => {
                self.metadata.put(key, None, self.tracker.blocked_until());
                QueryResult::failed(GitHubError::NotFound(message))
            }
            Err(error) if error.is_rate_limit() => match cached {
                Some(entry) => {
                    warn!(%key, age_ms = entry.age_ms(now), "rate limited, serving stale repository metadata");
                    cached_metadata(&key, entry.payload, true)
                }
                None => QueryResult::failed(error),
            },
            Err(error) => QueryResult::failed(error),
        }
    }

    /// List a repository's issues without caching.
    pub async fn fetch_repository_issues(
        &self,
        owner: &str,
        repo: &str,
        token: Option<&str>,
        query: IssueQuery,
    ) -> QueryResult<IssueList> {
        let Some(token) = usable_token(token) else {
            return QueryResult::failed(GitHubError::NoToken);
        };

        self.list_issues(owner, repo, token, query, PRIMITIVE_QUOTA_FLOOR)
            .await
            .into()
    }

    /// List a repository's issues for a project, cached per project, repository and query.
    ///
    /// Only complete listings are cached. When GitHub throttles the request
    /// any earlier listing is served instead, however old.
    pub async fn fetch_project_issues(
        &self,
        project_id: &str,
        owner: &str,
        repo: &str,
        token: Option<&str>,
        query: IssueQuery,
    ) -> QueryResult<IssueList> {
        let Some(token) = usable_token(token) else {
            return QueryResult::failed(GitHubError::NoToken);
        };

        let key = format!(
            "{}?{}",
            paths::project_repo_key(project_id, owner, repo),
            query.cache_key_suffix(LIST_QUOTA_FLOOR)
        );
        let now = self.clock.now_ms();
        let cached = self.project_issues.get(&key);

        if let Some(entry) = cached.as_ref().filter(|e| e.is_fresh(now, ISSUES_TTL)) {
            if let Some(list) = entry.payload.clone() {
                debug!(%key, "project issues served from cache");
                return QueryResult {
                    data: Some(list),
                    error: None,
                    cached: true,
                    rate_limited: entry.within_rate_limit_window(now),
                };
            }
        }

        let result: QueryResult<IssueList> = self
            .list_issues(owner, repo, token, query, LIST_QUOTA_FLOOR)
            .await
            .into();

        if result.error.is_none() {
            if let Some(list) = &result.data {
                self.project_issues
                    .put(key, Some(list.clone()), self.tracker.blocked_until());
            }
            return result;
        }

        if result.data.is_none() && result.rate_limited {
            if let Some(entry) = cached {
                let age_ms = entry.age_ms(now);
                if let Some(list) = entry.payload {
                    warn!(%key, age_ms, "rate limited, serving stale project issues");
                    return QueryResult {
                        data: Some(list),
                        error: None,
                        cached: true,
                        rate_limited: true,
                    };
                }
            }
        }

        result
    }

    async fn list_issues(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
        query: IssueQuery,
        default_floor: i64,
    ) -> Paginated<Issue> {
        let params = [("state", query.state.as_str().to_string())];
        self.client
            .paginate(
                token,
                &format!("/repos/{}/{}/issues", owner, repo),
                &params,
                query.page_options(default_floor),
                RawIssue::into_issue,
            )
            .await
    }

    /// Load cache snapshots saved by an earlier process.
    pub fn load_caches(&self, dir: &Path) -> Result<()> {
        let metadata: HashMap<String, CacheEntry<RepositoryMetadata>> =
            cache::load_snapshot(&paths::metadata_snapshot_path(dir))?;
        let issues: HashMap<String, CacheEntry<IssueList>> =
            cache::load_snapshot(&paths::issues_snapshot_path(dir))?;
        info!(
            metadata = metadata.len(),
            project_issues = issues.len(),
            "loaded cache snapshots"
        );
        self.metadata.restore(metadata);
        self.project_issues.restore(issues);
        Ok(())
    }

    /// Persist both caches under `dir`.
    pub fn save_caches(&self, dir: &Path) -> Result<()> {
        cache::save_snapshot(
            &paths::metadata_snapshot_path(dir),
            &self.metadata.snapshot(),
        )?;
        cache::save_snapshot(
            &paths::issues_snapshot_path(dir),
            &self.project_issues.snapshot(),
        )?;
        Ok(())
    }

    /// Drop in-memory entries and any snapshots under `dir`.
    pub fn purge_caches(&self, dir: &Path) -> Result<()> {
        self.clear_caches();
        cache::store::delete_snapshot(&paths::metadata_snapshot_path(dir))?;
        cache::store::delete_snapshot(&paths::issues_snapshot_path(dir))?;
        Ok(())
    }
}

fn usable_token(token: Option<&str>) -> Option<&str> {
    token.map(str::trim).filter(|t| !t.is_empty())
}

/// Envelope for a cache hit; a cached `None` is a known missing repository.
fn cached_metadata(
    key: &str,
    payload: Option<RepositoryMetadata>,
    rate_limited: bool,
) -> QueryResult<RepositoryMetadata> {
    match payload {
        Some(metadata) => QueryResult {
            data: Some(metadata),
            error: None,
            cached: true,
            rate_limited,
        },
        None => QueryResult {
            data: None,
            error: Some(GitHubError::NotFound(format!("repository {} not found", key))),
            cached: true,
            rate_limited,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> IssueList {
        IssueList {
            issues: Vec::new(),
            has_more: false,
            pages_fetched: 1,
            rate_limit: RateLimitInfo::default(),
        }
    }

    #[test]
    fn test_envelope_http_status() {
        let ok = QueryResult::fresh(list());
        assert_eq!(ok.http_status(), 200);

        let throttled: QueryResult<IssueList> = QueryResult::failed(GitHubError::RateLimit {
            retry_after_secs: 30,
        });
        assert!(throttled.rate_limited);
        assert_eq!(throttled.http_status(), 429);

        let partial = QueryResult {
            data: Some(list()),
            error: Some(GitHubError::RateLimit {
                retry_after_secs: 30,
            }),
            cached: false,
            rate_limited: true,
        };
        assert!(partial.is_partial());
        assert_eq!(partial.http_status(), 200);

        let no_token: QueryResult<IssueList> = QueryResult::failed(GitHubError::NoToken);
        assert_eq!(no_token.http_status(), 400);
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let result: QueryResult<IssueList> = QueryResult::failed(GitHubError::RateLimit {
            retry_after_secs: 7,
        });
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["rateLimited"], true);
        assert_eq!(json["cached"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], "RATE_LIMIT");
        assert_eq!(json["error"]["retryAfter"], 7);
    }

    #[test]
    fn test_paginated_conversion() {
        let failed: QueryResult<IssueList> = Paginated::<Issue> {
            items: Vec::new(),
            pages_fetched: 0,
            has_more: false,
            rate_limit: RateLimitInfo::default(),
            error: Some(GitHubError::Auth("bad credentials".into())),
        }
        .into();
        assert!(failed.data.is_none());
        assert!(!failed.rate_limited);

        let partial: QueryResult<IssueList> = Paginated::<Issue> {
            items: Vec::new(),
            pages_fetched: 2,
            has_more: true,
            rate_limit: RateLimitInfo::default(),
            error: Some(GitHubError::RateLimit {
                retry_after_secs: 60,
            }),
        }
        .into();
        assert!(partial.is_partial());
        assert!(partial.rate_limited);
        assert_eq!(partial.data.unwrap().pages_fetched, 2);
    }

    #[test]
    fn test_usable_token() {
        assert_eq!(usable_token(Some("t1")), Some("t1"));
        assert_eq!(usable_token(Some("  ")), None);
        assert_eq!(usable_token(None), None);
    }
}
