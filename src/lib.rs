//! GitHub access layer for the MoltBoard dashboard.
//!
//! Fetches repository metadata and issue lists from the GitHub REST API
//! while sharing rate-limit knowledge across callers, caching results, and
//! falling back to stale data when GitHub throttles us. Every query returns a
//! [`github::QueryResult`] envelope whose error code callers branch on.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod github;
pub mod logging;

pub use config::Config;
pub use error::{ErrorCode, GitHubError, MoltError, Result};
pub use github::{GitHubService, IssueQuery, QueryResult};
