// GitHub API module.
// Rate-limit tracking, pagination, and the cached query service over the REST API.

pub mod client;
pub mod pagination;
pub mod queries;
pub mod rate_limit;
pub mod types;

pub use client::{ApiResponse, GITHUB_API_BASE, GitHubClient};
pub use pagination::{PageOptions, Paginated};
pub use queries::{GitHubService, IssueList, IssueQuery, QueryResult};
pub use rate_limit::RateLimitTracker;
pub use types::*;
