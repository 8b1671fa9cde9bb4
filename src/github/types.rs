// GitHub API response types.
// Raw upstream shapes are mapped into strict internal types at the boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Issue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

/// `state` filter accepted by the issues endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }
}

/// GitHub user, as far as this layer cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Issue label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A GitHub issue with pull requests already excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: IssueState,
    pub labels: Vec<Label>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub assignee: Option<User>,
    pub comments: u64,
    pub reactions: u64,
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawReactions {
    #[serde(default)]
    total_count: u64,
}

/// Entry of the issues endpoint, which also lists pull requests.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    number: u64,
    title: String,
    state: IssueState,
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    assignee: Option<User>,
    #[serde(default)]
    comments: u64,
    #[serde(default)]
    reactions: Option<RawReactions>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl RawIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Map into an [`Issue`], or `None` for pull requests.
    pub fn into_issue(self) -> Option<Issue> {
        if self.is_pull_request() {
            return None;
        }

        Some(Issue {
            number: self.number,
            title: self.title,
            state: self.state,
            labels: self.labels,
            body: self.body,
            created_at: self.created_at,
            updated_at: self.updated_at,
            closed_at: self.closed_at,
            assignee: self.assignee,
            comments: self.comments,
            reactions: self.reactions.map(|r| r.total_count).unwrap_or(0),
            html_url: self.html_url,
        })
    }
}

/// Short reference to another repository (fork parent or source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub html_url: Option<String>,
}

/// Repository metadata including fork linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: String,
    pub private: bool,
    pub fork: bool,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub html_url: Option<String>,
    pub open_issues_count: u64,
    pub parent: Option<RepositoryRef>,
    pub source: Option<RepositoryRef>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRepositoryRef {
    name: String,
    full_name: String,
    owner: User,
    #[serde(default)]
    html_url: Option<String>,
}

impl From<RawRepositoryRef> for RepositoryRef {
    fn from(raw: RawRepositoryRef) -> Self {
        Self {
            owner: raw.owner.login,
            name: raw.name,
            full_name: raw.full_name,
            html_url: raw.html_url,
        }
    }
}

/// `GET /repos/{owner}/{repo}` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRepository {
    id: u64,
    name: String,
    full_name: String,
    owner: User,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    open_issues_count: u64,
    #[serde(default)]
    parent: Option<RawRepositoryRef>,
    #[serde(default)]
    source: Option<RawRepositoryRef>,
}

impl From<RawRepository> for RepositoryMetadata {
    fn from(raw: RawRepository) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            full_name: raw.full_name,
            owner: raw.owner.login,
            private: raw.private,
            fork: raw.fork,
            description: raw.description,
            default_branch: raw.default_branch,
            html_url: raw.html_url,
            open_issues_count: raw.open_issues_count,
            parent: raw.parent.map(Into::into),
            source: raw.source.map(Into::into),
        }
    }
}

/// Rate limit information from the last observed response headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub remaining: Option<i64>,
    /// Epoch milliseconds.
    pub reset_at: Option<i64>,
}

impl RateLimitInfo {
    pub fn reset_at_utc(&self) -> Option<DateTime<Utc>> {
        self.reset_at.and_then(DateTime::from_timestamp_millis)
    }
}
