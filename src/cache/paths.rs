// Cache path utilities.
// Locates the snapshot files under the platform cache directory.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Get the base cache directory (~/.cache/moltboard on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "moltboard").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the repository metadata snapshot.
pub fn metadata_snapshot_path(dir: &Path) -> PathBuf {
    dir.join("github").join("repo_metadata.json")
}

/// Path to the project issue list snapshot.
pub fn issues_snapshot_path(dir: &Path) -> PathBuf {
    dir.join("github").join("project_issues.json")
}

/// Cache key for repository-scoped entries.
pub fn repo_key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

/// Cache key for a project's view of a repository.
pub fn project_repo_key(project_id: &str, owner: &str, repo: &str) -> String {
    format!("{}:{}/{}", project_id, owner, repo)
}
