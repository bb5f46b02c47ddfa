//! Git integration module.
//!
//! Steps reach the repository through [`GitClient`]. The `git` feature
//! provides [`GitRepository`], backed by `git2`.

#[cfg(feature = "git")]
mod repository;

#[cfg(feature = "git")]
pub use repository::GitRepository;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::Settings;

/// Working tree state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitStatus {
    /// Current branch name (None if detached HEAD)
    pub branch: Option<String>,

    /// No staged, modified or untracked files
    pub is_clean: bool,

    /// Tracked files changed in the working tree
    pub modified_files: Vec<String>,

    /// Files not known to git
    pub untracked_files: Vec<String>,

    /// Files with changes in the index
    pub staged_files: Vec<String>,

    /// Commits ahead of upstream
    pub ahead: usize,

    /// Commits behind upstream
    pub behind: usize,
}

impl GitStatus {
    /// Branch name, or "HEAD" if detached.
    #[must_use]
    pub fn branch_display(&self) -> &str {
        self.branch.as_deref().unwrap_or("HEAD")
    }

    /// Every changed path, staged first, without duplicates.
    #[must_use]
    pub fn changed_files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = Vec::new();
        for file in self.staged_files.iter().chain(&self.modified_files).chain(&self.untracked_files)
        {
            if !files.contains(&file.as_str()) {
                files.push(file);
            }
        }
        files
    }

    /// Compact status string for display.
    #[must_use]
    pub fn status_string(&self) -> String {
        let mut parts = Vec::new();

        if self.ahead > 0 {
            parts.push(format!("↑{}", self.ahead));
        }
        if self.behind > 0 {
            parts.push(format!("↓{}", self.behind));
        }
        if !self.staged_files.is_empty() {
            parts.push(format!("●{}", self.staged_files.len()));
        }
        if !self.modified_files.is_empty() {
            parts.push(format!("✚{}", self.modified_files.len()));
        }
        if !self.untracked_files.is_empty() {
            parts.push(format!("?{}", self.untracked_files.len()));
        }

        if parts.is_empty() {
            "✓".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// One commit in a branch listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub summary: String,
}

/// Errors from git operations.
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("HEAD is detached")]
    DetachedHead,

    #[error("Nothing to commit")]
    NothingToCommit,

    #[cfg(feature = "git")]
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("`{command}` failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git support not available - compile with 'git' feature")]
    FeatureNotAvailable,
}

/// Version control operations used by workflow steps.
pub trait GitClient: Send + Sync {
    fn status(&self) -> Result<GitStatus, GitError>;

    /// Unified patch of staged and unstaged changes against HEAD.
    fn diff(&self) -> Result<String, GitError>;

    /// Patch for a single path, including untracked file content.
    fn file_diff(&self, path: &str) -> Result<String, GitError>;

    /// Add `paths` to the index. Paths deleted from the working tree are
    /// removed from it.
    fn stage(&self, paths: &[String]) -> Result<(), GitError>;

    fn current_branch(&self) -> Result<String, GitError>;

    /// `origin` if present, else the first remote.
    fn default_remote(&self) -> Option<String>;

    /// Create a commit and return its hash. With `all`, modified tracked
    /// files are staged first.
    fn commit(&self, message: &str, all: bool) -> Result<String, GitError>;

    fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<(), GitError>;

    /// Commits reachable from `head` but not from `base`, newest first.
    fn branch_commits(&self, base: &str, head: &str) -> Result<Vec<CommitInfo>, GitError>;

    fn remote_url(&self, name: &str) -> Option<String>;
}

/// Open the repository containing the project directory.
#[cfg(feature = "git")]
pub fn open_repository(settings: &Settings) -> Result<Box<dyn GitClient>, GitError> {
    let dir = settings.project_dir();
    let repo = GitRepository::discover(&dir)?;
    Ok(Box::new(repo))
}

/// Open the repository containing the project directory.
#[cfg(not(feature = "git"))]
pub fn open_repository(_settings: &Settings) -> Result<Box<dyn GitClient>, GitError> {
    Err(GitError::FeatureNotAvailable)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::{CommitInfo, GitClient, GitError, GitStatus};

    /// In-memory repository recording commits, pushes and staging.
    #[derive(Default)]
    pub struct FakeGit {
        pub status: GitStatus,
        pub diff: String,
        pub file_diffs: HashMap<String, String>,
        pub fail_commits: bool,
        pub staged: Mutex<Vec<Vec<String>>>,
        pub commits: Mutex<Vec<(String, bool)>>,
        pub pushes: Mutex<Vec<(String, String, bool)>>,
    }

    impl GitClient for FakeGit {
        fn status(&self) -> Result<GitStatus, GitError> {
            Ok(self.status.clone())
        }

        fn diff(&self) -> Result<String, GitError> {
            Ok(self.diff.clone())
        }

        fn file_diff(&self, path: &str) -> Result<String, GitError> {
            Ok(self.file_diffs.get(path).cloned().unwrap_or_default())
        }

        fn stage(&self, paths: &[String]) -> Result<(), GitError> {
            self.staged.lock().push(paths.to_vec());
            Ok(())
        }

        fn current_branch(&self) -> Result<String, GitError> {
            self.status.branch.clone().ok_or(GitError::DetachedHead)
        }

        fn default_remote(&self) -> Option<String> {
            Some("origin".to_string())
        }

        fn commit(&self, message: &str, all: bool) -> Result<String, GitError> {
            if self.fail_commits {
                return Err(GitError::NothingToCommit);
            }
            self.commits.lock().push((message.to_string(), all));
            Ok("abc123".to_string())
        }

        fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<(), GitError> {
            self.pushes.lock().push((remote.to_string(), branch.to_string(), set_upstream));
            Ok(())
        }

        fn branch_commits(&self, _base: &str, _head: &str) -> Result<Vec<CommitInfo>, GitError> {
            Ok(Vec::new())
        }

        fn remote_url(&self, _name: &str) -> Option<String> {
            None
        }
    }
}
