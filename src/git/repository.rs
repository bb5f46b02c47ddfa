//! `git2`-backed [`GitClient`].

use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{BranchType, DiffFormat, DiffOptions, Repository, Sort, StatusOptions};
use parking_lot::Mutex;

use super::{CommitInfo, GitClient, GitError, GitStatus};

/// Git repository wrapper with high-level operations.
pub struct GitRepository {
    // git2::Repository is Send but not Sync.
    repo: Mutex<Repository>,
    root: PathBuf,
}

impl GitRepository {
    /// Open the repository containing `path`, searching upward.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self, GitError> {
        let path = path.as_ref();
        let repo = Repository::discover(path)
            .map_err(|_| GitError::NotARepository(path.to_path_buf()))?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::NotARepository(path.to_path_buf()))?;

        tracing::debug!(root = %root.display(), "Opened git repository");
        Ok(Self { repo: Mutex::new(repo), root })
    }

    /// Repository working directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ahead_behind(repo: &Repository) -> (usize, usize) {
        let Ok(head) = repo.head() else {
            return (0, 0);
        };

        let Some(local_oid) = head.target() else {
            return (0, 0);
        };

        let Some(branch_name) = head.shorthand() else {
            return (0, 0);
        };

        let Ok(branch) = repo.find_branch(branch_name, BranchType::Local) else {
            return (0, 0);
        };

        let Ok(upstream) = branch.upstream() else {
            return (0, 0);
        };

        let Some(upstream_oid) = upstream.get().target() else {
            return (0, 0);
        };

        repo.graph_ahead_behind(local_oid, upstream_oid).unwrap_or((0, 0))
    }

    fn patch(
        repo: &Repository,
        head_tree: Option<&git2::Tree<'_>>,
        opts: &mut DiffOptions,
    ) -> Result<String, GitError> {
        let diff = repo.diff_tree_to_workdir_with_index(head_tree, Some(opts))?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                patch.push(line.origin());
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(patch)
    }

    fn branch_name(repo: &Repository) -> Result<Option<String>, GitError> {
        match repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(String::from)),
            Ok(_) => Ok(None),
            // Unborn branch: HEAD points at a ref that has no commit yet.
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let head = repo.find_reference("HEAD")?;
                Ok(head
                    .symbolic_target()
                    .map(|t| t.strip_prefix("refs/heads/").unwrap_or(t).to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl GitClient for GitRepository {
    fn status(&self) -> Result<GitStatus, GitError> {
        let repo = self.repo.lock();

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .include_unmodified(false);

        let statuses = repo.statuses(Some(&mut opts))?;

        let mut status = GitStatus { branch: Self::branch_name(&repo)?, ..GitStatus::default() };

        for entry in statuses.iter() {
            let Some(path) = entry.path().map(String::from) else {
                continue;
            };
            let flags = entry.status();

            if flags.is_index_new()
                || flags.is_index_modified()
                || flags.is_index_deleted()
                || flags.is_index_renamed()
                || flags.is_index_typechange()
            {
                status.staged_files.push(path.clone());
            }

            if flags.is_wt_modified()
                || flags.is_wt_deleted()
                || flags.is_wt_renamed()
                || flags.is_wt_typechange()
            {
                status.modified_files.push(path.clone());
            }

            if flags.is_wt_new() {
                status.untracked_files.push(path);
            }
        }

        status.is_clean = status.staged_files.is_empty()
            && status.modified_files.is_empty()
            && status.untracked_files.is_empty();
        (status.ahead, status.behind) = Self::ahead_behind(&repo);

        Ok(status)
    }

    fn diff(&self) -> Result<String, GitError> {
        let repo = self.repo.lock();
        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.context_lines(3);
        Self::patch(&repo, head_tree.as_ref(), &mut opts)
    }

    fn file_diff(&self, path: &str) -> Result<String, GitError> {
        let repo = self.repo.lock();
        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(_) => None,
        };

        let mut opts = DiffOptions::new();
        opts.context_lines(3)
            .pathspec(path)
            .disable_pathspec_match(true)
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);
        Self::patch(&repo, head_tree.as_ref(), &mut opts)
    }

    fn stage(&self, paths: &[String]) -> Result<(), GitError> {
        let repo = self.repo.lock();
        let mut index = repo.index()?;

        for path in paths {
            if self.root.join(path).exists() {
                index.add_path(Path::new(path))?;
            } else {
                index.remove_path(Path::new(path))?;
            }
        }
        index.write()?;

        tracing::debug!(files = paths.len(), "Staged files");
        Ok(())
    }

    fn current_branch(&self) -> Result<String, GitError> {
        let repo = self.repo.lock();
        Self::branch_name(&repo)?.ok_or(GitError::DetachedHead)
    }

    fn default_remote(&self) -> Option<String> {
        let repo = self.repo.lock();
        let remotes = repo.remotes().ok()?;
        let names: Vec<&str> = remotes.iter().flatten().collect();
        if names.contains(&"origin") {
            return Some("origin".to_string());
        }
        names.first().map(|n| (*n).to_string())
    }

    fn commit(&self, message: &str, all: bool) -> Result<String, GitError> {
        let repo = self.repo.lock();
        let mut index = repo.index()?;

        if all {
            index.update_all(["*"], None)?;
            index.write()?;
        }

        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };

        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                return Err(GitError::NothingToCommit);
            }
        } else if tree.is_empty() {
            return Err(GitError::NothingToCommit);
        }

        let signature = repo.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;

        tracing::info!(hash = %oid, "Created commit");
        Ok(oid.to_string())
    }

    fn push(&self, remote: &str, branch: &str, set_upstream: bool) -> Result<(), GitError> {
        // Shell out so credential helpers and SSH agents apply.
        let mut args = vec!["push"];
        if set_upstream {
            args.push("--set-upstream");
        }
        args.push(remote);
        args.push(branch);

        let output = Command::new("git").current_dir(&self.root).args(&args).output()?;
        if !output.status.success() {
            return Err(GitError::Command {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::info!(remote, branch, "Pushed branch");
        Ok(())
    }

    fn branch_commits(&self, base: &str, head: &str) -> Result<Vec<CommitInfo>, GitError> {
        let repo = self.repo.lock();
        let head_oid = repo.revparse_single(head)?.peel_to_commit()?.id();

        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(head_oid)?;
        // A missing base (e.g. never fetched) lists the whole history.
        if let Ok(base) = repo.revparse_single(base) {
            walk.hide(base.peel_to_commit()?.id())?;
        }

        walk.map(|oid| -> Result<CommitInfo, GitError> {
            let commit = repo.find_commit(oid?)?;
            Ok(CommitInfo {
                hash: commit.id().to_string(),
                summary: commit.summary().unwrap_or_default().to_string(),
            })
        })
        .collect()
    }

    fn remote_url(&self, name: &str) -> Option<String> {
        let repo = self.repo.lock();
        let remote = repo.find_remote(name).ok()?;
        remote.url().map(String::from)
    }
}
