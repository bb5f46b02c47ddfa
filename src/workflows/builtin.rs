//! Workflows shipped with Titan.

/// `(name, yaml)` pairs.
pub(super) const BUILTIN_WORKFLOWS: &[(&str, &str)] = &[
    ("commit", COMMIT),
    ("ai-commit", AI_COMMIT),
    ("atomic-commits", ATOMIC_COMMITS),
    ("create-pr", CREATE_PR),
    ("analyze", ANALYZE),
];

const COMMIT: &str = r"
name: commit
description: Commit all tracked changes with a message you type
params:
  all_files: true
steps:
  - id: status
    name: Check repository status
    plugin: git
    step: status
  - id: message
    name: Commit message
    plugin: git
    step: prompt_commit_message
  - id: commit
    name: Create commit
    plugin: git
    step: commit
";

const AI_COMMIT: &str = r"
name: ai-commit
description: Commit all tracked changes with an AI-suggested conventional message
params:
  all_files: true
steps:
  - id: status
    name: Check repository status
    plugin: git
    step: status
  - id: diff
    name: Collect changes
    plugin: git
    step: diff
  - id: suggest
    name: Suggest commit message
    plugin: agents
    step: suggest_commit_message
    optional: true
  - id: message
    name: Commit message
    plugin: git
    step: prompt_commit_message
  - id: commit
    name: Create commit
    plugin: git
    step: commit
";

const ATOMIC_COMMITS: &str = r"
name: atomic-commits
description: Split the uncommitted changes into AI-planned conventional commits
steps:
  - id: status
    name: Check repository status
    plugin: git
    step: status
  - id: atomic
    name: Create atomic commits
    plugin: agents
    step: ai_create_atomic_commits
";

const CREATE_PR: &str = r"
name: create-pr
description: Push the current branch and open a pull request
steps:
  - id: status
    name: Check repository status
    plugin: git
    step: status
  - id: push
    name: Push branch
    plugin: git
    step: push
  - id: ai_description
    name: Draft PR description
    plugin: agents
    step: suggest_pr_description
    optional: true
  - id: details
    name: Pull request details
    plugin: github
    step: prompt_pr_details
  - id: create
    name: Create pull request
    plugin: github
    step: create_pr
";

const ANALYZE: &str = r"
name: analyze
description: AI review of the uncommitted changes
steps:
  - id: status
    name: Check repository status
    plugin: git
    step: status
  - id: diff
    name: Collect changes
    plugin: git
    step: diff
  - id: analyze
    name: Analyze changes
    plugin: agents
    step: analyze_changes
";
