//! Image tags derived from the project's git checkout.

use std::path::Path;

use serde::Serialize;

use crate::shell::execute_quiet;

/// Tag suffix outside a git repository.
pub const UNVERSIONED_TAG: &str = "latest";

/// Git facts about a project directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    /// `HEAD` commit, if the directory is a git checkout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Current branch, unless `HEAD` is detached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// URL of the `origin` remote
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

impl GitInfo {
    /// Probe `dir` with the `git` CLI. Anything git can't answer is `None`.
    pub fn detect(dir: &Path) -> Self {
        let git = |args: &[&str]| -> Option<String> {
            let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
            execute_quiet("git", &args, Some(dir))
                .ok()
                .and_then(|r| r.trimmed_stdout())
        };

        let commit = git(&["rev-parse", "HEAD"]);
        if commit.is_none() {
            tracing::debug!("{} is not a git checkout", dir.display());
            return Self::default();
        }

        let branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]).filter(|b| b != "HEAD");
        let remote = git(&["remote", "get-url", "origin"]);

        Self {
            commit,
            branch,
            remote,
        }
    }

    /// The commit, or `latest` outside a repository.
    pub fn version(&self) -> &str {
        self.commit.as_deref().unwrap_or(UNVERSIONED_TAG)
    }
}

/// Repository name from a remote URL, without a `.git` style suffix.
pub fn repo_name(remote: &str) -> Option<String> {
    Path::new(remote.trim_end_matches('/'))
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
}

/// Image tag of the tests container.
///
/// `<repo>:<commit>` inside a git checkout with an `origin`, otherwise
/// `<dirname>:<commit>` or `<dirname>:latest`. A build stage is appended
/// as `-<stage>`.
pub fn image_tag(project_dir: &Path, git: &GitInfo, stage: Option<&str>) -> String {
    let name = git
        .remote
        .as_deref()
        .and_then(repo_name)
        .or_else(|| {
            project_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        })
        .unwrap_or_else(|| "teststack".to_string());

    let mut tag = format!("{}:{}", name, git.version());
    if let Some(stage) = stage {
        tag.push('-');
        tag.push_str(stage);
    }
    tag
}

/// Image tag of a service built from a directory.
pub fn service_tag(prefix: &str, service: &str, git: &GitInfo) -> String {
    format!("{}{}:{}", prefix, service, git.version())
}
