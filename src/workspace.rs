#![allow(clippy::module_name_repetitions)]
//! Repository worktrees for `renv`.
//!
//! Layout: `<base>/<owner>/<repo>` holds a bare clone, and each branch gets a
//! worktree directory `worktree-<branch>` inside it.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, ConfigValue, ARGS_KEY};
use crate::errors::{Result, RockercError};
use crate::plan::derive_container_name;
use crate::util::{ExecRequest, ExecService};

pub const DEFAULT_BRANCH: &str = "main";

/// Parsed `owner/repo[@branch][#subfolder]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub subfolder: Option<String>,
}

impl RepoSpec {
    pub fn parse(spec: &str) -> Result<Self> {
        let err = |reason: &str| RockercError::RepoSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(err("empty"));
        }
        let (rest, subfolder) = match trimmed.split_once('#') {
            Some((r, s)) => (r, Some(s.trim_matches('/').to_string()).filter(|s| !s.is_empty())),
            None => (trimmed, None),
        };
        let (repo_part, branch) = match rest.split_once('@') {
            Some((r, b)) if b.trim().is_empty() => (r, DEFAULT_BRANCH.to_string()),
            Some((r, b)) => (r, b.trim().to_string()),
            None => (rest, DEFAULT_BRANCH.to_string()),
        };
        if repo_part.contains("//") {
            return Err(err("double slash"));
        }
        let Some((owner, repo)) = repo_part.split_once('/') else {
            return Err(err("expected owner/repo"));
        };
        let (owner, repo) = (owner.trim(), repo.trim());
        if owner.is_empty() || repo.is_empty() {
            return Err(err("owner and repo must not be empty"));
        }
        if repo.contains('/') {
            return Err(err("expected owner/repo"));
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch,
            subfolder,
        })
    }

    pub fn remote_url(&self) -> String {
        format!("git@github.com:{}/{}.git", self.owner, self.repo)
    }

    /// `<repo>.<branch>`, sanitized for docker.
    pub fn container_name(&self) -> String {
        derive_container_name(&format!("{}.{}", self.repo, self.branch))
    }
}

/// `RENV_DIR`, else `~/renv`.
pub fn renv_base_dir() -> PathBuf {
    if let Ok(p) = env::var("RENV_DIR") {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("renv")
}

pub fn repo_dir(base: &Path, spec: &RepoSpec) -> PathBuf {
    base.join(&spec.owner).join(&spec.repo)
}

pub fn worktree_dir(base: &Path, spec: &RepoSpec) -> PathBuf {
    repo_dir(base, spec).join(format!("worktree-{}", spec.branch.replace('/', "-")))
}

/// Extensions adjusted for a worktree launch: `auto` detects from the worktree
/// and `cwd` is dropped, since the worktree is already the mounted workspace.
pub fn worktree_config(config: &Config, worktree: &Path) -> Config {
    let mut out = config.clone();
    if let Some(ConfigValue::List(args)) = out.get_mut(ARGS_KEY) {
        *args = args
            .iter()
            .filter(|a| a.as_str() != "cwd")
            .map(|a| {
                if a == "auto" {
                    format!("auto={}", worktree.display())
                } else {
                    a.clone()
                }
            })
            .collect();
    }
    out
}

/// Git operations `ensure_worktree` needs.
pub trait GitProvider {
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()>;
    fn fetch_all(&self, repo: &Path) -> Result<()>;
    fn branch_exists(&self, repo: &Path, branch: &str) -> bool;
    fn create_worktree(&self, repo: &Path, dir: &Path, branch: &str) -> Result<()>;
    fn create_branch_from_default(&self, repo: &Path, dir: &Path, branch: &str) -> Result<()>;
    /// Forget worktree records whose directory is gone.
    fn prune_worktrees(&self, repo: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct GitCli {
    exec: ExecService,
}

impl GitCli {
    pub fn new(exec: ExecService) -> Self {
        Self { exec }
    }

    fn git(&self, repo: &Path) -> ExecRequest {
        ExecRequest::new("git").arg("-C").arg(repo)
    }

    fn run(&self, request: ExecRequest) -> Result<()> {
        let shown = request.display();
        tracing::debug!(command = %shown, "git");
        let out = self.exec.run(request).map_err(|e| RockercError::Git {
            command: shown.clone(),
            stderr: format!("{e:#}"),
        })?;
        if out.success() {
            Ok(())
        } else {
            Err(RockercError::Git {
                command: shown,
                stderr: out.stderr.trim().to_string(),
            })
        }
    }
}

impl GitProvider for GitCli {
    fn clone_bare(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.run(
            ExecRequest::new("git")
                .args(["clone", "--bare", url])
                .arg(dest)
                .timeout(Duration::ZERO),
        )
    }

    fn fetch_all(&self, repo: &Path) -> Result<()> {
        self.run(
            self.git(repo)
                .args(["fetch", "--all", "--prune"])
                .timeout(Duration::ZERO),
        )
    }

    fn branch_exists(&self, repo: &Path, branch: &str) -> bool {
        let req = self
            .git(repo)
            .args(["rev-parse", "--verify", "--quiet"])
            .arg(format!("refs/heads/{branch}"));
        self.exec.run(req).is_ok_and(|o| o.success())
    }

    fn create_worktree(&self, repo: &Path, dir: &Path, branch: &str) -> Result<()> {
        self.run(
            self.git(repo)
                .args(["worktree", "add"])
                .arg(dir)
                .arg(branch)
                .timeout(Duration::ZERO),
        )
    }

    fn create_branch_from_default(&self, repo: &Path, dir: &Path, branch: &str) -> Result<()> {
        self.run(
            self.git(repo)
                .args(["worktree", "add", "-b", branch])
                .arg(dir)
                .arg("HEAD")
                .timeout(Duration::ZERO),
        )
    }

    fn prune_worktrees(&self, repo: &Path) -> Result<()> {
        self.run(self.git(repo).args(["worktree", "prune"]))
    }
}

/// Clone or refresh the bare repository, then make sure the branch worktree exists.
/// Returns the worktree directory.
pub fn ensure_worktree<G: GitProvider + ?Sized>(
    git: &G,
    base: &Path,
    spec: &RepoSpec,
) -> Result<PathBuf> {
    let repo = repo_dir(base, spec);
    if repo.exists() {
        if let Err(e) = git.fetch_all(&repo) {
            tracing::warn!(repo = %repo.display(), error = %e, "fetch failed, using local state");
        }
    } else {
        crate::color::log_info_stderr(
            crate::color::color_enabled_stderr(),
            &format!("cloning {}/{} into {}", spec.owner, spec.repo, repo.display()),
        );
        git.clone_bare(&spec.remote_url(), &repo)?;
    }

    let dir = worktree_dir(base, spec);
    if dir.exists() {
        return Ok(dir);
    }
    let created = if git.branch_exists(&repo, &spec.branch) {
        git.create_worktree(&repo, &dir, &spec.branch)
    } else {
        tracing::info!(branch = %spec.branch, "branch not found, creating from default branch");
        git.create_branch_from_default(&repo, &dir, &spec.branch)
    };
    if let Err(e) = created {
        discard_partial_worktree(git, &repo, &dir);
        return Err(e);
    }
    Ok(dir)
}

/// A half-written worktree directory would be taken as ready on the next run.
fn discard_partial_worktree<G: GitProvider + ?Sized>(git: &G, repo: &Path, dir: &Path) {
    if dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not remove partial worktree");
            return;
        }
    }
    if let Err(e) = git.prune_worktrees(repo) {
        tracing::debug!(repo = %repo.display(), error = %e, "worktree prune failed");
    }
}
