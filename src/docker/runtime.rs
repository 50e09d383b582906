#![allow(clippy::module_name_repetitions)]
//! Runtime discovery and the traits the planner and executor are written against.

use std::env;
use std::path::{Path, PathBuf};

use which::which;

use crate::errors::{Result, RockercError};

pub fn container_runtime_path() -> Result<PathBuf> {
    // Tests and callers can disable detection explicitly
    if env::var("ROCKERC_SKIP_DOCKER").ok().as_deref() == Some("1") {
        return Err(RockercError::ToolNotFound {
            tool: "docker".to_string(),
        });
    }
    which("docker").map_err(|_| RockercError::ToolNotFound {
        tool: "docker".to_string(),
    })
}

/// Path of the `rocker` launch tool; `ROCKERC_ROCKER` overrides PATH lookup.
pub fn launch_tool_path() -> Result<PathBuf> {
    if let Ok(p) = env::var("ROCKERC_ROCKER") {
        let p = p.trim();
        if !p.is_empty() {
            return which(p).map_err(|_| RockercError::ToolNotFound {
                tool: p.to_string(),
            });
        }
    }
    which("rocker").map_err(|_| RockercError::ToolNotFound {
        tool: "rocker".to_string(),
    })
}

/// Read-only queries against named containers.
///
/// Failures are reported as "absent": `false` or `None`.
pub trait ContainerInspector {
    /// True when a container with exactly this name exists, running or not.
    fn exists(&self, name: &str) -> bool;
    fn is_running(&self, name: &str) -> bool;
    /// Extensions recorded on the container at creation time.
    fn stored_extensions(&self, name: &str) -> Option<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutput {
    pub code: i32,
    pub stderr: String,
}

impl LaunchOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Builds an image from a Dockerfile and returns its tag.
pub trait ImageBuilder {
    fn build_image(&self, dockerfile: &Path, context: &Path, tag: &str, no_cache: bool)
        -> Result<String>;
}

pub trait ContainerRuntime: ContainerInspector + ImageBuilder {
    fn start(&self, name: &str) -> bool;
    fn stop(&self, name: &str) -> bool;
    fn remove(&self, name: &str) -> bool;
    /// Run a full launch command line (`command[0]` is the program).
    fn launch(&self, command: &[String]) -> Result<LaunchOutput>;
    /// Attach an interactive shell; returns its exit code.
    fn interactive_shell(&self, name: &str, workdir: Option<&str>) -> Result<i32>;
    fn exec(&self, name: &str, workdir: Option<&str>, command: &[String]) -> Result<i32>;
}
