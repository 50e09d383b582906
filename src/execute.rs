#![allow(clippy::module_name_repetitions)]
//! Carrying out a launch plan: launch, wait, open the IDE, attach.

use std::thread;
use std::time::{Duration, Instant};

use crate::docker::{ContainerInspector, ContainerRuntime};
use crate::errors::{Result, RockercError};
use crate::plan::LaunchPlan;
use crate::util::{shell_join, ExecRequest, ExecService};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub timeout: Duration,
    pub interval: Duration,
    /// Command to run in the container; empty attaches an interactive shell.
    pub command: Vec<String>,
    /// Directory below the workspace mount to start in.
    pub subdir: Option<String>,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_WAIT_INTERVAL,
            command: Vec::new(),
            subdir: None,
        }
    }
}

fn attach_workdir(plan: &LaunchPlan, subdir: Option<&str>) -> Option<String> {
    let base = plan.mount_target.as_deref()?;
    match subdir.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(sub) => Some(format!("{base}/{sub}")),
        None => Some(base.to_string()),
    }
}

/// Opens an editor attached to the container.
pub trait IdeLauncher {
    fn open(&self, plan: &LaunchPlan) -> Result<()>;
}

/// VS Code via its `code` CLI and the attached-container URI.
#[derive(Debug, Default)]
pub struct VsCode {
    exec: ExecService,
}

pub fn vscode_folder_uri(plan: &LaunchPlan) -> String {
    let folder = plan
        .mount_target
        .clone()
        .unwrap_or_else(|| crate::plan::workspace_mount_target(&plan.container_name));
    format!(
        "vscode-remote://attached-container+{}{}",
        plan.container_hex, folder
    )
}

impl IdeLauncher for VsCode {
    fn open(&self, plan: &LaunchPlan) -> Result<()> {
        let code = which::which("code").map_err(|_| RockercError::ToolNotFound {
            tool: "code".to_string(),
        })?;
        let uri = vscode_folder_uri(plan);
        let req = ExecRequest::new(code).args(["--folder-uri", uri.as_str()]);
        let shown = req.display();
        let out = self
            .exec
            .run(req)
            .map_err(|e| RockercError::ContainerCommand {
                command: shown.clone(),
                code: 1,
                stderr: format!("{e:#}"),
            })?;
        if !out.success() {
            return Err(RockercError::ContainerCommand {
                command: shown,
                code: out.code(),
                stderr: out.stderr,
            });
        }
        Ok(())
    }
}

/// Poll until the container is running. Existence alone does not count.
pub fn wait_for_container<I: ContainerInspector + ?Sized>(
    inspector: &I,
    name: &str,
    timeout: Duration,
    interval: Duration,
) -> bool {
    let started = Instant::now();
    loop {
        if inspector.is_running(name) {
            return true;
        }
        let elapsed = started.elapsed();
        if elapsed >= timeout {
            return false;
        }
        thread::sleep(interval.min(timeout - elapsed));
    }
}

pub fn execute_plan<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    ide: Option<&dyn IdeLauncher>,
    plan: &LaunchPlan,
    options: &ExecuteOptions,
) -> Result<i32> {
    let name = plan.container_name.as_str();

    if !plan.rocker_cmd.is_empty() {
        let out = runtime.launch(&plan.rocker_cmd)?;
        if !out.success() {
            return Err(RockercError::LaunchFailed {
                command: shell_join(&plan.rocker_cmd),
                code: out.code,
                stderr: out.stderr,
            });
        }
    }

    if !wait_for_container(runtime, name, options.timeout, options.interval) {
        return Err(RockercError::NotRunning {
            name: name.to_string(),
            waited: options.timeout,
        });
    }
    tracing::debug!(container = %name, created = plan.created, "container running");

    if plan.vscode {
        match ide {
            Some(ide) => {
                if let Err(e) = ide.open(plan) {
                    tracing::warn!(container = %name, error = %e, "could not open editor");
                    crate::color::warn_print(&format!("could not open VS Code: {e}"));
                }
            }
            None => tracing::warn!(container = %name, "no editor launcher configured"),
        }
    }

    let workdir = attach_workdir(plan, options.subdir.as_deref());
    if options.command.is_empty() {
        runtime.interactive_shell(name, workdir.as_deref())
    } else {
        runtime.exec(name, workdir.as_deref(), &options.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> LaunchPlan {
        LaunchPlan {
            container_name: "ab".to_string(),
            container_hex: "6162".to_string(),
            rocker_cmd: Vec::new(),
            created: false,
            vscode: true,
            mount_target: Some("/workspaces/ab".to_string()),
        }
    }

    #[test]
    fn test_vscode_folder_uri() {
        assert_eq!(
            vscode_folder_uri(&plan()),
            "vscode-remote://attached-container+6162/workspaces/ab"
        );
    }

    #[test]
    fn test_attach_workdir_appends_subdir() {
        assert_eq!(
            attach_workdir(&plan(), Some("/docs/api/")).as_deref(),
            Some("/workspaces/ab/docs/api")
        );
        assert_eq!(attach_workdir(&plan(), None).as_deref(), Some("/workspaces/ab"));
    }
}
