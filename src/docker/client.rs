//! `ContainerRuntime` backed by the docker CLI.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::docker::extensions::parse_marker;
use crate::docker::runtime::{
    container_runtime_path, launch_tool_path, ContainerInspector, ContainerRuntime, ImageBuilder,
    LaunchOutput,
};
use crate::errors::{Result, RockercError};
use crate::util::exec::OutputMode;
use crate::util::{ExecOutput, ExecRequest, ExecService};

const DEFAULT_SHELL: &str = "/bin/bash";

#[derive(Debug, Clone)]
pub struct DockerClient {
    docker: PathBuf,
    exec: ExecService,
}

impl DockerClient {
    pub fn new(docker: PathBuf) -> Self {
        Self {
            docker,
            exec: ExecService::default(),
        }
    }

    /// Locate docker on PATH.
    pub fn discover() -> Result<Self> {
        container_runtime_path().map(Self::new)
    }

    fn docker(&self) -> ExecRequest {
        ExecRequest::new(&self.docker)
    }

    /// Run a query; any failure is logged and reported as `None`.
    fn query(&self, request: ExecRequest) -> Option<ExecOutput> {
        let shown = request.display();
        match self.exec.run(request) {
            Ok(out) if out.success() => Some(out),
            Ok(out) => {
                tracing::debug!(command = %shown, code = out.code(), stderr = %out.stderr.trim(), "docker query failed");
                None
            }
            Err(e) => {
                tracing::debug!(command = %shown, error = %format!("{e:#}"), "docker query failed");
                None
            }
        }
    }

    fn ps_has_name(&self, name: &str, all: bool) -> bool {
        let mut req = self.docker().arg("ps");
        if all {
            req = req.arg("-a");
        }
        let filter = format!("name=^/{name}$");
        let req = req.args(["--filter", filter.as_str(), "--format", "{{.Names}}"]);
        self.query(req)
            .is_some_and(|out| out.stdout.lines().any(|l| l.trim() == name))
    }

    fn simple(&self, verb: &str, name: &str) -> bool {
        let req = self.docker().args([verb, name]);
        let shown = req.display();
        match self.exec.run(req) {
            Ok(out) if out.success() => true,
            Ok(out) => {
                tracing::warn!(command = %shown, code = out.code(), stderr = %out.stderr.trim(), "docker command failed");
                false
            }
            Err(e) => {
                tracing::warn!(command = %shown, error = %format!("{e:#}"), "docker command failed");
                false
            }
        }
    }

    fn run_inherited(&self, request: ExecRequest) -> Result<i32> {
        let shown = request.display();
        let out = self
            .exec
            .run(request.mode(OutputMode::Inherit).timeout(Duration::ZERO))
            .map_err(|e| spawn_failure(&shown, &e))?;
        Ok(out.code())
    }
}

/// Turn a spawn/wait failure into a typed error, keeping "not found" distinct.
fn spawn_failure(command: &str, err: &anyhow::Error) -> RockercError {
    let not_found = err
        .root_cause()
        .downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound);
    if not_found {
        let tool = command.split_whitespace().next().unwrap_or(command);
        return RockercError::ToolNotFound {
            tool: tool.to_string(),
        };
    }
    RockercError::ContainerCommand {
        command: command.to_string(),
        code: 1,
        stderr: format!("{err:#}"),
    }
}

fn tty_flags() -> &'static str {
    if atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout) {
        "-it"
    } else {
        "-i"
    }
}

impl ContainerInspector for DockerClient {
    fn exists(&self, name: &str) -> bool {
        self.ps_has_name(name, true)
    }

    fn is_running(&self, name: &str) -> bool {
        self.ps_has_name(name, false)
    }

    fn stored_extensions(&self, name: &str) -> Option<Vec<String>> {
        let out = self.query(
            self.docker()
                .args(["inspect", "--format", "{{json .Config.Env}}", name]),
        )?;
        match serde_json::from_str::<Option<Vec<String>>>(out.stdout.trim()) {
            Ok(env) => parse_marker(&env.unwrap_or_default()),
            Err(e) => {
                tracing::debug!(container = %name, error = %e, "unparsable docker inspect output");
                None
            }
        }
    }
}

impl ImageBuilder for DockerClient {
    fn build_image(
        &self,
        dockerfile: &Path,
        context: &Path,
        tag: &str,
        no_cache: bool,
    ) -> Result<String> {
        let mut req = self.docker().arg("build");
        if no_cache {
            req = req.arg("--no-cache");
        }
        let req = req
            .args(["-t", tag, "-f"])
            .arg(dockerfile)
            .arg(context)
            .mode(OutputMode::TeeStderr)
            .timeout(Duration::ZERO);
        let shown = req.display();
        tracing::info!(command = %shown, "building image");
        let out = self
            .exec
            .run(req)
            .map_err(|e| spawn_failure(&shown, &e))?;
        if !out.success() {
            return Err(RockercError::ContainerCommand {
                command: shown,
                code: out.code(),
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(tag.to_string())
    }
}

impl ContainerRuntime for DockerClient {
    fn start(&self, name: &str) -> bool {
        self.simple("start", name)
    }

    fn stop(&self, name: &str) -> bool {
        self.simple("stop", name)
    }

    fn remove(&self, name: &str) -> bool {
        self.simple("rm", name)
    }

    fn launch(&self, command: &[String]) -> Result<LaunchOutput> {
        let Some((program, args)) = command.split_first() else {
            return Ok(LaunchOutput {
                code: 0,
                stderr: String::new(),
            });
        };
        let program = if program == "rocker" {
            launch_tool_path()?
        } else {
            PathBuf::from(program)
        };
        let request = ExecRequest::new(&program)
            .args(args)
            .mode(OutputMode::TeeStderr)
            .timeout(Duration::ZERO);
        let shown = crate::util::shell_join(command);
        tracing::info!(command = %shown, "launching container");
        let out = self
            .exec
            .run(request)
            .map_err(|e| spawn_failure(&shown, &e))?;
        Ok(LaunchOutput {
            code: out.code(),
            stderr: out.stderr,
        })
    }

    fn interactive_shell(&self, name: &str, workdir: Option<&str>) -> Result<i32> {
        let shell = env::var("ROCKERC_SHELL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        let mut req = self.docker().args(["exec", tty_flags()]);
        if let Some(dir) = workdir {
            req = req.args(["-w", dir]);
        }
        self.run_inherited(req.args([name, shell.as_str()]))
    }

    fn exec(&self, name: &str, workdir: Option<&str>, command: &[String]) -> Result<i32> {
        let mut req = self.docker().arg("exec");
        if atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout) {
            req = req.arg("-it");
        }
        if let Some(dir) = workdir {
            req = req.args(["-w", dir]);
        }
        self.run_inherited(req.arg(name).args(command))
    }
}
