//! End-to-end launch flow shared by both binaries: build a configured
//! Dockerfile, plan, execute, and retry on duplicate mounts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, ConfigValue, DOCKERFILE_KEY, IMAGE_KEY};
use crate::docker::{ContainerRuntime, ImageBuilder};
use crate::errors::Result;
use crate::execute::{execute_plan, ExecuteOptions, IdeLauncher};
use crate::plan::{prepare_launch_plan, LaunchPlan, LaunchRequest};
use crate::render::ExtraArgs;
use crate::retry::{launch_with_retry, DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub container_name: String,
    pub path: PathBuf,
    pub extra: ExtraArgs,
    pub vscode: bool,
    pub force: bool,
    /// Rebuild without the launch tool's cache; implies `force`.
    pub nocache: bool,
    /// Command to exec after attaching; empty opens a shell.
    pub command: Vec<String>,
    /// Start directory relative to the workspace mount.
    pub subdir: Option<String>,
    pub extra_volumes: Vec<(PathBuf, String)>,
    pub max_attempts: usize,
    pub wait_timeout: Duration,
    pub wait_interval: Duration,
}

impl LaunchSettings {
    pub fn new(container_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let defaults = ExecuteOptions::default();
        Self {
            container_name: container_name.into(),
            path: path.into(),
            extra: ExtraArgs::default(),
            vscode: false,
            force: false,
            nocache: false,
            command: Vec::new(),
            subdir: None,
            extra_volumes: Vec::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            wait_timeout: defaults.timeout,
            wait_interval: defaults.interval,
        }
    }

    pub fn request(&self, config: Config) -> LaunchRequest {
        let mut extra = self.extra.clone();
        if self.nocache && !extra.has_option("--nocache") {
            extra = extra.flag("--nocache");
        }
        let mut req = LaunchRequest::new(config, self.container_name.clone(), self.path.clone())
            .extra(extra)
            .vscode(self.vscode)
            .force(self.force || self.nocache);
        for (host, target) in &self.extra_volumes {
            req = req.extra_volume(host.clone(), target.clone());
        }
        req
    }

    fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            timeout: self.wait_timeout,
            interval: self.wait_interval,
            command: self.command.clone(),
            subdir: self.subdir.clone(),
        }
    }
}

/// Tag for an image built from the configured Dockerfile.
pub fn image_tag(container_name: &str) -> String {
    format!("rockerc-{}:latest", container_name.to_ascii_lowercase())
}

/// Build the configured `dockerfile`, if any, and point `image` at the result.
/// The path is relative to the workspace; its directory is the build context.
pub fn build_configured_image<B: ImageBuilder + ?Sized>(
    builder: &B,
    config: &Config,
    settings: &LaunchSettings,
) -> Result<Config> {
    let Some(dockerfile) = config
        .get(DOCKERFILE_KEY)
        .and_then(ConfigValue::as_str)
        .map(str::trim)
        .filter(|d| !d.is_empty())
    else {
        return Ok(config.clone());
    };
    let dockerfile = settings.path.join(dockerfile);
    let context = dockerfile
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.path.clone());
    let tag = builder.build_image(
        &dockerfile,
        &context,
        &image_tag(&settings.container_name),
        settings.nocache,
    )?;
    tracing::info!(tag = %tag, dockerfile = %dockerfile.display(), "built image");

    let mut built = config.clone();
    built.shift_remove(DOCKERFILE_KEY);
    built.insert(IMAGE_KEY.to_string(), ConfigValue::Str(tag));
    Ok(built)
}

/// Plan without executing, against the given runtime.
pub fn plan_only<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    config: &Config,
    settings: &LaunchSettings,
) -> Result<LaunchPlan> {
    let config = build_configured_image(runtime, config, settings)?;
    Ok(prepare_launch_plan(runtime, &settings.request(config)))
}

/// Plan and execute, rebuilding the plan on each duplicate-mount retry.
/// Returns the exit code of the attached shell or command.
pub fn run<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    ide: Option<&dyn IdeLauncher>,
    config: &Config,
    settings: &LaunchSettings,
) -> Result<i32> {
    let options = settings.execute_options();
    let config = build_configured_image(runtime, config, settings)?;
    launch_with_retry(&config, settings.max_attempts, |state| {
        let mut request = settings.request(state.config().clone());
        // force applies to the first attempt only
        request.force = request.force && state.attempt() == 1;
        let plan = prepare_launch_plan(runtime, &request);
        tracing::debug!(attempt = state.attempt(), plan = ?plan, "launch plan");
        execute_plan(runtime, ide, &plan, &options)
    })
}
