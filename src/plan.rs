#![allow(clippy::module_name_repetitions)]
//! Deciding whether to reuse, restart or rebuild the container.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{
    config_args, merge_keyed, volume_identity, Config, ConfigValue, DETACH_KEY, NAME_KEY,
    VOLUME_KEY,
};
use crate::docker::{extensions_changed, marker_value, ContainerRuntime};
use crate::render::{render_tokens, ExtraArgs};
use crate::report::render_extension_comparison_table;

pub const WORKSPACES_DIR: &str = "/workspaces";

const IMAGE_NAME_KEY: &str = "image-name";

/// Everything the executor needs; produced once per launch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchPlan {
    pub container_name: String,
    pub container_hex: String,
    /// Full launch command, or empty when the existing container is reused.
    pub rocker_cmd: Vec<String>,
    pub created: bool,
    pub vscode: bool,
    pub mount_target: Option<String>,
}

impl LaunchPlan {
    pub fn reuses_container(&self) -> bool {
        self.rocker_cmd.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub config: Config,
    pub extra: ExtraArgs,
    pub container_name: String,
    pub vscode: bool,
    pub force: bool,
    pub path: PathBuf,
    /// Desired extensions; defaults to the config's `args`.
    pub extensions: Option<Vec<String>>,
    /// Additional `(host, target)` bind mounts.
    pub extra_volumes: Vec<(PathBuf, String)>,
}

impl LaunchRequest {
    pub fn new(config: Config, container_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            extra: ExtraArgs::default(),
            container_name: container_name.into(),
            vscode: false,
            force: false,
            path: path.into(),
            extensions: None,
            extra_volumes: Vec::new(),
        }
    }

    #[must_use]
    pub fn extra(mut self, extra: ExtraArgs) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn vscode(mut self, on: bool) -> Self {
        self.vscode = on;
        self
    }

    #[must_use]
    pub fn force(mut self, on: bool) -> Self {
        self.force = on;
        self
    }

    #[must_use]
    pub fn extensions(mut self, exts: Vec<String>) -> Self {
        self.extensions = Some(exts);
        self
    }

    #[must_use]
    pub fn extra_volume(mut self, host: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        self.extra_volumes.push((host.into(), target.into()));
        self
    }

    fn desired_extensions(&self) -> Vec<String> {
        self.extensions
            .clone()
            .unwrap_or_else(|| config_args(&self.config))
    }
}

/// Container-safe name: `/` and anything outside `[A-Za-z0-9_.-]` become `-`.
pub fn derive_container_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub fn container_hex(name: &str) -> String {
    hex::encode(name)
}

pub fn workspace_mount_target(name: &str) -> String {
    format!("{WORKSPACES_DIR}/{name}")
}

/// Stop then remove; failures are logged and otherwise ignored.
pub fn stop_and_remove_container<R: ContainerRuntime + ?Sized>(runtime: &R, name: &str) {
    if !runtime.stop(name) {
        tracing::warn!(container = %name, "failed to stop container");
    }
    if !runtime.remove(name) {
        tracing::warn!(container = %name, "failed to remove container");
    }
}

pub fn prepare_launch_plan<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    request: &LaunchRequest,
) -> LaunchPlan {
    let name = request.container_name.as_str();
    let desired = request.desired_extensions();

    let mut exists = runtime.exists(name);
    if exists && request.force {
        tracing::info!(container = %name, "force: removing existing container");
        stop_and_remove_container(runtime, name);
        exists = false;
    }

    if exists {
        let stored = runtime.stored_extensions(name);
        if extensions_changed(&desired, stored.as_deref()) {
            let table = render_extension_comparison_table(&desired, stored.as_deref());
            tracing::info!(container = %name, stored = ?stored, desired = ?desired, "extensions changed");
            crate::color::log_info_stderr(
                crate::color::color_enabled_stderr(),
                &format!("extensions changed for {name}, rebuilding container\n{table}"),
            );
            stop_and_remove_container(runtime, name);
        } else if !runtime.is_running(name) {
            if runtime.start(name) {
                tracing::info!(container = %name, "started stopped container");
                return reuse_plan(request);
            }
            tracing::warn!(container = %name, "could not start container, recreating");
            stop_and_remove_container(runtime, name);
        } else {
            tracing::info!(container = %name, "reusing running container");
            return reuse_plan(request);
        }
    }

    build_plan(request, &desired)
}

fn reuse_plan(request: &LaunchRequest) -> LaunchPlan {
    let name = &request.container_name;
    LaunchPlan {
        container_name: name.clone(),
        container_hex: container_hex(name),
        rocker_cmd: Vec::new(),
        created: false,
        vscode: request.vscode,
        mount_target: Some(workspace_mount_target(name)),
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn build_plan(request: &LaunchRequest, desired: &[String]) -> LaunchPlan {
    let name = request.container_name.as_str();
    let target = workspace_mount_target(name);

    let configured = |key: &str| {
        request
            .config
            .get(key)
            .is_some_and(|v| !matches!(v, ConfigValue::Bool(false)))
    };
    let mut extra = request.extra.clone();
    if !extra.is_detached() && !configured(DETACH_KEY) {
        extra = extra.flag("--detach");
    }
    if !extra.has_option("--name") && !configured(NAME_KEY) {
        extra = extra.option("--name", name);
    }
    if !extra.has_option("--image-name") && !configured(IMAGE_NAME_KEY) {
        extra = extra.option("--image-name", name);
    }
    if let Some(marker) = marker_value(desired) {
        extra = extra.option("--env", marker);
    }

    // Mounts already passed on the command line stay as given.
    let cli_targets: Vec<String> = extra
        .option_values(&["--volume", "-v"])
        .iter()
        .map(|v| volume_identity(v))
        .collect();
    let planner_mounts: Vec<String> =
        std::iter::once((absolute(&request.path), target.clone()))
            .chain(
                request
                    .extra_volumes
                    .iter()
                    .map(|(host, tgt)| (host.clone(), tgt.clone())),
            )
            .filter(|(_, tgt)| !cli_targets.contains(&volume_identity(tgt)))
            .map(|(host, tgt)| format!("{}:{}:Z", host.display(), tgt))
            .collect();

    let mut config = request.config.clone();
    let existing = config
        .get(VOLUME_KEY)
        .and_then(ConfigValue::as_list)
        .map(<[String]>::to_vec)
        .unwrap_or_default();
    let volumes = merge_keyed(&planner_mounts, &existing, volume_identity);
    if !volumes.is_empty() {
        config.insert(VOLUME_KEY.to_string(), ConfigValue::List(volumes));
    }

    let mut rocker_cmd = vec!["rocker".to_string()];
    rocker_cmd.extend(render_tokens(&config, &extra));

    LaunchPlan {
        container_name: name.to_string(),
        container_hex: container_hex(name),
        rocker_cmd,
        created: true,
        vscode: request.vscode,
        mount_target: Some(target),
    }
}
