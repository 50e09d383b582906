//! rockerc: layered `rockerc.yaml` configuration rendered into `rocker`
//! invocations, with container reuse, extension-change detection and
//! duplicate-mount recovery. `renv` adds per-branch git worktrees on top.

pub mod cli;
pub mod color;
pub mod config;
pub mod docker;
pub mod errors;
pub mod execute;
pub mod launch;
pub mod plan;
pub mod render;
pub mod report;
pub mod retry;
pub mod telemetry;
pub mod util;
pub mod workspace;

pub use color::*;
pub use config::{load_layered, merge_configs, Config, ConfigScope, ConfigValue, LoadedConfig};
pub use docker::{
    container_runtime_path, launch_tool_path, ContainerInspector, ContainerRuntime, DockerClient,
    DryRunRuntime, ImageBuilder, LaunchOutput,
};
pub use errors::{exit_code_for_error, RockercError};
pub use execute::{execute_plan, wait_for_container, ExecuteOptions, IdeLauncher, VsCode};
pub use launch::{build_configured_image, LaunchSettings};
pub use plan::{derive_container_name, prepare_launch_plan, LaunchPlan, LaunchRequest};
pub use render::{render_tokens, yaml_dict_to_args, ArgToken, ExtraArgs};
pub use report::{render_extension_comparison_table, render_extension_table};
pub use retry::{launch_with_retry, AttemptState};
pub use workspace::{ensure_worktree, worktree_config, GitCli, GitProvider, RepoSpec};
