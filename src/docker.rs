#![allow(clippy::module_name_repetitions)]
//! Container runtime access: tool discovery, the inspection/mutation traits,
//! the docker CLI implementation, the extension marker and a dry-run wrapper.

pub mod client;
pub mod dry_run;
pub mod extensions;
pub mod runtime;

pub use client::DockerClient;
pub use dry_run::DryRunRuntime;
pub use extensions::{
    extensions_changed, is_valid_extension_name, marker_value, parse_marker, MARKER_ENV,
};
pub use runtime::{
    container_runtime_path, launch_tool_path, ContainerInspector, ContainerRuntime, ImageBuilder,
    LaunchOutput,
};
