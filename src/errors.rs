//! Error mapping guide:
//! - Map io::ErrorKind::NotFound and missing external tools to exit code 127.
//! - A failed launch or exec surfaces the external tool's own exit code unchanged.
//! - Everything else exits with 1.
//! - Messages always name the external command that failed and include its output.
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RockercError {
    /// A configuration file exists but cannot be used.
    #[error("configuration error in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("{tool} is required but was not found in PATH")]
    ToolNotFound { tool: String },

    /// The container-launch tool exited non-zero.
    #[error("launch command failed with exit code {code}: {command}\n{stderr}")]
    LaunchFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    /// The container exists (or was just launched) but never reached the running state.
    #[error(
        "container {name} failed to reach running state within {}s",
        waited.as_secs_f64()
    )]
    NotRunning { name: String, waited: Duration },

    #[error("container runtime command failed with exit code {code}: {command}\n{stderr}")]
    ContainerCommand {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("invalid repository spec '{spec}': {reason}")]
    RepoSpec { spec: String, reason: String },

    #[error("git command failed: {command}\n{stderr}")]
    Git { command: String, stderr: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl RockercError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RockercError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stderr captured from the external tool, when the failure came from one.
    pub fn tool_stderr(&self) -> Option<&str> {
        match self {
            RockercError::LaunchFailed { stderr, .. }
            | RockercError::ContainerCommand { stderr, .. }
            | RockercError::Git { stderr, .. } => Some(stderr.as_str()),
            _ => None,
        }
    }
}

pub type Result<T, E = RockercError> = std::result::Result<T, E>;

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Convert a RockercError to the process exit code.
pub fn exit_code_for_error(e: &RockercError) -> u8 {
    match e {
        RockercError::ToolNotFound { .. } => 127,
        RockercError::LaunchFailed { code, .. } | RockercError::ContainerCommand { code, .. } => {
            exit_code_from_status(*code)
        }
        RockercError::Io(ioe) => exit_code_for_io_error(ioe),
        _ => 1,
    }
}

/// Clamp an external tool's exit status into the u8 range the process can return.
/// Codes that do not fit (or zero reported as a failure) collapse to 1.
pub fn exit_code_from_status(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(0) | Err(_) => 1,
        Ok(c) => c,
    }
}

/// Exit code for an error surfaced at the binary edge.
pub fn exit_code_for_anyhow(e: &anyhow::Error) -> u8 {
    if let Some(re) = e.downcast_ref::<RockercError>() {
        return exit_code_for_error(re);
    }
    match e.root_cause().downcast_ref::<io::Error>() {
        Some(ioe) => exit_code_for_io_error(ioe),
        None => 1,
    }
}

/// Exit code of the attached shell or command, passed through.
pub fn exit_code_for_session(code: i32) -> u8 {
    if code == 0 {
        0
    } else {
        exit_code_from_status(code)
    }
}
