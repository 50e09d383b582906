//! Recovering from "duplicate mount point" launch failures.
//!
//! The launch tool sometimes mounts a path that the configuration also lists.
//! Each retry drops the offending configured volume and tries again, up to a
//! fixed number of attempts.

use crate::config::{remove_volume_by_target, Config, ConfigValue, VOLUME_KEY};
use crate::errors::{Result, RockercError};

pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

const DUPLICATE_MOUNT_MARKER: &str = "duplicate mount point:";

/// Per-attempt state; each retry produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    config: Config,
    attempt: usize,
    max_attempts: usize,
}

impl AttemptState {
    pub fn new(config: Config, max_attempts: usize) -> Self {
        Self {
            config,
            attempt: 1,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 1-based.
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    pub fn volumes(&self) -> &[String] {
        self.config
            .get(VOLUME_KEY)
            .and_then(ConfigValue::as_list)
            .unwrap_or_default()
    }

    /// Next attempt without the volume mounted at `target`; `None` if nothing matched.
    pub fn without_volume(&self, target: &str) -> Option<Self> {
        let config = remove_volume_by_target(&self.config, target)?;
        Some(Self {
            config,
            attempt: self.attempt + 1,
            max_attempts: self.max_attempts,
        })
    }
}

/// Path named by a "duplicate mount point" message, matched case-insensitively.
pub fn parse_duplicate_mount(stderr: &str) -> Option<String> {
    let lower = stderr.to_ascii_lowercase();
    let idx = lower.find(DUPLICATE_MOUNT_MARKER)?;
    let rest = &stderr[idx + DUPLICATE_MOUNT_MARKER.len()..];
    let path = rest
        .split_whitespace()
        .next()?
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | ',' | '.'));
    (!path.is_empty()).then(|| path.to_string())
}

fn duplicate_mount_in(err: &RockercError) -> Option<String> {
    match err {
        RockercError::LaunchFailed { stderr, .. } => parse_duplicate_mount(stderr),
        _ => None,
    }
}

/// Run `attempt_fn` until it succeeds, retrying only on recoverable duplicate mounts.
pub fn launch_with_retry<T, F>(config: &Config, max_attempts: usize, mut attempt_fn: F) -> Result<T>
where
    F: FnMut(&AttemptState) -> Result<T>,
{
    let mut state = AttemptState::new(config.clone(), max_attempts);
    loop {
        let err = match attempt_fn(&state) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let Some(path) = duplicate_mount_in(&err) else {
            return Err(err);
        };
        if state.is_last() {
            tracing::warn!(attempts = state.attempt(), path = %path, "giving up on duplicate mount retries");
            return Err(err);
        }
        match state.without_volume(&path) {
            Some(next) => {
                tracing::info!(
                    attempt = next.attempt(),
                    path = %path,
                    "duplicate mount point, retrying without the configured volume"
                );
                crate::color::warn_print(&format!(
                    "duplicate mount point {path}; retrying without that volume"
                ));
                state = next;
            }
            None => {
                tracing::debug!(path = %path, "duplicate mount not in configured volumes");
                return Err(err);
            }
        }
    }
}
