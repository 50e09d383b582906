//! Tracing subscriber setup for the binaries.
//!
//! Filter precedence: `ROCKERC_LOG` (EnvFilter syntax), then `--verbose`
//! (debug for this crate), then the default of warnings only.

use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

fn build_filter(verbose: bool) -> EnvFilter {
    if let Ok(spec) = env::var("ROCKERC_LOG") {
        let spec = spec.trim();
        if !spec.is_empty() {
            if let Ok(f) = EnvFilter::try_new(spec) {
                return f;
            }
            eprintln!("rockerc: telemetry: ignoring invalid ROCKERC_LOG value '{spec}'");
        }
    }
    if verbose {
        EnvFilter::new("rockerc=debug,renv=debug,warn")
    } else {
        EnvFilter::new("warn")
    }
}

/// Install the stderr fmt subscriber once per process. Later calls are no-ops.
pub fn init(verbose: bool) {
    INIT.get_or_init(|| {
        let use_color = crate::color_enabled_stderr();
        let res = tracing_subscriber::fmt()
            .with_env_filter(build_filter(verbose))
            .with_writer(std::io::stderr)
            .with_target(verbose)
            .with_ansi(use_color)
            .without_time()
            .try_init();
        if let Err(e) = res {
            eprintln!("rockerc: telemetry: subscriber already installed: {e}");
        }
    });
}
