//! Command-line definitions for `rockerc` and `renv`.

use clap::{Args, Parser};

use crate::color::ColorMode;

/// Flags shared by both binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct LaunchFlags {
    /// Stop and remove an existing container before launching
    #[arg(long)]
    pub force: bool,

    /// Rebuild the container without the image cache (implies --force)
    #[arg(long)]
    pub nocache: bool,

    /// Open VS Code attached to the container
    #[arg(long)]
    pub vscode: bool,

    /// Print the launch plan without creating, starting or removing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print detailed execution info
    #[arg(long)]
    pub verbose: bool,

    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum)]
    pub color: Option<ColorMode>,
}

#[derive(Parser, Debug)]
#[command(
    name = "rockerc",
    version,
    about = "Launch a rocker container for the current directory from rockerc.yaml"
)]
pub struct RockercCli {
    #[command(flatten)]
    pub flags: LaunchFlags,

    /// Additional arguments passed through to rocker
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "renv",
    version,
    about = "Open a repository branch worktree inside its rocker container"
)]
pub struct RenvCli {
    #[command(flatten)]
    pub flags: LaunchFlags,

    /// Only set up the worktree and print its path
    #[arg(long)]
    pub no_container: bool,

    /// Repository as owner/repo[@branch][#subfolder]
    pub repo_spec: String,

    /// Command to run in the container instead of an interactive shell
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rockerc_passthrough_after_double_dash() {
        let cli = RockercCli::try_parse_from(["rockerc", "--force", "--", "--gpus", "all"])
            .expect("parse");
        assert!(cli.flags.force);
        assert_eq!(cli.extra, vec!["--gpus".to_string(), "all".to_string()]);
    }

    #[test]
    fn test_renv_spec_and_command() {
        let cli = RenvCli::try_parse_from(["renv", "--vscode", "o/r@dev", "make", "-j4"])
            .expect("parse");
        assert!(cli.flags.vscode);
        assert_eq!(cli.repo_spec, "o/r@dev");
        assert_eq!(cli.command, vec!["make".to_string(), "-j4".to_string()]);
    }

    #[test]
    fn test_renv_nocache_and_no_container() {
        let cli = RenvCli::try_parse_from(["renv", "--nocache", "--no-container", "o/r"])
            .expect("parse");
        assert!(cli.flags.nocache);
        assert!(cli.no_container);
        assert!(cli.command.is_empty());
    }

    #[test]
    fn test_color_flag_parses() {
        let cli = RockercCli::try_parse_from(["rockerc", "--color", "never"]).expect("parse");
        assert_eq!(cli.flags.color, Some(ColorMode::Never));
    }
}
