use std::process::ExitCode;

use clap::Parser;

use rockerc::cli::RenvCli;
use rockerc::config::{config_args, default_scopes, load_layered};
use rockerc::docker::{DockerClient, DryRunRuntime};
use rockerc::errors::{exit_code_for_anyhow, exit_code_for_session};
use rockerc::launch::{self, LaunchSettings};
use rockerc::report::render_extension_table;
use rockerc::util::shell_join;
use rockerc::workspace::{
    ensure_worktree, renv_base_dir, repo_dir, worktree_config, worktree_dir, GitCli, RepoSpec,
};
use rockerc::{color_enabled_stderr, log_error_stderr, log_info_stderr, IdeLauncher, VsCode};

fn run(cli: &RenvCli) -> anyhow::Result<u8> {
    let use_err = color_enabled_stderr();
    let spec = RepoSpec::parse(&cli.repo_spec)?;
    let base = renv_base_dir();

    let worktree = if cli.flags.dry_run {
        worktree_dir(&base, &spec)
    } else {
        ensure_worktree(&GitCli::default(), &base, &spec)?
    };
    if cli.no_container {
        println!("{}", worktree.display());
        return Ok(0);
    }
    let bare = repo_dir(&base, &spec);

    let loaded = load_layered(&default_scopes(&worktree))?;
    let args = config_args(&loaded.config);
    if !args.is_empty() || !loaded.removed.is_empty() {
        eprint!(
            "{}",
            render_extension_table(&loaded.provenance, &args, &loaded.removed)
        );
    }
    let config = worktree_config(&loaded.config, &worktree);

    let mut settings = LaunchSettings::new(spec.container_name(), &worktree);
    settings.vscode = cli.flags.vscode;
    settings.force = cli.flags.force;
    settings.nocache = cli.flags.nocache;
    settings.command = cli.command.clone();
    settings.subdir = spec.subfolder.clone();
    // the worktree's .git file points into the bare repository by absolute path
    settings
        .extra_volumes
        .push((bare.clone(), bare.display().to_string()));

    let runtime = DockerClient::discover()?;
    if cli.flags.dry_run {
        let dry = DryRunRuntime::new(&runtime);
        let plan = launch::plan_only(&dry, &config, &settings)?;
        if plan.reuses_container() {
            eprintln!("dry-run: would reuse container {}", plan.container_name);
        } else {
            eprintln!("dry-run: {}", shell_join(&plan.rocker_cmd));
        }
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(0);
    }

    log_info_stderr(
        use_err,
        &format!(
            "renv: {}/{}@{} in container {}",
            spec.owner, spec.repo, spec.branch, settings.container_name
        ),
    );
    let vscode = VsCode::default();
    let ide: &dyn IdeLauncher = &vscode;
    let code = launch::run(&runtime, Some(ide), &config, &settings)?;
    Ok(exit_code_for_session(code))
}

fn main() -> ExitCode {
    let cli = RenvCli::parse();
    if let Some(mode) = cli.flags.color {
        rockerc::set_color_mode(mode);
    }
    rockerc::telemetry::init(cli.flags.verbose);
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log_error_stderr(color_enabled_stderr(), &format!("renv: {e:#}"));
            ExitCode::from(exit_code_for_anyhow(&e))
        }
    }
}
