use std::env;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use rockerc::cli::{LaunchFlags, RockercCli};
use rockerc::config::{
    config_args, default_scopes, load_layered, Config, ConfigValue, LoadedConfig, NAME_KEY,
};
use rockerc::docker::{ContainerRuntime, DockerClient, DryRunRuntime};
use rockerc::errors::{exit_code_for_anyhow, exit_code_for_session};
use rockerc::launch::{self, LaunchSettings};
use rockerc::plan::derive_container_name;
use rockerc::render::ExtraArgs;
use rockerc::report::render_extension_table;
use rockerc::util::shell_join;
use rockerc::{color_enabled_stderr, log_error_stderr, log_info_stderr, log_warn_stderr, IdeLauncher, VsCode};

fn print_extension_table(loaded: &LoadedConfig) {
    let args = config_args(&loaded.config);
    if args.is_empty() && loaded.removed.is_empty() {
        return;
    }
    eprint!(
        "{}",
        render_extension_table(&loaded.provenance, &args, &loaded.removed)
    );
}

fn print_dry_run<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    loaded: &LoadedConfig,
    settings: &LaunchSettings,
) -> anyhow::Result<()> {
    let dry = DryRunRuntime::new(runtime);
    let plan = launch::plan_only(&dry, &loaded.config, settings)?;
    if plan.reuses_container() {
        eprintln!("dry-run: would reuse container {}", plan.container_name);
    } else {
        eprintln!("dry-run: {}", shell_join(&plan.rocker_cmd));
    }
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// The configured `name`, else the folder name.
fn container_name(config: &Config, cwd: &Path) -> String {
    if let Some(name) = config
        .get(NAME_KEY)
        .and_then(ConfigValue::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
    {
        return name.to_string();
    }
    let folder = cwd
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workspace".to_string());
    derive_container_name(&folder)
}

fn apply_flags(flags: &LaunchFlags) {
    if let Some(mode) = flags.color {
        rockerc::set_color_mode(mode);
    }
    rockerc::telemetry::init(flags.verbose);
}

fn run(cli: &RockercCli) -> anyhow::Result<u8> {
    let use_err = color_enabled_stderr();
    let cwd = env::current_dir().context("cannot determine current directory")?;

    let loaded = load_layered(&default_scopes(&cwd))?;
    if loaded.is_empty() {
        log_warn_stderr(
            use_err,
            &format!(
                "no rockerc.yaml found in {} and no global ~/.rockerc.yaml; nothing to launch",
                cwd.display()
            ),
        );
        return Ok(1);
    }
    print_extension_table(&loaded);

    let mut settings = LaunchSettings::new(container_name(&loaded.config, &cwd), &cwd);
    settings.extra = ExtraArgs::from_words(cli.extra.iter().cloned());
    settings.vscode = cli.flags.vscode;
    settings.force = cli.flags.force;
    settings.nocache = cli.flags.nocache;

    let runtime = DockerClient::discover()?;
    if cli.flags.dry_run {
        print_dry_run(&runtime, &loaded, &settings)?;
        return Ok(0);
    }

    log_info_stderr(
        use_err,
        &format!("rockerc: container {}", settings.container_name),
    );
    let vscode = VsCode::default();
    let ide: &dyn IdeLauncher = &vscode;
    let code = launch::run(&runtime, Some(ide), &loaded.config, &settings)?;
    Ok(exit_code_for_session(code))
}

fn main() -> ExitCode {
    let cli = RockercCli::parse();
    apply_flags(&cli.flags);
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log_error_stderr(color_enabled_stderr(), &format!("rockerc: {e:#}"));
            ExitCode::from(exit_code_for_anyhow(&e))
        }
    }
}
