use std::io::{IsTerminal, Write};
use std::process::ExitCode;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use log::{error, info};

use devbootstrap::cli::{Args, Cmd};
use devbootstrap::config::BootstrapConfig;
use devbootstrap::exec::ShellExecutor;
use devbootstrap::pipeline::{AssumeDefaults, Context, Prompter};
use devbootstrap::session::{self, RunStatus};
use devbootstrap::signal;
use devbootstrap::system::SystemInfo;
use devbootstrap::tools::{InstallRequest, ToolKind, UninstallRequest};
use devbootstrap::wizard::{self, InquirePrompter, MenuAction, ToolStatus};

fn main() -> ExitCode {
    let args = Args::parse();

    // Compact format; RUST_LOG still overrides the -v level.
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    match real_main(&args) {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            error!("{e:#}");
            if signal::interrupted() {
                ExitCode::from(RunStatus::Interrupted.exit_code())
            } else {
                ExitCode::from(RunStatus::Failed.exit_code())
            }
        }
    }
}

fn real_main(args: &Args) -> Result<RunStatus> {
    let command = args.action();
    if command == Cmd::Config {
        print!("{}", BootstrapConfig::default().to_toml()?);
        return Ok(RunStatus::Success);
    }

    signal::install_handlers()?;
    let system = SystemInfo::detect();

    if command == Cmd::Info {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&system)?);
        } else {
            wizard::show_system(&system);
        }
        return Ok(RunStatus::Success);
    }

    let config = BootstrapConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    if command == Cmd::List {
        let catalog = probe_catalog(&system, &config)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        } else {
            wizard::show_catalog(&catalog);
        }
        return Ok(RunStatus::Success);
    }

    session::admit(&system)?;
    if system.is_macos() && system.is_root {
        bail!("Do not run devbootstrap with sudo on macOS: Homebrew refuses to run as root");
    }

    let interactive = wizard::is_interactive() && !args.yes;
    let (action, tools) = match command {
        Cmd::Install { tools } => (MenuAction::Install, tools),
        Cmd::Uninstall { tools } => (MenuAction::Uninstall, tools),
        _ => {
            if !interactive {
                bail!("The menu needs an interactive terminal; use `devbootstrap install <TOOL>...` instead");
            }
            if !args.json {
                wizard::show_welcome(&system, args.dry_run);
            }
            let catalog = probe_catalog(&system, &config)?;
            match wizard::run_menu(&catalog) {
                Ok(Some(choice)) => (choice.action, choice.tools),
                Ok(None) => {
                    info!("Nothing to do");
                    return Ok(RunStatus::Success);
                }
                Err(_) if signal::interrupted() => return Ok(RunStatus::Interrupted),
                Err(e) => return Err(e).context("Menu failed"),
            }
        }
    };
    let tools = dedup(tools);

    let exec = ShellExecutor::new(&system, args.dry_run)
        .context("Failed to start the command executor")?
        .with_default_timeout(config.command_timeout())
        .with_progress(!args.json && std::io::stderr().is_terminal());
    let prompter: &dyn Prompter = if interactive { &InquirePrompter } else { &AssumeDefaults };
    let ctx = Context::new(&exec, &system, prompter);

    match action {
        MenuAction::Install => {
            let requests = tools
                .iter()
                .map(|kind| InstallRequest::from_config(*kind, &config))
                .collect();
            let report = session::install_all(&ctx, requests);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                wizard::show_install_summary(&report, args.dry_run);
            }
            Ok(report.status)
        }
        MenuAction::Uninstall => {
            let requests = tools
                .iter()
                .map(|kind| UninstallRequest::from_config(*kind, &config))
                .collect();
            let report = session::uninstall_all(&ctx, requests);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                wizard::show_uninstall_summary(&report, args.dry_run);
            }
            Ok(report.status)
        }
    }
}

/// Probe every tool with a live executor; only read-only queries run.
fn probe_catalog(system: &SystemInfo, config: &BootstrapConfig) -> Result<Vec<ToolStatus>> {
    let exec = ShellExecutor::new(system, false)
        .context("Failed to start the command executor")?
        .with_progress(false);
    let ctx = Context::new(&exec, system, &AssumeDefaults);
    Ok(ToolKind::ALL
        .into_iter()
        .map(|kind| ToolStatus {
            kind,
            installed: session::is_installed(&ctx, kind, config),
        })
        .collect())
}

/// Keep the first occurrence of each tool.
fn dedup(tools: Vec<ToolKind>) -> Vec<ToolKind> {
    let mut seen = Vec::with_capacity(tools.len());
    for kind in tools {
        if !seen.contains(&kind) {
            seen.push(kind);
        }
    }
    seen
}
