use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::tools::ToolKind;

#[derive(Parser, Debug)]
#[command(version, about = "Install and remove a developer environment on macOS, Ubuntu and Debian")]
pub struct Args {
    /// Print what would run without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Answer every question with its default
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Print results as JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Sub‑commands (menu, install, etc.)
    #[command(subcommand)]
    pub sub: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Interactive menu (default if no sub‑command)
    Menu,
    /// Install tools in the given order
    Install {
        #[arg(value_enum, required = true)]
        tools: Vec<ToolKind>,
    },
    /// Remove tools in the given order
    Uninstall {
        #[arg(value_enum, required = true)]
        tools: Vec<ToolKind>,
    },
    /// Show every tool and whether it is installed
    List,
    /// Show the detected system
    Info,
    /// Print the default configuration as TOML
    Config,
}

impl Args {
    pub fn action(&self) -> Cmd {
        self.sub.clone().unwrap_or(Cmd::Menu)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
