//! Developer environment bootstrapper
//!
//! Installs and removes a fixed catalog of developer tools (Docker, VS Code,
//! Neovim, Zsh with Oh My Zsh, Nerd Fonts and the `devbootstrap` command
//! itself) on macOS through Homebrew and on Ubuntu/Debian through apt.
//!
//! Every tool runs through the same installation or removal pipeline
//! ([`pipeline::run_install`], [`pipeline::run_uninstall`]); every side effect
//! goes through an [`exec::Executor`], which is what makes `--dry-run`
//! trustworthy.

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod platform;
pub mod session;
pub mod signal;
pub mod system;
pub mod tools;
pub mod wizard;

pub use error::{BootstrapError, Result};
