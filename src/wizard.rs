//! Interactive menu and terminal summaries for `devbootstrap`

use std::fmt;
use std::io::{self, IsTerminal, Write};

use inquire::error::InquireError;
use inquire::{Confirm, MultiSelect, Select};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::error::BootstrapError;
use crate::pipeline::{InstallResult, Prompter, UninstallResult};
use crate::session::{RunStatus, SessionReport};
use crate::signal;
use crate::system::SystemInfo;
use crate::tools::ToolKind;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Whether prompts can be shown at all.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

/// Confirmations through `inquire`. Ctrl-C at a prompt interrupts the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct InquirePrompter;

impl Prompter for InquirePrompter {
    fn confirm(&self, question: &str, default: bool) -> bool {
        match Confirm::new(question).with_default(default).prompt() {
            Ok(answer) => answer,
            Err(InquireError::OperationInterrupted) => {
                signal::raise();
                false
            }
            Err(InquireError::OperationCanceled) => default,
            Err(e) => {
                log::warn!("Prompt failed ({e}); assuming {}", if default { "yes" } else { "no" });
                default
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Install,
    Uninstall,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::Install => f.write_str("Install tools"),
            MenuAction::Uninstall => f.write_str("Uninstall tools"),
        }
    }
}

/// What the operator picked in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuChoice {
    pub action: MenuAction,
    pub tools: Vec<ToolKind>,
}

/// Catalog entry with its probed state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolStatus {
    pub kind: ToolKind,
    /// `None` when the state could not be determined.
    pub installed: Option<bool>,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.installed {
            Some(true) => " [installed]",
            Some(false) | None => "",
        };
        write!(f, "{}{state} - {}", self.kind.label(), self.kind.summary())
    }
}

fn prompt_error(e: InquireError) -> BootstrapError {
    match e {
        InquireError::OperationInterrupted => {
            signal::raise();
            BootstrapError::Cancelled
        }
        InquireError::OperationCanceled => BootstrapError::Cancelled,
        other => BootstrapError::Prompt(other.to_string()),
    }
}

/// Run the menu. `Ok(None)` means the operator backed out without choosing.
pub fn run_menu(catalog: &[ToolStatus]) -> Result<Option<MenuChoice>, BootstrapError> {
    let action = Select::new(
        "What do you want to do?",
        vec![MenuAction::Install, MenuAction::Uninstall],
    )
    .prompt()
    .map_err(prompt_error)?;

    // Preselect what makes sense for the action.
    let defaults: Vec<usize> = catalog
        .iter()
        .enumerate()
        .filter(|(_, status)| match action {
            MenuAction::Install => status.installed == Some(false),
            MenuAction::Uninstall => status.installed == Some(true),
        })
        .map(|(index, _)| index)
        .collect();

    let picked = MultiSelect::new("Select tools (space to toggle, enter to confirm)", catalog.to_vec())
        .with_default(&defaults)
        .prompt()
        .map_err(prompt_error)?;
    if picked.is_empty() {
        println!("Nothing selected.");
        return Ok(None);
    }

    let tools: Vec<ToolKind> = picked.into_iter().map(|status| status.kind).collect();
    let names: Vec<&str> = tools.iter().map(|kind| kind.label()).collect();
    let verb = match action {
        MenuAction::Install => "Install",
        MenuAction::Uninstall => "Uninstall",
    };
    let proceed = Confirm::new(&format!("{verb} {}?", names.join(", ")))
        .with_default(true)
        .prompt()
        .map_err(prompt_error)?;

    Ok(proceed.then_some(MenuChoice { action, tools }))
}

fn color(out: &mut impl WriteColor, fg: Color, bold: bool) {
    let _ = out.set_color(ColorSpec::new().set_fg(Some(fg)).set_bold(bold));
}

fn rule(out: &mut impl WriteColor) -> io::Result<()> {
    color(out, Color::Cyan, false);
    writeln!(out, "{RULE}")?;
    out.reset()
}

fn stdout() -> StandardStream {
    let choice = if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Display welcome banner
pub fn show_welcome(system: &SystemInfo, dry_run: bool) {
    let mut out = stdout();
    let _ = write_welcome(&mut out, system, dry_run);
}

fn write_welcome(out: &mut impl WriteColor, system: &SystemInfo, dry_run: bool) -> io::Result<()> {
    writeln!(out)?;
    rule(out)?;
    color(out, Color::Cyan, true);
    writeln!(out, "\n                 D E V B O O T S T R A P\n")?;
    out.reset()?;
    writeln!(out, "  System: {system}")?;
    if dry_run {
        color(out, Color::Yellow, true);
        writeln!(out, "  DRY RUN: nothing will be changed")?;
        out.reset()?;
    }
    rule(out)?;
    writeln!(out)
}

/// `list` output: every tool with its state on this host.
pub fn show_catalog(catalog: &[ToolStatus]) {
    let mut out = stdout();
    let _ = write_catalog(&mut out, catalog);
}

fn write_catalog(out: &mut impl WriteColor, catalog: &[ToolStatus]) -> io::Result<()> {
    for status in catalog {
        let (mark, fg, state) = match status.installed {
            Some(true) => ("✓", Color::Green, "installed"),
            Some(false) => ("·", Color::White, "not installed"),
            None => ("?", Color::Yellow, "unsupported here"),
        };
        color(out, fg, false);
        write!(out, "  {mark} {:<22}", status.kind.label())?;
        out.reset()?;
        writeln!(out, " {state:<16} {}", status.kind.summary())?;
    }
    Ok(())
}

/// `info` output.
pub fn show_system(system: &SystemInfo) {
    let mut out = stdout();
    let _ = write_system(&mut out, system);
}

fn write_system(out: &mut impl WriteColor, system: &SystemInfo) -> io::Result<()> {
    writeln!(out, "Operating system: {} {}", system.os_name, system.os_version)?;
    writeln!(out, "Family:           {}", system.os_family)?;
    if let Some(codename) = &system.os_codename {
        writeln!(out, "Codename:         {codename}")?;
    }
    writeln!(out, "Architecture:     {}", system.architecture)?;
    writeln!(out, "Home:             {}", system.home_dir.display())?;
    writeln!(out, "Root:             {}", if system.is_root { "yes" } else { "no" })?;
    writeln!(out, "Sudo:             {}", if system.has_sudo { "available" } else { "unavailable" })?;
    if !system.is_supported() {
        color(out, Color::Yellow, false);
        writeln!(out, "This system is not supported; only macOS, Ubuntu and Debian are.")?;
        out.reset()?;
    }
    Ok(())
}

/// One line per tool and the itemized caveats below it.
struct Line<'a> {
    tool: &'a str,
    success: bool,
    message: &'a str,
    warnings: &'a [String],
    errors: &'a [String],
    notes: &'a [String],
    planned: &'a [String],
}

impl<'a> From<&'a InstallResult> for Line<'a> {
    fn from(r: &'a InstallResult) -> Self {
        Line {
            tool: &r.tool,
            success: r.success,
            message: &r.message,
            warnings: &r.warnings,
            errors: &r.errors,
            notes: &r.notes,
            planned: &r.planned,
        }
    }
}

impl<'a> From<&'a UninstallResult> for Line<'a> {
    fn from(r: &'a UninstallResult) -> Self {
        Line {
            tool: &r.tool,
            success: r.success,
            message: &r.message,
            warnings: &r.warnings,
            errors: &r.errors,
            notes: &r.notes,
            planned: &r.planned,
        }
    }
}

/// Display the install summary
pub fn show_install_summary(report: &SessionReport<InstallResult>, dry_run: bool) {
    let lines: Vec<Line<'_>> = report.results.iter().map(Line::from).collect();
    let _ = write_summary(&mut stdout(), report.status, &lines, dry_run);
}

/// Display the uninstall summary
pub fn show_uninstall_summary(report: &SessionReport<UninstallResult>, dry_run: bool) {
    let lines: Vec<Line<'_>> = report.results.iter().map(Line::from).collect();
    let _ = write_summary(&mut stdout(), report.status, &lines, dry_run);
}

fn write_summary(
    out: &mut impl WriteColor,
    status: RunStatus,
    lines: &[Line<'_>],
    dry_run: bool,
) -> io::Result<()> {
    writeln!(out)?;
    rule(out)?;
    let (fg, header) = match status {
        RunStatus::Success if dry_run => (Color::Green, "✓ DRY RUN COMPLETE"),
        RunStatus::Success => (Color::Green, "✓ ALL DONE"),
        RunStatus::Failed => (Color::Red, "✗ SOME TOOLS FAILED"),
        RunStatus::Interrupted => (Color::Yellow, "⚠ INTERRUPTED"),
    };
    color(out, fg, true);
    writeln!(out, "\n                    {header}\n")?;
    out.reset()?;
    rule(out)?;

    for line in lines {
        if line.success && line.warnings.is_empty() {
            color(out, Color::Green, false);
            writeln!(out, "  ✓ {}: {}", line.tool, line.message)?;
        } else if line.success {
            color(out, Color::Yellow, false);
            writeln!(out, "  ⚠ {}: {}", line.tool, line.message)?;
        } else {
            color(out, Color::Red, false);
            writeln!(out, "  ✗ {}: {}", line.tool, line.message)?;
        }
        out.reset()?;

        for error in line.errors {
            writeln!(out, "      error: {error}")?;
        }
        for warning in line.warnings {
            writeln!(out, "      warning: {warning}")?;
        }
        if dry_run && !line.planned.is_empty() {
            writeln!(out, "      would run:")?;
            for action in line.planned {
                writeln!(out, "        {action}")?;
            }
        }
        for note in line.notes {
            writeln!(out, "      → {note}")?;
        }
    }

    rule(out)?;
    writeln!(out)
}
