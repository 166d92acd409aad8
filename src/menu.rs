//! Numbered text menu.

use std::io::{BufRead, Write};

use log::error;

use crate::configure;
use crate::console::Console;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::install::{self, InstallOptions};
use crate::service::{self, Action, DEFAULT_LOG_LINES};
use crate::uninstall::{self, UninstallOptions};

const ENTRIES: &[(&str, &str)] = &[
    ("1", "Install"),
    ("2", "Configure"),
    ("3", "Start"),
    ("4", "Stop"),
    ("5", "Restart"),
    ("6", "Status"),
    ("7", "Logs"),
    ("8", "Show config"),
    ("9", "Update"),
    ("10", "Uninstall"),
    ("0", "Exit"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Install,
    Configure,
    Control(Action),
    Status,
    Logs,
    Show,
    Update,
    Uninstall,
    Exit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Choice> {
        Some(match input.trim() {
            "1" => Choice::Install,
            "2" => Choice::Configure,
            "3" => Choice::Control(Action::Start),
            "4" => Choice::Control(Action::Stop),
            "5" => Choice::Control(Action::Restart),
            "6" => Choice::Status,
            "7" => Choice::Logs,
            "8" => Choice::Show,
            "9" => Choice::Update,
            "10" => Choice::Uninstall,
            "0" | "q" => Choice::Exit,
            _ => return None,
        })
    }
}

fn header<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>) -> Result<()> {
    let state = if !ctx.layout.is_installed() {
        "not installed".to_string()
    } else {
        let running = if service::is_active(ctx) { "running" } else { "stopped" };
        let enabled = if service::is_enabled(ctx) { "enabled" } else { "disabled" };
        format!("{}, {}", running, enabled)
    };

    con.line("\n==================== bifrost ====================")?;
    con.line(format!("  Status: {}", state))?;
    con.line("=================================================")?;
    for (key, label) in ENTRIES {
        con.line(format!("  {:>2}) {}", key, label))?;
    }
    Ok(())
}

fn dispatch<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>, choice: Choice) -> Result<()> {
    match choice {
        Choice::Install => install::install(
            ctx,
            con,
            InstallOptions {
                configure: true,
                start: true,
            },
        ),
        Choice::Configure => {
            if configure::interactive(ctx, con)? {
                configure::offer_restart(ctx, con)?;
            }
            Ok(())
        }
        Choice::Control(action) => {
            service::control(ctx, action)?;
            con.line(format!("bifrost: {} OK", action))?;
            Ok(())
        }
        Choice::Status => service::status(ctx),
        Choice::Logs => service::logs(ctx, DEFAULT_LOG_LINES, false),
        Choice::Show => configure::show(ctx, con),
        Choice::Update => install::update(ctx, con),
        Choice::Uninstall => uninstall::uninstall(ctx, con, UninstallOptions::default()),
        Choice::Exit => Ok(()),
    }
}

/// Runs until `0` or end of input. A failed action is reported and the menu
/// shown again.
pub fn run<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>) -> Result<()> {
    loop {
        header(ctx, con)?;
        let Some(input) = con.prompt("Choose [0-10]: ")? else {
            return Ok(());
        };
        let Some(choice) = Choice::parse(&input) else {
            con.line(format!("Invalid choice: {}", input))?;
            continue;
        };
        if choice == Choice::Exit {
            return Ok(());
        }
        match dispatch(ctx, con, choice) {
            Ok(()) => {}
            Err(Error::Cancelled) => con.line("Cancelled.")?,
            Err(e) => error!("{}", e),
        }
    }
}
