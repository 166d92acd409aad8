use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::console::Console;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::service::{self, Action};
use crate::system;
use crate::unit;

#[derive(Debug, Clone, Copy, Default)]
pub struct UninstallOptions {
    pub yes: bool,
    pub keep_repo: bool,
}

/// Stops the service and removes everything install created. Service calls
/// are best-effort; a file that is already gone is skipped.
pub fn uninstall<R: BufRead, W: Write>(
    ctx: &Ctx,
    con: &mut Console<R, W>,
    opts: UninstallOptions,
) -> Result<()> {
    ctx.require_root()?;
    let layout = &ctx.layout;

    if !opts.yes
        && !con.prompt_yn(
            "Remove bifrost, its unit and all configuration?",
            false,
        )?
    {
        return Err(Error::Cancelled);
    }

    // Only an account the installed unit runs as is ours to delete.
    let service_user = match fs::read_to_string(&layout.unit) {
        Ok(content) => Some(unit::installed_user(&content)).filter(|u| u != "root"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(Error::io(&layout.unit)(e)),
    };

    let mut actions: Vec<String> = Vec::new();
    let mut removed = |what: &str, path: &Path, gone: bool| {
        if gone {
            actions.push(format!("removed {:<8} {}", what, path.display()));
        }
    };

    service::control_best_effort(ctx, Action::Stop);
    service::control_best_effort(ctx, Action::Disable);

    removed("unit", layout.unit.as_path(), system::remove_file(&layout.unit)?);
    service::daemon_reload(ctx);
    removed("binary", layout.binary.as_path(), system::remove_file(&layout.binary)?);
    removed("config", layout.config_dir.as_path(), system::remove_dir(&layout.config_dir)?);
    if !opts.keep_repo {
        removed("repo", layout.repo_dir.as_path(), system::remove_dir(&layout.repo_dir)?);
    }
    if let Some(user) = &service_user {
        system::remove_system_user(ctx.runner, user);
    }

    con.line("\nbifrost uninstalled")?;
    if actions.is_empty() {
        con.line("  (nothing to remove)")?;
    }
    for a in &actions {
        con.line(format!("  {}", a))?;
    }
    Ok(())
}
