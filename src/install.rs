//! Install and update.

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use log::{info, warn};

use crate::configure;
use crate::console::Console;
use crate::ctx::Ctx;
use crate::envfile;
use crate::error::{Error, Result};
use crate::repo;
use crate::service::{self, Action};
use crate::system;
use crate::unit::UnitSpec;

const REQUIRED_TOOLS: &[&str] = &["git", "curl"];
const TOTAL_STEPS: u32 = 10;

#[derive(Debug, Clone, Copy)]
pub struct InstallOptions {
    pub configure: bool,
    pub start: bool,
}

fn step<R: BufRead, W: Write>(con: &mut Console<R, W>, n: u32, msg: &str) -> Result<()> {
    con.print(format!("  [{}/{}] {}... ", n, TOTAL_STEPS, msg))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(Error::io(parent)),
        None => Ok(()),
    }
}

/// Copies the repository's binary over the installed one.
fn install_binary(ctx: &Ctx) -> Result<()> {
    let src = repo::binary(&ctx.layout.repo_dir)?;
    let bytes = fs::read(&src).map_err(Error::io(&src))?;
    ensure_parent(&ctx.layout.binary)?;
    system::write_atomic(&ctx.layout.binary, &bytes, 0o755)
}

/// Seeds the config from the template. An existing config is kept.
fn seed_config(ctx: &Ctx) -> Result<bool> {
    if ctx.layout.config.exists() {
        return Ok(false);
    }
    let template = repo::config_template(&ctx.layout.repo_dir)?;
    let content = fs::read(&template).map_err(Error::io(&template))?;
    system::write_atomic(&ctx.layout.config, &content, 0o640)?;
    Ok(true)
}

fn write_env_file(ctx: &Ctx) -> Result<()> {
    let path = &ctx.layout.env_file;
    let base = if path.exists() {
        fs::read_to_string(path).map_err(Error::io(path))?
    } else if let Some(template) = repo::env_template(&ctx.layout.repo_dir) {
        fs::read_to_string(&template).map_err(Error::io(&template))?
    } else {
        "# bifrost environment, read by the systemd unit\n".to_string()
    };

    let config = ctx.layout.config.to_string_lossy();
    let mut content = envfile::upsert(&base, "BIFROST_CONFIG", &config);
    if envfile::get(&content, "BIFROST_ARGS").is_none() {
        content = envfile::upsert(&content, "BIFROST_ARGS", "");
    }
    system::write_atomic(path, content.as_bytes(), 0o640)
}

fn write_unit(ctx: &Ctx) -> Result<()> {
    let unit = UnitSpec::new(&ctx.layout, &ctx.user).render();
    ensure_parent(&ctx.layout.unit)?;
    system::write_atomic(&ctx.layout.unit, unit.as_bytes(), 0o644)
}

pub fn install<R: BufRead, W: Write>(
    ctx: &Ctx,
    con: &mut Console<R, W>,
    opts: InstallOptions,
) -> Result<()> {
    let layout = &ctx.layout;

    con.line("\nInstalling bifrost...\n")?;

    step(con, 1, "Checking privileges")?;
    if let Err(e) = ctx.require_root() {
        con.line("FAILED")?;
        return Err(e);
    }
    con.line("OK")?;

    step(con, 2, "Checking dependencies")?;
    system::ensure_packages(ctx.runner, REQUIRED_TOOLS);
    con.line("OK")?;

    step(con, 3, "Fetching installer repository")?;
    repo::sync(ctx.runner, ctx.repo_url.as_deref(), &layout.repo_dir)?;
    con.line("OK")?;

    step(con, 4, "Creating config directory")?;
    system::create_dir(&layout.config_dir, 0o755)?;
    con.line("OK")?;

    step(con, 5, "Installing binary")?;
    install_binary(ctx)?;
    con.line("OK")?;

    step(con, 6, "Seeding config")?;
    if seed_config(ctx)? {
        con.line("OK")?;
    } else {
        con.line("OK (kept existing)")?;
    }

    step(con, 7, "Creating service user")?;
    if ctx.user == "root" {
        con.line("SKIP (running as root)")?;
    } else {
        system::ensure_system_user(ctx.runner, &ctx.user);
        let owner = format!("{}:{}", ctx.user, ctx.user);
        let dir = layout.config_dir.to_string_lossy();
        system::run_best_effort(ctx.runner, "chown", &["-R", &owner, &dir]);
        con.line("OK")?;
    }

    step(con, 8, "Writing environment file")?;
    write_env_file(ctx)?;
    con.line("OK")?;

    step(con, 9, "Writing systemd unit")?;
    write_unit(ctx)?;
    con.line("OK")?;

    step(con, 10, "Enabling service")?;
    service::daemon_reload(ctx);
    if service::control_best_effort(ctx, Action::Enable) {
        con.line("OK")?;
    } else {
        con.line("FAILED (enable it manually)")?;
    }

    info!("installed {}", layout.binary.display());

    if opts.configure {
        match configure::interactive(ctx, con) {
            Ok(_) => {}
            Err(Error::Cancelled) => {
                info!("configuration skipped, run `bifrostctl configure` later");
            }
            Err(e) => return Err(e),
        }
    }

    if opts.start {
        if service::control_best_effort(ctx, Action::Restart) {
            con.line("\nService started.")?;
        } else {
            warn!("service failed to start, check: journalctl -u bifrost");
        }
    }

    con.line("\nFiles:")?;
    con.line(format!("  Binary:  {}", layout.binary.display()))?;
    con.line(format!("  Config:  {}", layout.config.display()))?;
    con.line(format!("  Env:     {}", layout.env_file.display()))?;
    con.line(format!("  Unit:    {}", layout.unit.display()))?;
    con.line(format!("  Repo:    {}", layout.repo_dir.display()))?;
    con.line("\nCommands:")?;
    con.line("  Status:  systemctl status bifrost")?;
    con.line("  Logs:    journalctl -u bifrost -f")?;
    Ok(())
}

/// Pulls the repository, replaces the binary and restarts a running service.
pub fn update<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>) -> Result<()> {
    ctx.require_root()?;
    if !ctx.layout.is_installed() {
        return Err(Error::NotInstalled(ctx.layout.binary.clone()));
    }

    con.print("Updating installer repository... ")?;
    repo::sync(ctx.runner, ctx.repo_url.as_deref(), &ctx.layout.repo_dir)?;
    con.line("OK")?;

    con.print("Replacing binary... ")?;
    install_binary(ctx)?;
    con.line("OK")?;

    if service::is_active(ctx) {
        con.print("Restarting service... ")?;
        service::control(ctx, Action::Restart)?;
        con.line("OK")?;
    }
    Ok(())
}
