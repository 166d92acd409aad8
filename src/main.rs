//! bifrostctl
//!
//! Installs a prebuilt `bifrost` binary from its installer repository, edits
//! its YAML config and runs it as a systemd service.
//!
//! Layout on the host:
//! - /usr/local/bin/bifrost                binary
//! - /etc/bifrost/config.yaml              config (key-upserted in place)
//! - /etc/bifrost/bifrost.env              EnvironmentFile of the unit
//! - /etc/systemd/system/bifrost.service   unit
//! - /opt/bifrost-installer                installer repository checkout
//!
//! Service management is delegated to systemctl/journalctl; teardown calls
//! are best-effort, missing artifacts are fatal.

use std::io::Write;

use clap::Parser;

mod cli;
mod configure;
mod console;
mod ctx;
mod envfile;
mod error;
mod install;
mod keys;
mod layout;
mod menu;
mod repo;
mod service;
mod system;
mod uninstall;
mod unit;
mod yaml;

use cli::{Cli, Commands};
use ctx::Ctx;
use error::Result;
use install::InstallOptions;
use keys::ConfigKey;
use layout::Layout;
use service::Action;
use system::SystemRunner;
use uninstall::UninstallOptions;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[bifrost] {}: {}", record.level(), record.args()))
        .init();
}

fn exit_err(msg: &str) -> ! {
    eprintln!("[bifrost] ERROR: {}", msg);
    std::process::exit(1);
}

fn run(cli: Cli) -> Result<()> {
    let runner = SystemRunner;
    let mut layout = match &cli.root {
        Some(root) => Layout::rooted(root),
        None => Layout::system(),
    };
    if let Some(dir) = cli.repo_dir {
        layout = layout.with_repo_dir(dir);
    }
    let ctx = Ctx {
        layout,
        runner: &runner,
        user: cli.user,
        repo_url: cli.repo_url,
        check_root: true,
    };
    let mut con = console::stdio();

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => menu::run(&ctx, &mut con),
        Commands::Install {
            no_configure,
            no_start,
        } => install::install(
            &ctx,
            &mut con,
            InstallOptions {
                configure: !no_configure,
                start: !no_start,
            },
        ),
        Commands::Configure => {
            ctx.require_root()?;
            if configure::interactive(&ctx, &mut con)? {
                configure::offer_restart(&ctx, &mut con)?;
            }
            Ok(())
        }
        Commands::Set {
            key,
            value,
            restart,
        } => {
            ctx.require_root()?;
            let key: ConfigKey = key.parse()?;
            let (stored, changed) = configure::set(&ctx, key, &value)?;
            con.line(format!("{}: {}", key, stored))?;
            if changed {
                configure::apply_to_running(&ctx, &mut con, restart)?;
            }
            Ok(())
        }
        Commands::Get { key } => {
            let key: ConfigKey = key.parse()?;
            match configure::get(&ctx, key)? {
                Some(v) => println!("{}", v),
                None => exit_err(&format!("{} is not set", key)),
            }
            Ok(())
        }
        Commands::Show => configure::show(&ctx, &mut con),
        Commands::Start => service::control(&ctx, Action::Start),
        Commands::Stop => service::control(&ctx, Action::Stop),
        Commands::Restart => service::control(&ctx, Action::Restart),
        Commands::Status => service::status(&ctx),
        Commands::Logs { lines, follow } => service::logs(&ctx, lines, follow),
        Commands::Update => install::update(&ctx, &mut con),
        Commands::Uninstall { yes, keep_repo } => {
            uninstall::uninstall(&ctx, &mut con, UninstallOptions { yes, keep_repo })
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        exit_err(&e.to_string());
    }
}
