use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::layout::DEFAULT_USER;
use crate::service::DEFAULT_LOG_LINES;

#[derive(Parser, Debug)]
#[command(name = "bifrostctl", version, about = "Install and manage the bifrost systemd service")]
pub struct Cli {
    /// Prefix every managed path with this directory (staging installs)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Git URL of the installer repository
    #[arg(long, global = true, env = "BIFROST_REPO_URL")]
    pub repo_url: Option<String>,

    /// Where the installer repository is checked out
    #[arg(long, global = true, env = "BIFROST_REPO_DIR")]
    pub repo_dir: Option<PathBuf>,

    /// Account the service runs as
    #[arg(long, global = true, default_value = DEFAULT_USER)]
    pub user: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive numbered menu (default)
    Menu,
    /// Fetch the installer repository and install the service
    Install {
        #[arg(long)]
        no_configure: bool,
        #[arg(long)]
        no_start: bool,
    },
    /// Prompt for every config key
    Configure,
    /// Set one config key
    Set {
        key: String,
        value: String,
        /// Restart a running service after the change
        #[arg(long)]
        restart: bool,
    },
    /// Print one config key
    Get { key: String },
    /// Print all config keys
    Show,
    Start,
    Stop,
    Restart,
    Status,
    Logs {
        #[arg(short = 'n', long, default_value_t = DEFAULT_LOG_LINES)]
        lines: u32,
        #[arg(short, long)]
        follow: bool,
    },
    /// Pull the installer repository and replace the binary
    Update,
    Uninstall {
        #[arg(short, long)]
        yes: bool,
        #[arg(long)]
        keep_repo: bool,
    },
}
