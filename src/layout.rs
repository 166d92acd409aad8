//! Filesystem locations touched by the installer.

use std::path::{Path, PathBuf};

pub const SERVICE_NAME: &str = "bifrost";
pub const DEFAULT_USER: &str = "bifrost";

const CONFIG_DIR: &str = "/etc/bifrost";
const CONFIG_PATH: &str = "/etc/bifrost/config.yaml";
const ENV_PATH: &str = "/etc/bifrost/bifrost.env";
const BINARY_PATH: &str = "/usr/local/bin/bifrost";
const SERVICE_PATH: &str = "/etc/systemd/system/bifrost.service";
const REPO_DIR: &str = "/opt/bifrost-installer";

#[derive(Debug, Clone)]
pub struct Layout {
    pub config_dir: PathBuf,
    pub config: PathBuf,
    pub env_file: PathBuf,
    pub binary: PathBuf,
    pub unit: PathBuf,
    pub repo_dir: PathBuf,
}

impl Layout {
    pub fn system() -> Self {
        Layout {
            config_dir: PathBuf::from(CONFIG_DIR),
            config: PathBuf::from(CONFIG_PATH),
            env_file: PathBuf::from(ENV_PATH),
            binary: PathBuf::from(BINARY_PATH),
            unit: PathBuf::from(SERVICE_PATH),
            repo_dir: PathBuf::from(REPO_DIR),
        }
    }

    /// Every path of [`Layout::system`] re-anchored under `root`.
    pub fn rooted(root: &Path) -> Self {
        let under = |p: &str| root.join(p.trim_start_matches('/'));
        Layout {
            config_dir: under(CONFIG_DIR),
            config: under(CONFIG_PATH),
            env_file: under(ENV_PATH),
            binary: under(BINARY_PATH),
            unit: under(SERVICE_PATH),
            repo_dir: under(REPO_DIR),
        }
    }

    pub fn with_repo_dir(mut self, dir: PathBuf) -> Self {
        self.repo_dir = dir;
        self
    }

    pub fn is_installed(&self) -> bool {
        self.binary.exists() && self.config.exists()
    }
}
