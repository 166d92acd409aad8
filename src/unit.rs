//! systemd unit generation.

use std::fmt;
use std::path::PathBuf;

use crate::layout::{Layout, SERVICE_NAME};

const CAPABILITIES: &str = "CAP_NET_ADMIN CAP_NET_BIND_SERVICE CAP_NET_RAW";

#[derive(Debug, Clone)]
pub struct UnitSpec {
    pub description: String,
    pub binary: PathBuf,
    /// Fallback for `BIFROST_CONFIG` when the env file does not set it.
    pub config: PathBuf,
    pub env_file: PathBuf,
    pub working_dir: PathBuf,
    pub user: String,
    pub group: String,
}

impl UnitSpec {
    pub fn new(layout: &Layout, user: &str) -> Self {
        UnitSpec {
            description: "Bifrost Service".to_string(),
            binary: layout.binary.clone(),
            config: layout.config.clone(),
            env_file: layout.env_file.clone(),
            working_dir: layout.config_dir.clone(),
            user: user.to_string(),
            group: user.to_string(),
        }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UnitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[Unit]")?;
        writeln!(f, "Description={}", self.description)?;
        writeln!(f, "After=network-online.target")?;
        writeln!(f, "Wants=network-online.target")?;
        writeln!(f)?;
        writeln!(f, "[Service]")?;
        writeln!(f, "Type=simple")?;
        writeln!(f, "Environment=BIFROST_CONFIG={}", self.config.display())?;
        writeln!(f, "EnvironmentFile=-{}", self.env_file.display())?;
        writeln!(f, "WorkingDirectory={}", self.working_dir.display())?;
        writeln!(
            f,
            "ExecStart={} -c ${{BIFROST_CONFIG}} $BIFROST_ARGS",
            self.binary.display()
        )?;
        writeln!(f, "Restart=on-failure")?;
        writeln!(f, "RestartSec=5")?;
        writeln!(f, "LimitNOFILE=1048576")?;

        if self.user != "root" {
            writeln!(f, "User={}", self.user)?;
            writeln!(f, "Group={}", self.group)?;
            writeln!(f, "AmbientCapabilities={}", CAPABILITIES)?;
            writeln!(f, "CapabilityBoundingSet={}", CAPABILITIES)?;
            writeln!(f, "NoNewPrivileges=true")?;
        }

        writeln!(f, "StandardOutput=journal")?;
        writeln!(f, "StandardError=journal")?;
        writeln!(f, "SyslogIdentifier={}", SERVICE_NAME)?;
        writeln!(f)?;
        writeln!(f, "[Install]")?;
        writeln!(f, "WantedBy=multi-user.target")
    }
}

/// The `User=` an installed unit runs as; `root` when the line is absent.
pub fn installed_user(unit: &str) -> String {
    unit.lines()
        .filter_map(|line| line.trim().strip_prefix("User="))
        .map(|user| user.trim().to_string())
        .find(|user| !user.is_empty())
        .unwrap_or_else(|| "root".to_string())
}
