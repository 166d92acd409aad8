//! Everything that touches the host: external commands, users, packages, files.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::net::IpAddr;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::error::{Error, Result};

const PUBLIC_IP_URL: &str = "https://api.ipify.org";
const FETCH_TIMEOUT_SECS: &str = "5";

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the installer and the processes it spawns.
pub trait Runner {
    /// Runs with captured stdout/stderr.
    fn run(&self, prog: &str, args: &[&str]) -> io::Result<Output>;

    /// Runs attached to the terminal (status pages, log following).
    fn run_interactive(&self, prog: &str, args: &[&str]) -> io::Result<bool>;
}

pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, prog: &str, args: &[&str]) -> io::Result<Output> {
        debug!("exec: {} {}", prog, args.join(" "));
        let output = Command::new(prog)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        Ok(Output {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_interactive(&self, prog: &str, args: &[&str]) -> io::Result<bool> {
        debug!("exec: {} {}", prog, args.join(" "));
        Command::new(prog).args(args).status().map(|s| s.success())
    }
}

fn describe(prog: &str, args: &[&str]) -> String {
    if args.is_empty() {
        prog.to_string()
    } else {
        format!("{} {}", prog, args.join(" "))
    }
}

/// Runs a command and fails unless it exits successfully.
pub fn run_strict(runner: &dyn Runner, prog: &str, args: &[&str]) -> Result<Output> {
    let cmd = describe(prog, args);
    let out = runner.run(prog, args).map_err(|e| Error::Command {
        cmd: cmd.clone(),
        detail: e.to_string(),
    })?;
    if !out.success {
        let detail = out.stderr.trim();
        return Err(Error::Command {
            cmd,
            detail: if detail.is_empty() {
                "non-zero exit status".to_string()
            } else {
                detail.to_string()
            },
        });
    }
    Ok(out)
}

/// Runs a command, logging instead of failing. Returns whether it succeeded.
pub fn run_best_effort(runner: &dyn Runner, prog: &str, args: &[&str]) -> bool {
    match runner.run(prog, args) {
        Ok(out) if out.success => true,
        Ok(out) => {
            warn!("{} failed: {}", describe(prog, args), out.stderr.trim());
            false
        }
        Err(e) => {
            warn!("{} failed: {}", describe(prog, args), e);
            false
        }
    }
}

// ============================================================================
// Privileges & PATH
// ============================================================================

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

pub fn require_root() -> Result<()> {
    if is_root() {
        Ok(())
    } else {
        Err(Error::NotRoot)
    }
}

pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| {
            fs::metadata(candidate)
                .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
                .unwrap_or(false)
        })
}

pub fn has_command(name: &str) -> bool {
    find_in_path(name).is_some()
}

// ============================================================================
// Packages
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Apk,
    Pacman,
}

impl PackageManager {
    pub fn detect() -> Option<Self> {
        [
            ("apt-get", PackageManager::Apt),
            ("dnf", PackageManager::Dnf),
            ("yum", PackageManager::Yum),
            ("apk", PackageManager::Apk),
            ("pacman", PackageManager::Pacman),
        ]
        .into_iter()
        .find(|(bin, _)| has_command(bin))
        .map(|(_, pm)| pm)
    }

    pub fn install_command(self, packages: &[&str]) -> (&'static str, Vec<String>) {
        let (prog, base): (&'static str, &[&str]) = match self {
            PackageManager::Apt => ("apt-get", &["install", "-y"][..]),
            PackageManager::Dnf => ("dnf", &["install", "-y"][..]),
            PackageManager::Yum => ("yum", &["install", "-y"][..]),
            PackageManager::Apk => ("apk", &["add", "--no-cache"][..]),
            PackageManager::Pacman => ("pacman", &["-S", "--noconfirm", "--needed"][..]),
        };
        let args = base
            .iter()
            .chain(packages.iter())
            .map(|s| s.to_string())
            .collect();
        (prog, args)
    }
}

/// Installs whichever of `packages` is missing from PATH. Best-effort.
pub fn ensure_packages(runner: &dyn Runner, packages: &[&str]) {
    let missing: Vec<&str> = packages.iter().copied().filter(|p| !has_command(p)).collect();
    if missing.is_empty() {
        return;
    }

    let Some(pm) = PackageManager::detect() else {
        warn!("no supported package manager found, please install: {}", missing.join(" "));
        return;
    };

    if pm == PackageManager::Apt {
        run_best_effort(runner, "apt-get", &["update", "-y"]);
    }
    let (prog, args) = pm.install_command(&missing);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    run_best_effort(runner, prog, &args);
}

// ============================================================================
// Service user
// ============================================================================

pub fn user_exists(runner: &dyn Runner, user: &str) -> bool {
    runner
        .run("id", &["-u", user])
        .map(|o| o.success)
        .unwrap_or(false)
}

/// Creates a system account without home or login shell. Best-effort.
pub fn ensure_system_user(runner: &dyn Runner, user: &str) {
    if user == "root" || user_exists(runner, user) {
        return;
    }
    run_best_effort(
        runner,
        "useradd",
        &["--system", "--no-create-home", "--shell", "/usr/sbin/nologin", user],
    );
}

pub fn remove_system_user(runner: &dyn Runner, user: &str) {
    if user == "root" || !user_exists(runner, user) {
        return;
    }
    run_best_effort(runner, "userdel", &[user]);
}

// ============================================================================
// Network
// ============================================================================

fn parse_ip(body: &str) -> Option<IpAddr> {
    body.trim().parse().ok()
}

/// The host's public address as seen by an echo service, if reachable.
pub fn public_ip(runner: &dyn Runner) -> Option<IpAddr> {
    let attempts: [(&str, [&str; 4]); 2] = [
        ("curl", ["-fsS", "--max-time", FETCH_TIMEOUT_SECS, PUBLIC_IP_URL]),
        ("wget", ["-qO-", "-T", FETCH_TIMEOUT_SECS, PUBLIC_IP_URL]),
    ];
    attempts.iter().find_map(|(prog, args)| {
        let out = runner.run(prog, args).ok()?;
        if out.success {
            parse_ip(&out.stdout)
        } else {
            None
        }
    })
}

// ============================================================================
// Files
// ============================================================================

/// Writes `content` to a sibling temp file with `mode`, fsyncs, then renames
/// it over `path`. A file being replaced keeps its owner and group.
pub fn write_atomic(path: &Path, content: &[u8], mode: u32) -> Result<()> {
    let owner = file_owner(path);
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(&temp)
        .map_err(Error::io(&temp))?;
    file.write_all(content).map_err(Error::io(&temp))?;
    file.sync_all().map_err(Error::io(&temp))?;
    // `mode` on open is filtered by the umask.
    fs::set_permissions(&temp, fs::Permissions::from_mode(mode)).map_err(Error::io(&temp))?;
    if let Some((uid, gid)) = owner {
        std::os::unix::fs::chown(&temp, Some(uid), Some(gid)).map_err(Error::io(&temp))?;
    }
    fs::rename(&temp, path).map_err(Error::io(path))
}

pub fn file_owner(path: &Path) -> Option<(u32, u32)> {
    fs::metadata(path).ok().map(|m| (m.uid(), m.gid()))
}

pub fn file_mode(path: &Path) -> Option<u32> {
    fs::metadata(path).ok().map(|m| m.permissions().mode() & 0o7777)
}

pub fn create_dir(path: &Path, mode: u32) -> Result<()> {
    fs::create_dir_all(path).map_err(Error::io(path))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(Error::io(path))
}

/// Removes a file if present. Returns whether something was removed.
pub fn remove_file(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path)(e)),
    }
}

pub fn remove_dir(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(path)(e)),
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeRunner;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn strict_reports_stderr() {
        let runner = FakeRunner::default().failing("systemctl start");
        let err = run_strict(&runner, "systemctl", &["start", "bifrost"]).unwrap_err();
        assert_eq!(err.to_string(), "`systemctl start bifrost` failed: boom");
        assert!(run_strict(&runner, "systemctl", &["stop", "bifrost"]).is_ok());
    }

    #[test]
    fn best_effort_swallows_failure() {
        let runner = FakeRunner::default().failing("useradd");
        assert!(!run_best_effort(&runner, "useradd", &["x"]));
        assert_eq!(runner.calls(), vec!["useradd x"]);
    }

    #[test]
    fn public_ip_falls_back_to_wget() {
        let runner = FakeRunner::default()
            .failing("curl")
            .answering("wget -qO- -T 5 https://api.ipify.org", "203.0.113.7\n");
        assert_eq!(public_ip(&runner), Some("203.0.113.7".parse().unwrap()));

        let runner = FakeRunner::default()
            .answering("curl -fsS --max-time 5 https://api.ipify.org", "<html>");
        assert_eq!(public_ip(&runner), None);
    }

    #[test]
    fn system_user_skips_root_and_existing() {
        let runner = FakeRunner::default();
        ensure_system_user(&runner, "root");
        ensure_system_user(&runner, "bifrost");
        assert_eq!(runner.calls(), vec!["id -u bifrost"]);

        let runner = FakeRunner::default().failing("id -u");
        ensure_system_user(&runner, "bifrost");
        assert_eq!(
            runner.calls(),
            vec![
                "id -u bifrost",
                "useradd --system --no-create-home --shell /usr/sbin/nologin bifrost"
            ]
        );
    }

    #[test]
    fn package_install_commands() {
        let (prog, args) = PackageManager::Apk.install_command(&["git", "curl"]);
        assert_eq!(prog, "apk");
        assert_eq!(args, vec!["add", "--no-cache", "git", "curl"]);
    }

    #[test]
    fn atomic_write_sets_mode_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new", 0o640).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(file_mode(&path), Some(0o640));
        assert!(!dir.path().join("config.yaml.tmp").exists());
    }

    #[test]
    fn atomic_write_keeps_owner_of_replaced_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "old").unwrap();
        if is_root() {
            std::os::unix::fs::chown(&path, Some(65534), Some(65534)).unwrap();
        }
        let before = file_owner(&path).unwrap();

        write_atomic(&path, b"new", 0o640).unwrap();

        assert_eq!(file_owner(&path), Some(before));
        assert_eq!(file_mode(&path), Some(0o640));
    }

    #[test]
    fn remove_missing_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!remove_file(&dir.path().join("nope")).unwrap());
        assert!(!remove_dir(&dir.path().join("nope")).unwrap());
    }
}
