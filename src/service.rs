//! `systemctl` / `journalctl` wrappers for the bifrost unit.

use std::fmt;

use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::layout::SERVICE_NAME;
use crate::system::{run_best_effort, run_strict};

pub const DEFAULT_LOG_LINES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
            Action::Enable => "enable",
            Action::Disable => "disable",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require_unit(ctx: &Ctx) -> Result<()> {
    if ctx.layout.unit.exists() {
        Ok(())
    } else {
        Err(Error::NotInstalled(ctx.layout.unit.clone()))
    }
}

pub fn control(ctx: &Ctx, action: Action) -> Result<()> {
    ctx.require_root()?;
    require_unit(ctx)?;
    run_strict(ctx.runner, "systemctl", &[action.as_str(), SERVICE_NAME])?;
    Ok(())
}

/// Same as [`control`] but never fails; used while tearing down.
pub fn control_best_effort(ctx: &Ctx, action: Action) -> bool {
    run_best_effort(ctx.runner, "systemctl", &[action.as_str(), SERVICE_NAME])
}

pub fn daemon_reload(ctx: &Ctx) -> bool {
    run_best_effort(ctx.runner, "systemctl", &["daemon-reload"])
}

pub fn is_active(ctx: &Ctx) -> bool {
    ctx.runner
        .run("systemctl", &["is-active", "--quiet", SERVICE_NAME])
        .map(|o| o.success)
        .unwrap_or(false)
}

pub fn is_enabled(ctx: &Ctx) -> bool {
    ctx.runner
        .run("systemctl", &["is-enabled", "--quiet", SERVICE_NAME])
        .map(|o| o.success)
        .unwrap_or(false)
}

/// `systemctl status` exits non-zero for a stopped unit, which is not an error here.
pub fn status(ctx: &Ctx) -> Result<()> {
    require_unit(ctx)?;
    ctx.runner
        .run_interactive("systemctl", &["status", SERVICE_NAME, "--no-pager"])
        .map_err(|e| Error::Command {
            cmd: format!("systemctl status {}", SERVICE_NAME),
            detail: e.to_string(),
        })?;
    Ok(())
}

pub fn logs(ctx: &Ctx, lines: u32, follow: bool) -> Result<()> {
    let lines = lines.to_string();
    let mut args = vec!["-u", SERVICE_NAME, "--no-pager", "-n", lines.as_str()];
    if follow {
        args.push("-f");
    }
    let ok = ctx
        .runner
        .run_interactive("journalctl", &args)
        .map_err(|e| Error::Command {
            cmd: "journalctl".to_string(),
            detail: e.to_string(),
        })?;
    if !ok {
        return Err(Error::Command {
            cmd: format!("journalctl {}", args.join(" ")),
            detail: "non-zero exit status".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fake::FakeRunner;
    use std::fs;
    use tempfile::TempDir;

    fn installed(dir: &TempDir, runner: &FakeRunner) {
        let ctx = Ctx::for_test(dir.path(), runner);
        fs::create_dir_all(ctx.layout.unit.parent().unwrap()).unwrap();
        fs::write(&ctx.layout.unit, "[Unit]\n").unwrap();
    }

    #[test]
    fn control_requires_unit() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let ctx = Ctx::for_test(dir.path(), &runner);

        assert!(matches!(control(&ctx, Action::Start), Err(Error::NotInstalled(_))));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn control_invokes_systemctl() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default().failing("systemctl restart");
        installed(&dir, &runner);
        let ctx = Ctx::for_test(dir.path(), &runner);

        control(&ctx, Action::Stop).unwrap();
        assert!(control(&ctx, Action::Restart).is_err());
        assert_eq!(
            runner.calls(),
            vec!["systemctl stop bifrost", "systemctl restart bifrost"]
        );
    }

    #[test]
    fn logs_arguments() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let ctx = Ctx::for_test(dir.path(), &runner);

        logs(&ctx, 50, false).unwrap();
        logs(&ctx, 10, true).unwrap();
        assert_eq!(
            runner.calls(),
            vec![
                "journalctl -u bifrost --no-pager -n 50",
                "journalctl -u bifrost --no-pager -n 10 -f"
            ]
        );
    }

    #[test]
    fn stopped_unit_status_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default().failing("systemctl status");
        installed(&dir, &runner);
        let ctx = Ctx::for_test(dir.path(), &runner);

        status(&ctx).unwrap();
        assert!(!is_active(&Ctx::for_test(
            dir.path(),
            &FakeRunner::default().failing("systemctl is-active")
        )));
    }
}
