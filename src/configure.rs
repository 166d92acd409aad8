//! Reading and editing the installed bifrost config.

use std::fs;
use std::io::{BufRead, Write};
use std::net::IpAddr;

use log::info;

use crate::console::Console;
use crate::ctx::Ctx;
use crate::error::{Error, Result};
use crate::keys::ConfigKey;
use crate::service::{self, Action};
use crate::system;
use crate::yaml::{self, Scalar};

const CONFIG_MODE: u32 = 0o640;

pub fn read_config(ctx: &Ctx) -> Result<String> {
    let path = &ctx.layout.config;
    if !path.exists() {
        return Err(Error::NotInstalled(path.clone()));
    }
    fs::read_to_string(path).map_err(Error::io(path))
}

/// Atomically replaces the config, keeping its current permissions.
pub fn write_config(ctx: &Ctx, content: &str) -> Result<()> {
    let path = &ctx.layout.config;
    let mode = system::file_mode(path).unwrap_or(CONFIG_MODE);
    system::write_atomic(path, content.as_bytes(), mode)
}

pub fn get(ctx: &Ctx, key: ConfigKey) -> Result<Option<String>> {
    Ok(yaml::get(&read_config(ctx)?, key.as_str()))
}

/// Validates `raw` for `key` and upserts it. Returns the stored scalar and
/// whether the file changed.
pub fn set(ctx: &Ctx, key: ConfigKey, raw: &str) -> Result<(Scalar, bool)> {
    let value = key.parse_value(raw)?;
    let content = read_config(ctx)?;
    let updated = yaml::upsert(&content, key.as_str(), &value);
    let changed = updated != content;
    if changed {
        write_config(ctx, &updated)?;
        info!("{} set to {}", key, value);
    }
    Ok((value, changed))
}

/// Asks whether to restart a running service after its config changed.
pub fn offer_restart<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>) -> Result<bool> {
    if !service::is_active(ctx) || !con.prompt_yn("Restart bifrost to apply changes?", true)? {
        return Ok(false);
    }
    service::control(ctx, Action::Restart)?;
    con.line("Restarted.")?;
    Ok(true)
}

/// Non-interactive counterpart of [`offer_restart`]: restarts a running
/// service when `restart` is set, otherwise tells how to apply the change.
pub fn apply_to_running<R: BufRead, W: Write>(
    ctx: &Ctx,
    con: &mut Console<R, W>,
    restart: bool,
) -> Result<()> {
    if !service::is_active(ctx) {
        return Ok(());
    }
    if restart {
        service::control(ctx, Action::Restart)?;
        con.line("Restarted.")?;
    } else {
        con.line("bifrost is running; apply with: bifrostctl restart")?;
    }
    Ok(())
}

pub fn show<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>) -> Result<()> {
    let content = read_config(ctx)?;
    con.line(format!("Config: {}", ctx.layout.config.display()))?;
    for key in ConfigKey::ALL {
        let value = yaml::get(&content, key.as_str());
        con.line(format!(
            "  {:<10} {}",
            key.as_str(),
            value.as_deref().unwrap_or("(not set)")
        ))?;
    }
    Ok(())
}

/// Suggested values for keys that are not set yet.
struct Defaults<'c, 'a> {
    ctx: &'c Ctx<'a>,
    public_ip: Option<Option<IpAddr>>,
}

impl Defaults<'_, '_> {
    fn public_ip(&mut self) -> Option<IpAddr> {
        let ctx = self.ctx;
        *self
            .public_ip
            .get_or_insert_with(|| system::public_ip(ctx.runner))
    }

    fn for_key(&mut self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::ListenIp => Some("0.0.0.0".to_string()),
            ConfigKey::SrcIp => self.public_ip().map(|ip| ip.to_string()),
            ConfigKey::Protocol => Some("tcp".to_string()),
            ConfigKey::DstIp | ConfigKey::Address | ConfigKey::Port => None,
        }
    }
}

/// Prompts for every key. Enter leaves a set key byte-for-byte untouched and
/// writes the suggestion for an unset one; with no suggestion the key stays
/// unset. Returns whether the file changed.
pub fn interactive<R: BufRead, W: Write>(ctx: &Ctx, con: &mut Console<R, W>) -> Result<bool> {
    let original = read_config(ctx)?;
    let mut content = original.clone();
    let mut defaults = Defaults {
        ctx,
        public_ip: None,
    };

    con.line("")?;
    con.line("Configure bifrost (press Enter to keep the value in brackets)")?;

    for key in ConfigKey::ALL {
        let current = yaml::get(&content, key.as_str()).filter(|v| !v.is_empty());
        let shown = match current.clone() {
            Some(v) => Some(v),
            None => defaults.for_key(key),
        };

        let value = loop {
            let msg = match &shown {
                Some(v) => format!("{} [{}]: ", key.hint(), v),
                None => format!("{}: ", key.hint()),
            };
            let Some(input) = con.prompt(&msg)? else {
                return Err(Error::Cancelled);
            };
            let input = if input.is_empty() {
                match (&current, &shown) {
                    (Some(_), _) | (None, None) => break None,
                    (None, Some(suggested)) => suggested.clone(),
                }
            } else {
                input
            };
            match key.parse_value(&input) {
                Ok(value) => break Some(value),
                Err(e) => con.line(format!("  {}", e))?,
            }
        };

        if let Some(value) = value {
            content = yaml::upsert(&content, key.as_str(), &value);
        }
    }

    if content == original {
        con.line("No changes.")?;
        return Ok(false);
    }
    write_config(ctx, &content)?;
    con.line(format!("Saved {}", ctx.layout.config.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::fake::FakeRunner;
    use std::io::Cursor;
    use tempfile::TempDir;

    const TEMPLATE: &str = "\
# bifrost relay
listen_ip: \"127.0.0.1\"  # bind address
protocol: tcp
port: 8080
";

    fn with_config(dir: &TempDir, runner: &FakeRunner, content: &str) {
        let ctx = Ctx::for_test(dir.path(), runner);
        fs::create_dir_all(&ctx.layout.config_dir).unwrap();
        fs::write(&ctx.layout.config, content).unwrap();
    }

    #[test]
    fn set_validates_and_writes() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        with_config(&dir, &runner, TEMPLATE);
        let ctx = Ctx::for_test(dir.path(), &runner);

        set(&ctx, ConfigKey::Port, "9000").unwrap();
        set(&ctx, ConfigKey::DstIp, "10.1.2.3").unwrap();
        assert!(matches!(
            set(&ctx, ConfigKey::Port, "http"),
            Err(Error::InvalidValue { key: "port", .. })
        ));

        let content = fs::read_to_string(&ctx.layout.config).unwrap();
        assert_eq!(
            content,
            "# bifrost relay\nlisten_ip: \"127.0.0.1\"  # bind address\nprotocol: tcp\nport: 9000\ndst_ip: \"10.1.2.3\"\n"
        );
        assert_eq!(get(&ctx, ConfigKey::DstIp).unwrap().as_deref(), Some("10.1.2.3"));
    }

    #[test]
    fn set_without_config_fails() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let ctx = Ctx::for_test(dir.path(), &runner);
        assert!(matches!(
            set(&ctx, ConfigKey::Port, "1"),
            Err(Error::NotInstalled(_))
        ));
    }

    #[test]
    fn interactive_keeps_and_replaces() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default().answering(
            "curl -fsS --max-time 5 https://api.ipify.org",
            "198.51.100.4\n",
        );
        with_config(&dir, &runner, TEMPLATE);
        let ctx = Ctx::for_test(dir.path(), &runner);

        // listen_ip: keep, src_ip: accept suggestion, dst_ip: bad then good,
        // address: skip, protocol: udp, port: keep
        let input = "\n\nnope\n192.0.2.1\n\nUDP\n\n";
        let mut con = Console::new(Cursor::new(input), Vec::new());

        assert!(interactive(&ctx, &mut con).unwrap());

        let content = fs::read_to_string(&ctx.layout.config).unwrap();
        assert_eq!(
            content,
            "# bifrost relay\nlisten_ip: \"127.0.0.1\"  # bind address\nprotocol: \"udp\"\nport: 8080\nsrc_ip: \"198.51.100.4\"\ndst_ip: \"192.0.2.1\"\n"
        );
        let out = String::from_utf8(con.into_output()).unwrap();
        assert!(out.contains("Source IP [198.51.100.4]: "));
        assert!(out.contains("Invalid value for dst_ip"));
    }

    #[test]
    fn interactive_eof_cancels_without_writing() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        with_config(&dir, &runner, TEMPLATE);
        let ctx = Ctx::for_test(dir.path(), &runner);

        let mut con = Console::new(Cursor::new("0.0.0.0\n"), Vec::new());
        assert!(matches!(interactive(&ctx, &mut con), Err(Error::Cancelled)));
        assert_eq!(fs::read_to_string(&ctx.layout.config).unwrap(), TEMPLATE);
    }

    #[test]
    fn show_lists_every_key() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        with_config(&dir, &runner, TEMPLATE);
        let ctx = Ctx::for_test(dir.path(), &runner);

        let mut con = Console::new(Cursor::new(""), Vec::new());
        show(&ctx, &mut con).unwrap();
        let out = String::from_utf8(con.into_output()).unwrap();
        assert!(out.contains("  listen_ip  127.0.0.1\n"));
        assert!(out.contains("  address    (not set)\n"));
        assert!(out.contains("  port       8080\n"));
    }

    #[test]
    fn set_keeps_owner_and_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        with_config(&dir, &runner, TEMPLATE);
        let ctx = Ctx::for_test(dir.path(), &runner);
        let path = &ctx.layout.config;
        fs::set_permissions(path, fs::Permissions::from_mode(0o644)).unwrap();
        if system::is_root() {
            std::os::unix::fs::chown(path, Some(65534), Some(65534)).unwrap();
        }
        let owner = system::file_owner(path).unwrap();

        let (_, changed) = set(&ctx, ConfigKey::Port, "2").unwrap();

        assert!(changed);
        assert_eq!(system::file_owner(path), Some(owner));
        assert_eq!(system::file_mode(path), Some(0o644));
    }

    #[test]
    fn enter_on_set_keys_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let src = "listen_ip: 1.2.3.4\nprotocol: tcp\nport: 0443\n";
        with_config(&dir, &runner, src);
        let ctx = Ctx::for_test(dir.path(), &runner);

        // curl answers nothing, so src_ip has no suggestion; dst_ip and
        // address have none either.
        let mut con = Console::new(Cursor::new("\n\n\n\n\n\n"), Vec::new());
        assert!(!interactive(&ctx, &mut con).unwrap());

        assert_eq!(fs::read_to_string(&ctx.layout.config).unwrap(), src);
        let out = String::from_utf8(con.into_output()).unwrap();
        assert!(out.contains("No changes."));
    }

    fn with_unit(ctx: &Ctx) {
        fs::create_dir_all(ctx.layout.unit.parent().unwrap()).unwrap();
        fs::write(&ctx.layout.unit, "[Unit]\n").unwrap();
    }

    #[test]
    fn offer_restart_only_for_running_service() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let ctx = Ctx::for_test(dir.path(), &runner);
        with_unit(&ctx);

        let mut con = Console::new(Cursor::new("\n"), Vec::new());
        assert!(offer_restart(&ctx, &mut con).unwrap());
        assert_eq!(runner.calls().last().unwrap(), "systemctl restart bifrost");

        let runner = FakeRunner::default().failing("systemctl is-active");
        let ctx = Ctx::for_test(dir.path(), &runner);
        let mut con = Console::new(Cursor::new("y\n"), Vec::new());
        assert!(!offer_restart(&ctx, &mut con).unwrap());
        assert_eq!(runner.calls(), vec!["systemctl is-active --quiet bifrost"]);
    }

    #[test]
    fn set_on_running_service_hints_or_restarts() {
        let dir = TempDir::new().unwrap();
        let runner = FakeRunner::default();
        let ctx = Ctx::for_test(dir.path(), &runner);
        with_unit(&ctx);

        let mut con = Console::new(Cursor::new(""), Vec::new());
        apply_to_running(&ctx, &mut con, false).unwrap();
        let out = String::from_utf8(con.into_output()).unwrap();
        assert!(out.contains("apply with: bifrostctl restart"));
        assert!(!runner.calls().iter().any(|c| c.contains("restart")));

        let mut con = Console::new(Cursor::new(""), Vec::new());
        apply_to_running(&ctx, &mut con, true).unwrap();
        assert_eq!(runner.calls().last().unwrap(), "systemctl restart bifrost");
    }
}
