//! `KEY=value` environment file consumed by systemd's `EnvironmentFile=`.

fn line_key(line: &str) -> Option<&str> {
    let line = line.trim_start();
    if line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, _) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some(key)
}

fn render_value(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

/// Key/value pairs in file order. Comments and blank lines are skipped.
pub fn parse(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let key = line_key(line)?;
            let (_, raw) = line.split_once('=')?;
            let raw = raw.trim();
            let value = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .map(|v| v.replace("\\\"", "\"").replace("\\\\", "\\"))
                .unwrap_or_else(|| raw.to_string());
            Some((key.to_string(), value))
        })
        .collect()
}

pub fn get(content: &str, key: &str) -> Option<String> {
    parse(content).into_iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Rewrites the first `key=` line or appends one.
pub fn upsert(content: &str, key: &str, value: &str) -> String {
    let new_line = format!("{}={}", key, render_value(value));
    let mut out = String::with_capacity(content.len() + new_line.len() + 1);
    let mut replaced = false;

    for line in content.lines() {
        if !replaced && line_key(line) == Some(key) {
            out.push_str(&new_line);
            replaced = true;
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    if !replaced {
        out.push_str(&new_line);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# bifrost environment\nBIFROST_CONFIG=/etc/bifrost/config.yaml\n\nexport BIFROST_ARGS=\"--verbose --x\"\n";

    #[test]
    fn parse_skips_comments_and_unquotes() {
        let entries = parse(SAMPLE);
        assert_eq!(
            entries,
            vec![
                ("BIFROST_CONFIG".to_string(), "/etc/bifrost/config.yaml".to_string()),
                ("BIFROST_ARGS".to_string(), "--verbose --x".to_string()),
            ]
        );
    }

    #[test]
    fn upsert_replaces_in_place() {
        let out = upsert(SAMPLE, "BIFROST_CONFIG", "/tmp/c.yaml");
        assert_eq!(
            out,
            "# bifrost environment\nBIFROST_CONFIG=/tmp/c.yaml\n\nexport BIFROST_ARGS=\"--verbose --x\"\n"
        );
        assert_eq!(upsert(&out, "BIFROST_CONFIG", "/tmp/c.yaml"), out);
    }

    #[test]
    fn upsert_appends_and_quotes() {
        let out = upsert("A=1", "BIFROST_ARGS", "-v -q");
        assert_eq!(out, "A=1\nBIFROST_ARGS=\"-v -q\"\n");
        assert_eq!(get(&out, "BIFROST_ARGS").as_deref(), Some("-v -q"));
        assert_eq!(upsert("", "B", ""), "B=\n");
    }

    #[test]
    fn commented_key_is_not_replaced() {
        let out = upsert("#PORT=1\n", "PORT", "2");
        assert_eq!(out, "#PORT=1\nPORT=2\n");
    }
}
