//! Line-oriented editing of scalar `key: value` entries in the bifrost YAML config.
//!
//! The file is never parsed as a document: the first line whose key matches is
//! rewritten in place, keeping its indentation and any trailing comment. Every
//! other byte of the file, line endings included, is left alone.

use std::fmt;

use regex_lite::Regex;

/// A YAML scalar as it is written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Written as a double-quoted string.
    Quoted(String),
    /// Written verbatim (numbers).
    Bare(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bare(s) => f.write_str(s),
            Scalar::Quoted(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
        }
    }
}

fn key_pattern(key: &str) -> Regex {
    // The escaped key is always a valid pattern.
    Regex::new(&format!(r"^(\s*){}\s*:(.*)$", regex_lite::escape(key)))
        .unwrap_or_else(|_| unreachable!("escaped key produced an invalid regex"))
}

/// Splits a line into its body and its terminator (`\n`, `\r\n` or nothing).
fn split_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

/// Splits the text after `key:` into the value part and the inline comment,
/// the latter including the whitespace that precedes `#`.
fn split_comment(rest: &str) -> (&str, &str) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev_ws = true;

    for (i, c) in rest.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' if prev_ws => {
                    let value = rest[..i].trim_end();
                    return (value, &rest[value.len()..]);
                }
                _ => {}
            },
        }
        prev_ws = c.is_whitespace();
    }

    (rest.trim_end(), "")
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        let inner = &raw[1..raw.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            } else {
                out.push(c);
            }
        }
        out
    } else if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        raw[1..raw.len() - 1].replace("''", "'")
    } else {
        raw.to_string()
    }
}

/// Replaces the first `key:` line or appends `key: value` at top level.
pub fn upsert(content: &str, key: &str, value: &Scalar) -> String {
    let re = key_pattern(key);
    let mut out = String::with_capacity(content.len() + key.len() + 16);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        if !replaced {
            let (body, ending) = split_ending(line);
            if let Some(caps) = re.captures(body) {
                let indent = caps.get(1).map_or("", |m| m.as_str());
                let rest = caps.get(2).map_or("", |m| m.as_str());
                let (_, comment) = split_comment(rest);
                out.push_str(&format!("{}{}: {}{}{}", indent, key, value, comment, ending));
                replaced = true;
                continue;
            }
        }
        out.push_str(line);
    }

    if !replaced {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("{}: {}\n", key, value));
    }

    out
}

/// Value of the first `key:` line with quotes and inline comment removed.
pub fn get(content: &str, key: &str) -> Option<String> {
    let re = key_pattern(key);
    content.lines().find_map(|line| {
        let caps = re.captures(line)?;
        let rest = caps.get(2).map_or("", |m| m.as_str());
        let (value, _) = split_comment(rest);
        Some(unquote(value))
    })
}
