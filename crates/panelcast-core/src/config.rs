//! Replication configuration parsing
//!
//! The configuration is a line-oriented `key=value` format with one level of
//! `[section]` nesting. Lines before the first header (and between sections)
//! belong to the implicit root section. A named section is closed by a blank
//! line or by the end of input:
//!
//! ```text
//! key=value
//! anotherKey = trimmed value
//! keyWithNoEquals
//!
//! [transmitter]
//! block=Cockpit
//! surface=1
//! tag=hud
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use thiserror::Error;

/// Fatal configuration errors (malformed structure or values)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line {line}: found section [{header}] inside section [{section}], did you forget to close it with an empty line?")]
    NestedSection {
        line: usize,
        section: String,
        header: String,
    },
    #[error("section [{section}]: value {value:?} of '{key}' is not an integer")]
    InvalidInteger {
        section: String,
        key: String,
        value: String,
    },
}

/// A parsed configuration section
///
/// The root section has an empty name and is the only one that may hold
/// children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSection {
    name: String,
    entries: BTreeMap<String, String>,
    children: Vec<ConfigSection>,
}

impl ConfigSection {
    /// Parse configuration text into its root section
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let lines = split_lines(text);
        let (root, _) = parse_section(&lines, 0, String::new())?;
        Ok(root)
    }

    /// Section name, empty for the root
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_empty()
    }

    /// Child sections in configuration order
    pub fn sections(&self) -> &[ConfigSection] {
        &self.children
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Look up a key, falling back to `default` when absent
    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(default)
    }

    /// Look up an integer key
    ///
    /// An absent key yields `default`; a present value that does not parse
    /// as an integer is a [`ConfigError::InvalidInteger`].
    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidInteger {
                section: self.name.clone(),
                key: key.to_string(),
                value: value.clone(),
            }),
        }
    }

    /// Render the tree back into configuration text
    ///
    /// Root entries come first, then every child section followed by a blank
    /// line. Parsing the result yields an equal tree.
    pub fn to_config_string(&self) -> String {
        let mut out = String::new();
        self.write_entries(&mut out);
        for child in &self.children {
            let _ = writeln!(out, "[{}]", child.name);
            child.write_entries(&mut out);
            out.push('\n');
        }
        out
    }

    fn write_entries(&self, out: &mut String) {
        for (key, value) in &self.entries {
            let _ = writeln!(out, "{}={}", key, value);
        }
    }
}

/// Split on `\r\n`, `\n` or a lone `\r`
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(['\n', '\r']) {
        lines.push(&rest[..pos]);
        let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + skip..];
    }
    lines.push(rest);
    lines
}

/// Returns the captured name if the (trimmed) line is a `[name]` header
fn section_header(line: &str) -> Option<&str> {
    let name = line.strip_prefix('[')?.strip_suffix(']')?;
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Parse one section starting at `pos`, returning it with the position of the
/// first line it did not consume
fn parse_section(
    lines: &[&str],
    mut pos: usize,
    name: String,
) -> Result<(ConfigSection, usize), ConfigError> {
    let mut section = ConfigSection {
        name,
        ..Default::default()
    };

    while pos < lines.len() {
        let line = lines[pos].trim();
        pos += 1;

        if line.is_empty() {
            if section.is_root() {
                continue;
            }
            break;
        }

        if let Some(header) = section_header(line) {
            if !section.is_root() {
                return Err(ConfigError::NestedSection {
                    line: pos,
                    section: section.name,
                    header: header.to_string(),
                });
            }
            let (child, next) = parse_section(lines, pos, header.to_string())?;
            section.children.push(child);
            pos = next;
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line, ""),
        };
        section.entries.insert(key.to_string(), value.to_string());
    }

    Ok((section, pos))
}
