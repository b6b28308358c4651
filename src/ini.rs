//! Line-preserving INI documents
//!
//! Node configuration files carry long comment blocks that operators rely on.
//! `IniDocument` keeps every line as it was read and only re-renders the
//! entries whose values were replaced.
//!
//! Section names are case-sensitive, keys are not. Both `=` and `:` are accepted
//! as delimiters and lines starting with `;` or `#` are comments.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{GenError, Result};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Raw(String),
    Section(String, String),
    Entry {
        section: String,
        key: String,
        prefix: String,
        value: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    lines: Vec<Line>,
}

impl IniDocument {
    pub fn parse(text: &str) -> std::result::Result<Self, SyntaxError> {
        let mut lines = Vec::new();
        let mut sections: Vec<String> = Vec::new();
        let mut keys: HashSet<(String, String)> = HashSet::new();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                lines.push(Line::Raw(raw.to_string()));
                continue;
            }

            if trimmed.starts_with('[') {
                let name = trimmed[1..]
                    .split_once(']')
                    .map(|(name, _)| name.trim().to_string())
                    .ok_or_else(|| SyntaxError {
                        line: line_no,
                        message: format!("unterminated section header '{}'", trimmed),
                    })?;
                if sections.contains(&name) {
                    return Err(SyntaxError {
                        line: line_no,
                        message: format!("duplicate section [{}]", name),
                    });
                }
                sections.push(name.clone());
                current = Some(name.clone());
                lines.push(Line::Section(name, raw.to_string()));
                continue;
            }

            let section = current.clone().ok_or_else(|| SyntaxError {
                line: line_no,
                message: "entry before first section header".to_string(),
            })?;

            let delim = raw.find(&['=', ':'][..]).ok_or_else(|| SyntaxError {
                line: line_no,
                message: format!("expected 'key = value', found '{}'", trimmed),
            })?;

            let key = raw[..delim].trim();
            if key.is_empty() {
                return Err(SyntaxError {
                    line: line_no,
                    message: "empty key".to_string(),
                });
            }

            let key = key.to_lowercase();
            if !keys.insert((section.clone(), key.clone())) {
                return Err(SyntaxError {
                    line: line_no,
                    message: format!("duplicate key '{}' in section [{}]", key, section),
                });
            }

            let rest = &raw[delim + 1..];
            let value = rest.trim();
            let lead = rest.len() - rest.trim_start().len();
            let prefix = raw[..delim + 1 + lead].to_string();

            lines.push(Line::Entry {
                section,
                key,
                prefix,
                value: value.to_string(),
            });
        }

        Ok(Self { lines })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| GenError::io(path, e))?;
        Self::parse(&text).map_err(|e| GenError::parse(path, e.to_string()))
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.lines
            .iter()
            .any(|l| matches!(l, Line::Section(name, _) if name == section))
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        self.lines.iter().find_map(|l| match l {
            Line::Entry {
                section: s,
                key: k,
                value,
                ..
            } if s == section && *k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Replace the value of an existing entry, returning the previous value.
    ///
    /// Returns `None` and leaves the document untouched when the section or
    /// key does not exist.
    pub fn replace(&mut self, section: &str, key: &str, value: &str) -> Option<String> {
        let key = key.to_lowercase();
        self.lines.iter_mut().find_map(|l| match l {
            Line::Entry {
                section: s,
                key: k,
                value: v,
                ..
            } if s == section && *k == key => Some(std::mem::replace(v, value.to_string())),
            _ => None,
        })
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_string()).map_err(|e| GenError::io(path, e))
    }
}

impl fmt::Display for IniDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            match line {
                Line::Raw(raw) | Line::Section(_, raw) => writeln!(f, "{}", raw)?,
                Line::Entry { prefix, value, .. } => writeln!(f, "{}{}", prefix, value)?,
            }
        }
        Ok(())
    }
}
