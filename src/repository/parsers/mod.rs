// src/repository/parsers/mod.rs

//! Control-file (deb822) stanza parsing
//!
//! An index is a sequence of stanzas separated by blank lines. Each stanza
//! is a list of `Field: value` lines; lines starting with a space or tab
//! continue the previous field. Field names are case-insensitive.
//!
//! Syntax errors are confined to the stanza they occur in: the stanza is
//! recorded as skipped and parsing resumes at the next blank line.

pub mod debian;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use debian::{IndexEntries, IndexKind, IndexParser, ParsedIndex, ReleaseFile};

/// A single field of a stanza
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    /// Value with continuation lines joined by `\n` (one leading space removed)
    pub value: String,
}

/// One paragraph of a control file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stanza {
    fields: Vec<Field>,
    /// 1-based line number of the first line
    pub line: usize,
}

impl Stanza {
    pub fn new(line: usize) -> Self {
        Self {
            fields: Vec::new(),
            line,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field value, looked up case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .map(|f| f.value.as_str())
    }

    /// Field value with surrounding whitespace removed, `None` if empty
    pub fn get_trimmed(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Append a field; a repeated field name makes the stanza invalid
    pub fn push(&mut self, name: &str, value: String) -> Result<(), String> {
        if self.contains(name) {
            return Err(format!("duplicate field '{}'", name));
        }
        self.fields.push(Field {
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn last_mut(&mut self) -> Option<&mut Field> {
        self.fields.last_mut()
    }

    /// Fields whose names are not in `known`, in original order
    pub fn unknown_fields(&self, known: &[&str]) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|f| !known.iter().any(|k| k.eq_ignore_ascii_case(&f.name)))
            .map(|f| (f.name.clone(), f.value.clone()))
            .collect()
    }
}

impl fmt::Display for Stanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in &self.fields {
            let mut lines = field.value.split('\n');
            match lines.next() {
                Some(first) if !first.is_empty() => writeln!(f, "{}: {}", field.name, first)?,
                _ => writeln!(f, "{}:", field.name)?,
            }
            for line in lines {
                writeln!(f, " {}", line)?;
            }
        }
        Ok(())
    }
}

/// A stanza the parser had to drop, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedStanza {
    /// Line the stanza starts on
    pub line: usize,
    /// Package name, when the stanza got far enough to have one
    pub package: Option<String>,
    pub reason: String,
}

impl fmt::Display for SkippedStanza {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(name) => write!(f, "stanza at line {} ({}): {}", self.line, name, self.reason),
            None => write!(f, "stanza at line {}: {}", self.line, self.reason),
        }
    }
}

/// Split control-file text into stanzas
///
/// Returns the well-formed stanzas and the ones skipped for syntax errors.
/// `#` comment lines are ignored.
pub fn parse_stanzas(text: &str) -> (Vec<Stanza>, Vec<SkippedStanza>) {
    let mut stanzas = Vec::new();
    let mut skipped = Vec::new();

    let mut current: Option<Stanza> = None;
    let mut error: Option<String> = None;

    let mut finish = |current: &mut Option<Stanza>, error: &mut Option<String>| {
        if let Some(stanza) = current.take() {
            match error.take() {
                Some(reason) => skipped.push(SkippedStanza {
                    line: stanza.line,
                    package: stanza.get_trimmed("Package").map(str::to_string),
                    reason,
                }),
                None if !stanza.is_empty() => stanzas.push(stanza),
                None => {}
            }
        }
    };

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        if line.trim().is_empty() {
            finish(&mut current, &mut error);
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let stanza = current.get_or_insert_with(|| Stanza::new(line_no));
        if error.is_some() {
            // stanza already broken, only look for its end
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            match stanza.last_mut() {
                Some(field) => {
                    field.value.push('\n');
                    field.value.push_str(&line[1..]);
                }
                None => {
                    error = Some(format!("continuation line {} without a field", line_no));
                }
            }
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) if !name.is_empty() && !name.contains(char::is_whitespace) => {
                if let Err(reason) = stanza.push(name, value.trim().to_string()) {
                    error = Some(reason);
                }
            }
            _ => {
                error = Some(format!("line {} is not a 'Field: value' pair", line_no));
            }
        }
    }
    finish(&mut current, &mut error);

    (stanzas, skipped)
}
