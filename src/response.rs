//! Parsers for the tabular result formats returned by the resource index.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PartchainError, Result};
use crate::model::{ResourceId, Value};
use crate::query::ResultFormat;
use crate::vocab::strip_fedora_prefix;

/// One solution: variable label to bound value, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    raw: String,
    bindings: Vec<(String, Value)>,
}

impl Row {
    /// Value bound to `label`, if any.
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v)
    }

    /// Value bound to `label`, which must be a repository resource.
    pub fn resource(&self, label: &str) -> Result<ResourceId> {
        match self.get(label) {
            Some(Value::Resource(id)) => Ok(id.clone()),
            Some(Value::Literal(_)) => Err(self.malformed(format!("${} is not a resource", label))),
            None => Err(self.malformed(format!("${} is unbound", label))),
        }
    }

    /// Value bound to `label`, resource or literal.
    pub fn value(&self, label: &str) -> Result<Value> {
        self.get(label)
            .cloned()
            .ok_or_else(|| self.malformed(format!("${} is unbound", label)))
    }

    fn malformed(&self, reason: String) -> PartchainError {
        PartchainError::MalformedResponse {
            row: self.raw.clone(),
            reason,
        }
    }
}

/// Parse a response body in the given format.
pub fn parse(body: &str, format: ResultFormat) -> Result<Vec<Row>> {
    match format {
        ResultFormat::Simple => parse_simple(body),
        ResultFormat::Csv => parse_csv(body),
    }
}

fn simple_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*(?:\w+\s*:\s*(?:<[^<>\s]+>|"(?:[^"\\]|\\.)*")\s*)+$"#)
            .expect("Invalid regex pattern")
    })
}

fn simple_binding_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(\w+)\s*:\s*(?:<([^<>\s]+)>|"((?:[^"\\]|\\.)*)")"#)
            .expect("Invalid regex pattern")
    })
}

/// `label : <info:fedora/ID>` or `label : "literal"`, one solution per line.
pub fn parse_simple(body: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for line in body.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if !simple_line_regex().is_match(line) {
            return Err(PartchainError::MalformedResponse {
                row: line.to_string(),
                reason: "expected `label : <uri>` or `label : \"literal\"`".to_string(),
            });
        }
        let mut bindings = Vec::new();
        for cap in simple_binding_regex().captures_iter(line) {
            let label = cap[1].to_string();
            let value = match (cap.get(2), cap.get(3)) {
                (Some(uri), _) => uri_value(uri.as_str(), line)?,
                (None, Some(lit)) => Value::Literal(unescape(lit.as_str(), line)?),
                (None, None) => Value::Literal(String::new()),
            };
            bindings.push((label, value));
        }
        rows.push(Row {
            raw: line.to_string(),
            bindings,
        });
    }
    log::debug!("Parsed {} simple row(s)", rows.len());
    Ok(rows)
}

/// Header row, then `value1,value2,...` per line.
pub fn parse_csv(body: &str) -> Result<Vec<Row>> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(h) => split_csv_row(h)?,
        None => return Ok(Vec::new()),
    };

    let mut rows = Vec::new();
    for line in lines {
        let cells = split_csv_row(line)?;
        if cells.len() != header.len() {
            return Err(PartchainError::MalformedResponse {
                row: line.to_string(),
                reason: format!("expected {} column(s), found {}", header.len(), cells.len()),
            });
        }
        let mut bindings = Vec::with_capacity(cells.len());
        for (label, cell) in header.iter().zip(cells) {
            let value = match strip_fedora_prefix(&cell) {
                Some(_) => uri_value(&cell, line)?,
                None => Value::Literal(cell),
            };
            bindings.push((label.trim().to_string(), value));
        }
        rows.push(Row {
            raw: line.to_string(),
            bindings,
        });
    }
    log::debug!("Parsed {} csv row(s)", rows.len());
    Ok(rows)
}

fn uri_value(uri: &str, line: &str) -> Result<Value> {
    match strip_fedora_prefix(uri) {
        Some(pid) => ResourceId::new(pid)
            .map(Value::Resource)
            .map_err(|_| PartchainError::MalformedResponse {
                row: line.to_string(),
                reason: format!("invalid identifier in {}", uri),
            }),
        None => Ok(Value::Literal(uri.to_string())),
    }
}

/// Decode N-Triples string escapes.
fn unescape(raw: &str, line: &str) -> Result<String> {
    let malformed = |reason: String| PartchainError::MalformedResponse {
        row: line.to_string(),
        reason,
    };

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(u @ ('u' | 'U')) => {
                let width = if u == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(width).collect();
                let well_formed =
                    hex.len() == width && hex.chars().all(|h| h.is_ascii_hexdigit());
                let decoded = if well_formed {
                    u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                } else {
                    None
                };
                match decoded {
                    Some(ch) => out.push(ch),
                    None => return Err(malformed(format!("invalid escape \\{}{}", u, hex))),
                }
            }
            Some(other) => return Err(malformed(format!("unknown escape \\{}", other))),
            None => return Err(malformed("dangling backslash".to_string())),
        }
    }
    Ok(out)
}

/// Split one CSV line; quoted cells may contain commas and `""` escapes.
fn split_csv_row(line: &str) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                cell.push('"');
            }
            ('"', true) => in_quotes = false,
            ('"', false) if cell.is_empty() => in_quotes = true,
            (',', false) => cells.push(std::mem::take(&mut cell)),
            (c, _) => cell.push(c),
        }
    }
    if in_quotes {
        return Err(PartchainError::MalformedResponse {
            row: line.to_string(),
            reason: "unterminated quoted value".to_string(),
        });
    }
    cells.push(cell);
    Ok(cells)
}
