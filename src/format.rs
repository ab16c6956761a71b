//! Turn the plain text printed by `batt` into display text.
//!
//! The heuristics are line based:
//! - `Section:` alone on its line becomes a heading,
//! - `Key: value` gets its key emphasised,
//! - `- item` / `* item` are kept as list items (with the same rules for their content),
//! - anything else is passed through untouched.
use crate::error::BattError;
use chrono::{DateTime, Local};
use serde::Serialize;

/// A `key: value` pair found in the status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    /// Heading the entry appeared under, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[allow(missing_docs)]
    pub key: String,
    #[allow(missing_docs)]
    pub value: String,
}

/// Status output, raw and formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Output as printed by `batt`.
    pub raw: String,
    /// Display text.
    pub formatted: String,
    /// Every `key: value` pair, in order.
    pub entries: Vec<StatusEntry>,
}

impl StatusReport {
    /// Build a report from raw `batt status` output.
    pub fn new(raw: &str) -> Self {
        let mut section = None;
        let mut entries = Vec::new();
        for line in raw.lines() {
            match classify(line) {
                Line::Header(h) => section = Some(h.to_owned()),
                Line::Entry { key, value, .. } => entries.push(StatusEntry {
                    section: section.clone(),
                    key: key.to_owned(),
                    value: value.to_owned(),
                }),
                _ => (),
            }
        }
        StatusReport {
            raw: raw.to_owned(),
            formatted: format_status(raw),
            entries,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Blank,
    Header(&'a str),
    Entry {
        indent: &'a str,
        bullet: bool,
        key: &'a str,
        value: &'a str,
    },
    Item {
        indent: &'a str,
        text: &'a str,
    },
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim_end();
    let content = line.trim_start();
    if content.is_empty() {
        return Line::Blank;
    }
    let indent = &line[..line.len() - content.len()];
    let (bullet, body) = match content
        .strip_prefix("- ")
        .or_else(|| content.strip_prefix("* "))
    {
        Some(rest) => (true, rest.trim_start()),
        None => (false, content),
    };

    if !bullet && indent.is_empty() {
        if let Some(head) = body.strip_suffix(':') {
            if !head.is_empty() && !head.contains(':') {
                return Line::Header(head.trim());
            }
        }
    }
    if let Some((key, value)) = body.split_once(": ") {
        let key = key.trim();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            return Line::Entry {
                indent,
                bullet,
                key,
                value,
            };
        }
    }
    if bullet {
        Line::Item { indent, text: body }
    } else {
        Line::Text(line)
    }
}

/// Format raw `batt status` output for display.
///
/// Never fails: lines the heuristics do not recognise are kept as is.
pub fn format_status(raw: &str) -> String {
    raw.lines()
        .map(|line| match classify(line) {
            Line::Blank => String::new(),
            Line::Header(h) => format!("## {h}"),
            Line::Entry {
                indent,
                bullet,
                key,
                value,
            } => {
                let marker = if bullet { "- " } else { "" };
                format!("{indent}{marker}**{key}**: {value}")
            }
            Line::Item { indent, text } => format!("{indent}- {text}"),
            Line::Text(t) => t.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full status view, with the refresh time.
pub fn render_status(report: &StatusReport, updated_at: DateTime<Local>) -> String {
    format!(
        "# Battery Status\n\n{}\n\n_Last updated {}_",
        report.formatted,
        updated_at.format("%H:%M:%S")
    )
}

/// Error panel with remediation steps.
pub fn render_error(error: &BattError) -> String {
    let mut res = format!("# Error\n\n{error}\n\n## Try\n");
    for (i, step) in error.remediation().iter().enumerate() {
        res.push_str(&format!("\n{}. {}", i + 1, step));
    }
    res
}
