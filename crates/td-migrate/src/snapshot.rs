//! Schema snapshot text format.
//!
//! A snapshot is one provenance header line followed by the store's DDL,
//! one statement per line:
//!
//! ```text
//! -- tilde schema version: 1748577600
//! CREATE TABLE users(id INTEGER PRIMARY KEY, username VARCHAR NOT NULL);
//! ```
//!
//! The header records the highest applied version when the dump was taken,
//! or `none` for an empty ledger.

use std::io::Write;

const HEADER_PREFIX: &str = "-- tilde schema version: ";

/// A parsed snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Highest applied version recorded in the header
    pub version: Option<u64>,

    /// DDL statements, each terminated by `;`
    pub statements: Vec<String>,
}

impl Snapshot {
    /// Parse snapshot text. A missing or malformed header yields no version.
    pub fn parse(text: &str) -> Self {
        let mut version = None;
        let mut statements = Vec::new();
        let mut current = String::new();
        for line in text.lines() {
            if current.is_empty() {
                let trimmed = line.trim();
                if let Some(rest) = trimmed.strip_prefix(HEADER_PREFIX) {
                    version = rest.trim().parse().ok();
                    continue;
                }
                if trimmed.is_empty() || trimmed.starts_with("--") {
                    continue;
                }
            } else {
                current.push('\n');
            }
            // View bodies keep their original line breaks.
            current.push_str(line.trim_end());
            if current.ends_with(';') {
                statements.push(std::mem::take(&mut current));
            }
        }
        if !current.trim().is_empty() {
            statements.push(current);
        }
        Self {
            version,
            statements,
        }
    }

    /// Render the snapshot back to text
    pub fn render(&self) -> String {
        let mut out = header_line(self.version);
        for stmt in &self.statements {
            out.push_str(stmt);
            out.push('\n');
        }
        out
    }
}

/// The provenance header for `version`, newline included
pub fn header_line(version: Option<u64>) -> String {
    match version {
        Some(id) => format!("{HEADER_PREFIX}{id}\n"),
        None => format!("{HEADER_PREFIX}none\n"),
    }
}

/// Write the provenance header for `version`
pub fn write_header(sink: &mut (dyn Write + Send), version: Option<u64>) -> std::io::Result<()> {
    sink.write_all(header_line(version).as_bytes())
}
