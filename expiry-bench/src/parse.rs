//! Output parser: scrapes memory usage and the throughput table out of the
//! free-form text printed by the server client and the load generator.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::BenchError;

/// Key of the server's human-readable memory figure in `INFO memory`.
pub const MEMORY_KEY: &str = "used_memory_human";

/// Key of the exact byte count printed alongside it.
pub const MEMORY_BYTES_KEY: &str = "used_memory";

/// Name the memory figure is reported under.
pub const MEMORY_METRIC: &str = "mem";

/// The load generator prints this (as part of a longer rule) right above the
/// per-command result rows.
pub const TABLE_SEPARATOR: &str =
    "----------------------------------------------------------------";

/// Rows carrying this marker aggregate the others and are not reported.
pub const TOTALS_MARKER: &str = "Totals";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryReading {
    /// Value exactly as the server printed it, e.g. `1.23M`.
    pub human: String,
    /// Exact byte count from `used_memory`, or decoded from `human` when the
    /// exact line is absent and the suffix is recognised.
    pub bytes: Option<u64>,
}

#[derive(Debug, Default)]
pub struct ParsedOutput {
    pub memory: Option<MemoryReading>,
    pub metrics: BTreeMap<String, i64>,
    /// Malformed rows. The rest of the output is still parsed.
    pub errors: Vec<BenchError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Scanning,
    CapturingRow1,
    CapturingRow2,
}

impl ParseState {
    fn next(self) -> ParseState {
        match self {
            ParseState::Scanning => ParseState::Scanning,
            ParseState::CapturingRow1 => ParseState::CapturingRow2,
            ParseState::CapturingRow2 => ParseState::Scanning,
        }
    }
}

/// Parse the complete output of one step.
///
/// A separator line (re)starts capture of the next two rows. End of input in
/// the middle of a capture is not an error.
pub fn parse_output(text: &str) -> ParsedOutput {
    let mut parsed = ParsedOutput::default();
    let mut state = ParseState::Scanning;
    let mut human = None;
    let mut exact_bytes = None;

    for line in text.lines() {
        if human.is_none() {
            human = info_value(line, MEMORY_KEY).map(str::to_string);
        }
        if exact_bytes.is_none() {
            exact_bytes = info_value(line, MEMORY_BYTES_KEY).and_then(|v| v.parse::<u64>().ok());
        }

        if line.contains(TABLE_SEPARATOR) {
            state = ParseState::CapturingRow1;
            continue;
        }

        if state == ParseState::Scanning {
            continue;
        }
        if !line.contains(TOTALS_MARKER) {
            match parse_row(line) {
                Ok((label, value)) => {
                    parsed.metrics.insert(label, value);
                }
                Err(err) => parsed.errors.push(err),
            }
        }
        state = state.next();
    }

    parsed.memory = human.map(|human| MemoryReading {
        bytes: exact_bytes.or_else(|| parse_human_bytes(&human)),
        human,
    });
    parsed
}

/// Value of an `INFO` line `key:value`. The key must match exactly, so
/// `used_memory` does not pick up `used_memory_human` or `used_memory_rss`.
fn info_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (name, value) = line.trim().split_once(':')?;
    (name == key).then(|| value.trim())
}

/// Split a table row into its label and the truncated integer in the second
/// column.
pub fn parse_row(line: &str) -> Result<(String, i64), BenchError> {
    let row = line.trim();
    let mut tokens = row.split_whitespace();
    let malformed = |reason: &str| BenchError::ParseError {
        row: row.to_string(),
        reason: reason.to_string(),
    };

    let label = tokens.next().ok_or_else(|| malformed("empty row"))?;
    let raw = tokens.next().ok_or_else(|| malformed("missing value column"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| malformed(&format!("'{raw}' is not a number")))?;
    if !value.is_finite() {
        return Err(malformed(&format!("'{raw}' is not finite")));
    }
    Ok((label.to_string(), value.trunc() as i64))
}

/// Decode the server's human-readable sizes (`800B`, `1.5K`, `2.03M`, ...),
/// which use powers of 1024.
pub fn parse_human_bytes(human: &str) -> Option<u64> {
    let human = human.trim();
    let split = human
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(human.len());
    let (number, suffix) = human.split_at(split);
    let number: f64 = number.parse().ok()?;
    let exponent = match suffix.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" => 1,
        "M" => 2,
        "G" => 3,
        "T" => 4,
        "P" => 5,
        _ => return None,
    };
    Some((number * 1024f64.powi(exponent)).round() as u64)
}
