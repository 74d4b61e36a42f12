//! Name, purpose and size heuristics applied to every listed file.

use crate::types::{FileEntry, FilePurpose, Rule};
use thiserror::Error;

/// server.jar files smaller than this are treated as disguised payloads.
pub const SERVER_JAR_MIN_BYTES: u64 = 18 * 1024 * 1024;

const MINER_NAME: &str = "xmrig";
const SERVER_JAR_NAME: &str = "server.jar";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("size is empty")]
    Empty,
    #[error("unknown size unit in '{0}'")]
    UnknownUnit(String),
    #[error("invalid size magnitude in '{0}'")]
    InvalidMagnitude(String),
}

/// Parse a listing size such as `2MB`, `512KB` or `100B` into bytes.
pub fn parse_size(raw: &str) -> Result<u64, SizeParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SizeParseError::Empty);
    }

    // Longest suffix first: every unit ends with "B".
    let (magnitude, multiplier) = if let Some(m) = trimmed.strip_suffix("MB") {
        (m, 1024.0 * 1024.0)
    } else if let Some(m) = trimmed.strip_suffix("KB") {
        (m, 1024.0)
    } else if let Some(m) = trimmed.strip_suffix('B') {
        // "5GB" or "1TB": a unit prefix we do not know.
        if m.ends_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(SizeParseError::UnknownUnit(raw.to_string()));
        }
        (m, 1.0)
    } else {
        return Err(SizeParseError::UnknownUnit(raw.to_string()));
    };

    let magnitude = magnitude.trim();
    if magnitude.is_empty() {
        return Err(SizeParseError::InvalidMagnitude(raw.to_string()));
    }

    let value: f64 = magnitude
        .parse()
        .map_err(|_| SizeParseError::InvalidMagnitude(raw.to_string()))?;

    if !value.is_finite() || value < 0.0 {
        return Err(SizeParseError::InvalidMagnitude(raw.to_string()));
    }

    Ok((value * multiplier) as u64)
}

/// Classify one entry. Rules are checked in order and the first match wins.
///
/// An `Err` is only produced by the size rule, which runs last, so a bad size
/// never hides a match from the other rules.
pub fn classify(entry: &FileEntry) -> Result<Option<Rule>, SizeParseError> {
    if entry.purpose == FilePurpose::Script {
        return Ok(Some(Rule::SuspiciousScript));
    }

    if entry.name == MINER_NAME {
        return Ok(Some(Rule::MoneroMiner));
    }

    if entry.name == SERVER_JAR_NAME {
        let bytes = parse_size(&entry.size)?;
        if bytes < SERVER_JAR_MIN_BYTES {
            return Ok(Some(Rule::UndersizedServerJar));
        }
    }

    Ok(None)
}
