//! Parsing of human-readable byte sizes.
//!
//! Broker capacity limits arrive as strings like `"4Gb"` or `"400 KB"`.
//! Parsing is total: malformed input degrades to zero rather than failing,
//! so a bad configuration value disables size limits instead of crashing
//! the agent.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

// A decimal number, optional whitespace, then whatever remains as the
// unit token. Compiled once; the pattern is a constant.
static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let re = Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*(\S*)\s*$");
    re.expect("valid size regex")
});

/// Parses a human-readable size string into a number of bytes.
///
/// Units are binary (base 1024) whether or not they carry an explicit
/// `i`: `KB` and `KiB` both denote 1024 bytes. Recognized prefixes are
/// `B`, `K`, `M` and `G`, case-insensitive. A bare number is taken as a
/// raw byte count, as is a number followed by an unrecognized unit.
/// Input without a leading number yields 0. Fractional values round to
/// the nearest byte.
#[must_use]
pub fn parse_to_bytes(text: &str) -> u64 {
    let Some(caps) = SIZE_RE.captures(text) else {
        debug!("unparseable size string {text:?}, treating as 0 bytes");
        return 0;
    };

    let value: f64 = match caps[1].parse() {
        Ok(v) => v,
        Err(_) => return 0,
    };

    let multiplier = unit_multiplier(&caps[2]).unwrap_or_else(|| {
        if !caps[2].is_empty() {
            debug!("unrecognized size unit {:?}, using raw byte count", &caps[2]);
        }
        1
    });

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bytes = (value * multiplier as f64).round() as u64;
    bytes
}

/// Resolves a unit token to its byte multiplier, if recognized.
fn unit_multiplier(unit: &str) -> Option<u64> {
    let unit = unit.to_ascii_lowercase();
    if unit.is_empty() || unit == "b" {
        return Some(1);
    }

    let mut chars = unit.chars();
    let prefix = chars.next()?;
    let rest = chars.as_str();
    if !matches!(rest, "" | "b" | "ib") {
        return None;
    }

    match prefix {
        'k' => Some(1 << 10),
        'm' => Some(1 << 20),
        'g' => Some(1 << 30),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bytes() {
        assert_eq!(parse_to_bytes("1024B"), 1024);
        assert_eq!(parse_to_bytes("1024"), 1024);
    }

    #[test]
    fn test_binary_units() {
        assert_eq!(parse_to_bytes("400 KB"), 409_600);
        assert_eq!(parse_to_bytes("10.5Mib"), 11_010_048);
        assert_eq!(parse_to_bytes("10.5Mb"), 11_010_048);
        assert_eq!(parse_to_bytes("4Gb"), 4_294_967_296);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(parse_to_bytes("4gb"), parse_to_bytes("4GB"));
        assert_eq!(parse_to_bytes("1k"), 1024);
        assert_eq!(parse_to_bytes("1KiB"), 1024);
    }

    #[test]
    fn test_unrecognized_unit_falls_back_to_raw_number() {
        assert_eq!(parse_to_bytes("35 XYZ"), 35);
        assert_eq!(parse_to_bytes("12quux"), 12);
    }

    #[test]
    fn test_missing_number_yields_zero() {
        assert_eq!(parse_to_bytes("MB"), 0);
        assert_eq!(parse_to_bytes("OnlyUnits"), 0);
        assert_eq!(parse_to_bytes(""), 0);
        assert_eq!(parse_to_bytes("   "), 0);
    }
}
