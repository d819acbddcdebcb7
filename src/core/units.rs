//! Byte-size formatting and parsing.
//!
//! Formatting picks the largest power-of-1024 unit that keeps the displayed
//! magnitude at 1 or above, with a single space between number and unit
//! (`"1.5 GB"`). Parsing accepts the same grammar the config file uses for
//! the soft limit (`"0.5GB"`, `"500 MB"`, `"1048576"`), case-insensitive.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::errors::{GaugeError, Result};

/// Canonical KB→bytes multiplier.
pub const BYTES_PER_KB: u64 = 1024;

/// Canonical MB→bytes multiplier (1024 * KB).
pub const BYTES_PER_MB: u64 = 1024 * BYTES_PER_KB;

/// Canonical GB→bytes multiplier (1024 * MB).
pub const BYTES_PER_GB: u64 = 1024 * BYTES_PER_MB;

/// Canonical TB→bytes multiplier (1024 * GB).
pub const BYTES_PER_TB: u64 = 1024 * BYTES_PER_GB;

/// Canonical PB→bytes multiplier (1024 * TB).
pub const BYTES_PER_PB: u64 = 1024 * BYTES_PER_TB;

/// Rendering of an absent figure (e.g. `free` when the total overruns the
/// limit). Callers get an explicit marker, never a sentinel number.
pub const UNAVAILABLE: &str = "unavailable";

/// Format a byte count as a human-readable, unit-scaled string.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    if bytes >= BYTES_PER_PB {
        format!("{:.1} PB", bytes as f64 / BYTES_PER_PB as f64)
    } else if bytes >= BYTES_PER_TB {
        format!("{:.1} TB", bytes as f64 / BYTES_PER_TB as f64)
    } else if bytes >= BYTES_PER_GB {
        format!("{:.1} GB", bytes as f64 / BYTES_PER_GB as f64)
    } else if bytes >= BYTES_PER_MB {
        format!("{:.1} MB", bytes as f64 / BYTES_PER_MB as f64)
    } else if bytes >= BYTES_PER_KB {
        format!("{:.1} KB", bytes as f64 / BYTES_PER_KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format an optional byte count; `None` renders as [`UNAVAILABLE`].
#[must_use]
pub fn format_size_opt(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| UNAVAILABLE.to_string(), format_size)
}

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*([0-9]+(?:\.[0-9]+)?)\s*(b|kb|mb|gb|tb|pb)?\s*$")
            .expect("size pattern is a valid regex")
    })
}

/// Parse a size string into whole bytes.
///
/// Units are 1024-based; a bare number is plain bytes. Fractional values are
/// floored (`"0.5GB"` → 536_870_912). Anything outside the grammar is an
/// `SG-1004` error carrying the offending input.
pub fn parse_size(input: &str) -> Result<u64> {
    let captures = size_pattern()
        .captures(input)
        .ok_or_else(|| GaugeError::SizeParse {
            input: input.to_string(),
        })?;

    let value: f64 = captures[1].parse().map_err(|_| GaugeError::SizeParse {
        input: input.to_string(),
    })?;
    let multiplier = match captures.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        None => 1,
        Some(unit) => match unit.as_str() {
            "b" => 1,
            "kb" => BYTES_PER_KB,
            "mb" => BYTES_PER_MB,
            "gb" => BYTES_PER_GB,
            "tb" => BYTES_PER_TB,
            "pb" => BYTES_PER_PB,
            _ => {
                return Err(GaugeError::SizeParse {
                    input: input.to_string(),
                });
            }
        },
    };

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok((value * multiplier as f64).floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn format_picks_largest_unit_with_magnitude_at_least_one() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * BYTES_PER_MB), "5.0 MB");
        assert_eq!(format_size(BYTES_PER_GB + BYTES_PER_GB / 2), "1.5 GB");
        assert_eq!(format_size(2 * BYTES_PER_TB), "2.0 TB");
        assert_eq!(format_size(3 * BYTES_PER_PB), "3.0 PB");
    }

    #[test]
    fn format_uses_single_space_separator() {
        for bytes in [0, 999, 2048, 3 * BYTES_PER_GB] {
            let formatted = format_size(bytes);
            let parts: Vec<&str> = formatted.split(' ').collect();
            assert_eq!(parts.len(), 2, "expected `<number> <unit>`: {formatted:?}");
        }
    }

    #[test]
    fn format_opt_handles_absent_values() {
        assert_eq!(format_size_opt(None), "unavailable");
        assert_eq!(format_size_opt(Some(0)), "0 B");
        assert_eq!(format_size_opt(Some(1024)), "1.0 KB");
    }

    #[test]
    fn parse_accepts_the_original_default_limit() {
        assert_eq!(parse_size("0.5GB").unwrap(), 536_870_912);
    }

    #[test]
    fn parse_grammar_table() {
        assert_eq!(parse_size("0").unwrap(), 0);
        assert_eq!(parse_size("1048576").unwrap(), 1_048_576);
        assert_eq!(parse_size("100 b").unwrap(), 100);
        assert_eq!(parse_size("1kb").unwrap(), 1024);
        assert_eq!(parse_size("1.5 KB").unwrap(), 1536);
        assert_eq!(parse_size("500 MB").unwrap(), 500 * BYTES_PER_MB);
        assert_eq!(parse_size("2tb").unwrap(), 2 * BYTES_PER_TB);
        assert_eq!(parse_size(" 1 PB ").unwrap(), BYTES_PER_PB);
    }

    #[test]
    fn parse_floors_fractional_bytes() {
        assert_eq!(parse_size("12.9").unwrap(), 12);
        assert_eq!(parse_size("1.0001 KB").unwrap(), 1024);
    }

    #[test]
    fn parse_rejects_out_of_grammar_inputs() {
        for bad in ["", "  ", "GB", "-1MB", "1.5.2 KB", "12 XB", "lots"] {
            let err = parse_size(bad).expect_err("should reject");
            assert_eq!(err.code(), "SG-1004", "input {bad:?}");
        }
    }

    /// Split `"<number> <unit>"` back into an absolute byte magnitude.
    fn normalized_magnitude(formatted: &str) -> f64 {
        let (number, unit) = formatted
            .split_once(' ')
            .expect("formatted output has one space");
        let value: f64 = number.parse().expect("numeric part parses");
        let multiplier = match unit {
            "B" => 1u64,
            "KB" => BYTES_PER_KB,
            "MB" => BYTES_PER_MB,
            "GB" => BYTES_PER_GB,
            "TB" => BYTES_PER_TB,
            "PB" => BYTES_PER_PB,
            other => panic!("unexpected unit {other:?}"),
        };
        #[allow(clippy::cast_precision_loss)]
        {
            value * multiplier as f64
        }
    }

    proptest! {
        #[test]
        fn formatting_is_monotonic_after_unit_normalization(a in any::<u64>(), b in any::<u64>()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let lo_mag = normalized_magnitude(&format_size(lo));
            let hi_mag = normalized_magnitude(&format_size(hi));
            prop_assert!(
                lo_mag <= hi_mag,
                "format({lo}) -> {lo_mag} exceeds format({hi}) -> {hi_mag}"
            );
        }

        #[test]
        fn formatting_never_panics_and_always_has_a_unit(bytes in any::<u64>()) {
            let formatted = format_size(bytes);
            prop_assert!(formatted.ends_with('B'));
            prop_assert!(formatted.contains(' '));
        }
    }
}
