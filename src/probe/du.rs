//! `du`-backed path sizing.
//!
//! The measurement primitive the tool historically shelled out to. Kept as a
//! selectable strategy for parity checks against coreutils accounting; note
//! that `du` reports block usage, not apparent size, so its figures can
//! exceed what [`super::WalkMeasurer`] reports for the same tree.

use std::path::Path;
use std::process::Command;

use crate::core::errors::{GaugeError, Result};
use crate::probe::PathMeasurer;

/// Measures a path by spawning `du -sB1` and parsing the summary line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuMeasurer;

impl DuMeasurer {
    /// Build the `du`-backed measurer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PathMeasurer for DuMeasurer {
    fn measure(&self, path: &Path) -> Result<u64> {
        let output = Command::new("du")
            .arg("-sB1")
            .arg(path)
            .output()
            .map_err(|error| {
                GaugeError::measurement(path, format!("failed to spawn du: {error}"))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(GaugeError::measurement(
                path,
                format!(
                    "du exited with {}: {}",
                    output.status,
                    collate_output(&stdout, &stderr)
                ),
            ));
        }

        parse_du_total(&stdout).ok_or_else(|| {
            GaugeError::measurement(
                path,
                format!("unparsable du output: {}", collate_output(&stdout, &stderr)),
            )
        })
    }
}

/// Join trimmed stdout and stderr into one diagnostic line.
fn collate_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    match (stdout.is_empty(), stderr.is_empty()) {
        (true, true) => "(no output)".to_string(),
        (false, true) => stdout.to_string(),
        (true, false) => stderr.to_string(),
        (false, false) => format!("{stdout} | {stderr}"),
    }
}

/// Extract the byte count from the last non-empty line of `du` output.
fn parse_du_total(stdout: &str) -> Option<u64> {
    let line = stdout.lines().rev().find(|line| !line.trim().is_empty())?;
    line.split_whitespace().next()?.parse().ok()
}
