//! Report assembly: raw usage in, presentation-ready figures out.
//!
//! The builder is the only component that knows about the configured size
//! limit. It attaches a rounded percent-of-limit to every figure, emits the
//! synthetic `limit` entry, and derives `free` while usage stays within the
//! limit. When usage exceeds the limit, `free` is simply absent from the
//! report rather than clamped or negative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::units::format_size;
use crate::report::aggregator::{ProbeFailure, RawUsage};

/// One labelled report entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageFigure {
    /// Exact byte count.
    pub raw: u64,
    /// Human-readable rendering of `raw`.
    pub formatted: String,
    /// Rounded percentage of the configured limit; absent when no limit is
    /// configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_of_limit: Option<u64>,
    /// Set when at least one path behind this figure failed to measure and
    /// the byte count is therefore an undercount.
    #[serde(default, skip_serializing_if = "is_false")]
    pub partial: bool,
}

/// A complete usage report, ready for serialization or rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    /// RFC 3339 UTC timestamp of the aggregation pass.
    pub generated_at: String,
    /// Figures keyed by label: categories, external figures, and the
    /// derived `system`, `limit` and `free` entries.
    pub entries: BTreeMap<String, UsageFigure>,
    /// Set when the enclosed categories summed past the root and the derived
    /// `system` figure was clamped to zero.
    #[serde(default, skip_serializing_if = "is_false")]
    pub system_clamped: bool,
    /// Per-path probe failures collected during aggregation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProbeFailure>,
}

impl Report {
    /// Look up a figure by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&UsageFigure> {
        self.entries.get(label)
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Turns a [`RawUsage`] snapshot into a [`Report`].
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder {
    limit: Option<u64>,
}

impl ReportBuilder {
    /// A zero-byte limit counts as no limit at all.
    #[must_use]
    pub fn new(limit: Option<u64>) -> Self {
        Self {
            limit: limit.filter(|&bytes| bytes > 0),
        }
    }

    /// Renders `usage` into labelled figures, adding `limit` and `free`
    /// entries when a limit is configured.
    #[must_use]
    pub fn build(&self, usage: RawUsage) -> Report {
        let mut entries = BTreeMap::new();

        for (name, figure) in &usage.categories {
            entries.insert(name.clone(), self.figure(figure.bytes, figure.partial));
        }
        for (label, bytes) in &usage.external {
            entries.insert(label.clone(), self.figure(*bytes, false));
        }
        if let Some(system) = usage.system {
            entries.insert("system".to_string(), self.figure(system.bytes, system.partial));
        }

        if let Some(limit) = self.limit {
            entries.insert(
                "limit".to_string(),
                UsageFigure {
                    raw: limit,
                    formatted: format_size(limit),
                    percent_of_limit: Some(100),
                    partial: false,
                },
            );
            // free = limit - total, defined only while within the limit.
            if let Some(root) = usage.root.as_deref()
                && let Some((_, total)) = usage.categories.iter().find(|(name, _)| name == root)
                && total.bytes <= limit
            {
                entries.insert(
                    "free".to_string(),
                    self.figure(limit - total.bytes, total.partial),
                );
            }
        }

        Report {
            generated_at: format_utc_now(),
            entries,
            system_clamped: usage.system_clamped,
            failures: usage.failures,
        }
    }

    fn figure(&self, raw: u64, partial: bool) -> UsageFigure {
        UsageFigure {
            raw,
            formatted: format_size(raw),
            percent_of_limit: self.limit.map(|limit| percent_of(raw, limit)),
            partial,
        }
    }
}

/// Integer round-half-up of `raw / limit * 100`, saturating at `u64::MAX`.
fn percent_of(raw: u64, limit: u64) -> u64 {
    let percent = (u128::from(raw) * 100 + u128::from(limit) / 2) / u128::from(limit);
    u64::try_from(percent).unwrap_or(u64::MAX)
}
