//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use storage_gauge::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{GaugeError, Result};
pub use crate::core::units::{format_size, format_size_opt, parse_size};

// Catalog
pub use crate::catalog::{Category, CategoryCatalog};

// Probe
pub use crate::probe::{
    DuMeasurer, PathMeasurer, StaticMeasurer, WalkMeasurer, WalkOptions, measurer_from_config,
};

// Report
pub use crate::report::aggregator::{
    ExternalFigures, MeasuredFigure, ProbeFailure, RawUsage, UsageAggregator,
};
pub use crate::report::builder::{Report, ReportBuilder, UsageFigure};
pub use crate::report::engine::GaugeEngine;

// Journal
pub use crate::journal::jsonl::{JournalEntry, JournalEvent, JournalWriter, Severity};
