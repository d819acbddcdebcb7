//! Path measurement capability.
//!
//! `PathMeasurer` is the seam between aggregation and the filesystem: the
//! aggregator fans out over it, tests substitute [`StaticMeasurer`], and the
//! two production strategies live in [`walk`] and [`du`]. A measurer answers
//! one question only: how many bytes does this path hold right now.

pub mod du;
pub mod walk;

pub use du::DuMeasurer;
pub use walk::{WalkMeasurer, WalkOptions};

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::config::{ProbeConfig, ProbeStrategy};
use crate::core::errors::{GaugeError, Result};

/// Capability for turning one filesystem path into a byte count.
///
/// Implementations must be callable from multiple worker threads at once.
/// Measuring a missing or unreadable path is an error, never a silent zero;
/// the aggregator decides what a failure means for the report.
pub trait PathMeasurer: Send + Sync {
    /// Measure the total apparent size of `path` in bytes.
    fn measure(&self, path: &Path) -> Result<u64>;
}

/// Build the measurer selected by configuration.
#[must_use]
pub fn measurer_from_config(probe: &ProbeConfig) -> Arc<dyn PathMeasurer> {
    match probe.strategy {
        ProbeStrategy::Walk => Arc::new(WalkMeasurer::new(WalkOptions {
            follow_symlinks: probe.follow_symlinks,
            max_depth: probe.max_depth,
        })),
        ProbeStrategy::Du => Arc::new(DuMeasurer::new()),
    }
}

/// Deterministic in-memory measurer for tests and demos.
///
/// Known paths return their mapped size; unknown paths fail with a
/// measurement error, which makes failure-policy behavior testable without
/// touching a real filesystem. A call counter records fan-out.
#[derive(Debug, Default)]
pub struct StaticMeasurer {
    sizes: HashMap<PathBuf, u64>,
    calls: AtomicUsize,
}

impl StaticMeasurer {
    /// Build a measurer over a fixed path-to-size map.
    #[must_use]
    pub fn new<I, P>(sizes: I) -> Self
    where
        I: IntoIterator<Item = (P, u64)>,
        P: Into<PathBuf>,
    {
        Self {
            sizes: sizes
                .into_iter()
                .map(|(path, bytes)| (path.into(), bytes))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `measure` calls observed so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl PathMeasurer for StaticMeasurer {
    fn measure(&self, path: &Path) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.sizes
            .get(path)
            .copied()
            .ok_or_else(|| GaugeError::measurement(path, "path not present in static size map"))
    }
}
