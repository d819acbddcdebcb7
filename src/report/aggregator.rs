//! Parallel usage aggregation over the category catalog.
//!
//! Every (category, path) pair becomes one probe job; jobs fan out over a
//! bounded work channel to a small pool of measurer threads and the
//! aggregator blocks until the full snapshot is back. One aggregation pass
//! yields one coherent `RawUsage`; there is no caching and no retry.
//!
//! Failure policy, applied uniformly to every category: a failing path
//! contributes zero bytes, the owning category is marked `partial`, and a
//! [`ProbeFailure`] record is kept. `aggregate` returns `Err` only for
//! engine-internal faults, never for a path that would not measure.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel as channel;
use serde::{Deserialize, Serialize};

use crate::catalog::{CategoryCatalog, RESERVED_LABELS};
use crate::core::errors::{GaugeError, Result};
use crate::probe::PathMeasurer;

/// One failed path probe, preserved on the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeFailure {
    /// Category the failing path belongs to.
    pub category: String,
    /// The path that could not be measured.
    pub path: PathBuf,
    /// Probe error text, suitable for display.
    pub detail: String,
}

/// Measured bytes for one label plus its partial-failure marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeasuredFigure {
    /// Summed bytes across the label's paths.
    pub bytes: u64,
    /// Set when at least one path failed and `bytes` is an undercount.
    pub partial: bool,
}

/// Opaque figures supplied by the caller, e.g. a database size measured by
/// some other subsystem. Merged into the report unmeasured and unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalFigures(BTreeMap<String, u64>);

impl ExternalFigures {
    /// An empty figure set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a labelled figure.
    pub fn insert(&mut self, label: impl Into<String>, bytes: u64) {
        self.0.insert(label.into(), bytes);
    }

    /// Figures in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(label, bytes)| (label.as_str(), *bytes))
    }

    /// Number of figures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set holds no figures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u64)> for ExternalFigures {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(label, bytes)| (label.into(), bytes))
                .collect(),
        )
    }
}

/// One complete measurement snapshot, before presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawUsage {
    /// Measured figures in catalog declaration order.
    pub categories: Vec<(String, MeasuredFigure)>,
    /// Name of the enclosing category, when the catalog declares one.
    pub root: Option<String>,
    /// Derived unaccounted remainder: root bytes minus the sum of the
    /// declared-enclosed categories. Present only when a root exists.
    pub system: Option<MeasuredFigure>,
    /// Set when the enclosed sum exceeded the root and `system` was clamped
    /// to zero (overlapping paths double-subtracted).
    pub system_clamped: bool,
    /// Caller-supplied figures, passed through untouched.
    pub external: Vec<(String, u64)>,
    /// Every path probe that failed during this pass.
    pub failures: Vec<ProbeFailure>,
}

type ProbeJob = (usize, PathBuf);
type ProbeOutcome = (usize, PathBuf, Result<u64>);

/// Fans out path probes and folds them into a [`RawUsage`] snapshot.
pub struct UsageAggregator {
    measurer: Arc<dyn PathMeasurer>,
    parallelism: usize,
}

impl UsageAggregator {
    /// A `parallelism` of zero is treated as one worker.
    #[must_use]
    pub fn new(measurer: Arc<dyn PathMeasurer>, parallelism: usize) -> Self {
        Self {
            measurer,
            parallelism: parallelism.max(1),
        }
    }

    /// Measure every category once and derive the synthetic figures.
    pub fn aggregate(
        &self,
        catalog: &CategoryCatalog,
        external: &ExternalFigures,
    ) -> Result<RawUsage> {
        check_external_labels(catalog, external)?;

        let names: Vec<String> = catalog.names().map(ToString::to_string).collect();
        let jobs: Vec<ProbeJob> = catalog
            .iter()
            .enumerate()
            .flat_map(|(index, category)| {
                category.paths.iter().map(move |path| (index, path.clone()))
            })
            .collect();

        let mut figures = vec![MeasuredFigure::default(); names.len()];
        let mut failures = Vec::new();
        for (index, path, outcome) in self.fan_out(jobs)? {
            match outcome {
                Ok(bytes) => {
                    figures[index].bytes = figures[index].bytes.saturating_add(bytes);
                }
                Err(error) => {
                    figures[index].partial = true;
                    failures.push(ProbeFailure {
                        category: names[index].clone(),
                        path,
                        detail: match error {
                            GaugeError::Measurement { details, .. } => details,
                            other => other.to_string(),
                        },
                    });
                }
            }
        }

        let categories: Vec<(String, MeasuredFigure)> =
            names.into_iter().zip(figures).collect();
        let figure_of = |name: &str| {
            categories
                .iter()
                .find(|(label, _)| label == name)
                .map(|(_, figure)| *figure)
        };

        let mut system_clamped = false;
        let root = catalog.root();
        let system = root.map(|root| {
            let total = figure_of(&root.name).unwrap_or_default();
            let mut enclosed_sum: u64 = 0;
            let mut partial = total.partial;
            for name in &root.encloses {
                if let Some(figure) = figure_of(name) {
                    enclosed_sum = enclosed_sum.saturating_add(figure.bytes);
                    partial = partial || figure.partial;
                }
            }
            let bytes = if enclosed_sum > total.bytes {
                system_clamped = true;
                0
            } else {
                total.bytes - enclosed_sum
            };
            MeasuredFigure { bytes, partial }
        });

        Ok(RawUsage {
            categories,
            root: root.map(|category| category.name.clone()),
            system,
            system_clamped,
            external: external
                .iter()
                .map(|(label, bytes)| (label.to_string(), bytes))
                .collect(),
            failures,
        })
    }

    /// Run every job through the worker pool and collect all outcomes.
    fn fan_out(&self, jobs: Vec<ProbeJob>) -> Result<Vec<ProbeOutcome>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let expected = jobs.len();
        let workers = self.parallelism.min(expected);

        let (job_tx, job_rx) = channel::bounded::<ProbeJob>(expected);
        let (outcome_tx, outcome_rx) = channel::unbounded::<ProbeOutcome>();

        for job in jobs {
            job_tx.send(job).map_err(|_| GaugeError::ChannelClosed {
                component: "aggregator jobs",
            })?;
        }
        // Workers drain the queue and exit when it disconnects.
        drop(job_tx);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let outcome_tx = outcome_tx.clone();
            let measurer = Arc::clone(&self.measurer);
            handles.push(thread::spawn(move || {
                while let Ok((index, path)) = job_rx.recv() {
                    let outcome = measurer.measure(&path);
                    if outcome_tx.send((index, path, outcome)).is_err() {
                        return;
                    }
                }
            }));
        }
        drop(outcome_tx);
        drop(job_rx);

        let mut outcomes: Vec<ProbeOutcome> = outcome_rx.iter().collect();

        for handle in handles {
            if handle.join().is_err() {
                return Err(GaugeError::ChannelClosed {
                    component: "aggregator worker",
                });
            }
        }
        if outcomes.len() != expected {
            return Err(GaugeError::ChannelClosed {
                component: "aggregator results",
            });
        }

        // Deterministic fold order regardless of worker scheduling.
        outcomes.sort_by(|left, right| (left.0, &left.1).cmp(&(right.0, &right.1)));
        Ok(outcomes)
    }
}

/// External labels may not shadow a category or a derived report label.
fn check_external_labels(catalog: &CategoryCatalog, external: &ExternalFigures) -> Result<()> {
    for (label, _) in external.iter() {
        if RESERVED_LABELS.contains(&label) {
            return Err(GaugeError::InvalidConfig {
                details: format!("external figure label {label:?} is a derived report label"),
            });
        }
        if catalog.get(label).is_some() {
            return Err(GaugeError::InvalidConfig {
                details: format!("external figure label {label:?} collides with a category"),
            });
        }
    }
    Ok(())
}
