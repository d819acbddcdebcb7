//! The gauge engine: one façade over catalog, probe and report assembly.

use std::sync::Arc;

use crate::catalog::CategoryCatalog;
use crate::core::config::Config;
use crate::core::errors::Result;
use crate::core::units::parse_size;
use crate::probe::{PathMeasurer, measurer_from_config};
use crate::report::aggregator::{ExternalFigures, UsageAggregator};
use crate::report::builder::{Report, ReportBuilder};

/// Produces usage reports on demand. Holds no cached state; every
/// [`produce_report`](GaugeEngine::produce_report) call measures afresh.
pub struct GaugeEngine {
    catalog: CategoryCatalog,
    limit: Option<u64>,
    aggregator: UsageAggregator,
}

impl GaugeEngine {
    /// A limit of zero bytes disables the limit.
    #[must_use]
    pub fn new(
        catalog: CategoryCatalog,
        limit: Option<u64>,
        measurer: Arc<dyn PathMeasurer>,
        parallelism: usize,
    ) -> Self {
        Self {
            catalog,
            limit: limit.filter(|&bytes| bytes > 0),
            aggregator: UsageAggregator::new(measurer, parallelism),
        }
    }

    /// Build an engine from a validated [`Config`].
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = CategoryCatalog::from_config(config)?;
        let limit = config
            .limit
            .as_deref()
            .map(parse_size)
            .transpose()?
            .filter(|&bytes| bytes > 0);
        let measurer = measurer_from_config(&config.probe);
        Ok(Self::new(catalog, limit, measurer, config.probe.parallelism))
    }

    /// Measure every category and assemble a fresh report.
    pub fn produce_report(&self, external: &ExternalFigures) -> Result<Report> {
        let usage = self.aggregator.aggregate(&self.catalog, external)?;
        Ok(ReportBuilder::new(self.limit).build(usage))
    }

    /// The validated catalog the engine measures against.
    #[must_use]
    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    /// The effective byte limit, if one is configured.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::catalog::Category;
    use crate::probe::StaticMeasurer;

    fn cat(name: &str, paths: &[&str], encloses: &[&str]) -> Category {
        Category {
            name: name.to_string(),
            paths: paths.iter().map(PathBuf::from).collect(),
            encloses: encloses.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn default_config_carries_a_half_gigabyte_limit() {
        let engine = GaugeEngine::from_config(&Config::default()).expect("engine builds");
        assert_eq!(engine.limit(), Some(536_870_912));
    }

    #[test]
    fn zero_limit_string_disables_the_limit() {
        let config = Config {
            limit: Some("0".to_string()),
            ..Config::default()
        };
        let engine = GaugeEngine::from_config(&config).expect("engine builds");
        assert_eq!(engine.limit(), None);
    }

    #[test]
    fn unparsable_limit_is_a_size_parse_error() {
        let config = Config {
            limit: Some("lots".to_string()),
            ..Config::default()
        };
        let err = GaugeEngine::from_config(&config)
            .err()
            .expect("limit should not parse");
        assert_eq!(err.code(), "SG-1004");
    }

    #[test]
    fn catalog_violations_surface_from_construction() {
        let config = Config {
            categories: vec![],
            ..Config::default()
        };
        let err = GaugeEngine::from_config(&config)
            .err()
            .expect("empty catalog should fail");
        assert!(err.is_configuration());
    }

    #[test]
    fn produce_report_runs_the_full_pipeline() {
        let catalog = CategoryCatalog::new(vec![
            cat("assets", &["/srv/assets"], &[]),
            cat("total", &["/srv"], &["assets"]),
        ])
        .expect("catalog builds");
        let measurer = Arc::new(StaticMeasurer::new([("/srv/assets", 100u64), ("/srv", 400)]));
        let engine = GaugeEngine::new(catalog, Some(1_000), measurer, 2);

        let report = engine
            .produce_report(&ExternalFigures::new())
            .expect("report builds");

        assert_eq!(report.get("assets").expect("assets").raw, 100);
        assert_eq!(report.get("total").expect("total").percent_of_limit, Some(40));
        assert_eq!(report.get("system").expect("system").raw, 300);
        assert_eq!(report.get("free").expect("free").raw, 600);
        assert_eq!(report.get("limit").expect("limit").raw, 1_000);
        assert!(!report.generated_at.is_empty());
    }
}
