//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{GaugeError, Result};
use crate::core::units::parse_size;

/// Full gauge configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base directory for relative category paths.
    pub root_dir: PathBuf,
    /// Soft usage limit as a size string (`"0.5 GB"`). A value that parses
    /// to zero bytes disables the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    pub probe: ProbeConfig,
    pub journal: JournalConfig,
    pub categories: Vec<CategoryConfig>,
    /// File this configuration was loaded from; `None` when built-in
    /// defaults were used.
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

/// Measurement strategy and traversal constraints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    pub strategy: ProbeStrategy,
    pub parallelism: usize,
    pub follow_symlinks: bool,
    pub max_depth: usize,
}

/// How a single path is turned into a byte count.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStrategy {
    /// Native recursive traversal summing regular-file lengths.
    #[default]
    Walk,
    /// Shell out to `du -sB1` and parse its summary line.
    Du,
}

impl ProbeStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Du => "du",
        }
    }
}

/// Activity journal settings (JSONL, size-rotated).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub max_size_bytes: u64,
    pub max_rotated_files: usize,
}

/// One named category: a label over zero or more measured paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Names of categories this one is a declared superset of. At most one
    /// category in the catalog may declare containment.
    #[serde(default)]
    pub encloses: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            limit: Some("0.5 GB".to_string()),
            probe: ProbeConfig::default(),
            journal: JournalConfig::default(),
            categories: default_categories(),
            config_file: None,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strategy: ProbeStrategy::Walk,
            parallelism: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
            follow_symlinks: false,
            max_depth: 64,
        }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[SGAUGE-CONFIG] WARNING: HOME not set, falling back to /tmp for journal path"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let data_dir = home_dir.join(".local").join("share").join("sgauge");
        Self {
            enabled: true,
            path: data_dir.join("activity.jsonl"),
            max_size_bytes: 10 * 1024 * 1024,
            max_rotated_files: 3,
        }
    }
}

/// The stock catalog: uploaded assets, build/cache artifacts, installed
/// plugins, and a `total` category enclosing the other three.
fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig {
            name: "assets".to_string(),
            paths: vec![PathBuf::from("data/assets")],
            encloses: Vec::new(),
        },
        CategoryConfig {
            name: "cache".to_string(),
            paths: vec![PathBuf::from("data/tmp"), PathBuf::from("build")],
            encloses: Vec::new(),
        },
        CategoryConfig {
            name: "plugins".to_string(),
            paths: vec![PathBuf::from("plugins")],
            encloses: Vec::new(),
        },
        CategoryConfig {
            name: "total".to_string(),
            paths: vec![PathBuf::from(".")],
            encloses: vec![
                "assets".to_string(),
                "cache".to_string(),
                "plugins".to_string(),
            ],
        },
    ]
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("sgauge").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();
        let file_exists = path_buf.exists();

        let mut cfg = if file_exists {
            let raw = fs::read_to_string(&path_buf).map_err(|source| GaugeError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(GaugeError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = file_exists.then_some(path_buf);
        cfg.apply_env_overrides()?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|error| GaugeError::Serialization {
            context: "config",
            details: error.to_string(),
        })
    }

    /// Deterministic hash of the effective config for journal correlation.
    ///
    /// FNV-1a over the canonical JSON form; stable across processes and
    /// Rust releases.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(env_var)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("SGAUGE_ROOT_DIR") {
            self.root_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SGAUGE_LIMIT") {
            self.limit = Some(raw);
        }
        if let Some(raw) = lookup("SGAUGE_PROBE_STRATEGY") {
            self.probe.strategy = parse_env_strategy("SGAUGE_PROBE_STRATEGY", &raw)?;
        }
        if let Some(raw) = lookup("SGAUGE_PROBE_PARALLELISM") {
            self.probe.parallelism = parse_env_usize("SGAUGE_PROBE_PARALLELISM", &raw)?;
        }
        if let Some(raw) = lookup("SGAUGE_PROBE_FOLLOW_SYMLINKS") {
            self.probe.follow_symlinks = parse_env_bool("SGAUGE_PROBE_FOLLOW_SYMLINKS", &raw)?;
        }
        if let Some(raw) = lookup("SGAUGE_PROBE_MAX_DEPTH") {
            self.probe.max_depth = parse_env_usize("SGAUGE_PROBE_MAX_DEPTH", &raw)?;
        }
        if let Some(raw) = lookup("SGAUGE_JOURNAL_ENABLED") {
            self.journal.enabled = parse_env_bool("SGAUGE_JOURNAL_ENABLED", &raw)?;
        }
        if let Some(raw) = lookup("SGAUGE_JOURNAL_PATH") {
            self.journal.path = PathBuf::from(raw);
        }
        Ok(())
    }

    /// Normalize paths for consistent comparison.
    fn normalize_paths(&mut self) {
        strip_trailing_slash(&mut self.root_dir);
        for category in &mut self.categories {
            for path in &mut category.paths {
                strip_trailing_slash(path);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.probe.parallelism == 0 {
            return Err(GaugeError::InvalidConfig {
                details: "probe.parallelism must be >= 1".to_string(),
            });
        }
        if self.probe.max_depth == 0 {
            return Err(GaugeError::InvalidConfig {
                details: "probe.max_depth must be >= 1".to_string(),
            });
        }

        if self.journal.max_size_bytes == 0 {
            return Err(GaugeError::InvalidConfig {
                details: "journal.max_size_bytes must be > 0".to_string(),
            });
        }
        if self.journal.max_rotated_files == 0 {
            return Err(GaugeError::InvalidConfig {
                details: "journal.max_rotated_files must be >= 1".to_string(),
            });
        }

        // An unparsable limit is fatal here; a limit of zero bytes is legal
        // and means "no limit" downstream.
        if let Some(raw) = &self.limit {
            parse_size(raw)?;
        }

        if self.categories.is_empty() {
            return Err(GaugeError::InvalidConfig {
                details: "at least one [[categories]] entry is required".to_string(),
            });
        }

        Ok(())
    }
}

fn strip_trailing_slash(path: &mut PathBuf) {
    let s = path.to_string_lossy();
    if s.len() > 1
        && let Some(stripped) = s.strip_suffix('/')
    {
        *path = PathBuf::from(stripped);
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_strategy(name: &str, raw: &str) -> Result<ProbeStrategy> {
    match raw.to_ascii_lowercase().as_str() {
        "walk" => Ok(ProbeStrategy::Walk),
        "du" => Ok(ProbeStrategy::Du),
        _ => Err(GaugeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: expected \"walk\" or \"du\""),
        }),
    }
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.parse::<usize>()
        .map_err(|error| GaugeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.parse::<bool>().map_err(|error| GaugeError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
