//! Category catalog: named labels over measured paths, with explicit
//! containment.
//!
//! A catalog is pure data built once at startup. Each category names zero or
//! more filesystem paths; at most one category (conventionally `total`) may
//! declare the set of categories it encloses, which is what makes the derived
//! `system` figure well defined. All structural defects are caught here, not
//! at measurement time.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::core::config::Config;
use crate::core::errors::{GaugeError, Result};
use crate::core::paths::{resolve_absolute_path, resolve_under};

/// Report labels the engine derives itself; categories may not shadow them.
pub const RESERVED_LABELS: [&str; 3] = ["limit", "system", "free"];

/// One named category over a set of measured paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Unique label; doubles as the report entry key.
    pub name: String,
    /// Absolute paths measured for this category. Overlap between paths is
    /// not deduplicated; each path contributes its full size.
    pub paths: Vec<PathBuf>,
    /// Names of the categories this one is a declared superset of. Empty for
    /// plain categories.
    pub encloses: Vec<String>,
}

/// Validated, read-only collection of categories.
#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
    root: Option<usize>,
}

impl CategoryCatalog {
    /// Build and validate a catalog. Every violation is a configuration
    /// error (`SG-1xxx`) carrying enough detail to fix the config file.
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        if categories.is_empty() {
            return Err(GaugeError::InvalidConfig {
                details: "at least one category is required".to_string(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(GaugeError::InvalidConfig {
                    details: "category name must not be empty".to_string(),
                });
            }
            if RESERVED_LABELS.contains(&category.name.as_str()) {
                return Err(GaugeError::InvalidConfig {
                    details: format!(
                        "category name {:?} is reserved for a derived report label",
                        category.name
                    ),
                });
            }
            if !seen.insert(category.name.as_str()) {
                return Err(GaugeError::InvalidConfig {
                    details: format!("duplicate category name {:?}", category.name),
                });
            }
        }

        let mut root: Option<usize> = None;
        for (index, category) in categories.iter().enumerate() {
            if category.encloses.is_empty() {
                continue;
            }
            if let Some(previous) = root {
                let previous_name: &str = &categories[previous].name;
                return Err(GaugeError::InvalidConfig {
                    details: format!(
                        "containment may be declared by at most one category; \
                         both {previous_name:?} and {:?} declare `encloses`",
                        category.name
                    ),
                });
            }
            root = Some(index);

            let mut enclosed: HashSet<&str> = HashSet::new();
            for target in &category.encloses {
                if target == &category.name {
                    return Err(GaugeError::InvalidConfig {
                        details: format!("category {:?} cannot enclose itself", category.name),
                    });
                }
                if !seen.contains(target.as_str()) {
                    return Err(GaugeError::UnknownCategory {
                        name: target.clone(),
                    });
                }
                if !enclosed.insert(target.as_str()) {
                    return Err(GaugeError::InvalidConfig {
                        details: format!(
                            "category {:?} encloses {target:?} more than once",
                            category.name
                        ),
                    });
                }
            }
        }

        Ok(Self { categories, root })
    }

    /// Build a catalog from configuration, resolving every category path
    /// against `root_dir`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let root_dir = resolve_absolute_path(&config.root_dir);
        let categories = config
            .categories
            .iter()
            .map(|category| Category {
                name: category.name.clone(),
                paths: category
                    .paths
                    .iter()
                    .map(|path| resolve_under(&root_dir, path))
                    .collect(),
                encloses: category.encloses.clone(),
            })
            .collect();
        Self::new(categories)
    }

    /// Category names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|category| category.name.as_str())
    }

    /// The measured paths of a category, `None` for an unknown name.
    #[must_use]
    pub fn paths(&self, name: &str) -> Option<&[PathBuf]> {
        self.get(name).map(|category| category.paths.as_slice())
    }

    /// Look up a category by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.name == name)
    }

    /// The category that declares containment, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Category> {
        self.root.map(|index| &self.categories[index])
    }

    /// Categories in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the catalog holds no categories. Never true for a catalog
    /// built through [`CategoryCatalog::new`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl<'a> IntoIterator for &'a CategoryCatalog {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}
