//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a path to an absolute, normalized path.
///
/// If `fs::canonicalize` succeeds (path exists), it is used to resolve
/// symlinks and normalize components. If it fails (e.g. path does not exist
/// yet), the path is made absolute relative to CWD and `..`/`.` components
/// are resolved syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    canonicalize_or_normalize(&absolute)
}

/// Resolve a category path against the configured root directory.
///
/// Absolute paths are taken as-is; relative paths are anchored under `root`.
/// Either way the result is normalized like [`resolve_absolute_path`].
pub fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };
    canonicalize_or_normalize(&absolute)
}

fn canonicalize_or_normalize(absolute: &Path) -> PathBuf {
    // Filesystem resolution first (handles symlinks).
    if let Ok(canonical) = std::fs::canonicalize(absolute) {
        return canonical;
    }
    normalize_syntactic(absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}
