//! Native recursive path sizing.
//!
//! Sums the apparent size (file length, not block usage) of every regular
//! file under a path. Traversal invariants:
//! - The root path must be statable; anything else fails the measurement.
//! - Entries that vanish mid-walk (`NotFound`) are skipped; deletion during
//!   measurement is not fabrication.
//! - An unreadable subdirectory fails the measurement; a silent undercount
//!   is indistinguishable from truth.
//! - Symlinks are skipped unless `follow_symlinks` is set.
//! - Recursion is bounded by `max_depth`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::core::errors::{GaugeError, Result};
use crate::probe::PathMeasurer;

/// Traversal knobs lifted from `ProbeConfig`.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Follow symlinks instead of skipping them.
    pub follow_symlinks: bool,
    /// Maximum recursion depth below the probed root.
    pub max_depth: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            max_depth: 64,
        }
    }
}

/// Default measurement strategy: native recursive descent.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkMeasurer {
    options: WalkOptions,
}

impl WalkMeasurer {
    /// Build a measurer with the given traversal options.
    #[must_use]
    pub const fn new(options: WalkOptions) -> Self {
        Self { options }
    }

    fn sum_directory(&self, dir: &Path, depth: usize, total: &mut u64) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            // The directory vanished between discovery and listing.
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(GaugeError::measurement(dir, error.to_string())),
        };

        for entry_result in entries {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => return Err(GaugeError::measurement(dir, error.to_string())),
            };
            let child = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => return Err(GaugeError::measurement(&child, error.to_string())),
            };

            if file_type.is_symlink() {
                if !self.options.follow_symlinks {
                    continue;
                }
                match fs::metadata(&child) {
                    Ok(meta) if meta.is_dir() => {
                        if depth < self.options.max_depth {
                            self.sum_directory(&child, depth + 1, total)?;
                        }
                    }
                    Ok(meta) => *total = total.saturating_add(meta.len()),
                    // Dangling link; nothing to count.
                    Err(error) if error.kind() == ErrorKind::NotFound => {}
                    Err(error) => return Err(GaugeError::measurement(&child, error.to_string())),
                }
                continue;
            }

            if file_type.is_dir() {
                if depth < self.options.max_depth {
                    self.sum_directory(&child, depth + 1, total)?;
                }
            } else {
                match entry.metadata() {
                    Ok(meta) => *total = total.saturating_add(meta.len()),
                    Err(error) if error.kind() == ErrorKind::NotFound => {}
                    Err(error) => return Err(GaugeError::measurement(&child, error.to_string())),
                }
            }
        }

        Ok(())
    }
}

impl PathMeasurer for WalkMeasurer {
    fn measure(&self, path: &Path) -> Result<u64> {
        let meta = if self.options.follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
        .map_err(|error| GaugeError::measurement(path, error.to_string()))?;

        if !meta.is_dir() {
            // A file root measures to its own length.
            return Ok(meta.len());
        }

        let mut total = 0u64;
        self.sum_directory(path, 0, &mut total)?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(path: &Path, bytes: usize) {
        fs::write(path, vec![b'x'; bytes]).expect("write test file");
    }

    #[test]
    fn sums_nested_files() {
        let tmp = TempDir::new().expect("temp dir");
        fs::create_dir_all(tmp.path().join("a").join("b")).expect("create tree");
        write_file(&tmp.path().join("top.bin"), 100);
        write_file(&tmp.path().join("a").join("mid.bin"), 200);
        write_file(&tmp.path().join("a").join("b").join("deep.bin"), 300);

        let measurer = WalkMeasurer::default();
        assert_eq!(measurer.measure(tmp.path()).expect("measure"), 600);
    }

    #[test]
    fn empty_directory_measures_zero() {
        let tmp = TempDir::new().expect("temp dir");
        let measurer = WalkMeasurer::default();
        assert_eq!(measurer.measure(tmp.path()).expect("measure"), 0);
    }

    #[test]
    fn missing_root_fails() {
        let measurer = WalkMeasurer::default();
        let err = measurer
            .measure(Path::new("/definitely/does/not/exist"))
            .expect_err("missing root should fail");
        assert_eq!(err.code(), "SG-2001");
        assert!(err.to_string().contains("/definitely/does/not/exist"));
    }

    #[test]
    fn file_root_measures_its_own_length() {
        let tmp = TempDir::new().expect("temp dir");
        let file = tmp.path().join("lone.bin");
        write_file(&file, 1234);

        let measurer = WalkMeasurer::default();
        assert_eq!(measurer.measure(&file).expect("measure"), 1234);
    }

    #[test]
    fn respects_max_depth() {
        let tmp = TempDir::new().expect("temp dir");
        let deep = tmp.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).expect("create tree");
        write_file(&tmp.path().join("d0.bin"), 10);
        write_file(&tmp.path().join("a").join("d1.bin"), 20);
        write_file(&tmp.path().join("a").join("b").join("d2.bin"), 40);
        write_file(&deep.join("d3.bin"), 80);

        let measurer = WalkMeasurer::new(WalkOptions {
            follow_symlinks: false,
            max_depth: 2,
        });
        // Directories deeper than max_depth are not entered.
        assert_eq!(measurer.measure(tmp.path()).expect("measure"), 70);
    }

    #[cfg(unix)]
    #[test]
    fn does_not_follow_symlinks_by_default() {
        let tmp = TempDir::new().expect("temp dir");
        let real = tmp.path().join("real");
        fs::create_dir_all(&real).expect("create dir");
        write_file(&real.join("payload.bin"), 500);

        let measured = tmp.path().join("measured");
        fs::create_dir_all(&measured).expect("create dir");
        write_file(&measured.join("own.bin"), 50);
        std::os::unix::fs::symlink(&real, measured.join("link")).expect("symlink");

        let measurer = WalkMeasurer::default();
        assert_eq!(measurer.measure(&measured).expect("measure"), 50);
    }

    #[cfg(unix)]
    #[test]
    fn follows_symlinks_when_enabled() {
        let tmp = TempDir::new().expect("temp dir");
        let real = tmp.path().join("real");
        fs::create_dir_all(&real).expect("create dir");
        write_file(&real.join("payload.bin"), 500);

        let measured = tmp.path().join("measured");
        fs::create_dir_all(&measured).expect("create dir");
        write_file(&measured.join("own.bin"), 50);
        std::os::unix::fs::symlink(&real, measured.join("link")).expect("symlink");

        let measurer = WalkMeasurer::new(WalkOptions {
            follow_symlinks: true,
            max_depth: 64,
        });
        assert_eq!(measurer.measure(&measured).expect("measure"), 550);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_is_skipped_even_when_following() {
        let tmp = TempDir::new().expect("temp dir");
        write_file(&tmp.path().join("present.bin"), 75);
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling"))
            .expect("symlink");

        let measurer = WalkMeasurer::new(WalkOptions {
            follow_symlinks: true,
            max_depth: 64,
        });
        assert_eq!(measurer.measure(tmp.path()).expect("measure"), 75);
    }
}
