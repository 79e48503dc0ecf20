//! Test utilities for quill
//!
//! This crate provides shared testing utilities used across the quill workspace.

use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Creates a temporary directory within `.tmp/` at the project root
///
/// This ensures all test temporary files are centralized in a single location
/// that is gitignored and easy to clean up manually if needed.
///
/// # Returns
///
/// A `TempDir` instance that automatically cleans up on drop.
/// The directory is created at `.tmp/<random-name>` relative to the project root.
///
/// # Panics
///
/// Panics if:
/// - Unable to determine current directory
/// - Unable to create `.tmp/` directory
/// - Unable to create temporary subdirectory
///
/// # Examples
///
/// ```rust
/// use quill_testkit::temp_dir_in_workspace;
///
/// let temp = temp_dir_in_workspace();
/// let file_path = temp.path().join("test.txt");
/// std::fs::write(&file_path, "test data").unwrap();
/// // Cleanup happens automatically when temp is dropped
/// ```
pub fn temp_dir_in_workspace() -> TempDir {
    try_temp_dir_in_workspace().expect("Failed to create temporary directory in .tmp/")
}

/// Alternative with Result for non-test code
///
/// Use this variant when you need proper error handling instead of panics.
pub fn try_temp_dir_in_workspace() -> std::io::Result<TempDir> {
    let workspace_root = std::env::current_dir()?;
    let tmp_base = workspace_root.join(".tmp");
    std::fs::create_dir_all(&tmp_base)?;
    TempDir::new_in(&tmp_base)
}

/// Write template files under `dir`, creating parent directories
///
/// Returns the written paths in input order.
///
/// ```rust
/// use quill_testkit::{temp_dir_in_workspace, write_templates};
///
/// let temp = temp_dir_in_workspace();
/// let paths = write_templates(temp.path(), &[("layouts/base.html", "{% block body %}{% endblock %}")]);
/// assert!(paths[0].ends_with("layouts/base.html"));
/// assert!(paths[0].exists());
/// ```
///
/// # Panics
///
/// Panics if a directory or file cannot be written.
pub fn write_templates(dir: &Path, templates: &[(&str, &str)]) -> Vec<PathBuf> {
    templates
        .iter()
        .map(|(name, source)| {
            let path = dir.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .unwrap_or_else(|e| panic!("Failed to create {}: {}", parent.display(), e));
            }
            std::fs::write(&path, source)
                .unwrap_or_else(|e| panic!("Failed to write {}: {}", path.display(), e));
            path
        })
        .collect()
}

/// Install a test-friendly tracing subscriber
///
/// Only initializes once, even if called multiple times. The filter is read
/// from `QUILL_LOG` (e.g. `QUILL_LOG=quill_core=debug`) and defaults to
/// `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("QUILL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
        tracing::debug!("test tracing initialized");
    });
}
