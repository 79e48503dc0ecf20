//! Cross-platform template path resolution
//!
//! Template names are resolved the same way on every platform:
//!
//! - Absolute names (leading `/` or `\`, or a drive prefix such as `C:`)
//!   are used as-is.
//! - Otherwise, when a `root` is configured, the name is joined onto it.
//! - Otherwise the name is relative to the directory of the template that
//!   references it (includes, imports, extends).
//! - With neither, the name itself is the key.
//!
//! ## Why not `Path::is_absolute()`
//!
//! - Unix: `Path::new("C:\\views").is_absolute()` → `false`
//! - Windows: `Path::new("/views").is_absolute()` → `false` (rooted, not absolute!)
//!
//! Template names are written by template authors, not by the host OS, so
//! the check is done on the name's text:
//!
//! ```rust
//! use quill_core::path::is_absolute_template_path;
//!
//! assert!(is_absolute_template_path("/views/base.html"));
//! assert!(is_absolute_template_path("C:\\views\\base.html"));
//! assert!(!is_absolute_template_path("partials/nav.html"));
//! ```

use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// Check if a template name bypasses `root`
pub fn is_absolute_template_path(name: &str) -> bool {
    if name.starts_with('/') || name.starts_with('\\') {
        return true;
    }

    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Check if path is absolute OR rooted (cross-platform)
///
/// - Unix: `/tmp` → is_absolute() = true
/// - Windows: `/tmp` → is_absolute() = false (rooted, not absolute!)
pub fn has_absolute_or_rooted_component(path: &Path) -> bool {
    if path.is_absolute() {
        return true;
    }

    path.components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}

/// Resolve the template `name` referenced from `from`
///
/// The result is lexically normalised (`.` dropped, `..` folded into the
/// preceding component) so that one template has one cache key no matter how
/// it was reached.
///
/// # Errors
///
/// Returns an error for an empty name.
///
/// # Examples
///
/// ```rust
/// use quill_core::path::resolve_template_path;
/// use std::path::{Path, PathBuf};
///
/// let from = Path::new("views/pages/index.html");
/// assert_eq!(
///     resolve_template_path(None, Some(from), "../layout.html").unwrap(),
///     PathBuf::from("views/layout.html")
/// );
/// assert_eq!(
///     resolve_template_path(Some(Path::new("views")), Some(from), "layout.html").unwrap(),
///     PathBuf::from("views/layout.html")
/// );
/// ```
pub fn resolve_template_path(root: Option<&Path>, from: Option<&Path>, name: &str) -> Result<PathBuf> {
    if name.trim().is_empty() {
        bail!("Template name cannot be empty");
    }

    if is_absolute_template_path(name) || has_absolute_or_rooted_component(Path::new(name)) {
        return Ok(normalize(Path::new(name)));
    }

    let joined = match (root, from.and_then(Path::parent)) {
        (Some(root), _) => root.join(name),
        (None, Some(dir)) => dir.join(name),
        (None, None) => PathBuf::from(name),
    };
    Ok(normalize(&joined))
}

/// Fold `.` and `..` components without touching the filesystem
///
/// Leading `..` of a relative path are kept; `..` never climbs above a root.
fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().map(|c| c.as_os_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Tests for is_absolute_template_path()
    // ============================================================================

    #[test]
    fn test_absolute_names() {
        let cases = vec![
            ("/tmp/base.html", true, "Unix absolute"),
            ("\\views\\base.html", true, "Windows rooted"),
            ("C:\\views\\base.html", true, "Drive letter"),
            ("d:/views/base.html", true, "Lowercase drive letter"),
            ("base.html", false, "Bare name"),
            ("./base.html", false, "Current directory"),
            ("../base.html", false, "Parent directory"),
            ("1:base.html", false, "Digit is not a drive"),
        ];

        for (name, expected, description) in cases {
            assert_eq!(
                is_absolute_template_path(name),
                expected,
                "Name '{}' ({}): expected is_absolute_template_path={}",
                name,
                description,
                expected
            );
        }
    }

    #[test]
    fn test_rooted_component_detected() {
        assert!(has_absolute_or_rooted_component(Path::new("/tmp")));
        assert!(!has_absolute_or_rooted_component(Path::new("foo/bar")));
    }

    // ============================================================================
    // Tests for resolve_template_path()
    // ============================================================================

    #[test]
    fn test_bare_name_is_its_own_key() {
        let resolved = resolve_template_path(None, None, "base.html").unwrap();
        assert_eq!(resolved, PathBuf::from("base.html"));
    }

    #[test]
    fn test_root_takes_precedence_over_from() {
        let resolved = resolve_template_path(
            Some(Path::new("/srv/views")),
            Some(Path::new("/elsewhere/page.html")),
            "partials/nav.html",
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/views/partials/nav.html"));
    }

    #[test]
    fn test_relative_to_referencing_template() {
        let resolved =
            resolve_template_path(None, Some(Path::new("views/page.html")), "./nav.html").unwrap();
        assert_eq!(resolved, PathBuf::from("views/nav.html"));
    }

    #[test]
    fn test_absolute_bypasses_root() {
        let resolved =
            resolve_template_path(Some(Path::new("/srv/views")), None, "/tmp/other.html").unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/other.html"));
    }

    #[test]
    fn test_parent_dir_folded() {
        let resolved =
            resolve_template_path(Some(Path::new("/srv/views/pages")), None, "../base.html").unwrap();
        assert_eq!(resolved, PathBuf::from("/srv/views/base.html"));
    }

    #[test]
    fn test_parent_dir_never_climbs_above_root() {
        let resolved = resolve_template_path(None, None, "/../base.html").unwrap();
        assert_eq!(resolved, PathBuf::from("/base.html"));
    }

    #[test]
    fn test_leading_parent_dirs_kept() {
        let resolved = resolve_template_path(None, None, "../../base.html").unwrap();
        assert_eq!(resolved, PathBuf::from("../../base.html"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = resolve_template_path(None, None, "  ");
        assert!(result.is_err(), "Empty name should be rejected");

        let err_msg = result.unwrap_err().to_string();
        assert!(
            err_msg.contains("cannot be empty"),
            "Error should mention 'cannot be empty', got: {}",
            err_msg
        );
    }
}
