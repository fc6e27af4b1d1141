//! Lexical path helpers shared by the decision engine.
//!
//! Deliberately pure: no filesystem access, so callers control exactly when
//! the disk is consulted.

use std::path::{Component, Path, PathBuf};

/// Returns true when `path` is `ancestor` itself or nested anywhere below it.
///
/// Component-wise, so `/a/bc` is not under `/a/b`.
pub fn path_is_under(path: &Path, ancestor: &Path) -> bool {
    path.strip_prefix(ancestor).is_ok()
}

/// Lexical relative path from `base` to `path`, producing `..` components as
/// needed. Equal paths yield `.`.
///
/// Both arguments are expected to be absolute; no symlinks are consulted, so
/// the result is only for display.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_components: Vec<Component> = path.components().collect();
    let base_components: Vec<Component> = base.components().collect();

    let common = path_components
        .iter()
        .zip(base_components.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..base_components.len() {
        result.push("..");
    }
    for component in &path_components[common..] {
        result.push(component.as_os_str());
    }

    if result.as_os_str().is_empty() {
        result.push(".");
    }
    result
}
