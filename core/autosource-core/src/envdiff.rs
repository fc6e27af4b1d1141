//! Environment diffing and shell command emission.
//!
//! Deactivation restores the environment the shell had before sourcing a
//! project: diff the current environment against the snapshot, then emit
//! `export`/`unset` lines that the shell evals. The lines are not
//! `&&`-chained by callers; failing to reset one variable must not derail
//! the rest.

use std::collections::BTreeMap;

/// Changes that transform `old` into `new`.
///
/// Keys whose value changed (or that `old` lacks) map to the new value;
/// keys absent from `new` map to `None` (unset). Unchanged keys are
/// dropped.
pub fn diff(
    old: &BTreeMap<String, String>,
    new: &BTreeMap<String, String>,
) -> BTreeMap<String, Option<String>> {
    let mut remaining = new.clone();
    let mut result = BTreeMap::new();

    for (key, old_value) in old {
        match remaining.remove(key) {
            Some(new_value) if new_value == *old_value => {}
            other => {
                result.insert(key.clone(), other);
            }
        }
    }
    for (key, value) in remaining {
        result.insert(key, Some(value));
    }
    result
}

/// Shell commands applying `diff`, sorted by variable name and quoted.
pub fn shell_commands(diff: &BTreeMap<String, Option<String>>) -> Vec<String> {
    diff.iter()
        .map(|(key, value)| match value {
            None => format!("unset {}", shell_words::quote(key)),
            Some(value) => format!(
                "export {}={}",
                shell_words::quote(key),
                shell_words::quote(value)
            ),
        })
        .collect()
}
