//! Activation and deactivation command emission.
//!
//! The tool never mutates the shell itself; it prints commands the prompt
//! hook evals. Activation snapshots the pre-source environment, then emits
//! an `&&`-chained script that captures aliases, marks the project active,
//! and sources the marker through the init-installed `-as-source` wrapper
//! (which runs the security check and traps source failures). Deactivation
//! replays the snapshot diff and restores aliases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::envdiff;
use crate::error::{AutosourceError, Result};
use crate::snapshot::{Snapshot, ALIAS_FILE};
use crate::{ACTIVATE_FILE, ENV_ACTIVE, ENV_PID, TOOL_NAME};

/// Deactivation never touches these: the shell owns them per-prompt.
const UNDIFFABLE_VARS: [&str; 3] = ["_", "PWD", "OLDPWD"];

fn sh(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}

/// State directory for `project` under this shell's run dir:
/// `<run dir>/autosource/<project sans leading slash>/<shell pid>`.
///
/// The pid comes from `AUTOSOURCE_PID` (exported by `init`) so each shell
/// keeps its own snapshot of the same project.
pub fn state_dir(env: &BTreeMap<String, String>, project: &Path) -> Result<PathBuf> {
    let run_dir = match env.get("XDG_RUNTIME_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir().ok_or(AutosourceError::NoHomeDir)?.join(".run"),
    };
    // A session without `init` has no pid; "0" keeps us functional rather
    // than refusing to deactivate later.
    let pid = env.get(ENV_PID).map(String::as_str).unwrap_or("0");
    let project_key = project.to_string_lossy();
    let project_key = project_key.trim_start_matches('/');

    Ok(run_dir.join("autosource").join(project_key).join(pid))
}

/// Emits the activation script for `project`, snapshotting `env` first.
///
/// The final `cd` back to `cwd` is chained with a plain newline: it must
/// run even when an earlier step failed and aborted the `&&` chain.
pub fn activate_commands(
    env: &BTreeMap<String, String>,
    project: &Path,
    cwd: &Path,
) -> Result<String> {
    let state = state_dir(env, project)?;
    Snapshot::capture(project, env).save(&state)?;
    tracing::debug!(project = %project.display(), "Wrote activation snapshot");

    let chained = [
        format!("_as_state={}", sh(&state)),
        // sh and zsh omit the leading 'alias ' when listing; normalize it
        // so the capture file can be sourced back verbatim.
        format!(r#"alias | sed 's/^\(alias \)\?/alias /' > "$_as_state/{ALIAS_FILE}""#),
        format!("export {}={}", ENV_ACTIVE, sh(project)),
        format!("cd {}", sh(project)),
        format!("-as-source {ACTIVATE_FILE}"),
        // (chain && test) || deactivate: any failed step above rolls back.
        format!(r#"[ $_as_ok ] || eval "$({TOOL_NAME} deactivate)""#),
    ]
    .join(" &&\n");

    Ok(format!("{chained}\ncd {}", sh(cwd)))
}

/// A computed deactivation: the script to eval, plus the environment the
/// shell will have once it ran.
///
/// The resulting environment matters when switching projects: the
/// successor's activation snapshot must capture what deactivation leaves
/// behind, not the live environment this process inherited (which still
/// carries the outgoing project's variables).
#[derive(Debug)]
pub struct Deactivation {
    pub commands: String,
    pub resulting_env: BTreeMap<String, String>,
}

/// Emits commands reversing the active environment, or `None` when nothing
/// is active.
///
/// A missing or unreadable snapshot degrades to clearing the active marker:
/// the shell must not keep claiming a project is active just because we can
/// no longer restore it precisely.
pub fn deactivate_commands(env: &BTreeMap<String, String>) -> Result<Option<Deactivation>> {
    let active = match env.get(ENV_ACTIVE) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => return Ok(None),
    };

    let state = state_dir(env, &active)?;
    let snapshot = match Snapshot::load(&state) {
        Some(snapshot) => snapshot,
        None => {
            tracing::warn!(
                path = %active.display(),
                "No usable activation snapshot; clearing active marker only"
            );
            let mut resulting_env = env.clone();
            resulting_env.remove(ENV_ACTIVE);
            return Ok(Some(Deactivation {
                commands: format!("unset {ENV_ACTIVE}"),
                resulting_env,
            }));
        }
    };

    let mut diff = envdiff::diff(env, &snapshot.env);
    for var in UNDIFFABLE_VARS {
        diff.remove(var);
    }

    let mut lines = envdiff::shell_commands(&diff);
    lines.push(format!("_as_state={}", sh(&state)));
    lines.push("unalias -a".to_string());
    lines.push(format!(r#"-as-source "$_as_state/{ALIAS_FILE}" &&"#));
    lines.push("rm -r $_as_state".to_string());

    // What the diff restores, with the per-prompt shell variables keeping
    // their live values (the diff never touches them).
    let mut resulting_env = snapshot.env.clone();
    for var in UNDIFFABLE_VARS {
        match env.get(var) {
            Some(value) => {
                resulting_env.insert(var.to_string(), value.clone());
            }
            None => {
                resulting_env.remove(var);
            }
        }
    }

    Ok(Some(Deactivation {
        commands: lines.join("\n"),
        resulting_env,
    }))
}
