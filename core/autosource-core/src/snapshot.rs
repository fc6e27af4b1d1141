//! Per-activation environment snapshots.
//!
//! Written by the tool at activation time, before the shell sources
//! anything, so deactivation can restore the pre-activation environment.
//! Stored as versioned JSON in the per-shell state directory; written
//! atomically via temp file + rename.
//!
//! Loading is defensive: the directory is shared with shell-written files
//! and may have been cleaned up behind our back, and an old snapshot must
//! degrade gracefully rather than crash the prompt hook.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{AutosourceError, Result};

/// Schema version. Only snapshots with a matching version are restored.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Snapshot filename inside the state directory.
pub const SNAPSHOT_FILE: &str = "state.json";

/// Shell-side alias capture lands next to the snapshot under this name.
pub const ALIAS_FILE: &str = "alias";

/// The environment a shell had before a project was sourced.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// The project this activation belongs to.
    pub path: PathBuf,
    pub activated_at: DateTime<Utc>,
    /// Environment inherited from the shell, pre-source.
    pub env: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn capture(path: &Path, env: &BTreeMap<String, String>) -> Self {
        Snapshot {
            version: SNAPSHOT_VERSION,
            path: path.to_path_buf(),
            activated_at: Utc::now(),
            env: env.clone(),
        }
    }

    /// Atomically writes the snapshot into `state_dir`, creating it with
    /// owner-only permissions. The directory also receives shell-written
    /// files, so it must exist before the emitted commands run.
    pub fn save(&self, state_dir: &Path) -> Result<()> {
        fs_err::create_dir_all(state_dir)
            .map_err(|err| AutosourceError::io(format!("create {}", state_dir.display()), err))?;
        {
            use std::os::unix::fs::PermissionsExt;
            fs_err::set_permissions(state_dir, std::fs::Permissions::from_mode(0o700)).map_err(
                |err| AutosourceError::io(format!("chmod {}", state_dir.display()), err),
            )?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|err| AutosourceError::io("serialize snapshot", err.into()))?;

        let mut temp = NamedTempFile::new_in(state_dir).map_err(|err| {
            AutosourceError::io(format!("temp file in {}", state_dir.display()), err)
        })?;
        temp.write_all(content.as_bytes())
            .map_err(|err| AutosourceError::io("write temp snapshot", err))?;
        temp.flush()
            .map_err(|err| AutosourceError::io("flush temp snapshot", err))?;
        temp.persist(state_dir.join(SNAPSHOT_FILE))
            .map_err(|err| AutosourceError::io("persist snapshot", err.error))?;
        Ok(())
    }

    /// Loads the snapshot for a state directory, or `None` when it is
    /// missing, corrupt, or from an incompatible version. Callers fall back
    /// to a degraded deactivation in that case.
    pub fn load(state_dir: &Path) -> Option<Snapshot> {
        let path = state_dir.join(SNAPSHOT_FILE);
        let content = fs_err::read_to_string(&path).ok()?;
        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Some(snapshot),
            Ok(snapshot) => {
                tracing::warn!(
                    version = snapshot.version,
                    path = %path.display(),
                    "Unsupported snapshot version"
                );
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Failed to parse snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_env() -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert("PATH".to_string(), "/usr/bin".to_string());
        env.insert("HOME".to_string(), "/home/u".to_string());
        env
    }

    #[test]
    fn round_trip_preserves_path_and_env() {
        let temp = tempdir().unwrap();
        let state = temp.path().join("state");

        let snapshot = Snapshot::capture(Path::new("/tmp/x/venv"), &sample_env());
        snapshot.save(&state).unwrap();

        let loaded = Snapshot::load(&state).unwrap();
        assert_eq!(loaded.path, PathBuf::from("/tmp/x/venv"));
        assert_eq!(loaded.env, sample_env());
    }

    #[test]
    fn state_dir_is_owner_only() {
        use std::os::unix::fs::MetadataExt;

        let temp = tempdir().unwrap();
        let state = temp.path().join("state");
        Snapshot::capture(Path::new("/p"), &sample_env())
            .save(&state)
            .unwrap();

        let mode = fs_err::metadata(&state).unwrap().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn missing_snapshot_loads_as_none() {
        let temp = tempdir().unwrap();
        assert!(Snapshot::load(&temp.path().join("nope")).is_none());
    }

    #[test]
    fn corrupt_snapshot_loads_as_none() {
        let temp = tempdir().unwrap();
        fs_err::write(temp.path().join(SNAPSHOT_FILE), "{not json").unwrap();
        assert!(Snapshot::load(temp.path()).is_none());
    }

    #[test]
    fn version_mismatch_loads_as_none() {
        let temp = tempdir().unwrap();
        let mut snapshot = Snapshot::capture(Path::new("/p"), &sample_env());
        snapshot.version = 99;
        snapshot.save(temp.path()).unwrap();
        assert!(Snapshot::load(temp.path()).is_none());
    }
}
