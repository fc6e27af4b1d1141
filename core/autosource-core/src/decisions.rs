//! Persisted per-path trust decisions.
//!
//! Three newline-delimited path sets live under the user cache directory:
//! `allowed`, `disallowed`, and `not-now`. Each file is loaded once per
//! resolution as a snapshot; membership is all that matters, so duplicate
//! lines are harmless. Appends are line-oriented and unsynchronized:
//! concurrent sessions degrade to at worst one extra prompt, never a
//! corrupted store.

use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{AutosourceError, Result};
use crate::paths::path_is_under;

const ALLOWED_FILE: &str = "allowed";
const DISALLOWED_FILE: &str = "disallowed";
const NOT_NOW_FILE: &str = "not-now";

/// One persisted decision for a path, derived from set membership.
///
/// Deny-like states win when a path accidentally appears in more than one
/// file; see [`DecisionStore::decision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Disallowed,
    Deferred,
    Undecided,
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A single newline-delimited path set, loaded as a snapshot.
#[derive(Debug)]
struct DecisionFile {
    path: PathBuf,
    lines: HashSet<String>,
}

impl DecisionFile {
    fn load(path: PathBuf) -> Result<Self> {
        let lines = match fs_err::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(err) if err.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(err) => {
                return Err(AutosourceError::io(
                    format!("read {}", path.display()),
                    err,
                ))
            }
        };
        Ok(DecisionFile { path, lines })
    }

    fn contains(&self, path: &Path) -> bool {
        self.lines.contains(&key(path))
    }

    fn ensure_parent(&self) -> Result<&Path> {
        let parent = self.path.parent().ok_or_else(|| {
            AutosourceError::io(
                format!("resolve parent of {}", self.path.display()),
                std::io::Error::from(ErrorKind::NotFound),
            )
        })?;
        fs_err::create_dir_all(parent)
            .map_err(|err| AutosourceError::io(format!("create {}", parent.display()), err))?;
        Ok(parent)
    }

    fn append(&mut self, path: &Path) -> Result<()> {
        self.ensure_parent()?;
        let mut file = fs_err::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| AutosourceError::io(format!("open {}", self.path.display()), err))?;
        let entry = key(path);
        writeln!(file, "{entry}")
            .map_err(|err| AutosourceError::io(format!("append {}", self.path.display()), err))?;
        self.lines.insert(entry);
        Ok(())
    }

    /// Replaces the file with the retained subset, atomically.
    fn rewrite(&mut self, retain: impl Fn(&str) -> bool) -> Result<()> {
        self.lines.retain(|line| retain(line));
        let parent = self.ensure_parent()?.to_path_buf();
        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|err| AutosourceError::io(format!("temp file in {}", parent.display()), err))?;
        for line in &self.lines {
            writeln!(temp, "{line}")
                .map_err(|err| AutosourceError::io("write temp decision file", err))?;
        }
        temp.flush()
            .map_err(|err| AutosourceError::io("flush temp decision file", err))?;
        temp.persist(&self.path).map_err(|err| {
            AutosourceError::io(format!("replace {}", self.path.display()), err.error)
        })?;
        Ok(())
    }
}

/// The three persisted decision sets, loaded once per resolution request.
#[derive(Debug)]
pub struct DecisionStore {
    allowed: DecisionFile,
    disallowed: DecisionFile,
    not_now: DecisionFile,
}

impl DecisionStore {
    /// Opens the store under `config_dir`, snapshotting all three sets.
    /// Missing files are empty sets, not errors.
    pub fn open(config_dir: &Path) -> Result<Self> {
        Ok(DecisionStore {
            allowed: DecisionFile::load(config_dir.join(ALLOWED_FILE))?,
            disallowed: DecisionFile::load(config_dir.join(DISALLOWED_FILE))?,
            not_now: DecisionFile::load(config_dir.join(NOT_NOW_FILE))?,
        })
    }

    /// Default per-user location: `<cache dir>/autosource`.
    pub fn default_dir() -> Result<PathBuf> {
        dirs::cache_dir()
            .map(|dir| dir.join("autosource"))
            .ok_or(AutosourceError::NoCacheDir)
    }

    /// The cached decision for `path`.
    ///
    /// A single match keeps the precedence rule in one place: Disallowed
    /// beats Deferred beats Allowed beats Undecided, so a path that leaked
    /// into two files is still skipped without prompting.
    pub fn decision(&self, path: &Path) -> Decision {
        match (
            self.disallowed.contains(path),
            self.not_now.contains(path),
            self.allowed.contains(path),
        ) {
            (true, _, _) => Decision::Disallowed,
            (false, true, _) => Decision::Deferred,
            (false, false, true) => Decision::Allowed,
            (false, false, false) => Decision::Undecided,
        }
    }

    pub fn record_allow(&mut self, path: &Path) -> Result<()> {
        self.allowed.append(path)
    }

    pub fn record_disallow(&mut self, path: &Path) -> Result<()> {
        self.disallowed.append(path)
    }

    pub fn record_defer(&mut self, path: &Path) -> Result<()> {
        self.not_now.append(path)
    }

    /// Forgets "not now" answers once the user has left their subtree.
    ///
    /// An entry survives while `cwd` is still under the entry's parent
    /// directory, so a deferred project stays quiet for its siblings too,
    /// and prompts again only after the user leaves and comes back.
    pub fn prune_deferred(&mut self, cwd: &Path) -> Result<()> {
        let cwd = cwd.to_path_buf();
        let before = self.not_now.lines.len();
        self.not_now.rewrite(|line| {
            let entry = Path::new(line);
            let scope = entry.parent().unwrap_or(entry);
            path_is_under(&cwd, scope)
        })?;
        let dropped = before - self.not_now.lines.len();
        if dropped > 0 {
            tracing::debug!(dropped, "Pruned stale not-now entries");
        }
        Ok(())
    }

    /// Where allow decisions are remembered; shown to the user on "yes".
    pub fn allowed_file(&self) -> &Path {
        &self.allowed.path
    }

    /// Where "never" decisions are remembered; shown to the user on "N".
    pub fn disallowed_file(&self) -> &Path {
        &self.disallowed.path
    }
}
