//! Upward directory traversal bounded by filesystem boundaries.
//!
//! The walk yields the starting path first, then each parent in turn, and
//! refuses to cross onto another filesystem: a project tree on an NFS mount
//! must not lead to prompts about directories on the host volume.

use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use crate::error::{AutosourceError, Result};

/// Device id for `path`, or `None` when the path does not exist.
///
/// Any stat failure other than NotFound is an error; treating it as "not
/// found" could silently change activation decisions.
fn boundary_id(path: &Path) -> Result<Option<u64>> {
    match fs_err::metadata(path) {
        Ok(meta) => Ok(Some(meta.dev())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(AutosourceError::io(
            format!("stat {}", path.display()),
            err,
        )),
    }
}

/// Lazy, finite iterator over a path and its ancestors.
///
/// Stops (exclusively) before the first ancestor whose device id differs
/// from the start's, and after the filesystem root. Created by
/// [`ancestors`].
pub struct Ancestors {
    next: Option<PathBuf>,
    boundary: u64,
    pending_err: Option<AutosourceError>,
}

/// Walks upward from `start`.
///
/// A `start` that does not exist (e.g. the working directory was deleted
/// under us) produces an empty sequence. Stat failures for any other reason
/// surface as error items.
pub fn ancestors(start: &Path) -> Result<Ancestors> {
    Ok(match boundary_id(start)? {
        Some(dev) => Ancestors {
            next: Some(start.to_path_buf()),
            boundary: dev,
            pending_err: None,
        },
        None => Ancestors {
            next: None,
            boundary: 0,
            pending_err: None,
        },
    })
}

impl Iterator for Ancestors {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_err.take() {
            return Some(Err(err));
        }

        let current = self.next.take()?;

        // `Path::parent` is `None` at the root, which is also the "path
        // equals its own parent" stopping condition.
        if let Some(parent) = current.parent() {
            match boundary_id(parent) {
                Ok(Some(dev)) if dev == self.boundary => {
                    self.next = Some(parent.to_path_buf());
                }
                // Crossed a mount boundary, or the parent vanished: stop.
                Ok(_) => {}
                Err(err) => self.pending_err = Some(err),
            }
        }

        Some(Ok(current))
    }
}
