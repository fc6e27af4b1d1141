//! Filesystem permission screening for sourceable files.
//!
//! A file must be refused when anyone other than its owner could have
//! written it: group- or other-writable inodes anywhere up the tree. The
//! one exception is directories with the sticky bit set (`/tmp`-style),
//! where non-owners cannot delete or rename other users' entries.
//!
//! This check is advisory: it produces a refusal message, and the shell
//! glue installed by `init` is responsible for aborting the source.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use std::os::unix::fs::MetadataExt;

use crate::error::{AutosourceError, Result};
use crate::paths::relative_to;
use crate::walker::ancestors;
use crate::TOOL_NAME;

/// Returns true when this particular inode can be altered by someone other
/// than its owner.
fn insecure_inode(path: &Path) -> Result<bool> {
    let meta = fs_err::metadata(path)
        .map_err(|err| AutosourceError::io(format!("stat {}", path.display()), err))?;
    let mode = meta.mode();

    // Sticky directories are always acceptable.
    if meta.is_dir() && mode & (libc::S_ISVTX as u32) != 0 {
        return Ok(false);
    }

    Ok(mode & (libc::S_IWGRP as u32 | libc::S_IWOTH as u32) != 0)
}

/// Finds an insecure path at or above `path`, nearest first.
pub fn insecure_ancestor(path: &Path) -> Result<Option<PathBuf>> {
    for entry in ancestors(path)? {
        let candidate = entry?;
        if insecure_inode(&candidate)? {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Pre-source check against the process current directory.
///
/// Returns `Some(message)` when sourcing should be refused, `None` when the
/// whole chain up from `path` is safe.
pub fn security_check(path: &Path) -> Result<Option<String>> {
    let cwd = std::env::current_dir()
        .map_err(|err| AutosourceError::io("resolve current directory", err))?;
    security_check_from(path, &cwd)
}

/// Like [`security_check`], with the reference directory made explicit.
///
/// Paths in the refusal message are shown relative to `relative_base` so
/// they read naturally at the prompt where the refusal appears.
pub fn security_check_from(path: &Path, relative_base: &Path) -> Result<Option<String>> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        relative_base.join(path)
    };

    match fs_err::metadata(&absolute) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Ok(Some(format!(
                "{}: File does not exist: {}",
                TOOL_NAME,
                path.display()
            )));
        }
        Err(err) => {
            return Err(AutosourceError::io(
                format!("stat {}", absolute.display()),
                err,
            ));
        }
    }

    if let Some(insecure) = insecure_ancestor(&absolute)? {
        return Ok(Some(format!(
            "{}: Cowardly refusing to source {} because writeable by others: {}",
            TOOL_NAME,
            relative_to(&absolute, relative_base).display(),
            relative_to(&insecure, relative_base).display()
        )));
    }

    Ok(None)
}
