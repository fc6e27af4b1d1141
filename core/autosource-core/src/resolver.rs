//! Trust resolution: find the nearest ancestor the user has agreed to
//! source.
//!
//! Walks upward from the working directory, consulting the decision store
//! for each directory that carries an activation marker, and prompting for
//! directories nobody has decided on yet. Trust is decided here; whether
//! the marker file is *safe* to source is a separate, later check (see
//! [`crate::security`]) run at the moment the shell actually sources it.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::decisions::{Decision, DecisionStore};
use crate::error::{AutosourceError, Result};
use crate::walker::ancestors;
use crate::{ACTIVATE_FILE, TOOL_NAME};

/// Capability: does this directory carry an activation marker we may use?
///
/// Split out as a one-method trait so the prompt flow can be tested without
/// real ownership tricks. The production impl requires the marker to exist
/// *and* be owned by the current effective user; anything else makes the
/// directory non-activatable with no prompt, regardless of cached
/// decisions (fail closed).
pub trait MarkerLookup {
    fn exists_and_owned_by_current_user(&self, dir: &Path) -> Result<bool>;
}

/// Stats `<dir>/.activate.sh` on the real filesystem.
pub struct FsMarkerLookup;

impl MarkerLookup for FsMarkerLookup {
    fn exists_and_owned_by_current_user(&self, dir: &Path) -> Result<bool> {
        use std::os::unix::fs::MetadataExt;

        let marker = dir.join(ACTIVATE_FILE);
        match fs_err::metadata(&marker) {
            Ok(meta) => {
                // SAFETY: geteuid has no failure modes.
                let euid = unsafe { libc::geteuid() };
                Ok(meta.uid() == euid)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(AutosourceError::io(
                format!("stat {}", marker.display()),
                err,
            )),
        }
    }
}

/// One line of user input; `None` at end-of-input.
///
/// Injected so tests can script the conversation, and so a non-interactive
/// session (closed stdin) reliably answers "no" instead of hanging or
/// silently activating.
pub trait PromptInput {
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// Reads from the process stdin.
pub struct StdinInput;

impl PromptInput for StdinInput {
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = std::io::stdin()
            .read_line(&mut line)
            .map_err(|err| AutosourceError::io("read response from stdin", err))?;
        if read == 0 {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Yes,
    No,
    Never,
}

/// Classifies a prompt response, prefix-based.
///
/// An uppercase leading `N` means "never" (so `NO` is never, not no);
/// otherwise a case-insensitive leading `y` or `n` decides. Anything else
/// is unrecognized and re-prompts.
fn classify(response: &str) -> Option<Answer> {
    if response.starts_with('N') {
        return Some(Answer::Never);
    }
    let lower = response.to_lowercase();
    if lower.starts_with('y') {
        Some(Answer::Yes)
    } else if lower.starts_with('n') {
        Some(Answer::No)
    } else {
        None
    }
}

/// Finds the nearest activatable ancestor, prompting when undecided.
pub struct TrustResolver<'a, M, I, W>
where
    M: MarkerLookup,
    I: PromptInput,
    W: Write,
{
    store: &'a mut DecisionStore,
    markers: &'a M,
    input: &'a mut I,
    prompt_out: &'a mut W,
}

impl<'a, M, I, W> TrustResolver<'a, M, I, W>
where
    M: MarkerLookup,
    I: PromptInput,
    W: Write,
{
    pub fn new(
        store: &'a mut DecisionStore,
        markers: &'a M,
        input: &'a mut I,
        prompt_out: &'a mut W,
    ) -> Self {
        TrustResolver {
            store,
            markers,
            input,
            prompt_out,
        }
    }

    /// Walks `ancestors(cwd)` nearest first and returns the first directory
    /// the user allows, or `None` when every candidate is skipped or
    /// declined.
    pub fn find_allowed(&mut self, cwd: &Path) -> Result<Option<PathBuf>> {
        self.store.prune_deferred(cwd)?;

        for entry in ancestors(cwd)? {
            let path = entry?;

            if !self.markers.exists_and_owned_by_current_user(&path)? {
                continue;
            }

            match self.store.decision(&path) {
                Decision::Disallowed | Decision::Deferred => {
                    tracing::debug!(path = %path.display(), "Skipping declined project");
                    continue;
                }
                Decision::Allowed => return Ok(Some(path)),
                Decision::Undecided => {
                    if self.prompt(&path)? {
                        return Ok(Some(path));
                    }
                    // Declined; a farther ancestor may still be allowed.
                }
            }
        }

        Ok(None)
    }

    /// Runs the trust prompt for one directory. Returns true on "yes".
    fn prompt(&mut self, path: &Path) -> Result<bool> {
        let write_err = |err| AutosourceError::io("write trust prompt", err);

        writeln!(
            self.prompt_out,
            "{} will source {} at {}.",
            TOOL_NAME,
            ACTIVATE_FILE,
            path.display()
        )
        .map_err(write_err)?;

        loop {
            write!(self.prompt_out, "Acceptable? (y)es (n)o (N)ever: ").map_err(write_err)?;
            self.prompt_out.flush().map_err(write_err)?;

            // Closed stdin counts as "no": a cancelled or non-interactive
            // session must never silently activate.
            let line = self.input.read_line()?.unwrap_or_else(|| "n".to_string());
            let response = line.trim_end_matches(['\r', '\n']);

            match classify(response) {
                Some(Answer::Never) => {
                    self.store.record_disallow(path)?;
                    writeln!(
                        self.prompt_out,
                        "{} will remember this: {}",
                        TOOL_NAME,
                        self.store.disallowed_file().display()
                    )
                    .map_err(write_err)?;
                    return Ok(false);
                }
                Some(Answer::No) => {
                    self.store.record_defer(path)?;
                    return Ok(false);
                }
                Some(Answer::Yes) => {
                    self.store.record_allow(path)?;
                    writeln!(
                        self.prompt_out,
                        "{} will remember this: {}",
                        TOOL_NAME,
                        self.store.allowed_file().display()
                    )
                    .map_err(write_err)?;
                    return Ok(true);
                }
                None => {
                    writeln!(self.prompt_out, "I didn't understand your response.")
                        .map_err(write_err)?;
                    writeln!(self.prompt_out).map_err(write_err)?;
                }
            }
        }
    }
}
