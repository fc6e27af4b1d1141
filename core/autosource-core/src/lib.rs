//! # autosource-core
//!
//! Decision engine for autosource: trust resolution for directory-triggered
//! environment activation, the filesystem security check, and the
//! activation/deactivation transition logic.
//!
//! ## Design Principles
//!
//! - **Synchronous**: one shot per shell prompt, no background work.
//! - **No ambient state in the core**: the currently active project and the
//!   user's responses come in as values (or injected capabilities); reading
//!   the real environment and stdin happens at the CLI boundary.
//! - **Fail closed**: markers owned by someone else are never activatable
//!   and never prompt; a closed stdin answers "no".
//! - **Graceful degradation for user-owned files**: missing decision files
//!   are empty sets, an unreadable snapshot degrades to clearing the active
//!   marker. Unexpected filesystem errors still propagate: silently
//!   treating them as "not found" could flip an activation decision.

pub mod activation;
pub mod decisions;
pub mod envdiff;
pub mod error;
pub mod paths;
pub mod resolver;
pub mod security;
pub mod snapshot;
pub mod transition;
pub mod walker;

// Re-export commonly used items at crate root
pub use decisions::{Decision, DecisionStore};
pub use error::{AutosourceError, Result};
pub use resolver::{FsMarkerLookup, MarkerLookup, PromptInput, StdinInput, TrustResolver};
pub use transition::{plan, TransitionPlan};

/// Tool name as it appears in user-facing messages.
pub const TOOL_NAME: &str = "autosource";

/// Well-known activation marker filename.
pub const ACTIVATE_FILE: &str = ".activate.sh";

/// Environment variable carrying the currently active project path.
/// Owned by the shell; this crate only computes what its next value
/// should be.
pub const ENV_ACTIVE: &str = "AUTOSOURCE_ACTIVE";

/// Environment variable carrying the interactive shell's pid, exported by
/// `autosource init`.
pub const ENV_PID: &str = "AUTOSOURCE_PID";
