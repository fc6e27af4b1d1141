//! Decides how to move between activation targets.
//!
//! Deactivation always precedes activation so a stale environment never
//! leaks into the next project, and a failure while activating leaves the
//! shell cleanly at "nothing active".

use std::path::Path;

/// What the emitted shell script must do. When both flags are set, the
/// deactivation commands are emitted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub deactivate: bool,
    pub activate: bool,
}

impl TransitionPlan {
    pub const NOOP: TransitionPlan = TransitionPlan {
        deactivate: false,
        activate: false,
    };

    pub fn is_noop(&self) -> bool {
        !self.deactivate && !self.activate
    }
}

/// Compares the previously active project with the desired target.
///
/// The previous path is a value handed in by the caller (read from the
/// shell's environment at the boundary), never ambient state read here.
pub fn plan(previous: Option<&Path>, target: Option<&Path>) -> TransitionPlan {
    if previous == target {
        return TransitionPlan::NOOP;
    }
    TransitionPlan {
        deactivate: previous.is_some(),
        activate: target.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_active_nothing_wanted_is_noop() {
        assert_eq!(plan(None, None), TransitionPlan::NOOP);
    }

    #[test]
    fn already_active_is_noop() {
        let p = Path::new("/tmp/x/venv");
        assert_eq!(plan(Some(p), Some(p)), TransitionPlan::NOOP);
    }

    #[test]
    fn fresh_activation_only_activates() {
        assert_eq!(
            plan(None, Some(Path::new("/tmp/x/venv"))),
            TransitionPlan {
                deactivate: false,
                activate: true
            }
        );
    }

    #[test]
    fn leaving_only_deactivates() {
        assert_eq!(
            plan(Some(Path::new("/tmp/x/venv")), None),
            TransitionPlan {
                deactivate: true,
                activate: false
            }
        );
    }

    #[test]
    fn switching_projects_does_both() {
        assert_eq!(
            plan(
                Some(Path::new("/tmp/x/venv")),
                Some(Path::new("/tmp/x/venv2"))
            ),
            TransitionPlan {
                deactivate: true,
                activate: true
            }
        );
    }

    #[test]
    fn noop_predicate() {
        assert!(TransitionPlan::NOOP.is_noop());
        assert!(!plan(None, Some(Path::new("/p"))).is_noop());
    }
}
