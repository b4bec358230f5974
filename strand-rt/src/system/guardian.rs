//! Root guardians: `/`, `/user`, `/system`.

// Layer 1: Standard library
// (none)

// Layer 2: Third-party
use tracing::{debug, warn};

// Layer 3: Internal
use crate::actor::{ActorContext, Behavior, BehaviorError};
use crate::message::{Message, MessageKind, SystemTag};
use crate::supervisor::SupervisorStrategy;

/// Behavior of the three root actors.
///
/// Guardians only parent: they log terminations of their children and, as
/// the top of every supervision chain, answer escalations with `Stop` —
/// an error that nobody below handled stops the failing subtree.
pub(crate) struct GuardianBehavior {
    scope: &'static str,
}

impl GuardianBehavior {
    pub(crate) fn root() -> Self {
        Self { scope: "root" }
    }

    pub(crate) fn user() -> Self {
        Self { scope: "user" }
    }

    pub(crate) fn system() -> Self {
        Self { scope: "system" }
    }
}

impl Behavior for GuardianBehavior {
    fn receive(&mut self, _ctx: &mut ActorContext<'_>, msg: Message) -> Result<(), BehaviorError> {
        match msg.kind {
            MessageKind::System(SystemTag::Terminated(dead)) => {
                debug!(guardian = self.scope, actor = %dead, "child terminated");
            }
            _ => {
                warn!(guardian = self.scope, "guardian dropped unexpected message");
            }
        }
        Ok(())
    }

    fn supervisor_strategy(&self) -> SupervisorStrategy {
        // The buck stops here.
        SupervisorStrategy::Stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guardian_strategy_is_stop() {
        assert_eq!(
            GuardianBehavior::root().supervisor_strategy(),
            SupervisorStrategy::Stop
        );
        assert_eq!(
            GuardianBehavior::user().supervisor_strategy(),
            SupervisorStrategy::Stop
        );
        assert_eq!(
            GuardianBehavior::system().supervisor_strategy(),
            SupervisorStrategy::Stop
        );
    }
}
