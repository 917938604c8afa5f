//! Activation outcomes and stop reasons.

use serde::{Deserialize, Serialize};

use crate::core::Message;

/// Why an activation did not go through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The marker blocks do not match the ritual's structure.
    StructureInvalid,
    /// The owner's balance is below the activation cost.
    InsufficientResource,
    /// Nobody owns the anchor, or the owner has no essence account.
    NoOwnerOrAccount,
    /// The ritual is disabled by configuration.
    RitualDisabled,
    /// The catalyst or target the ritual needs is not there.
    MissingCatalystOrTarget,
    /// A cooldown or the ritual itself refused the activation.
    ActivationCancelled,
    /// Anything else, including unknown ritual ids.
    ActivationFailedGeneric,
    /// The activator's tier is below the ritual's requirement.
    InsufficientTier,
}

impl FailureReason {
    /// Snake-case name used in translation keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FailureReason::StructureInvalid => "structure_invalid",
            FailureReason::InsufficientResource => "insufficient_resource",
            FailureReason::NoOwnerOrAccount => "no_owner_or_account",
            FailureReason::RitualDisabled => "ritual_disabled",
            FailureReason::MissingCatalystOrTarget => "missing_catalyst_or_target",
            FailureReason::ActivationCancelled => "activation_cancelled",
            FailureReason::ActivationFailedGeneric => "activation_failed_generic",
            FailureReason::InsufficientTier => "insufficient_tier",
        }
    }

    /// Translation key of the player-facing message.
    #[must_use]
    pub fn translation_key(self) -> String {
        format!("ritual.essence_rituals.activate.fail.{}", self.name())
    }
}

/// Outcome of an activation attempt.
///
/// `context_value` carries the number the message needs: the cost that
/// could not be paid, the tier that is required or the remaining cooldown.
///
/// ```
/// use essence_rituals::ritual::{FailureReason, RitualResult};
///
/// let result = RitualResult::failure_with(FailureReason::InsufficientResource, 500);
/// assert!(!result.is_success());
/// assert_eq!(
///     result.message("Well of Water").to_string(),
///     "ritual.essence_rituals.activate.fail.insufficient_resource[Well of Water, 500]"
/// );
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RitualResult {
    pub success: bool,
    pub reason: Option<FailureReason>,
    pub context_value: i64,
}

impl RitualResult {
    /// A successful activation.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            reason: None,
            context_value: 0,
        }
    }

    /// A failure without a context value.
    #[must_use]
    pub const fn failure(reason: FailureReason) -> Self {
        Self::failure_with(reason, 0)
    }

    /// A failure carrying a context value.
    #[must_use]
    pub const fn failure_with(reason: FailureReason, context_value: i64) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            context_value,
        }
    }

    /// Did the activation go through?
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }

    /// Player-facing message, naming the ritual.
    #[must_use]
    pub fn message(&self, ritual_name: &str) -> Message {
        match self.reason {
            None => Message::new("ritual.essence_rituals.activate.success").with_arg(ritual_name),
            Some(reason) => {
                let message = Message::new(reason.translation_key()).with_arg(ritual_name);
                if self.context_value != 0 {
                    message.with_arg(self.context_value)
                } else {
                    message
                }
            }
        }
    }
}

/// Why an active ritual stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The owner or an administrator turned it off.
    Deactivated,
    /// The anchor block was broken.
    BrokenAnchor,
    /// A marker block was broken.
    BrokenComponent,
    /// Another ritual was activated on the same anchor.
    Superseded,
    /// A redstone signal stopped it.
    RedstoneSignal,
    /// The anchor was caught in an explosion.
    Explosion,
    /// The ritual finished its work.
    Completed,
}

impl StopReason {
    /// Snake-case name used in translation keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            StopReason::Deactivated => "deactivated",
            StopReason::BrokenAnchor => "broken_anchor",
            StopReason::BrokenComponent => "broken_component",
            StopReason::Superseded => "superseded",
            StopReason::RedstoneSignal => "redstone_signal",
            StopReason::Explosion => "explosion",
            StopReason::Completed => "completed",
        }
    }

    /// Message sent to the owner.
    #[must_use]
    pub fn message(self, ritual_name: &str) -> Message {
        Message::new(format!("ritual.essence_rituals.stop.{}", self.name())).with_arg(ritual_name)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_message() {
        let message = RitualResult::success().message("Ritual of Magnetism");
        assert_eq!(message.key, "ritual.essence_rituals.activate.success");
        assert_eq!(message.args, vec!["Ritual of Magnetism".to_string()]);
    }

    #[test]
    fn test_failure_without_value() {
        let result = RitualResult::failure(FailureReason::StructureInvalid);
        assert_eq!(result.reason, Some(FailureReason::StructureInvalid));
        assert_eq!(result.message("x").args.len(), 1);
    }

    #[test]
    fn test_stop_message() {
        let message = StopReason::BrokenComponent.message("Ritual of the Feathered Earth");
        assert_eq!(message.key, "ritual.essence_rituals.stop.broken_component");
    }
}
