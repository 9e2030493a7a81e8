use std::fmt;

use crate::error::CoreError;

/// Ledger anchoring status of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    /// Queued for submission to the ledger, or submission in progress.
    Pending,
    /// Hash is anchored on the ledger. Final state.
    Confirmed,
    /// Bounded retries exhausted; eligible for re-submission.
    Failed,
}

impl AnchorStatus {
    /// Whether this is a final (terminal) state.
    ///
    /// `Failed` is not terminal: a failed record can be re-queued.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Events that trigger anchor status transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEvent {
    /// The ledger accepted the hash and returned a transaction hash.
    Confirm,
    /// Retries exhausted without a successful submission.
    Fail,
    /// A failed record is queued again for submission.
    Resubmit,
}

/// Owns the anchor status transitions; the anchoring worker is the only
/// writer.
///
/// Valid transitions:
/// - Pending → Confirmed (Confirm)
/// - Pending → Failed (Fail)
/// - Failed → Pending (Resubmit)
pub struct AnchorStateMachine;

impl AnchorStateMachine {
    /// Attempt a status transition based on an event.
    /// Returns the new status on success, or an error for invalid transitions.
    pub fn transition(
        current: AnchorStatus,
        event: AnchorEvent,
    ) -> Result<AnchorStatus, CoreError> {
        let new_status = match (current, event) {
            (AnchorStatus::Pending, AnchorEvent::Confirm) => AnchorStatus::Confirmed,
            (AnchorStatus::Pending, AnchorEvent::Fail) => AnchorStatus::Failed,
            (AnchorStatus::Failed, AnchorEvent::Resubmit) => AnchorStatus::Pending,

            _ => {
                let target = match event {
                    AnchorEvent::Confirm => AnchorStatus::Confirmed,
                    AnchorEvent::Fail => AnchorStatus::Failed,
                    AnchorEvent::Resubmit => AnchorStatus::Pending,
                };
                return Err(CoreError::InvalidAnchorTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_status,
            event = ?event,
            "anchor status transition"
        );

        Ok(new_status)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: AnchorStatus, event: AnchorEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
