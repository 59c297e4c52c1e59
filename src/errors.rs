//! Error taxonomy for the session engine.
//!
//! Five categories, each with a distinct recovery story: malformed model
//! payloads kill the step, compliance rejections keep the phase open,
//! turn violations never touch state, transport failures retry then surface
//! classified, and id conflicts leave the phase unlocked for another pass.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Network,
    Timeout,
    RateLimited,
    Auth,
    Server,
    Other,
}

impl TransportKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => TransportKind::Auth,
            408 => TransportKind::Timeout,
            429 => TransportKind::RateLimited,
            500..=599 => TransportKind::Server,
            _ => TransportKind::Other,
        }
    }

    pub fn user_reason(self) -> &'static str {
        match self {
            TransportKind::Network => "network unreachable",
            TransportKind::Timeout => "request timed out",
            TransportKind::RateLimited => "rate limited, slow down",
            TransportKind::Auth => "authentication rejected",
            TransportKind::Server => "service unavailable",
            TransportKind::Other => "request failed",
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// Model payload failed structural validation. Fatal to the step;
    /// no state was touched.
    Validation(String),
    /// Reference validation found non-compliant content. Recorded; the
    /// phase stays open for resubmission.
    ComplianceRejection(String),
    /// A submission arrived from the wrong role for the current step.
    TurnViolation { expected: String, got: String },
    /// Network-layer failure, already retried per policy.
    Transport { kind: TransportKind, detail: String },
    /// Duplicate or unknown juror id in a selection list.
    IdConflict { reason: String, offending_id: u32 },
    /// An action for this phase is already in flight.
    ActionPending(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(msg) => write!(f, "invalid model payload: {}", msg),
            EngineError::ComplianceRejection(msg) => {
                write!(f, "non-compliant content rejected: {}", msg)
            }
            EngineError::TurnViolation { expected, got } => {
                write!(f, "out of turn: expected {}, got {}", expected, got)
            }
            EngineError::Transport { kind, detail } => {
                write!(f, "{}: {}", kind.user_reason(), detail)
            }
            EngineError::IdConflict {
                reason,
                offending_id,
            } => write!(f, "juror id conflict ({}): id {}", reason, offending_id),
            EngineError::ActionPending(phase) => {
                write!(f, "an action for phase {} is already pending", phase)
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(TransportKind::from_status(503), TransportKind::Server);
        assert_eq!(TransportKind::from_status(429), TransportKind::RateLimited);
        assert_eq!(TransportKind::from_status(401), TransportKind::Auth);
        assert_eq!(TransportKind::from_status(404), TransportKind::Other);
    }
}
