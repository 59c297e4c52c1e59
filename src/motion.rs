//! Pre-trial motion exchange state machine.
//!
//! motion_submission -> rebuttal_submission -> motion_ruling_locked.
//! The motion is always the defense's and the rebuttal always the
//! prosecution's, regardless of which side the human plays. Transitions are
//! a match on (phase, event); anything else is rejected without touching
//! state.

use serde::{Deserialize, Serialize};

use crate::docket::{CaseDocket, EvidenceStatus, Role};
use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionPhase {
    MotionSubmission,
    RebuttalSubmission,
    MotionRulingLocked,
}

/// Evidence admissibility change carried by a ruling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceUpdate {
    pub id: u32,
    pub status: EvidenceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionRuling {
    pub text: String,
    pub evidence_updates: Vec<EvidenceUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionExchangeState {
    pub motion_text: String,
    /// Fixed at creation; never Prosecution.
    pub motion_by: Role,
    pub rebuttal_text: String,
    /// Fixed at creation; never Defense.
    pub rebuttal_by: Role,
    pub ruling: Option<String>,
    pub phase: MotionPhase,
    pub locked: bool,
}

impl Default for MotionExchangeState {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionExchangeState {
    pub fn new() -> Self {
        Self {
            motion_text: String::new(),
            motion_by: Role::Defense,
            rebuttal_text: String::new(),
            rebuttal_by: Role::Prosecution,
            ruling: None,
            phase: MotionPhase::MotionSubmission,
            locked: false,
        }
    }

    /// The role whose submission the current step expects, if any.
    pub fn expected_role(&self) -> Option<Role> {
        match self.phase {
            MotionPhase::MotionSubmission => Some(self.motion_by),
            MotionPhase::RebuttalSubmission => Some(self.rebuttal_by),
            MotionPhase::MotionRulingLocked => None,
        }
    }

    /// Accepts a human submission only when the step's expected role equals
    /// the player's configured role. Wrong-role input is a TurnViolation and
    /// state is unchanged.
    pub fn submit_human(&mut self, player_role: Role, text: String) -> Result<(), EngineError> {
        match self.expected_role() {
            Some(expected) if expected == player_role => {
                self.accept(text);
                Ok(())
            }
            Some(expected) => Err(EngineError::TurnViolation {
                expected: expected.as_str().to_string(),
                got: player_role.as_str().to_string(),
            }),
            None => Err(EngineError::TurnViolation {
                expected: "none (ruling locked)".to_string(),
                got: player_role.as_str().to_string(),
            }),
        }
    }

    /// Accepts a model draft for the non-player role, fully replacing the
    /// field for that step.
    pub fn submit_model(&mut self, player_role: Role, text: String) -> Result<(), EngineError> {
        match self.expected_role() {
            Some(expected) if expected != player_role => {
                self.accept(text);
                Ok(())
            }
            Some(expected) => Err(EngineError::TurnViolation {
                expected: expected.opposing().as_str().to_string(),
                got: expected.as_str().to_string(),
            }),
            None => Err(EngineError::Validation(
                "motion ruling already locked".to_string(),
            )),
        }
    }

    fn accept(&mut self, text: String) {
        match self.phase {
            MotionPhase::MotionSubmission => {
                self.motion_text = text;
                self.phase = MotionPhase::RebuttalSubmission;
            }
            MotionPhase::RebuttalSubmission => {
                self.rebuttal_text = text;
            }
            MotionPhase::MotionRulingLocked => {}
        }
    }

    /// Both sides must be on the record before the judge rules.
    pub fn ready_for_ruling(&self) -> bool {
        !self.locked && !self.motion_text.is_empty() && !self.rebuttal_text.is_empty()
    }

    /// Atomically records the ruling, applies its evidence-status updates to
    /// the docket, and locks the phase. A second call is a no-op.
    pub fn apply_ruling(&mut self, docket: &mut CaseDocket, ruling: MotionRuling) {
        if self.locked {
            return;
        }
        for upd in &ruling.evidence_updates {
            docket.set_evidence_status(upd.id, upd.status);
        }
        self.ruling = Some(ruling.text);
        self.phase = MotionPhase::MotionRulingLocked;
        self.locked = true;
    }
}
