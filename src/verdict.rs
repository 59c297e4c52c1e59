//! Verdict admissibility guard.
//!
//! A verdict is only as good as what it rests on. The full text the judge
//! and jury produced is validated as one unit against the live registry;
//! anything short of fully compliant is logged and bounced, and the trial
//! phase stays open for another attempt. Transport failures never reach
//! this module.

use serde::{Deserialize, Serialize};

use crate::reference::{self, ValidationRecord};
use crate::registry::DocketRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictPayload {
    pub final_ruling: String,
    pub judge_opinion: String,
    pub jury_reasoning: String,
}

impl VerdictPayload {
    /// The single text the guard validates. Field order is fixed so a
    /// replayed payload validates identically.
    pub fn combined_text(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.final_ruling, self.judge_opinion, self.jury_reasoning
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedVerdict {
    pub payload: VerdictPayload,
    pub reason: String,
    pub validation: ValidationRecord,
    pub ts_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrialPhase {
    pub verdict: Option<VerdictPayload>,
    pub locked: bool,
    pub rejected_verdicts: Vec<RejectedVerdict>,
}

impl TrialPhase {
    /// Commits the verdict only when its combined text is fully compliant.
    /// Returns the validation record either way so the caller can append it
    /// to the session log.
    pub fn try_commit(
        &mut self,
        payload: VerdictPayload,
        registry: &DocketRegistry,
        validation_id: u64,
        ts_ms: u64,
    ) -> (bool, ValidationRecord) {
        let validation = reference::validate(
            &payload.combined_text(),
            registry,
            validation_id,
            "verdict",
            "judge",
            ts_ms,
        );
        if validation.is_compliant() && !self.locked {
            self.verdict = Some(payload);
            self.locked = true;
            (true, validation)
        } else {
            let reason = if self.locked {
                "verdict already committed".to_string()
            } else {
                format!("verdict references rejected: {:?}", validation.classification)
            };
            self.rejected_verdicts.push(RejectedVerdict {
                payload,
                reason,
                validation: validation.clone(),
                ts_ms,
            });
            (false, validation)
        }
    }
}
