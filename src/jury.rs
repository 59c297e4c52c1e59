//! Voir dire: strike/seat subset validation and application.
//!
//! The model proposes opponent strikes and a seated panel as raw id lists.
//! Both lists are validated independently against the pool; either failing
//! leaves the phase unlocked with the player's own strikes preserved so the
//! round can be retried without re-entering anything.

use serde::{Deserialize, Serialize};

use crate::docket::{CaseDocket, JurorStatus};
use crate::errors::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetCheck {
    pub valid: bool,
    pub reason: Option<&'static str>,
    pub offending_id: Option<u32>,
}

impl SubsetCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
            offending_id: None,
        }
    }

    fn fail(reason: &'static str, id: u32) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            offending_id: Some(id),
        }
    }
}

/// Rejects intra-list duplicates and ids absent from the pool.
pub fn validate_subset(pool_ids: &[u32], ids: &[u32]) -> SubsetCheck {
    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            return SubsetCheck::fail("duplicate id", *id);
        }
        if !pool_ids.contains(id) {
            return SubsetCheck::fail("unknown id", *id);
        }
    }
    SubsetCheck::ok()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JuryPhase {
    pub player_strikes: Vec<u32>,
    pub opponent_strikes: Vec<u32>,
    pub seated: Vec<u32>,
    pub locked: bool,
    /// Set when the model's lists failed validation; the phase stays open.
    pub invalid_strike: bool,
}

impl JuryPhase {
    /// Applies a full selection round. On any id conflict the docket is
    /// untouched, `invalid_strike` is set, and `player_strikes` is kept so
    /// the player does not lose their picks on retry.
    pub fn apply_selection(
        &mut self,
        docket: &mut CaseDocket,
        player_strikes: Vec<u32>,
        opponent_strikes: Vec<u32>,
        seated: Vec<u32>,
    ) -> Result<(), EngineError> {
        if self.locked {
            return Ok(());
        }
        let pool: Vec<u32> = docket.jurors.iter().map(|j| j.id).collect();
        self.player_strikes = player_strikes;

        for list in [&self.player_strikes, &opponent_strikes, &seated] {
            let check = validate_subset(&pool, list);
            if !check.valid {
                self.invalid_strike = true;
                return Err(EngineError::IdConflict {
                    reason: check.reason.unwrap_or("invalid id").to_string(),
                    offending_id: check.offending_id.unwrap_or(0),
                });
            }
        }

        for id in &self.player_strikes {
            if let Some(j) = docket.juror_by_id_mut(*id) {
                j.set_status(JurorStatus::StruckByPlayer);
            }
        }
        for id in &opponent_strikes {
            if let Some(j) = docket.juror_by_id_mut(*id) {
                j.set_status(JurorStatus::StruckByOpponent);
            }
        }
        for id in &seated {
            if let Some(j) = docket.juror_by_id_mut(*id) {
                j.set_status(JurorStatus::Seated);
            }
        }

        self.opponent_strikes = opponent_strikes;
        self.seated = seated;
        self.invalid_strike = false;
        self.locked = true;
        Ok(())
    }
}
