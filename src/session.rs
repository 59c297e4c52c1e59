//! Session orchestrator.
//!
//! One engine instance drives one logical session: a case advances through
//! voir dire, the motion exchange, trial argument and verdict, while the
//! sanctions engine runs alongside and outlives the case. Every model
//! response is parsed and reference-validated before any field changes, and
//! all mutation is whole-object replacement so a failed step leaves nothing
//! half-applied. One action per phase may be in flight at a time.

use std::sync::Arc;

use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::disposition::{self, DispositionRecord, Outcome};
use crate::docket::{CaseDocket, Role};
use crate::errors::EngineError;
use crate::jury::JuryPhase;
use crate::logging::{self, obj, v_str, v_text, Domain, Level};
use crate::model::payloads;
use crate::model::{CounselModel, ModelRequest};
use crate::motion::MotionExchangeState;
use crate::reference::{self, ValidationRecord};
use crate::registry::DocketRegistry;
use crate::sanctions::{SanctionsEngine, SanctionsState, Visibility};
use crate::storage::{ProfileSnapshot, ProfileStats, ProfileStore, RunRecord};
use crate::verdict::TrialPhase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    CaseGeneration,
    JurySelection,
    OpponentDraft,
    MotionRuling,
    Verdict,
}

impl PhaseAction {
    fn as_str(self) -> &'static str {
        match self {
            PhaseAction::CaseGeneration => "case_generation",
            PhaseAction::JurySelection => "jury_selection",
            PhaseAction::OpponentDraft => "opponent_draft",
            PhaseAction::MotionRuling => "motion_ruling",
            PhaseAction::Verdict => "verdict",
        }
    }
}

/// Reschedulable one-shot timer for sanctions expiry. Only the nearest
/// expiry is ever armed; state reads are lazy so the wake only has to
/// surface the change.
#[derive(Default)]
struct WakeTimer {
    handle: Option<JoinHandle<()>>,
}

impl WakeTimer {
    fn reschedule(&mut self, delay_ms: u64) {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            sleep(Duration::from_millis(delay_ms)).await;
            logging::log(
                Level::Info,
                Domain::Sanctions,
                "expiry_wake",
                obj(&[("delay_ms", json!(delay_ms))]),
            );
        }));
    }

    fn cancel(&mut self) {
        if let Some(h) = self.handle.take() {
            h.abort();
        }
    }
}

impl Drop for WakeTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub struct SessionEngine {
    player_role: Role,
    model: Arc<dyn CounselModel>,
    docket: Option<CaseDocket>,
    jury: JuryPhase,
    motion: MotionExchangeState,
    trial: TrialPhase,
    disposition: Option<DispositionRecord>,
    validations: Vec<ValidationRecord>,
    next_validation_id: u64,
    sanctions: SanctionsEngine,
    stats: ProfileStats,
    achievements: Vec<String>,
    pending: Option<PhaseAction>,
    wake: WakeTimer,
}

impl SessionEngine {
    pub fn new(model: Arc<dyn CounselModel>, player_role: Role, sanctions: SanctionsEngine) -> Self {
        Self {
            player_role,
            model,
            docket: None,
            jury: JuryPhase::default(),
            motion: MotionExchangeState::new(),
            trial: TrialPhase::default(),
            disposition: None,
            validations: Vec::new(),
            next_validation_id: 1,
            sanctions,
            stats: ProfileStats::default(),
            achievements: Vec::new(),
            pending: None,
            wake: WakeTimer::default(),
        }
    }

    pub fn player_role(&self) -> Role {
        self.player_role
    }

    pub fn docket(&self) -> Option<&CaseDocket> {
        self.docket.as_ref()
    }

    pub fn jury(&self) -> &JuryPhase {
        &self.jury
    }

    pub fn motion(&self) -> &MotionExchangeState {
        &self.motion
    }

    pub fn trial(&self) -> &TrialPhase {
        &self.trial
    }

    pub fn disposition(&self) -> Option<&DispositionRecord> {
        self.disposition.as_ref()
    }

    pub fn validations(&self) -> &[ValidationRecord] {
        &self.validations
    }

    pub fn sanctions_state(&self, now_ms: u64) -> SanctionsState {
        self.sanctions.current(now_ms)
    }

    fn registry(&self) -> Result<DocketRegistry, EngineError> {
        let docket = self
            .docket
            .as_ref()
            .ok_or_else(|| EngineError::Validation("no case loaded".to_string()))?;
        Ok(DocketRegistry::build(docket, &self.motion))
    }

    fn begin(&mut self, action: PhaseAction) -> Result<(), EngineError> {
        if let Some(pending) = self.pending {
            return Err(EngineError::ActionPending(pending.as_str().to_string()));
        }
        self.pending = Some(action);
        Ok(())
    }

    fn finish(&mut self) {
        self.pending = None;
    }

    async fn call_model(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<serde_json::Value, EngineError> {
        self.model
            .complete(ModelRequest {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
            })
            .await
    }

    fn record_validation(&mut self, text: &str, phase: &str, submitted_by: &str) -> Result<ValidationRecord, EngineError> {
        let registry = self.registry()?;
        let rec = reference::validate(
            text,
            &registry,
            self.next_validation_id,
            phase,
            submitted_by,
            logging::ts_epoch_ms(),
        );
        self.next_validation_id += 1;
        logging::log(
            Level::Debug,
            Domain::Session,
            "validation",
            obj(&[
                ("phase", v_str(phase)),
                ("classification", json!(rec.classification)),
                ("text", v_text(text)),
            ]),
        );
        if reference::has_any_rejection(&rec) {
            logging::log(
                Level::Warn,
                Domain::Session,
                "references_rejected",
                obj(&[
                    ("phase", v_str(phase)),
                    ("redacted", v_text(&reference::redact(text, &rec))),
                ]),
            );
        }
        self.validations.push(rec.clone());
        Ok(rec)
    }

    /// Generates a fresh case, discarding the previous one entirely. The
    /// sanctions engine, stats and achievements persist across cases.
    pub async fn new_case(&mut self, theme: &str) -> Result<(), EngineError> {
        self.begin(PhaseAction::CaseGeneration)?;
        let result = self
            .call_model(
                "You are the clerk of a criminal court. Produce one case as a JSON object.",
                &format!("Generate a case docket. Theme: {}", theme),
            )
            .await
            .and_then(payloads::parse_case);
        self.finish();
        let docket = result?;

        logging::log(
            Level::Info,
            Domain::Docket,
            "case_created",
            obj(&[
                ("title", v_str(&docket.title)),
                ("jurors", json!(docket.jurors.len())),
                ("facts", json!(docket.facts.len())),
            ]),
        );
        self.docket = Some(docket);
        self.jury = JuryPhase::default();
        self.motion = MotionExchangeState::new();
        self.trial = TrialPhase::default();
        self.disposition = None;
        self.validations.clear();
        Ok(())
    }

    /// Runs one voir dire round: the player's strikes go in the prompt, the
    /// model answers with its strikes and the seated panel, and both lists
    /// are validated before any juror status changes.
    pub async fn run_jury_selection(&mut self, player_strikes: Vec<u32>) -> Result<(), EngineError> {
        if self.jury.locked {
            return Ok(());
        }
        self.begin(PhaseAction::JurySelection)?;
        let result = self
            .call_model(
                "You are opposing counsel during jury selection. Answer with JSON.",
                &format!("Player strikes jurors {:?}. Return your strikes and the seated panel.", player_strikes),
            )
            .await
            .and_then(payloads::parse_jury_strike);
        self.finish();
        let picks = result?;

        let docket = self
            .docket
            .as_mut()
            .ok_or_else(|| EngineError::Validation("no case loaded".to_string()))?;
        let outcome = self.jury.apply_selection(
            docket,
            player_strikes,
            picks.opponent_strikes,
            picks.seated,
        );
        match &outcome {
            Ok(()) => logging::log(
                Level::Info,
                Domain::Jury,
                "panel_locked",
                obj(&[("seated", json!(self.jury.seated))]),
            ),
            Err(e) => logging::log(
                Level::Warn,
                Domain::Jury,
                "invalid_strike",
                obj(&[("error", v_str(&e.to_string()))]),
            ),
        }
        outcome
    }

    /// Human submission for the current motion step. Wrong-role input is a
    /// TurnViolation before anything changes.
    pub fn submit_motion_text(&mut self, text: String) -> Result<ValidationRecord, EngineError> {
        if self.docket.is_none() {
            return Err(EngineError::Validation("no case loaded".to_string()));
        }
        let phase = self.motion.phase;
        self.motion.submit_human(self.player_role, text.clone())?;
        self.record_validation(&text, &format!("{:?}", phase), self.player_role.as_str())
    }

    /// Asks the model to draft the opposing side's submission for the
    /// current step.
    pub async fn draft_opponent_submission(&mut self) -> Result<ValidationRecord, EngineError> {
        let Some(expected) = self.motion.expected_role() else {
            return Err(EngineError::Validation("motion ruling already locked".to_string()));
        };
        if expected == self.player_role {
            return Err(EngineError::TurnViolation {
                expected: expected.as_str().to_string(),
                got: expected.opposing().as_str().to_string(),
            });
        }
        self.begin(PhaseAction::OpponentDraft)?;
        let result = self
            .call_model(
                &format!("You are {} counsel. Answer with JSON.", expected.as_str()),
                &format!(
                    "Draft the {} for this exchange. Motion so far: {}",
                    if self.motion.motion_text.is_empty() { "motion" } else { "rebuttal" },
                    self.motion.motion_text
                ),
            )
            .await
            .and_then(payloads::parse_motion_draft);
        self.finish();
        let draft = result?;

        // model text with invented or suppressed citations is accepted only
        // after those spans are struck
        let phase = self.motion.phase;
        let rec = self.record_validation(&draft.text, &format!("{:?}", phase), expected.as_str())?;
        let accepted = reference::redact(&draft.text, &rec);
        self.motion.submit_model(self.player_role, accepted)?;
        Ok(rec)
    }

    /// Requests the judge's ruling on the completed exchange. A second
    /// request after lock is a no-op.
    pub async fn request_motion_ruling(&mut self) -> Result<(), EngineError> {
        if self.motion.locked {
            return Ok(());
        }
        if !self.motion.ready_for_ruling() {
            return Err(EngineError::Validation(
                "motion and rebuttal must both be on the record".to_string(),
            ));
        }
        self.begin(PhaseAction::MotionRuling)?;
        let result = self
            .call_model(
                "You are the presiding judge. Rule on the motion with JSON.",
                &format!(
                    "Motion: {}\nRebuttal: {}",
                    self.motion.motion_text, self.motion.rebuttal_text
                ),
            )
            .await
            .and_then(payloads::parse_motion_ruling);
        self.finish();
        let ruling = result?;

        // clone, mutate, swap: a ruling either lands whole or not at all
        let mut next_docket = self
            .docket
            .clone()
            .ok_or_else(|| EngineError::Validation("no case loaded".to_string()))?;
        let mut next_motion = self.motion.clone();
        next_motion.apply_ruling(&mut next_docket, ruling);

        let ruling_text = next_motion.ruling.clone().unwrap_or_default();
        self.docket = Some(next_docket);
        self.motion = next_motion;
        logging::log(
            Level::Info,
            Domain::Motion,
            "ruling_locked",
            obj(&[("ruling", v_text(&ruling_text))]),
        );
        self.record_validation(&ruling_text, "motion_ruling", "judge")?;

        let next = disposition::derive_from_motion(&self.motion);
        self.settle(next);
        Ok(())
    }

    /// Requests the verdict and routes it through the admissibility guard.
    /// Non-compliant verdicts are recorded and rejected; the phase stays
    /// open for resubmission.
    pub async fn request_verdict(&mut self, closing_argument: &str) -> Result<(), EngineError> {
        if self.disposition.is_some() {
            return Ok(());
        }
        if self.trial.locked {
            return Ok(());
        }
        if !self.motion.locked {
            return Err(EngineError::Validation(
                "pre-trial motions are still unresolved".to_string(),
            ));
        }
        self.begin(PhaseAction::Verdict)?;
        let result = self
            .call_model(
                "You are judge and jury. Deliver the verdict as JSON.",
                &format!("Closing argument: {}", closing_argument),
            )
            .await
            .and_then(payloads::parse_verdict);
        self.finish();
        let payload = result?;

        let registry = self.registry()?;
        let now = logging::ts_epoch_ms();
        let id = self.next_validation_id;
        self.next_validation_id += 1;
        let (committed, validation) = self.trial.try_commit(payload, &registry, id, now);
        self.validations.push(validation.clone());

        if !committed {
            logging::log(
                Level::Warn,
                Domain::Verdict,
                "verdict_rejected",
                obj(&[
                    ("classification", json!(validation.classification)),
                    ("rejections", json!(self.trial.rejected_verdicts.len())),
                ]),
            );
            return Err(EngineError::ComplianceRejection(format!(
                "verdict cited unresolved or suppressed material ({:?})",
                validation.classification
            )));
        }

        let final_ruling = self
            .trial
            .verdict
            .as_ref()
            .map(|v| v.final_ruling.clone())
            .unwrap_or_default();
        logging::log(
            Level::Info,
            Domain::Verdict,
            "verdict_committed",
            obj(&[("final_ruling", v_text(&final_ruling))]),
        );
        let next = disposition::derive_from_verdict(&final_ruling);
        self.settle(next);
        Ok(())
    }

    /// Routes a candidate disposition through the terminal guard and wires
    /// its sanctions side effects.
    fn settle(&mut self, next: Option<DispositionRecord>) {
        let was_settled = self.disposition.is_some();
        self.disposition = disposition::guard(self.disposition.take(), next);
        if was_settled {
            return;
        }
        let Some(d) = self.disposition.clone() else {
            return;
        };
        let now = logging::ts_epoch_ms();
        logging::log(
            Level::Info,
            Domain::Session,
            "case_settled",
            obj(&[("outcome", json!(d.outcome)), ("source", json!(d.source))]),
        );
        if d.outcome == Outcome::MistrialConduct {
            self.sanctions
                .record("mistrial_conduct", &d.details, Visibility::Public, now);
        }
        if d.outcome.favors_defense()
            && self.sanctions.current(now).state == crate::sanctions::ConductState::PublicDefender
        {
            self.sanctions.merit_release(now);
        }
        self.reschedule_wake(now);
        self.update_stats(d.outcome);
    }

    /// Records a conduct finding against the player and re-arms the expiry
    /// wake for the new state.
    pub fn register_conduct(&mut self, trigger: &str, docket_text: &str, now_ms: u64) -> SanctionsState {
        let state = self
            .sanctions
            .record(trigger, docket_text, Visibility::Public, now_ms);
        logging::log(
            Level::Info,
            Domain::Sanctions,
            "conduct_recorded",
            obj(&[
                ("trigger", v_str(trigger)),
                ("state", json!(state.state)),
                ("level", json!(state.level())),
            ]),
        );
        self.reschedule_wake(now_ms);
        state
    }

    fn reschedule_wake(&mut self, now_ms: u64) {
        match self.sanctions.next_expiry(now_ms) {
            Some(expiry) if expiry > now_ms => self.wake.reschedule(expiry - now_ms),
            _ => self.wake.cancel(),
        }
    }

    fn update_stats(&mut self, outcome: Outcome) {
        self.stats.cases_played += 1;
        let player_won = match self.player_role {
            Role::Defense => outcome.favors_defense(),
            Role::Prosecution => outcome == Outcome::Guilty,
        };
        if player_won {
            self.stats.cases_won += 1;
        } else {
            self.stats.cases_lost += 1;
        }
        match outcome {
            Outcome::Guilty => self.stats.guilty_verdicts += 1,
            Outcome::NotGuilty => self.stats.not_guilty_verdicts += 1,
            Outcome::MistrialHungJury | Outcome::MistrialConduct => self.stats.mistrials += 1,
            _ => self.stats.dismissals += 1,
        }
        if self.stats.not_guilty_verdicts == 1 && !self.achievements.iter().any(|a| a == "first_acquittal") {
            self.achievements.push("first_acquittal".to_string());
        }
    }

    /// Current profile snapshot for persistence.
    pub fn snapshot(&self, now_ms: u64) -> ProfileSnapshot {
        let current = self.sanctions.current(now_ms);
        ProfileSnapshot {
            sanctions: self.sanctions.log().to_vec(),
            reinstatement: current.recently_reinstated_until,
            pd_status: Some(current),
            stats: self.stats.clone(),
            achievements: self.achievements.clone(),
        }
    }

    /// Persists the profile and, if the case is settled, a run-history entry.
    pub fn persist(&self, store: &mut ProfileStore, now_ms: u64) -> anyhow::Result<()> {
        store.save_profile(&self.snapshot(now_ms))?;
        if let (Some(docket), Some(d)) = (&self.docket, &self.disposition) {
            store.push_run(&RunRecord {
                ts_ms: now_ms,
                title: docket.title.clone(),
                outcome: Some(d.outcome),
                role: self.player_role,
            })?;
        }
        logging::log(
            Level::Debug,
            Domain::Storage,
            "profile_saved",
            obj(&[("cases_played", json!(self.stats.cases_played))]),
        );
        Ok(())
    }

    /// Rehydrates stats and achievements from a persisted snapshot. The
    /// sanctions engine itself is rebuilt by the caller from the same
    /// snapshot's log.
    pub fn restore_profile(&mut self, snapshot: &ProfileSnapshot) {
        self.stats = snapshot.stats.clone();
        self.achievements = snapshot.achievements.clone();
    }
}
