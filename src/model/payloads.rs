//! Per-phase model payload shapes.
//!
//! Every model response parses through one of these before any session
//! state is touched. Parsing is two-stage: serde for shape, then semantic
//! checks (unique positive ids, non-empty required text). Failure at either
//! stage is a ValidationError and the step is aborted whole.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::docket::{CaseDocket, Evidence, EvidenceStatus, Juror, JurorStatus};
use crate::errors::EngineError;
use crate::motion::{EvidenceUpdate, MotionRuling};
use crate::verdict::VerdictPayload;

fn shape<T: for<'de> Deserialize<'de>>(value: Value, what: &str) -> Result<T, EngineError> {
    serde_json::from_value(value)
        .map_err(|e| EngineError::Validation(format!("{} payload: {}", what, e)))
}

fn non_empty(s: &str, field: &str) -> Result<(), EngineError> {
    if s.trim().is_empty() {
        Err(EngineError::Validation(format!("{} is empty", field)))
    } else {
        Ok(())
    }
}

fn unique_positive_ids<I: Iterator<Item = u32>>(ids: I, what: &str) -> Result<(), EngineError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if id == 0 {
            return Err(EngineError::Validation(format!("{} id 0 is not allowed", what)));
        }
        if !seen.insert(id) {
            return Err(EngineError::Validation(format!("duplicate {} id {}", what, id)));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Case generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedJuror {
    pub id: u32,
    pub name: String,
    pub age: u32,
    pub job: String,
    #[serde(default)]
    pub bias_hint: String,
    #[serde(default)]
    pub hidden_bias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedEvidence {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseGenPayload {
    pub title: String,
    pub defendant: String,
    pub charge: String,
    pub judge: String,
    pub facts: Vec<String>,
    pub witnesses: Vec<String>,
    pub evidence: Vec<GeneratedEvidence>,
    pub jurors: Vec<GeneratedJuror>,
}

/// Trust-but-validate: generated ids are taken as-is but must be unique
/// positive integers; everything referenced later resolves against them.
pub fn parse_case(value: Value) -> Result<CaseDocket, EngineError> {
    let p: CaseGenPayload = shape(value, "case generation")?;
    non_empty(&p.title, "title")?;
    non_empty(&p.defendant, "defendant")?;
    non_empty(&p.charge, "charge")?;
    if p.facts.is_empty() {
        return Err(EngineError::Validation("case has no facts".to_string()));
    }
    if p.jurors.is_empty() {
        return Err(EngineError::Validation("case has no juror pool".to_string()));
    }
    unique_positive_ids(p.jurors.iter().map(|j| j.id), "juror")?;
    unique_positive_ids(p.evidence.iter().map(|e| e.id), "evidence")?;

    Ok(CaseDocket {
        title: p.title,
        defendant: p.defendant,
        charge: p.charge,
        judge: p.judge,
        jurors: p
            .jurors
            .into_iter()
            .map(|j| Juror {
                id: j.id,
                name: j.name,
                age: j.age,
                job: j.job,
                bias_hint: j.bias_hint,
                hidden_bias: j.hidden_bias,
                status: JurorStatus::Eligible,
                status_history: vec![JurorStatus::Eligible],
            })
            .collect(),
        facts: p.facts,
        witnesses: p.witnesses,
        evidence: p
            .evidence
            .into_iter()
            .map(|e| Evidence {
                id: e.id,
                text: e.text,
                status: EvidenceStatus::Admissible,
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Jury strike round
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JuryStrikePayload {
    pub opponent_strikes: Vec<u32>,
    pub seated: Vec<u32>,
}

/// Shape only; pool membership is the jury validator's job.
pub fn parse_jury_strike(value: Value) -> Result<JuryStrikePayload, EngineError> {
    shape(value, "jury strike")
}

// ---------------------------------------------------------------------------
// Motion exchange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionDraftPayload {
    pub text: String,
}

pub fn parse_motion_draft(value: Value) -> Result<MotionDraftPayload, EngineError> {
    let p: MotionDraftPayload = shape(value, "motion draft")?;
    non_empty(&p.text, "motion text")?;
    Ok(p)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RulingWire {
    text: String,
    #[serde(default)]
    evidence_updates: Vec<EvidenceUpdateWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EvidenceUpdateWire {
    id: u32,
    status: EvidenceStatus,
}

pub fn parse_motion_ruling(value: Value) -> Result<MotionRuling, EngineError> {
    let p: RulingWire = shape(value, "motion ruling")?;
    non_empty(&p.text, "ruling text")?;
    unique_positive_ids(p.evidence_updates.iter().map(|u| u.id), "evidence update")?;
    Ok(MotionRuling {
        text: p.text,
        evidence_updates: p
            .evidence_updates
            .into_iter()
            .map(|u| EvidenceUpdate {
                id: u.id,
                status: u.status,
            })
            .collect(),
    })
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

pub fn parse_verdict(value: Value) -> Result<VerdictPayload, EngineError> {
    let p: VerdictPayload = shape(value, "verdict")?;
    non_empty(&p.final_ruling, "final_ruling")?;
    Ok(p)
}
