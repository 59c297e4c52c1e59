//! Case docket data model.
//!
//! The docket is the validation ground truth for a session: every juror,
//! fact, witness and piece of evidence the model is allowed to reference
//! lives here. Facts are 1-indexed and immutable after creation; evidence
//! admissibility is the only field that changes once a case exists.

use serde::{Deserialize, Serialize};

/// Which side a participant argues for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Defense,
    Prosecution,
}

impl Role {
    pub fn opposing(self) -> Role {
        match self {
            Role::Defense => Role::Prosecution,
            Role::Prosecution => Role::Defense,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Defense => "defense",
            Role::Prosecution => "prosecution",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    Admissible,
    Suppressed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub id: u32,
    pub text: String,
    pub status: EvidenceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JurorStatus {
    Eligible,
    StruckByPlayer,
    StruckByOpponent,
    Seated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Juror {
    /// Unique positive id, fixed at creation, never reassigned.
    pub id: u32,
    pub name: String,
    pub age: u32,
    pub job: String,
    pub bias_hint: String,
    /// Known to the engine, withheld from the player until voir dire closes.
    pub hidden_bias: String,
    pub status: JurorStatus,
    /// Append-only; consecutive duplicate statuses are collapsed.
    pub status_history: Vec<JurorStatus>,
}

impl Juror {
    pub fn set_status(&mut self, status: JurorStatus) {
        if self.status_history.last() != Some(&status) {
            self.status_history.push(status);
        }
        self.status = status;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocket {
    pub title: String,
    pub defendant: String,
    pub charge: String,
    pub judge: String,
    pub jurors: Vec<Juror>,
    /// 1-indexed by position; immutable after creation.
    pub facts: Vec<String>,
    pub witnesses: Vec<String>,
    pub evidence: Vec<Evidence>,
}

impl CaseDocket {
    pub fn evidence_by_id(&self, id: u32) -> Option<&Evidence> {
        self.evidence.iter().find(|e| e.id == id)
    }

    pub fn juror_by_id(&self, id: u32) -> Option<&Juror> {
        self.jurors.iter().find(|j| j.id == id)
    }

    pub fn juror_by_id_mut(&mut self, id: u32) -> Option<&mut Juror> {
        self.jurors.iter_mut().find(|j| j.id == id)
    }

    /// Flips evidence status in place. Unknown ids are ignored rather than
    /// erroring: rulings may reference evidence already in the requested
    /// state or text the payload validator has already flagged.
    pub fn set_evidence_status(&mut self, id: u32, status: EvidenceStatus) {
        if let Some(ev) = self.evidence.iter_mut().find(|e| e.id == id) {
            ev.status = status;
        }
    }
}
