//! Reference validator and redactor.
//!
//! Model output is untrusted: it cites facts, evidence, witnesses, jurors
//! and rulings by number, and any citation that does not resolve against the
//! live registry is either invented or suppressed material. The scanner is a
//! small hand-rolled tokenizer (no regex dependency): keyword, optional `#`,
//! digits, case-insensitive, word-bounded.
//!
//! Redaction re-scans rather than replaying recorded offsets, so redacting
//! already-redacted text is a no-op by construction: the marker contains no
//! keyword/number pair.

use serde::{Deserialize, Serialize};

use crate::docket::EvidenceStatus;
use crate::registry::DocketRegistry;

pub const REDACTION_MARKER: &str = "[struck from the record]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Fact,
    Evidence,
    Witness,
    Juror,
    Ruling,
}

impl EntityKind {
    const ALL: [(EntityKind, &'static str); 5] = [
        (EntityKind::Evidence, "evidence"),
        (EntityKind::Witness, "witness"),
        (EntityKind::Juror, "juror"),
        (EntityKind::Ruling, "ruling"),
        (EntityKind::Fact, "fact"),
    ];
}

/// One docket mention found in free text, with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub kind: EntityKind,
    pub id: u32,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compliance {
    Compliant,
    PartiallyCompliant,
    NonCompliant,
}

/// Resolution buckets for one entity kind. `inadmissible` is only ever
/// populated for evidence: the id exists but is currently suppressed, which
/// downstream scoring must be able to tell apart from an invented id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefBuckets {
    pub found: Vec<u32>,
    pub missing: Vec<u32>,
    pub inadmissible: Vec<u32>,
}

/// Append-only record of one validation pass. Never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub id: u64,
    pub phase: String,
    pub submitted_by: String,
    pub text: String,
    pub facts: RefBuckets,
    pub evidence: RefBuckets,
    pub witnesses: RefBuckets,
    pub jurors: RefBuckets,
    pub rulings: RefBuckets,
    pub classification: Compliance,
    pub ts_ms: u64,
}

impl ValidationRecord {
    pub fn is_compliant(&self) -> bool {
        self.classification == Compliance::Compliant
    }

    fn buckets(&self, kind: EntityKind) -> &RefBuckets {
        match kind {
            EntityKind::Fact => &self.facts,
            EntityKind::Evidence => &self.evidence,
            EntityKind::Witness => &self.witnesses,
            EntityKind::Juror => &self.jurors,
            EntityKind::Ruling => &self.rulings,
        }
    }

    fn buckets_mut(&mut self, kind: EntityKind) -> &mut RefBuckets {
        match kind {
            EntityKind::Fact => &mut self.facts,
            EntityKind::Evidence => &mut self.evidence,
            EntityKind::Witness => &mut self.witnesses,
            EntityKind::Juror => &mut self.jurors,
            EntityKind::Ruling => &mut self.rulings,
        }
    }

    /// True when this (kind, id) pair failed to resolve cleanly.
    fn rejects(&self, kind: EntityKind, id: u32) -> bool {
        let b = self.buckets(kind);
        b.missing.contains(&id) || b.inadmissible.contains(&id)
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan `text` for entity mentions. ASCII keyword matching keeps byte spans
/// valid in the presence of multi-byte characters elsewhere in the text.
pub fn scan(text: &str) -> Vec<Mention> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if i > 0 && is_word_byte(bytes[i - 1]) {
            i += 1;
            continue;
        }
        let mut matched = None;
        for (kind, kw) in EntityKind::ALL {
            let end = i + kw.len();
            if end <= bytes.len() && bytes[i..end].eq_ignore_ascii_case(kw.as_bytes()) {
                matched = Some((kind, end));
                break;
            }
        }
        let Some((kind, kw_end)) = matched else {
            i += 1;
            continue;
        };
        // keyword must end at a word boundary ("factory" is not "fact")
        if kw_end < bytes.len() && is_word_byte(bytes[kw_end]) {
            i += 1;
            continue;
        }
        let mut j = kw_end;
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'#' {
            j += 1;
            while j < bytes.len() && bytes[j] == b' ' {
                j += 1;
            }
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() && j - digits_start < 9 {
            j += 1;
        }
        if j == digits_start {
            i = kw_end;
            continue;
        }
        // "juror 12b" is prose, not a citation
        if j < bytes.len() && is_word_byte(bytes[j]) {
            i = kw_end;
            continue;
        }
        match text[digits_start..j].parse::<u32>() {
            Ok(id) => {
                out.push(Mention {
                    kind,
                    id,
                    start: i,
                    end: j,
                });
                i = j;
            }
            Err(_) => i = kw_end,
        }
    }
    out
}

/// Validate free text against the registry and produce an append-only record.
pub fn validate(
    text: &str,
    registry: &DocketRegistry,
    id: u64,
    phase: &str,
    submitted_by: &str,
    ts_ms: u64,
) -> ValidationRecord {
    let mut rec = ValidationRecord {
        id,
        phase: phase.to_string(),
        submitted_by: submitted_by.to_string(),
        text: text.to_string(),
        facts: RefBuckets::default(),
        evidence: RefBuckets::default(),
        witnesses: RefBuckets::default(),
        jurors: RefBuckets::default(),
        rulings: RefBuckets::default(),
        classification: Compliance::Compliant,
        ts_ms,
    };

    let mut resolved = 0usize;
    let mut failed = 0usize;
    for m in scan(text) {
        let bucket = rec.buckets_mut(m.kind);
        let ok = match m.kind {
            EntityKind::Fact => registry.facts.contains(&m.id),
            EntityKind::Witness => registry.witnesses.contains(&m.id),
            EntityKind::Juror => registry.jurors.contains(&m.id),
            EntityKind::Ruling => registry.rulings.contains(&m.id),
            EntityKind::Evidence => match registry.evidence.get(&m.id) {
                Some(EvidenceStatus::Admissible) => true,
                Some(EvidenceStatus::Suppressed) => {
                    if !bucket.inadmissible.contains(&m.id) {
                        bucket.inadmissible.push(m.id);
                    }
                    failed += 1;
                    continue;
                }
                None => false,
            },
        };
        if ok {
            if !bucket.found.contains(&m.id) {
                bucket.found.push(m.id);
            }
            resolved += 1;
        } else {
            if !bucket.missing.contains(&m.id) {
                bucket.missing.push(m.id);
            }
            failed += 1;
        }
    }

    rec.classification = match (resolved, failed) {
        (_, 0) => Compliance::Compliant,
        (0, _) => Compliance::NonCompliant,
        _ => Compliance::PartiallyCompliant,
    };
    rec
}

/// Replace every span whose (kind, id) the record rejected with the fixed
/// marker. Spans are re-derived from the input, so applying this to its own
/// output finds nothing to replace.
pub fn redact(text: &str, record: &ValidationRecord) -> String {
    let mentions = scan(text);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for m in mentions {
        if !record.rejects(m.kind, m.id) {
            continue;
        }
        out.push_str(&text[cursor..m.start]);
        out.push_str(REDACTION_MARKER);
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}

pub fn has_any_rejection(record: &ValidationRecord) -> bool {
    [
        &record.facts,
        &record.evidence,
        &record.witnesses,
        &record.jurors,
        &record.rulings,
    ]
    .iter()
    .any(|b| !b.missing.is_empty() || !b.inadmissible.is_empty())
}
