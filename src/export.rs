//! Flattened text rendition of a session, for clipboard and file export.
//!
//! Sections appear in docket order. The same terminal short-circuit the
//! disposition resolver enforces applies here: once a pre-trial motion
//! settles the case, nothing after the motion section is rendered.

use std::fmt::Write;

use crate::disposition::{DispositionRecord, DispositionSource};
use crate::docket::{CaseDocket, EvidenceStatus, JurorStatus};
use crate::motion::MotionExchangeState;
use crate::verdict::TrialPhase;

fn juror_status_label(status: JurorStatus) -> &'static str {
    match status {
        JurorStatus::Eligible => "eligible",
        JurorStatus::StruckByPlayer => "struck (player)",
        JurorStatus::StruckByOpponent => "struck (opponent)",
        JurorStatus::Seated => "seated",
    }
}

pub fn export_session(
    docket: &CaseDocket,
    motion: &MotionExchangeState,
    trial: &TrialPhase,
    disposition: Option<&DispositionRecord>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", docket.title);
    let _ = writeln!(out, "Defendant: {}", docket.defendant);
    let _ = writeln!(out, "Charge: {}", docket.charge);
    let _ = writeln!(out, "Presiding: {}", docket.judge);

    let _ = writeln!(out, "\n-- Facts --");
    for (i, fact) in docket.facts.iter().enumerate() {
        let _ = writeln!(out, "fact {}: {}", i + 1, fact);
    }

    let _ = writeln!(out, "\n-- Evidence --");
    for ev in &docket.evidence {
        let status = match ev.status {
            EvidenceStatus::Admissible => "admissible",
            EvidenceStatus::Suppressed => "SUPPRESSED",
        };
        let _ = writeln!(out, "evidence {} [{}]: {}", ev.id, status, ev.text);
    }

    let _ = writeln!(out, "\n-- Witnesses --");
    for (i, w) in docket.witnesses.iter().enumerate() {
        let _ = writeln!(out, "witness {}: {}", i + 1, w);
    }

    let _ = writeln!(out, "\n-- Jury --");
    for j in &docket.jurors {
        let _ = writeln!(
            out,
            "juror {}: {} ({}, {}) - {}",
            j.id,
            j.name,
            j.age,
            j.job,
            juror_status_label(j.status)
        );
    }

    if !motion.motion_text.is_empty() {
        let _ = writeln!(out, "\n-- Pre-trial Motion --");
        let _ = writeln!(out, "motion ({}): {}", motion.motion_by.as_str(), motion.motion_text);
        if !motion.rebuttal_text.is_empty() {
            let _ = writeln!(
                out,
                "rebuttal ({}): {}",
                motion.rebuttal_by.as_str(),
                motion.rebuttal_text
            );
        }
        if let Some(ruling) = &motion.ruling {
            let _ = writeln!(out, "ruling 1: {}", ruling);
        }
    }

    // a motion-sourced disposition ends the rendition here
    if let Some(d) = disposition {
        if d.source == DispositionSource::Motion {
            let _ = writeln!(out, "\n-- Disposition --");
            let _ = writeln!(out, "{:?}: {}", d.outcome, d.summary);
            return out;
        }
    }

    if let Some(verdict) = &trial.verdict {
        let _ = writeln!(out, "\n-- Verdict --");
        let _ = writeln!(out, "final ruling: {}", verdict.final_ruling);
        let _ = writeln!(out, "judge's opinion: {}", verdict.judge_opinion);
        let _ = writeln!(out, "jury's reasoning: {}", verdict.jury_reasoning);
    }

    if let Some(d) = disposition {
        let _ = writeln!(out, "\n-- Disposition --");
        let _ = writeln!(out, "{:?}: {}", d.outcome, d.summary);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disposition::{DispositionRecord, Outcome};
    use crate::docket::{Evidence, Juror};
    use crate::verdict::VerdictPayload;

    fn docket() -> CaseDocket {
        CaseDocket {
            title: "State v. Hale".into(),
            defendant: "N. Hale".into(),
            charge: "arson".into(),
            judge: "Hon. I. Sorel".into(),
            jurors: vec![Juror {
                id: 1,
                name: "P. Voss".into(),
                age: 52,
                job: "plumber".into(),
                bias_hint: String::new(),
                hidden_bias: String::new(),
                status: JurorStatus::Seated,
                status_history: vec![JurorStatus::Eligible, JurorStatus::Seated],
            }],
            facts: vec!["the fire started at night".into()],
            witnesses: vec!["K. Odum".into()],
            evidence: vec![Evidence {
                id: 1,
                text: "accelerant can".into(),
                status: EvidenceStatus::Suppressed,
            }],
        }
    }

    #[test]
    fn motion_dismissal_short_circuits_the_rendition() {
        let mut motion = MotionExchangeState::new();
        motion.motion_text = "motion to dismiss".into();
        motion.rebuttal_text = "opposed".into();
        motion.ruling = Some("dismissed with prejudice".into());

        let mut trial = TrialPhase::default();
        trial.verdict = Some(VerdictPayload {
            final_ruling: "guilty".into(),
            judge_opinion: "should never render".into(),
            jury_reasoning: "should never render".into(),
        });

        let disposition = DispositionRecord {
            outcome: Outcome::DismissedWithPrejudice,
            source: DispositionSource::Motion,
            summary: "case dismissed on pre-trial motion".into(),
            details: String::new(),
        };

        let text = export_session(&docket(), &motion, &trial, Some(&disposition));
        assert!(text.contains("ruling 1: dismissed with prejudice"));
        assert!(text.contains("Disposition"));
        assert!(!text.contains("should never render"));
    }

    #[test]
    fn full_trial_renders_verdict_and_suppression_status() {
        let motion = MotionExchangeState::new();
        let mut trial = TrialPhase::default();
        trial.verdict = Some(VerdictPayload {
            final_ruling: "not guilty".into(),
            judge_opinion: "the record is thin".into(),
            jury_reasoning: "reasonable doubt".into(),
        });
        let disposition = DispositionRecord {
            outcome: Outcome::NotGuilty,
            source: DispositionSource::Verdict,
            summary: "verdict: NotGuilty".into(),
            details: String::new(),
        };
        let text = export_session(&docket(), &motion, &trial, Some(&disposition));
        assert!(text.contains("evidence 1 [SUPPRESSED]"));
        assert!(text.contains("final ruling: not guilty"));
        assert!(text.contains("NotGuilty"));
    }
}
