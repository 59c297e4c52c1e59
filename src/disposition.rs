//! Disposition resolver: classifies ruling/verdict text into a canonical
//! outcome and latches the first terminal result. Once a case is settled,
//! nothing downstream may overwrite it; `guard` is the single chokepoint
//! enforcing that.

use serde::{Deserialize, Serialize};

use crate::motion::MotionExchangeState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Guilty,
    NotGuilty,
    MistrialHungJury,
    MistrialConduct,
    Dismissed,
    DismissedWithPrejudice,
    DismissedWithoutPrejudice,
}

impl Outcome {
    /// Whether the defendant walks. Drives merit-based sanctions release.
    pub fn favors_defense(self) -> bool {
        !matches!(self, Outcome::Guilty | Outcome::MistrialHungJury | Outcome::MistrialConduct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispositionSource {
    Motion,
    Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispositionRecord {
    pub outcome: Outcome,
    pub source: DispositionSource,
    pub summary: String,
    pub details: String,
}

/// Every classified outcome ends the case.
pub fn is_terminal(current: Option<&DispositionRecord>) -> bool {
    current.is_some()
}

/// Returns `current` untouched whenever it is already terminal. This is the
/// invariant that keeps a verdict from overwriting a pre-trial dismissal.
pub fn guard(
    current: Option<DispositionRecord>,
    next: Option<DispositionRecord>,
) -> Option<DispositionRecord> {
    if current.is_some() {
        current
    } else {
        next
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

fn classify_dismissal(text: &str) -> Option<Outcome> {
    if !contains(text, "dismiss") {
        return None;
    }
    if contains(text, "with prejudice") {
        Some(Outcome::DismissedWithPrejudice)
    } else if contains(text, "without prejudice") {
        Some(Outcome::DismissedWithoutPrejudice)
    } else {
        Some(Outcome::Dismissed)
    }
}

/// Fires only for dismissal-class rulings; denial or suppression rulings
/// leave the case running.
pub fn derive_from_motion(motion: &MotionExchangeState) -> Option<DispositionRecord> {
    let ruling = motion.ruling.as_deref()?;
    let outcome = classify_dismissal(ruling)?;
    Some(DispositionRecord {
        outcome,
        source: DispositionSource::Motion,
        summary: "case dismissed on pre-trial motion".to_string(),
        details: ruling.to_string(),
    })
}

/// Classifies the final-ruling text of a committed verdict.
pub fn derive_from_verdict(final_ruling: &str) -> Option<DispositionRecord> {
    let outcome = if contains(final_ruling, "mistrial") {
        if contains(final_ruling, "misconduct") || contains(final_ruling, "conduct") {
            Outcome::MistrialConduct
        } else {
            Outcome::MistrialHungJury
        }
    } else if contains(final_ruling, "hung jury") {
        Outcome::MistrialHungJury
    } else if let Some(d) = classify_dismissal(final_ruling) {
        d
    } else if contains(final_ruling, "not guilty") || contains(final_ruling, "acquit") {
        Outcome::NotGuilty
    } else if contains(final_ruling, "guilty") {
        Outcome::Guilty
    } else {
        return None;
    };
    Some(DispositionRecord {
        outcome,
        source: DispositionSource::Verdict,
        summary: format!("verdict: {:?}", outcome),
        details: final_ruling.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(outcome: Outcome) -> DispositionRecord {
        DispositionRecord {
            outcome,
            source: DispositionSource::Verdict,
            summary: String::new(),
            details: String::new(),
        }
    }

    #[test]
    fn guard_never_replaces_a_terminal_disposition() {
        let settled = guard(Some(rec(Outcome::Dismissed)), Some(rec(Outcome::Guilty)));
        assert_eq!(settled.unwrap().outcome, Outcome::Dismissed);

        let first = guard(None, Some(rec(Outcome::Guilty)));
        assert_eq!(first.unwrap().outcome, Outcome::Guilty);

        // idempotent under repeated application
        let again = guard(Some(rec(Outcome::Dismissed)), None);
        assert_eq!(again.unwrap().outcome, Outcome::Dismissed);
    }

    #[test]
    fn verdict_classification() {
        assert_eq!(
            derive_from_verdict("the defendant is NOT GUILTY").unwrap().outcome,
            Outcome::NotGuilty
        );
        assert_eq!(
            derive_from_verdict("we find the defendant guilty").unwrap().outcome,
            Outcome::Guilty
        );
        assert_eq!(
            derive_from_verdict("mistrial: the jury is hopelessly deadlocked")
                .unwrap()
                .outcome,
            Outcome::MistrialHungJury
        );
        assert_eq!(
            derive_from_verdict("mistrial declared due to prosecutorial misconduct")
                .unwrap()
                .outcome,
            Outcome::MistrialConduct
        );
        assert_eq!(
            derive_from_verdict("case dismissed with prejudice").unwrap().outcome,
            Outcome::DismissedWithPrejudice
        );
        assert!(derive_from_verdict("closing arguments continue").is_none());
    }

    #[test]
    fn motion_disposition_only_for_dismissals() {
        let mut m = MotionExchangeState::new();
        m.ruling = Some("motion denied; evidence stands".into());
        assert!(derive_from_motion(&m).is_none());

        m.ruling = Some("motion granted, case dismissed without prejudice".into());
        let rec = derive_from_motion(&m).unwrap();
        assert_eq!(rec.outcome, Outcome::DismissedWithoutPrejudice);
        assert_eq!(rec.source, DispositionSource::Motion);
    }
}
