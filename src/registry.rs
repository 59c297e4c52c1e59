//! Id-set snapshot derived from the current docket and motion state.
//!
//! Rebuilt at every validation call so that evidence suppressed by a motion
//! ruling is invisible to the next validation without any cache plumbing.

use std::collections::{HashMap, HashSet};

use crate::docket::{CaseDocket, EvidenceStatus};
use crate::motion::MotionExchangeState;

#[derive(Debug, Clone, Default)]
pub struct DocketRegistry {
    pub facts: HashSet<u32>,
    pub evidence: HashMap<u32, EvidenceStatus>,
    pub witnesses: HashSet<u32>,
    pub jurors: HashSet<u32>,
    pub rulings: HashSet<u32>,
}

impl DocketRegistry {
    /// Pure function of case + motion state. Rulings are 1-indexed in issue
    /// order, so "ruling 1" resolves once the motion ruling exists.
    pub fn build(docket: &CaseDocket, motion: &MotionExchangeState) -> Self {
        let facts = (1..=docket.facts.len() as u32).collect();
        let evidence = docket.evidence.iter().map(|e| (e.id, e.status)).collect();
        let witnesses = (1..=docket.witnesses.len() as u32).collect();
        let jurors = docket.jurors.iter().map(|j| j.id).collect();
        let mut rulings = HashSet::new();
        if motion.ruling.is_some() {
            rulings.insert(1);
        }
        Self {
            facts,
            evidence,
            witnesses,
            jurors,
            rulings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docket::{CaseDocket, Evidence, EvidenceStatus};
    use crate::motion::MotionExchangeState;

    fn docket() -> CaseDocket {
        CaseDocket {
            title: "State v. Quill".into(),
            defendant: "M. Quill".into(),
            charge: "larceny".into(),
            judge: "Hon. R. Osei".into(),
            jurors: vec![],
            facts: vec!["a".into(), "b".into()],
            witnesses: vec!["P. Lam".into()],
            evidence: vec![Evidence {
                id: 3,
                text: "receipt".into(),
                status: EvidenceStatus::Suppressed,
            }],
        }
    }

    #[test]
    fn rebuild_sees_ruling_and_status() {
        let d = docket();
        let mut m = MotionExchangeState::new();
        let r = DocketRegistry::build(&d, &m);
        assert_eq!(r.facts, [1, 2].into_iter().collect());
        assert_eq!(r.witnesses, [1].into_iter().collect());
        assert_eq!(r.evidence.get(&3), Some(&EvidenceStatus::Suppressed));
        assert!(r.rulings.is_empty());

        m.ruling = Some("motion denied".into());
        let r = DocketRegistry::build(&d, &m);
        assert!(r.rulings.contains(&1));
    }
}
