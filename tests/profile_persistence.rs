//! Profile persistence across sessions.
//!
//! The sanctions log, stats and achievements must survive an engine
//! restart byte-for-byte, and the replayed conduct state must match what
//! the previous session saw.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::tempdir;

use mootcourt::errors::{EngineError, TransportKind};
use mootcourt::model::{CounselModel, ModelRequest};
use mootcourt::sanctions::{project, ConductState, SanctionsConfig, SanctionsEngine};
use mootcourt::storage::ProfileStore;
use mootcourt::{Role, SessionEngine};

struct SilentModel;

#[async_trait]
impl CounselModel for SilentModel {
    async fn complete(&self, _req: ModelRequest) -> Result<Value, EngineError> {
        Err(EngineError::Transport {
            kind: TransportKind::Other,
            detail: "unused".to_string(),
        })
    }
}

fn engine() -> SessionEngine {
    SessionEngine::new(
        Arc::new(SilentModel),
        Role::Defense,
        SanctionsEngine::new(SanctionsConfig::default()),
    )
}

#[tokio::test]
async fn conduct_log_survives_a_restart() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("profile.db");
    let db = db.to_str().unwrap();

    let mut e = engine();
    let s1 = e.register_conduct("contempt", "warned for interrupting the court", 1_000);
    assert_eq!(s1.state, ConductState::Warned);
    let s2 = e.register_conduct("deadline_violation", "missed a filing deadline", 120_000);

    let mut store = ProfileStore::new(db).unwrap();
    store.init().unwrap();
    e.persist(&mut store, 120_000).unwrap();
    drop(store);

    // new process, same database
    let store = ProfileStore::new(db).unwrap();
    let profile = store.load_profile().unwrap();
    assert_eq!(profile.sanctions.len(), 2);
    assert_eq!(profile.stats.cases_played, 0);

    let cfg = SanctionsConfig::default();
    let replayed = project(&profile.sanctions, 120_000, &cfg);
    assert_eq!(replayed, s2);

    // the rehydrated engine picks up exactly where the old one stopped
    let rehydrated = SanctionsEngine::with_log(cfg, profile.sanctions);
    assert_eq!(rehydrated.current(120_000), s2);
}

#[tokio::test]
async fn snapshot_carries_the_sanctions_projection() {
    let mut e = engine();
    e.register_conduct("contempt", "mistrial declared for misconduct", 1_000);
    e.register_conduct("contempt", "dismissed for misconduct", 60_000);
    assert_eq!(e.sanctions_state(60_000).state, ConductState::PublicDefender);

    let snapshot = e.snapshot(60_000);
    let pd = snapshot.pd_status.unwrap();
    assert_eq!(pd.state, ConductState::PublicDefender);
    assert_eq!(pd.level(), 3);
    assert!(snapshot.reinstatement.is_none());
}
