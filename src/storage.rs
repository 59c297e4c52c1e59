//! Profile persistence.
//!
//! One versioned profile snapshot row plus a capped run-history table.
//! A snapshot whose schema version is unknown resets to defaults; the one
//! exception is the v1 legacy-sanctions shape, which migrates its sanction
//! level into a synthetic conduct log entry so standing carries over.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::disposition::Outcome;
use crate::docket::Role;
use crate::sanctions::{SanctionRecord, SanctionsState, Visibility};

pub const SCHEMA_VERSION: u32 = 2;
pub const RUN_HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    pub cases_played: u32,
    pub cases_won: u32,
    pub cases_lost: u32,
    pub guilty_verdicts: u32,
    pub not_guilty_verdicts: u32,
    pub dismissals: u32,
    pub mistrials: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// Append-only conduct log; the sanctions engine is rehydrated from it.
    pub sanctions: Vec<SanctionRecord>,
    /// Cached sanctions projection at save time, for display without replay.
    pub pd_status: Option<SanctionsState>,
    /// End of the reinstatement grace period, if one is running.
    pub reinstatement: Option<u64>,
    pub stats: ProfileStats,
    pub achievements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub ts_ms: u64,
    pub title: String,
    pub outcome: Option<Outcome>,
    pub role: Role,
}

pub struct ProfileStore {
    conn: Connection,
}

impl ProfileStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                version INTEGER NOT NULL,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS run_history (
                ts INTEGER NOT NULL,
                data TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn save_profile(&mut self, snapshot: &ProfileSnapshot) -> Result<()> {
        let data = serde_json::to_string(snapshot)?;
        self.conn.execute(
            "INSERT INTO profile (id, version, data) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET version = ?1, data = ?2",
            params![SCHEMA_VERSION, data],
        )?;
        Ok(())
    }

    /// Loads the snapshot, migrating v1 and resetting anything else
    /// unrecognized to defaults.
    pub fn load_profile(&self) -> Result<ProfileSnapshot> {
        let row: Option<(u32, String)> = self
            .conn
            .query_row(
                "SELECT version, data FROM profile WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((version, data)) = row else {
            return Ok(ProfileSnapshot::default());
        };
        match version {
            SCHEMA_VERSION => Ok(serde_json::from_str(&data).unwrap_or_default()),
            1 => Ok(migrate_legacy_v1(&data)),
            _ => Ok(ProfileSnapshot::default()),
        }
    }

    pub fn push_run(&mut self, run: &RunRecord) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO run_history (ts, data) VALUES (?1, ?2)",
            params![run.ts_ms as i64, serde_json::to_string(run)?],
        )?;
        tx.execute(
            "DELETE FROM run_history WHERE rowid NOT IN (
                SELECT rowid FROM run_history ORDER BY ts DESC, rowid DESC LIMIT ?1
            )",
            params![RUN_HISTORY_CAP as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Newest first.
    pub fn run_history(&self) -> Result<Vec<RunRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM run_history ORDER BY ts DESC, rowid DESC")?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            if let Ok(run) = serde_json::from_str(&row?) {
                out.push(run);
            }
        }
        Ok(out)
    }
}

/// v1 kept a bare `{"sanction_level": n, "since_ms": t}` instead of the
/// conduct log. Standing is preserved by synthesizing one log entry of
/// matching severity at the recorded time.
#[derive(Debug, Deserialize)]
struct LegacyV1 {
    #[serde(default)]
    sanction_level: u8,
    #[serde(default)]
    since_ms: u64,
    #[serde(default)]
    stats: ProfileStats,
    #[serde(default)]
    achievements: Vec<String>,
}

fn migrate_legacy_v1(data: &str) -> ProfileSnapshot {
    let Ok(legacy) = serde_json::from_str::<LegacyV1>(data) else {
        return ProfileSnapshot::default();
    };
    let docket_text = match legacy.sanction_level {
        0 => return ProfileSnapshot {
            stats: legacy.stats,
            achievements: legacy.achievements,
            ..Default::default()
        },
        1 => "migrated: standing warning".to_string(),
        _ => "migrated: sanction level 2 on record".to_string(),
    };
    ProfileSnapshot {
        sanctions: vec![SanctionRecord {
            id: 1,
            state: crate::sanctions::ConductState::Clean,
            trigger: "legacy_migration".to_string(),
            docket_text,
            visibility: Visibility::Sealed,
            ts_ms: legacy.since_ms,
        }],
        pd_status: None,
        reinstatement: None,
        stats: legacy.stats,
        achievements: legacy.achievements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanctions::{project, ConductState, SanctionsConfig};

    fn store() -> ProfileStore {
        let mut s = ProfileStore::in_memory().unwrap();
        s.init().unwrap();
        s
    }

    #[test]
    fn empty_store_yields_default_profile() {
        let s = store();
        assert_eq!(s.load_profile().unwrap(), ProfileSnapshot::default());
    }

    #[test]
    fn profile_round_trips() {
        let mut s = store();
        let snapshot = ProfileSnapshot {
            achievements: vec!["first_acquittal".to_string()],
            stats: ProfileStats {
                cases_played: 3,
                cases_won: 2,
                ..Default::default()
            },
            ..Default::default()
        };
        s.save_profile(&snapshot).unwrap();
        assert_eq!(s.load_profile().unwrap(), snapshot);
    }

    #[test]
    fn unknown_version_resets_to_defaults() {
        let mut s = store();
        s.conn
            .execute(
                "INSERT INTO profile (id, version, data) VALUES (1, 99, '{\"junk\": true}')",
                [],
            )
            .unwrap();
        assert_eq!(s.load_profile().unwrap(), ProfileSnapshot::default());
    }

    #[test]
    fn legacy_v1_sanctions_migrate_into_the_log() {
        let mut s = store();
        s.conn
            .execute(
                "INSERT INTO profile (id, version, data) VALUES (1, 1,
                 '{\"sanction_level\": 2, \"since_ms\": 1000}')",
                [],
            )
            .unwrap();
        let profile = s.load_profile().unwrap();
        assert_eq!(profile.sanctions.len(), 1);
        // level 2 text is sanction-grade, so replay lands on Sanctioned
        let state = project(&profile.sanctions, 1_000, &SanctionsConfig::default());
        assert_eq!(state.state, ConductState::Sanctioned);
    }

    #[test]
    fn run_history_is_capped_newest_kept() {
        let mut s = store();
        for i in 0..(RUN_HISTORY_CAP as u64 + 10) {
            s.push_run(&RunRecord {
                ts_ms: i,
                title: format!("case {}", i),
                outcome: Some(Outcome::NotGuilty),
                role: Role::Defense,
            })
            .unwrap();
        }
        let history = s.run_history().unwrap();
        assert_eq!(history.len(), RUN_HISTORY_CAP);
        assert_eq!(history[0].ts_ms, RUN_HISTORY_CAP as u64 + 9);
    }
}
