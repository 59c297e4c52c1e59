//! Sanctions lifecycle engine.
//!
//! A persistent per-player conduct state machine that outlives any single
//! case. Current state is never mutated in place: it is a pure fold over the
//! append-only `SanctionRecord` log, replayed from Clean, with wall-clock
//! expiry applied between entries and again at read time. Replaying an
//! identical log always yields an identical state.
//!
//! Escalation ladder: Clean -> Warned -> Sanctioned -> PublicDefender, then
//! a timed release through RecentlyReinstated back to Clean. The grace
//! period is zero-tolerance: any trigger during it goes straight back to
//! PublicDefender.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConductState {
    Clean,
    Warned,
    Sanctioned,
    PublicDefender,
    RecentlyReinstated,
}

impl ConductState {
    /// Severity level is a pure function of state, never stored.
    pub fn level(self) -> u8 {
        match self {
            ConductState::Clean => 0,
            ConductState::Warned => 1,
            ConductState::Sanctioned => 2,
            ConductState::PublicDefender => 3,
            ConductState::RecentlyReinstated => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Sealed,
}

/// One entry in the append-only conduct log. Never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionRecord {
    pub id: u64,
    /// Conduct state observed when the entry was appended.
    pub state: ConductState,
    /// Reason code, e.g. "deadline_violation", "contempt", "merit_release".
    pub trigger: String,
    pub docket_text: String,
    pub visibility: Visibility,
    pub ts_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanctionsConfig {
    pub warned_expiry_ms: u64,
    pub sanctioned_expiry_ms: u64,
    pub public_defender_term_ms: u64,
    pub reinstated_grace_ms: u64,
    pub recidivism_window_ms: u64,
    pub clean_reset_ms: u64,
}

impl Default for SanctionsConfig {
    fn default() -> Self {
        Self {
            warned_expiry_ms: 30 * 60_000,
            sanctioned_expiry_ms: 60 * 60_000,
            public_defender_term_ms: 60 * 60_000,
            reinstated_grace_ms: 30 * 60_000,
            recidivism_window_ms: 30 * 60_000,
            clean_reset_ms: 2 * 3_600_000,
        }
    }
}

impl SanctionsConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let var = |name: &str, default: u64| -> u64 {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        Self {
            warned_expiry_ms: var("SANCTIONS_WARNED_EXPIRY_MS", d.warned_expiry_ms),
            sanctioned_expiry_ms: var("SANCTIONS_SANCTIONED_EXPIRY_MS", d.sanctioned_expiry_ms),
            public_defender_term_ms: var("SANCTIONS_PD_TERM_MS", d.public_defender_term_ms),
            reinstated_grace_ms: var("SANCTIONS_GRACE_MS", d.reinstated_grace_ms),
            recidivism_window_ms: var("SANCTIONS_RECIDIVISM_WINDOW_MS", d.recidivism_window_ms),
            clean_reset_ms: var("SANCTIONS_CLEAN_RESET_MS", d.clean_reset_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanctionsState {
    pub state: ConductState,
    pub started_at: u64,
    pub expires_at: Option<u64>,
    pub last_misconduct_at: Option<u64>,
    pub recidivism_count: u32,
    pub recently_reinstated_until: Option<u64>,
}

impl SanctionsState {
    pub fn clean(ts_ms: u64) -> Self {
        Self {
            state: ConductState::Clean,
            started_at: ts_ms,
            expires_at: None,
            last_misconduct_at: None,
            recidivism_count: 0,
            recently_reinstated_until: None,
        }
    }

    pub fn level(&self) -> u8 {
        self.state.level()
    }
}

/// Phrasings that describe losing a case rather than misbehaving in one.
/// These never drive an escalation no matter where they appear.
const DENY_PHRASES: [&str; 3] = [
    "losing on the merits",
    "lost on the merits",
    "adverse verdict on the merits",
];

/// Reason codes that count toward the rolling recidivism window.
const PROCEDURAL_TRIGGERS: [&str; 4] = [
    "deadline_violation",
    "procedural_violation",
    "discovery_violation",
    "frivolous_motion",
];

pub const MERIT_RELEASE_TRIGGER: &str = "merit_release";

fn is_denylisted(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    DENY_PHRASES.iter().any(|p| lower.contains(p))
}

fn is_procedural(trigger: &str) -> bool {
    PROCEDURAL_TRIGGERS.contains(&trigger)
}

/// Explicit "sanction ... level N" mentions at or above 2 are severe on
/// their own.
fn explicit_level_at_least_two(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    if !lower.contains("sanction") {
        return false;
    }
    let bytes = lower.as_bytes();
    let mut search = 0;
    while let Some(pos) = lower[search..].find("level") {
        let mut i = search + pos + "level".len();
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'#') {
            i += 1;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i > start {
            if let Ok(n) = lower[start..i].parse::<u32>() {
                if n >= 2 {
                    return true;
                }
            }
        }
        search = search + pos + "level".len();
    }
    false
}

fn text_is_severe(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    let misconduct = lower.contains("misconduct");
    (lower.contains("mistrial") && misconduct)
        || (lower.contains("dismiss") && misconduct)
        || explicit_level_at_least_two(text)
}

fn expiry_for(state: ConductState, ts_ms: u64, cfg: &SanctionsConfig) -> Option<u64> {
    match state {
        ConductState::Clean => None,
        ConductState::Warned => Some(ts_ms + cfg.warned_expiry_ms),
        ConductState::Sanctioned => Some(ts_ms + cfg.sanctioned_expiry_ms),
        ConductState::PublicDefender => Some(ts_ms + cfg.public_defender_term_ms),
        ConductState::RecentlyReinstated => Some(ts_ms + cfg.reinstated_grace_ms),
    }
}

/// Steps through any expirations due at or before `now_ms`. Looping matters:
/// a long-idle PublicDefender passes through RecentlyReinstated on its way
/// back to Clean.
fn expire_until(mut s: SanctionsState, now_ms: u64, cfg: &SanctionsConfig) -> SanctionsState {
    while let Some(exp) = s.expires_at {
        if exp > now_ms {
            break;
        }
        let next = match s.state {
            ConductState::Warned | ConductState::Sanctioned => ConductState::Clean,
            ConductState::PublicDefender => ConductState::RecentlyReinstated,
            ConductState::RecentlyReinstated => ConductState::Clean,
            ConductState::Clean => break,
        };
        s.state = next;
        s.started_at = exp;
        s.expires_at = expiry_for(next, exp, cfg);
        s.recently_reinstated_until = match next {
            ConductState::RecentlyReinstated => s.expires_at,
            _ => None,
        };
    }
    if let Some(last) = s.last_misconduct_at {
        if now_ms.saturating_sub(last) >= cfg.clean_reset_ms {
            s.recidivism_count = 0;
        }
    }
    s
}

fn escalate(current: ConductState, severe: bool, recidivism_count: u32) -> ConductState {
    match current {
        ConductState::Clean => {
            if severe {
                ConductState::Sanctioned
            } else {
                ConductState::Warned
            }
        }
        ConductState::Warned => {
            if severe || recidivism_count > 1 {
                ConductState::Sanctioned
            } else {
                ConductState::Warned
            }
        }
        ConductState::Sanctioned => {
            if severe || recidivism_count > 1 {
                ConductState::PublicDefender
            } else {
                ConductState::Sanctioned
            }
        }
        ConductState::PublicDefender => ConductState::PublicDefender,
        ConductState::RecentlyReinstated => ConductState::PublicDefender,
    }
}

/// Pure projection: fold the whole log from Clean. Deterministic for a
/// given (log, now, cfg).
pub fn project(log: &[SanctionRecord], now_ms: u64, cfg: &SanctionsConfig) -> SanctionsState {
    let mut s = SanctionsState::clean(log.first().map(|r| r.ts_ms).unwrap_or(now_ms));
    for (i, rec) in log.iter().enumerate() {
        s = expire_until(s, rec.ts_ms, cfg);

        if rec.trigger == MERIT_RELEASE_TRIGGER {
            if s.state == ConductState::PublicDefender {
                s.state = ConductState::RecentlyReinstated;
                s.started_at = rec.ts_ms;
                s.expires_at = expiry_for(ConductState::RecentlyReinstated, rec.ts_ms, cfg);
                s.recently_reinstated_until = s.expires_at;
            }
            continue;
        }
        if is_denylisted(&rec.docket_text) {
            continue;
        }

        let window_start = rec.ts_ms.saturating_sub(cfg.recidivism_window_ms);
        let procedural_in_window = log[..=i]
            .iter()
            .filter(|r| {
                is_procedural(&r.trigger) && r.ts_ms >= window_start && !is_denylisted(&r.docket_text)
            })
            .count();
        let severe = text_is_severe(&rec.docket_text) || procedural_in_window >= 2;

        s.recidivism_count = match s.last_misconduct_at {
            Some(last) if rec.ts_ms.saturating_sub(last) <= cfg.recidivism_window_ms => {
                s.recidivism_count + 1
            }
            _ => 1,
        };
        s.last_misconduct_at = Some(rec.ts_ms);

        let next = escalate(s.state, severe, s.recidivism_count);
        if next != s.state {
            s.state = next;
            s.started_at = rec.ts_ms;
            s.expires_at = expiry_for(next, rec.ts_ms, cfg);
            s.recently_reinstated_until = None;
        }
    }
    expire_until(s, now_ms, cfg)
}

#[derive(Debug, Clone)]
pub struct SanctionsEngine {
    cfg: SanctionsConfig,
    log: Vec<SanctionRecord>,
    next_id: u64,
}

impl SanctionsEngine {
    pub fn new(cfg: SanctionsConfig) -> Self {
        Self {
            cfg,
            log: Vec::new(),
            next_id: 1,
        }
    }

    /// Rehydrates from a persisted log.
    pub fn with_log(cfg: SanctionsConfig, log: Vec<SanctionRecord>) -> Self {
        let next_id = log.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self { cfg, log, next_id }
    }

    pub fn config(&self) -> &SanctionsConfig {
        &self.cfg
    }

    pub fn log(&self) -> &[SanctionRecord] {
        &self.log
    }

    /// Lazy read: expiry is applied as of `now_ms` without touching the log.
    pub fn current(&self, now_ms: u64) -> SanctionsState {
        project(&self.log, now_ms, &self.cfg)
    }

    /// Appends a conduct entry and returns the re-derived state.
    pub fn record(
        &mut self,
        trigger: &str,
        docket_text: &str,
        visibility: Visibility,
        now_ms: u64,
    ) -> SanctionsState {
        let state_before = self.current(now_ms).state;
        self.log.push(SanctionRecord {
            id: self.next_id,
            state: state_before,
            trigger: trigger.to_string(),
            docket_text: docket_text.to_string(),
            visibility,
            ts_ms: now_ms,
        });
        self.next_id += 1;
        self.current(now_ms)
    }

    /// Merit-based release: a not-guilty or dismissal won while serving as
    /// public defender ends the term immediately.
    pub fn merit_release(&mut self, now_ms: u64) -> SanctionsState {
        self.record(MERIT_RELEASE_TRIGGER, "merit-based release", Visibility::Public, now_ms)
    }

    /// Nearest upcoming expiry, for wake scheduling. None while Clean.
    pub fn next_expiry(&self, now_ms: u64) -> Option<u64> {
        self.current(now_ms).expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 60_000;

    fn engine() -> SanctionsEngine {
        SanctionsEngine::new(SanctionsConfig::default())
    }

    #[test]
    fn level_is_a_pure_function_of_state() {
        assert_eq!(ConductState::Clean.level(), 0);
        assert_eq!(ConductState::Warned.level(), 1);
        assert_eq!(ConductState::Sanctioned.level(), 2);
        assert_eq!(ConductState::PublicDefender.level(), 3);
        assert_eq!(ConductState::RecentlyReinstated.level(), 1);
    }

    #[test]
    fn first_trigger_warns_severe_trigger_sanctions() {
        let mut e = engine();
        let s = e.record("contempt", "warned for interrupting", Visibility::Public, 1_000);
        assert_eq!(s.state, ConductState::Warned);

        let mut e = engine();
        let s = e.record(
            "contempt",
            "mistrial declared for prosecutorial misconduct",
            Visibility::Public,
            1_000,
        );
        assert_eq!(s.state, ConductState::Sanctioned);
    }

    #[test]
    fn denylisted_phrasing_never_triggers() {
        let mut e = engine();
        let s = e.record(
            "case_outcome",
            "counsel is losing on the merits",
            Visibility::Public,
            1_000,
        );
        assert_eq!(s.state, ConductState::Clean);
    }

    #[test]
    fn explicit_level_two_is_severe() {
        assert!(text_is_severe("the court imposes sanction level 2"));
        assert!(text_is_severe("SANCTION LEVEL #3 entered"));
        assert!(!text_is_severe("sanction level 1 warning"));
        assert!(!text_is_severe("level 5 parking garage"));
    }

    #[test]
    fn sanctioned_player_escalates_on_two_procedural_entries_in_window() {
        let mut e = engine();
        // reach Sanctioned via a severe entry, then let the recidivism
        // window age out before the deadline trouble starts
        e.record("contempt", "mistrial for misconduct", Visibility::Public, 0);
        let s = e.record("deadline_violation", "missed filing deadline", Visibility::Public, 40 * MIN);
        assert_eq!(s.state, ConductState::Sanctioned);
        let s = e.record("deadline_violation", "missed another deadline", Visibility::Public, 45 * MIN);
        assert_eq!(s.state, ConductState::PublicDefender);
    }

    #[test]
    fn replay_is_deterministic() {
        let mut e = engine();
        e.record("contempt", "warned", Visibility::Public, 0);
        e.record("deadline_violation", "late", Visibility::Public, 5 * MIN);
        e.record("deadline_violation", "late again", Visibility::Sealed, 9 * MIN);
        let now = 20 * MIN;
        let a = project(e.log(), now, e.config());
        let b = project(e.log(), now, e.config());
        assert_eq!(a, b);
    }

    #[test]
    fn warned_expires_back_to_clean() {
        let mut e = engine();
        e.record("contempt", "warned", Visibility::Public, 0);
        let cfg = SanctionsConfig::default();
        let s = e.current(cfg.warned_expiry_ms + 1);
        assert_eq!(s.state, ConductState::Clean);
    }

    #[test]
    fn public_defender_release_path_passes_through_grace() {
        let cfg = SanctionsConfig::default();
        let mut e = engine();
        e.record("contempt", "mistrial for misconduct", Visibility::Public, 0);
        e.record("contempt", "dismissed for misconduct", Visibility::Public, MIN);
        let s = e.current(MIN);
        assert_eq!(s.state, ConductState::PublicDefender);

        let after_term = MIN + cfg.public_defender_term_ms + 1;
        let s = e.current(after_term);
        assert_eq!(s.state, ConductState::RecentlyReinstated);
        assert!(s.recently_reinstated_until.is_some());

        let after_grace = after_term + cfg.reinstated_grace_ms + 1;
        let s = e.current(after_grace);
        assert_eq!(s.state, ConductState::Clean);
    }

    #[test]
    fn any_trigger_during_grace_returns_to_public_defender() {
        let cfg = SanctionsConfig::default();
        let mut e = engine();
        e.record("contempt", "mistrial for misconduct", Visibility::Public, 0);
        e.record("contempt", "dismissed for misconduct", Visibility::Public, MIN);
        let in_grace = MIN + cfg.public_defender_term_ms + MIN;
        let s = e.record("deadline_violation", "late filing", Visibility::Public, in_grace);
        assert_eq!(s.state, ConductState::PublicDefender);
    }

    #[test]
    fn merit_release_ends_public_defender_term_immediately() {
        let mut e = engine();
        e.record("contempt", "mistrial for misconduct", Visibility::Public, 0);
        e.record("contempt", "dismissed for misconduct", Visibility::Public, MIN);
        assert_eq!(e.current(2 * MIN).state, ConductState::PublicDefender);
        let s = e.merit_release(2 * MIN);
        assert_eq!(s.state, ConductState::RecentlyReinstated);
    }

    #[test]
    fn merit_release_outside_public_defender_is_inert() {
        let mut e = engine();
        e.record("contempt", "warned", Visibility::Public, 0);
        let s = e.merit_release(MIN);
        assert_eq!(s.state, ConductState::Warned);
    }

    #[test]
    fn long_clean_interval_resets_recidivism_count() {
        let cfg = SanctionsConfig::default();
        let mut e = engine();
        e.record("deadline_violation", "late", Visibility::Public, 0);
        e.record("deadline_violation", "late", Visibility::Public, 5 * MIN);
        let s = e.current(5 * MIN);
        assert!(s.recidivism_count > 1);
        let s = e.current(5 * MIN + cfg.clean_reset_ms);
        assert_eq!(s.recidivism_count, 0);
    }

    #[test]
    fn next_expiry_tracks_current_state() {
        let mut e = engine();
        assert_eq!(e.next_expiry(0), None);
        e.record("contempt", "warned", Visibility::Public, 1_000);
        let cfg = SanctionsConfig::default();
        assert_eq!(e.next_expiry(1_000), Some(1_000 + cfg.warned_expiry_ms));
    }
}
