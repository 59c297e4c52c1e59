//! Structured logging for the session engine.
//!
//! JSON-lines entries with a level filter (`LOG_LEVEL`), domain filter
//! (`LOG_DOMAINS`, comma-separated or "all"), a monotonic sequence counter
//! for ordering, and a per-session events file under `LOG_DIR`. Model text
//! is logged truncated; API keys never reach a log line.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("trace") => Level::Trace,
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Docket,    // case generation, registry rebuilds
    Jury,      // voir dire, strike validation
    Motion,    // motion exchange, rulings
    Verdict,   // admissibility guard, commits
    Sanctions, // conduct log, escalation, expiry
    Model,     // service calls, payload parsing
    Storage,   // profile snapshots, run history
    Session,   // phase transitions, orchestration
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Docket => "docket",
            Domain::Jury => "jury",
            Domain::Motion => "motion",
            Domain::Verdict => "verdict",
            Domain::Sanctions => "sanctions",
            Domain::Model => "model",
            Domain::Storage => "storage",
            Domain::Session => "session",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static SESSION_CONTEXT: OnceLock<SessionContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct SessionContext {
    session_id: String,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_session_context() -> &'static SessionContext {
    SESSION_CONTEXT.get_or_init(|| {
        let session_id = std::env::var("SESSION_ID")
            .unwrap_or_else(|_| format!("s-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| {
            let mut dir = PathBuf::from(base);
            dir.push(&session_id);
            if let Err(err) = create_dir_all(&dir) {
                eprintln!("[log] failed to create session dir: {}", err);
                return None;
            }
            File::create(dir.join("events.jsonl"))
                .map(|f| Mutex::new(BufWriter::new(f)))
                .map_err(|err| eprintln!("[log] failed to create events log: {}", err))
                .ok()
        });
        SessionContext { session_id, events }
    })
}

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds; every timestamp in session state uses this clock.
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "api_key", "bearer"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

/// Emit a structured log entry.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    if level < Level::from_env() || !domain.is_enabled() {
        return;
    }
    let ctx = ensure_session_context();
    let fields = sanitize_fields(fields);

    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("session_id".to_string(), json!(ctx.session_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    if let Some(events) = &ctx.events {
        if let Ok(mut w) = events.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
    eprintln!("{}", line);
}

/// Field-map builder.
pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Truncate free model text before it hits a log line.
pub fn v_text(s: &str) -> Value {
    const MAX: usize = 240;
    if s.len() <= MAX {
        Value::String(s.to_string())
    } else {
        let mut end = MAX;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        Value::String(format!("{}…", &s[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(Level::Trace < Level::Info);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn text_truncation_respects_char_boundaries() {
        let long = "é".repeat(300);
        match v_text(&long) {
            Value::String(s) => assert!(s.ends_with('…')),
            _ => panic!("expected string"),
        }
        assert_eq!(v_text("short"), Value::String("short".to_string()));
    }

    #[test]
    fn sensitive_fields_are_redacted() {
        let fields = obj(&[("api_key", v_str("sk-xyz")), ("event", v_str("ok"))]);
        let out = sanitize_fields(fields);
        assert_eq!(out["api_key"], Value::String("[REDACTED]".to_string()));
        assert_eq!(out["event"], Value::String("ok".to_string()));
    }
}
