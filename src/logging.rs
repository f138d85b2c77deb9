//! Structured JSON-lines logging.
//!
//! Every record carries a run id, a sequence number and a domain, so one
//! session can be filtered out of a shared log. Records go to stdout and,
//! when `LOG_DIR` is set, to `<LOG_DIR>/<run_id>/events.jsonl`.
//!
//! `LOG_LEVEL` and `LOG_DOMAINS` are read once, on the first record.

use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::error::FetchError;

const REDACTED_KEYS: [&str; 4] = ["authorization", "Authorization", "api_key", "x_cg_demo_api_key"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" => Some(Level::Warn),
            "error" => Some(Level::Error),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Feed,
    Network,
    Market,
    Ledger,
    Risk,
    Cache,
    System,
    Profile,
}

impl Domain {
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Feed => "feed",
            Domain::Network => "network",
            Domain::Market => "market",
            Domain::Ledger => "ledger",
            Domain::Risk => "risk",
            Domain::Cache => "cache",
            Domain::System => "system",
            Domain::Profile => "profile",
        }
    }
}

/// Which records get written. `domains: None` lets every domain through.
#[derive(Debug, Clone, PartialEq)]
struct Filter {
    min: Level,
    domains: Option<Vec<String>>,
}

impl Filter {
    fn new(level: Option<&str>, domains: Option<&str>) -> Self {
        let min = level.and_then(Level::parse).unwrap_or(Level::Info);
        let domains = match domains.map(str::trim) {
            None | Some("all") | Some("") => None,
            Some(list) => Some(list.split(',').map(|d| d.trim().to_string()).collect()),
        };
        Self { min, domains }
    }

    fn admits(&self, level: Level, domain: Domain) -> bool {
        level >= self.min
            && self
                .domains
                .as_ref()
                .map_or(true, |names| names.iter().any(|n| n == domain.name()))
    }
}

struct Logger {
    run_id: String,
    filter: Filter,
    seq: AtomicU64,
    file: Option<Mutex<BufWriter<File>>>,
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn logger() -> &'static Logger {
    LOGGER.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", Utc::now().timestamp_millis(), process::id()));
        let filter = Filter::new(
            std::env::var("LOG_LEVEL").ok().as_deref(),
            std::env::var("LOG_DOMAINS").ok().as_deref(),
        );
        let file = std::env::var("LOG_DIR").ok().and_then(|dir| open_events(&dir, &run_id));
        Logger { run_id, filter, seq: AtomicU64::new(0), file }
    })
}

fn open_events(dir: &str, run_id: &str) -> Option<Mutex<BufWriter<File>>> {
    let run_dir: PathBuf = [dir, run_id].iter().collect();
    let opened = create_dir_all(&run_dir).and_then(|_| File::create(run_dir.join("events.jsonl")));
    match opened {
        Ok(file) => Some(Mutex::new(BufWriter::new(file))),
        Err(err) => {
            eprintln!("[log] events file unavailable under {}: {}", run_dir.display(), err);
            None
        }
    }
}

fn redact(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in REDACTED_KEYS {
        if let Some(slot) = fields.get_mut(key) {
            *slot = Value::String("[REDACTED]".into());
        }
    }
    fields
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Write one record if the level and domain pass the filter.
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let logger = logger();
    if !logger.filter.admits(level, domain) {
        return;
    }
    let record = json!({
        "ts": timestamp(),
        "run_id": logger.run_id,
        "seq": logger.seq.fetch_add(1, Ordering::Relaxed),
        "lvl": level.label(),
        "domain": domain.name(),
        "event": event,
        "data": Value::Object(redact(fields)),
    });
    let line = record.to_string();
    if let Some(file) = &logger.file {
        if let Ok(mut w) = file.lock() {
            let _ = writeln!(w, "{}", line).and_then(|_| w.flush());
        }
    }
    println!("{}", line);
}

pub fn log_fetch_failure(source: &str, error: &FetchError, consecutive: u32) {
    log(
        Level::Warn,
        Domain::Feed,
        "fetch_failed",
        obj(&[
            ("source", v_str(source)),
            ("kind", v_str(error.kind())),
            ("error", v_str(&error.to_string())),
            ("transient", Value::Bool(error.is_transient())),
            ("consecutive", json!(consecutive)),
        ]),
    );
}

pub fn log_severity_change(metric: &str, severity: &str) {
    log(
        Level::Warn,
        Domain::Feed,
        "severity_change",
        obj(&[("metric", v_str(metric)), ("severity", v_str(severity))]),
    );
}

pub fn log_cache_fallback(key: &str, hit: bool) {
    log(Level::Debug, Domain::Cache, "fallback", obj(&[("key", v_str(key)), ("hit", Value::Bool(hit))]));
}

pub fn log_invalid_address(address: &str, rank: usize) {
    log(
        Level::Warn,
        Domain::Ledger,
        "address_skipped",
        obj(&[("address", v_str(address)), ("list_position", json!(rank))]),
    );
}

pub fn log_large_movement(address: &str, rank: usize, delta: f64, balance: f64) {
    log(
        Level::Info,
        Domain::Ledger,
        "large_movement",
        obj(&[
            ("address", v_str(address)),
            ("rank", json!(rank)),
            ("delta", v_num(delta)),
            ("balance", v_num(balance)),
        ]),
    );
}

pub fn log_emission(emission_per_sec: f64, bps: f64, block_reward: f64) {
    log(
        Level::Debug,
        Domain::Network,
        "emission",
        obj(&[
            ("emission_per_sec", v_num(emission_per_sec)),
            ("bps", v_num(bps)),
            ("block_reward", v_num(block_reward)),
        ]),
    );
}

pub fn log_risk_score(score: u8, level: &str, factors: &[(&str, f64)]) {
    let factors: Map<String, Value> = factors.iter().map(|(k, v)| (k.to_string(), v_num(*v))).collect();
    log(
        Level::Info,
        Domain::Risk,
        "alert_level",
        obj(&[("score", json!(score)), ("level", v_str(level)), ("factors", Value::Object(factors))]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Non-finite numbers serialize as null, which reads as unknown.
pub fn v_num(n: f64) -> Value {
    json!(n)
}

/// Logs how long a fetch took when dropped.
pub struct FetchTimer {
    source: &'static str,
    started: Instant,
}

impl FetchTimer {
    pub fn start(source: &'static str) -> Self {
        Self { source, started: Instant::now() }
    }
}

impl Drop for FetchTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Debug,
            Domain::Profile,
            "fetch_timing",
            obj(&[("source", v_str(self.source)), ("elapsed_ms", v_num(elapsed_ms))]),
        );
    }
}
