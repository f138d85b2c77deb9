//! Presentation boundary.
//!
//! The engine computes; a `DisplaySink` renders. Values arrive already
//! formatted, keyed by a stable display id.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::json;

use crate::logging::{self, obj, v_str, Domain, Level};
use crate::reliability::Severity;
use crate::risk::AlertLevel;

pub const SIGNAL_LOST: &str = "SIGNAL LOST";

/// Display ids.
pub mod ids {
    pub const HASHRATE: &str = "network.hashrate";
    pub const HASHRATE_ATH: &str = "network.hashrate_ath";
    pub const SHIELD: &str = "network.shield";
    pub const ATTACK_COST: &str = "network.attack_cost";
    pub const DAA_SCORE: &str = "network.daa_score";
    pub const BPS: &str = "network.bps";
    pub const DIFFICULTY: &str = "network.difficulty";
    pub const DAG_WIDTH: &str = "network.dag_width";
    pub const BLOCK_FEED: &str = "network.block_feed";
    pub const SUPPLY: &str = "network.supply";
    pub const NODES: &str = "network.nodes";
    pub const HEALTH: &str = "network.health";
    pub const EMISSION: &str = "network.emission";
    pub const BLOCK_REWARD: &str = "network.block_reward";
    pub const YIELD: &str = "network.yield_per_th";
    pub const PRICE: &str = "market.price";
    pub const CHANGE: &str = "market.change_24h";
    pub const VOLUME: &str = "market.volume";
    pub const MARKET_CAP: &str = "market.cap";
    pub const SATS: &str = "market.sats";
    pub const GWEI: &str = "market.gwei";
    pub const REL_STRENGTH: &str = "market.relative_strength";
    pub const DOMINANCE: &str = "market.btc_dominance";
    pub const TOKENS: &str = "market.tokens";
    pub const NEWS: &str = "market.news";
    pub const FLOW: &str = "ledger.flow";
    pub const CONCENTRATION: &str = "ledger.concentration";
    pub const ALERT_SCORE: &str = "risk.score";
    pub const ALERT_LEVEL: &str = "risk.level";

    pub fn balance(address: &str) -> String {
        format!("ledger.balance:{}", address)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    LargeMovement { address: String, rank: usize, delta: f64, balance: f64 },
    SignalLost { metric: String },
    SignalRestored { metric: String },
    AlertLevelChanged { from: Option<AlertLevel>, to: AlertLevel, score: u8 },
}

impl FeedEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::LargeMovement { .. } => "large_movement",
            FeedEvent::SignalLost { .. } => "signal_lost",
            FeedEvent::SignalRestored { .. } => "signal_restored",
            FeedEvent::AlertLevelChanged { .. } => "alert_level_changed",
        }
    }
}

pub trait DisplaySink {
    fn set_value(&mut self, id: &str, formatted: &str);
    fn set_severity(&mut self, id: &str, severity: Severity);
    fn emit_event(&mut self, event: &FeedEvent);
}

/// Renders into the structured log. Repeated identical values are dropped.
#[derive(Debug, Default)]
pub struct LogSink {
    last: HashMap<String, String>,
}

impl DisplaySink for LogSink {
    fn set_value(&mut self, id: &str, formatted: &str) {
        if self.last.get(id).map(String::as_str) == Some(formatted) {
            return;
        }
        self.last.insert(id.to_string(), formatted.to_string());
        logging::log(
            Level::Info,
            Domain::System,
            "display",
            obj(&[("id", v_str(id)), ("value", v_str(formatted))]),
        );
    }

    fn set_severity(&mut self, id: &str, severity: Severity) {
        logging::log_severity_change(id, severity.as_str());
    }

    fn emit_event(&mut self, event: &FeedEvent) {
        let payload = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
        let domain = match event {
            FeedEvent::LargeMovement { .. } => Domain::Ledger,
            FeedEvent::SignalLost { .. } | FeedEvent::SignalRestored { .. } => Domain::Feed,
            FeedEvent::AlertLevelChanged { .. } => Domain::Risk,
        };
        logging::log(
            Level::Info,
            domain,
            event.kind(),
            obj(&[("event", payload)]),
        );
    }
}

#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn set_value(&mut self, _id: &str, _formatted: &str) {}
    fn set_severity(&mut self, _id: &str, _severity: Severity) {}
    fn emit_event(&mut self, _event: &FeedEvent) {}
}

/// Keeps the latest value per id and every event, for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub values: HashMap<String, String>,
    pub severities: HashMap<String, Severity>,
    pub events: Vec<FeedEvent>,
}

impl RecordingSink {
    pub fn value(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn severity(&self, id: &str) -> Severity {
        self.severities.get(id).copied().unwrap_or(Severity::Normal)
    }
}

impl DisplaySink for RecordingSink {
    fn set_value(&mut self, id: &str, formatted: &str) {
        self.values.insert(id.to_string(), formatted.to_string());
    }

    fn set_severity(&mut self, id: &str, severity: Severity) {
        self.severities.insert(id.to_string(), severity);
    }

    fn emit_event(&mut self, event: &FeedEvent) {
        self.events.push(event.clone());
    }
}

// =============================================================================
// Formatting
// =============================================================================

pub const UNKNOWN: &str = "--";

/// Thousands separators, no decimals.
pub fn thousands(n: f64) -> String {
    if !n.is_finite() {
        return UNKNOWN.to_string();
    }
    let rounded = n.abs().round() as u128;
    let digits = rounded.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0.0 && rounded > 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Hash power from TH/s into the largest fitting unit.
pub fn hashrate(th: f64) -> String {
    if !th.is_finite() {
        return UNKNOWN.to_string();
    }
    if th >= 1_000_000.0 {
        format!("{:.2} EH/s", th / 1_000_000.0)
    } else if th >= 1_000.0 {
        format!("{:.2} PH/s", th / 1_000.0)
    } else {
        format!("{:.2} TH/s", th)
    }
}

pub fn usd(n: f64, decimals: usize) -> String {
    if !n.is_finite() {
        return UNKNOWN.to_string();
    }
    format!("${:.*}", decimals, n)
}

/// Large USD amounts with a K/M/B suffix.
pub fn usd_compact(n: f64) -> String {
    if !n.is_finite() {
        return UNKNOWN.to_string();
    }
    let a = n.abs();
    if a >= 1e9 {
        format!("${:.2}B", n / 1e9)
    } else if a >= 1e6 {
        format!("${:.2}M", n / 1e6)
    } else if a >= 1e3 {
        format!("${:.1}K", n / 1e3)
    } else {
        format!("${:.2}", n)
    }
}

pub fn signed_pct(n: f64) -> String {
    if !n.is_finite() {
        return UNKNOWN.to_string();
    }
    format!("{:+.2}%", n)
}

pub fn opt(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    value.map_or_else(|| UNKNOWN.to_string(), f)
}
