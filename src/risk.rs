//! Composite alert level.
//!
//! Four signals are normalized to 0..100 and blended with fixed weights.
//! A signal whose inputs are unknown contributes the neutral 50. The score
//! is recomputed from a snapshot every time; nothing accumulates here.

use serde::Serialize;

use crate::ledger::EntityLedger;
use crate::state::{MarketState, NetworkState};

pub const NEUTRAL: f64 = 50.0;

const W_PRICE: f64 = 0.3;
const W_HASH_TREND: f64 = 0.3;
const W_ENTITY_FLOW: f64 = 0.2;
const W_VOLUME: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Dormant,
    Calm,
    Active,
    Heated,
    Extreme,
}

/// Inclusive lower bounds, highest first.
const LEVELS: [(u8, AlertLevel); 5] = [
    (80, AlertLevel::Extreme),
    (60, AlertLevel::Heated),
    (40, AlertLevel::Active),
    (20, AlertLevel::Calm),
    (0, AlertLevel::Dormant),
];

impl AlertLevel {
    pub fn from_score(score: u8) -> Self {
        LEVELS
            .iter()
            .find(|(floor, _)| score >= *floor)
            .map(|(_, level)| *level)
            .unwrap_or(AlertLevel::Dormant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Dormant => "dormant",
            AlertLevel::Calm => "calm",
            AlertLevel::Active => "active",
            AlertLevel::Heated => "heated",
            AlertLevel::Extreme => "extreme",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskFactors {
    pub price: f64,
    pub hash_trend: f64,
    pub entity_flow: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskScore {
    pub value: u8,
    pub level: AlertLevel,
    pub factors: RiskFactors,
}

/// Everything the scorer reads, copied out of the live state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskInputs {
    pub change_24h: Option<f64>,
    pub hash_samples: Vec<f64>,
    pub aggregate_delta: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
}

impl RiskInputs {
    pub fn snapshot(
        network: &NetworkState,
        market: &MarketState,
        ledger: &EntityLedger,
        top_n: usize,
    ) -> Self {
        Self {
            change_24h: market.change_24h,
            hash_samples: network.hash_values(),
            aggregate_delta: ledger.aggregate_delta(top_n),
            volume_24h: market.volume_24h,
            market_cap: market.market_cap,
        }
    }
}

fn clamp_score(raw: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, 100.0)
    } else {
        NEUTRAL
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Debug, Clone)]
pub struct RiskScorer {
    /// KAS of net entity flow per point of deviation from neutral.
    flow_scale: f64,
}

impl RiskScorer {
    pub fn new(flow_scale: f64) -> Self {
        Self { flow_scale }
    }

    pub fn price_score(&self, change_24h: Option<f64>) -> f64 {
        change_24h.map_or(NEUTRAL, |c| clamp_score(NEUTRAL + c * 5.0))
    }

    /// Last three samples against everything before them.
    pub fn hash_trend_score(&self, samples: &[f64]) -> f64 {
        if samples.len() < 4 {
            return NEUTRAL;
        }
        let split = samples.len() - 3;
        let earlier = mean(&samples[..split]);
        let recent = mean(&samples[split..]);
        if !(earlier > 0.0) {
            return NEUTRAL;
        }
        let pct = (recent - earlier) / earlier * 100.0;
        clamp_score(NEUTRAL + pct * 10.0)
    }

    pub fn entity_flow_score(&self, aggregate_delta: Option<f64>) -> f64 {
        match aggregate_delta {
            Some(delta) if self.flow_scale > 0.0 => clamp_score(NEUTRAL + delta / self.flow_scale),
            _ => NEUTRAL,
        }
    }

    /// A volume of 10% of market cap or more saturates.
    pub fn volume_score(&self, volume: Option<f64>, market_cap: Option<f64>) -> f64 {
        match (volume, market_cap) {
            (Some(v), Some(cap)) if cap > 0.0 => clamp_score((v / cap * 100.0) / 10.0 * 100.0),
            _ => NEUTRAL,
        }
    }

    pub fn combine(factors: RiskFactors) -> RiskScore {
        let raw = factors.price * W_PRICE
            + factors.hash_trend * W_HASH_TREND
            + factors.entity_flow * W_ENTITY_FLOW
            + factors.volume * W_VOLUME;
        let value = clamp_score(raw).round() as u8;
        RiskScore { value, level: AlertLevel::from_score(value), factors }
    }

    pub fn score(&self, inputs: &RiskInputs) -> RiskScore {
        Self::combine(RiskFactors {
            price: self.price_score(inputs.change_24h),
            hash_trend: self.hash_trend_score(&inputs.hash_samples),
            entity_flow: self.entity_flow_score(inputs.aggregate_delta),
            volume: self.volume_score(inputs.volume_24h, inputs.market_cap),
        })
    }
}
