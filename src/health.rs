//! Weighted network health summary.

use serde::Serialize;

use crate::state::NetworkState;

/// Score for an input that has not been observed yet.
const UNKNOWN: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthStatus::Excellent
        } else if score >= 80.0 {
            HealthStatus::Good
        } else if score >= 70.0 {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "EXCELLENT",
            HealthStatus::Good => "GOOD",
            HealthStatus::Fair => "FAIR",
            HealthStatus::Poor => "POOR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkHealth {
    pub decentralization: f64,
    pub security: f64,
    pub speed: f64,
    pub stability: f64,
    pub score: f64,
    pub status: HealthStatus,
}

fn decentralization(nodes: Option<usize>) -> f64 {
    match nodes {
        None => UNKNOWN,
        Some(n) if n >= 600 => 95.0,
        Some(n) if n >= 400 => 85.0,
        Some(n) if n >= 200 => 75.0,
        Some(_) => 60.0,
    }
}

/// Thresholds in TH/s: 900, 700 and 500 PH/s.
fn security(hashrate_th: Option<f64>) -> f64 {
    match hashrate_th {
        None => UNKNOWN,
        Some(h) if h >= 900_000.0 => 95.0,
        Some(h) if h >= 700_000.0 => 85.0,
        Some(h) if h >= 500_000.0 => 75.0,
        Some(_) => 65.0,
    }
}

fn speed(bps: Option<f64>, nominal_bps: f64) -> f64 {
    match bps {
        Some(b) if nominal_bps > 0.0 => {
            let ratio = b / nominal_bps;
            if ratio >= 0.95 {
                95.0
            } else if ratio >= 0.8 {
                85.0
            } else {
                70.0
            }
        }
        _ => UNKNOWN,
    }
}

fn stability(dag_width: Option<f64>) -> f64 {
    match dag_width {
        None => UNKNOWN,
        Some(w) if w <= 2.0 => 90.0,
        Some(w) if w <= 3.0 => 80.0,
        Some(w) if w <= 4.0 => 70.0,
        Some(_) => 60.0,
    }
}

pub fn assess(network: &NetworkState, nominal_bps: f64) -> NetworkHealth {
    let decentralization = decentralization(network.node_count);
    let security = security(network.hashrate_th);
    let speed = speed(network.velocity(), nominal_bps);
    let stability = stability(network.dag_width);
    let score = decentralization * 0.3 + security * 0.3 + speed * 0.2 + stability * 0.2;
    NetworkHealth {
        decentralization,
        security,
        speed,
        stability,
        score,
        status: HealthStatus::from_score(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::kaspa::{BlockDagInfo, BlockSummary};

    #[test]
    fn test_unknown_network_is_fair() {
        let h = assess(&NetworkState::new(10.0), 10.0);
        assert!((h.score - 75.0).abs() < 1e-9);
        assert_eq!(h.status, HealthStatus::Fair);
    }

    #[test]
    fn test_strong_network_is_excellent() {
        let mut n = NetworkState::new(10.0);
        n.node_count = Some(800);
        n.record_hashrate(1_200_000.0, 0, true);
        let block = |s| BlockSummary { hash: String::new(), daa_score: s, blue_score: None, timestamp_ms: None };
        n.record_blocks(vec![block(1), block(2)]);
        for (i, score) in [0u64, 100, 200].iter().enumerate() {
            let info = BlockDagInfo {
                virtual_daa_score: *score,
                difficulty: 1.0,
                block_count: None,
                network_name: String::new(),
                tip_hashes: Vec::new(),
            };
            n.record_blockdag(&info, i as i64 * 10_000, true);
        }
        let h = assess(&n, 10.0);
        assert_eq!(h.speed, 95.0);
        assert!((h.score - 94.0).abs() < 1e-9);
        assert_eq!(h.status, HealthStatus::Excellent);
    }

    #[test]
    fn test_small_network_is_poor() {
        let mut n = NetworkState::new(10.0);
        n.node_count = Some(100);
        n.record_hashrate(100_000.0, 0, true);
        let h = assess(&n, 10.0);
        assert_eq!(h.decentralization, 60.0);
        assert_eq!(h.security, 65.0);
        assert_eq!(h.status, HealthStatus::Poor);
    }

    #[test]
    fn test_bands() {
        assert_eq!(HealthStatus::from_score(90.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(89.9), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(70.0), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(69.0), HealthStatus::Poor);
    }
}
