//! Derived network and market figures.
//!
//! All functions here are pure over their inputs; unknown inputs produce
//! `None` instead of a number that looks real.

use serde::Serialize;

use crate::feed::kaspa::BlockSummary;
use crate::indicators::RollingMean;

pub const SECONDS_PER_DAY: f64 = 86_400.0;
pub const VELOCITY_WINDOW: usize = 6;

// =============================================================================
// DAA velocity
// =============================================================================

/// Blocks per second, smoothed over the last few DAA score readings.
#[derive(Debug, Clone)]
pub struct DaaVelocity {
    prev: Option<(u64, i64)>,
    window: RollingMean,
}

impl Default for DaaVelocity {
    fn default() -> Self {
        Self::new(VELOCITY_WINDOW)
    }
}

impl DaaVelocity {
    pub fn new(period: usize) -> Self {
        Self { prev: None, window: RollingMean::new(period) }
    }

    /// Feed one DAA reading. Returns the instantaneous velocity when the
    /// reading could be differenced against the previous one.
    pub fn observe(&mut self, score: u64, at_ms: i64) -> Option<f64> {
        let prev = self.prev.replace((score, at_ms));
        let (prev_score, prev_at) = prev?;
        let elapsed_secs = (at_ms - prev_at) as f64 / 1000.0;
        if elapsed_secs <= 0.0 {
            // Duplicate or out-of-order reading; keep the earlier anchor.
            self.prev = Some((prev_score, prev_at));
            return None;
        }
        if score < prev_score {
            // The node went backwards (resync); start over from here.
            self.window.clear();
            return None;
        }
        let instant = (score - prev_score) as f64 / elapsed_secs;
        self.window.update(instant);
        Some(instant)
    }

    /// Mean of the window, or None with fewer than two velocities in it.
    pub fn velocity(&self) -> Option<f64> {
        if self.window.len() < 2 {
            return None;
        }
        self.window.get()
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }
}

// =============================================================================
// Security
// =============================================================================

/// Current hash power as a percentage of the all-time high, clamped to [0, 100].
pub fn shield_ratio(current_th: f64, ath_th: f64) -> Option<f64> {
    if !(ath_th > 0.0) || !current_th.is_finite() {
        return None;
    }
    Some((current_th / ath_th * 100.0).clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttackCost {
    /// Hash power needed for a majority, TH/s.
    pub majority_th: f64,
    pub energy_usd: f64,
    pub hardware_usd: f64,
    pub total_usd: f64,
}

#[derive(Debug, Clone)]
pub struct AttackCostModel {
    pub energy_cost_per_th_hour: f64,
    pub hardware_cost_per_th: f64,
    pub hours: f64,
}

impl AttackCostModel {
    pub const MAJORITY: f64 = 0.51;

    pub fn estimate(&self, network_th: f64) -> Option<AttackCost> {
        if !(network_th > 0.0) {
            return None;
        }
        let majority_th = Self::MAJORITY * network_th;
        let energy_usd = majority_th * self.energy_cost_per_th_hour * self.hours;
        let hardware_usd = majority_th * self.hardware_cost_per_th;
        Some(AttackCost {
            majority_th,
            energy_usd,
            hardware_usd,
            total_usd: energy_usd + hardware_usd,
        })
    }
}

// =============================================================================
// Yield and mining projection
// =============================================================================

/// Daily USD revenue for a miner holding `share` of the network.
pub fn daily_revenue(block_reward: f64, bps: f64, share: f64, price_usd: f64) -> f64 {
    SECONDS_PER_DAY * block_reward * bps * share * price_usd
}

/// Daily USD revenue per TH/s of hash power.
pub fn revenue_per_th_day(block_reward: f64, bps: f64, network_th: f64, price_usd: f64) -> Option<f64> {
    if !(network_th > 0.0) {
        return None;
    }
    Some(daily_revenue(block_reward, bps, 1.0 / network_th, price_usd))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RigSpec {
    pub hashrate_th: f64,
    pub power_watts: f64,
    pub electricity_usd_per_kwh: f64,
    /// Hypothetical change in network hash power, in percent.
    pub network_change_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MiningProjection {
    pub network_th: f64,
    pub share: f64,
    pub kas_per_day: f64,
    pub revenue_per_day: f64,
    pub power_cost_per_day: f64,
    pub profit_per_day: f64,
    pub profit_per_month: f64,
    pub profit_per_year: f64,
}

pub fn project_mining(
    rig: &RigSpec,
    network_th: f64,
    block_reward: f64,
    bps: f64,
    price_usd: f64,
) -> Option<MiningProjection> {
    let simulated = network_th * (1.0 + rig.network_change_pct / 100.0);
    if !(simulated > 0.0) || !(rig.hashrate_th >= 0.0) {
        return None;
    }
    let share = rig.hashrate_th / simulated;
    let kas_per_day = SECONDS_PER_DAY * block_reward * bps * share;
    let revenue_per_day = kas_per_day * price_usd;
    let power_cost_per_day = rig.power_watts / 1000.0 * 24.0 * rig.electricity_usd_per_kwh;
    let profit_per_day = revenue_per_day - power_cost_per_day;
    Some(MiningProjection {
        network_th: simulated,
        share,
        kas_per_day,
        revenue_per_day,
        power_cost_per_day,
        profit_per_day,
        profit_per_month: profit_per_day * 30.0,
        profit_per_year: profit_per_day * 365.0,
    })
}

// =============================================================================
// DAG width
// =============================================================================

/// Mean number of blocks sharing a DAA score in the batch.
pub fn dag_width(blocks: &[BlockSummary]) -> Option<f64> {
    if blocks.is_empty() {
        return None;
    }
    let mut scores: Vec<u64> = blocks.iter().map(|b| b.daa_score).collect();
    scores.sort_unstable();
    scores.dedup();
    Some(blocks.len() as f64 / scores.len() as f64)
}

// =============================================================================
// Market ratios
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MarketRatios {
    pub sats_per_kas: Option<f64>,
    pub gwei_per_kas: Option<f64>,
    /// Kaspa 24h change minus Bitcoin 24h change, percentage points.
    pub relative_strength: Option<f64>,
    /// Position of the price within the 24h range, percent.
    pub range_position: Option<f64>,
    /// Distance below the all-time high, percent.
    pub below_ath_pct: Option<f64>,
}

pub fn ratio_to(base: Option<f64>, quote: Option<f64>, scale: f64) -> Option<f64> {
    match (base, quote) {
        (Some(b), Some(q)) if q > 0.0 && b.is_finite() => Some(b / q * scale),
        _ => None,
    }
}

pub fn range_position(price: Option<f64>, low: Option<f64>, high: Option<f64>) -> Option<f64> {
    match (price, low, high) {
        (Some(p), Some(l), Some(h)) if h > l => Some(((p - l) / (h - l) * 100.0).clamp(0.0, 100.0)),
        _ => None,
    }
}

pub fn below_ath(price: Option<f64>, ath: Option<f64>) -> Option<f64> {
    match (price, ath) {
        (Some(p), Some(a)) if a > 0.0 => Some(((a - p) / a * 100.0).max(0.0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(score: u64) -> BlockSummary {
        BlockSummary { hash: format!("h{}", score), daa_score: score, blue_score: None, timestamp_ms: None }
    }

    #[test]
    fn test_velocity_needs_two_samples() {
        let mut v = DaaVelocity::default();
        assert_eq!(v.observe(1_000, 0), None);
        assert_eq!(v.velocity(), None);
        assert_eq!(v.observe(1_100, 10_000), Some(10.0));
        assert_eq!(v.velocity(), None);
        v.observe(1_190, 20_000);
        assert!((v.velocity().unwrap() - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_skips_non_positive_elapsed() {
        let mut v = DaaVelocity::default();
        v.observe(1_000, 5_000);
        assert_eq!(v.observe(1_050, 5_000), None);
        assert_eq!(v.observe(1_100, 15_000), Some(10.0));
        assert_eq!(v.samples(), 1);
    }

    #[test]
    fn test_velocity_window_is_bounded() {
        let mut v = DaaVelocity::default();
        let mut score = 0;
        v.observe(score, 0);
        for i in 1..=20 {
            score += if i <= 14 { 50 } else { 100 };
            v.observe(score, i * 10_000);
        }
        assert_eq!(v.samples(), VELOCITY_WINDOW);
        assert!((v.velocity().unwrap() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_resync_resets() {
        let mut v = DaaVelocity::default();
        v.observe(1_000, 0);
        v.observe(1_100, 10_000);
        v.observe(1_200, 20_000);
        assert_eq!(v.observe(500, 30_000), None);
        assert_eq!(v.velocity(), None);
    }

    #[test]
    fn test_shield_ratio_clamped() {
        assert_eq!(shield_ratio(50.0, 100.0), Some(50.0));
        assert_eq!(shield_ratio(150.0, 100.0), Some(100.0));
        assert_eq!(shield_ratio(-1.0, 100.0), Some(0.0));
        assert_eq!(shield_ratio(50.0, 0.0), None);
    }

    #[test]
    fn test_attack_cost_components() {
        let model = AttackCostModel { energy_cost_per_th_hour: 0.01, hardware_cost_per_th: 100.0, hours: 2.0 };
        let c = model.estimate(1_000.0).unwrap();
        assert!((c.majority_th - 510.0).abs() < 1e-9);
        assert!((c.energy_usd - 10.2).abs() < 1e-9);
        assert!((c.hardware_usd - 51_000.0).abs() < 1e-9);
        assert!((c.total_usd - 51_010.2).abs() < 1e-9);
        assert!(model.estimate(0.0).is_none());
    }

    #[test]
    fn test_revenue_per_th() {
        let r = revenue_per_th_day(22.0, 10.0, 1_000_000.0, 0.1).unwrap();
        assert!((r - 86_400.0 * 22.0 * 10.0 / 1_000_000.0 * 0.1).abs() < 1e-9);
        assert!(revenue_per_th_day(22.0, 10.0, 0.0, 0.1).is_none());
    }

    #[test]
    fn test_projection_with_what_if() {
        let rig = RigSpec { hashrate_th: 10.0, power_watts: 3_000.0, electricity_usd_per_kwh: 0.1, network_change_pct: 0.0 };
        let base = project_mining(&rig, 1_000.0, 1.0, 1.0, 1.0).unwrap();
        assert!((base.kas_per_day - 864.0).abs() < 1e-9);
        assert!((base.power_cost_per_day - 7.2).abs() < 1e-9);
        assert!((base.profit_per_day - 856.8).abs() < 1e-9);

        let doubled = project_mining(&RigSpec { network_change_pct: 100.0, ..rig }, 1_000.0, 1.0, 1.0, 1.0).unwrap();
        assert!((doubled.kas_per_day - 432.0).abs() < 1e-9);
        assert!(project_mining(&RigSpec { network_change_pct: -100.0, ..rig }, 1_000.0, 1.0, 1.0, 1.0).is_none());
    }

    #[test]
    fn test_dag_width() {
        let blocks = vec![block(1), block(1), block(2), block(3), block(3), block(3)];
        assert_eq!(dag_width(&blocks), Some(2.0));
        assert_eq!(dag_width(&[]), None);
    }

    #[test]
    fn test_market_ratios() {
        assert_eq!(ratio_to(Some(0.1), Some(50_000.0), 1e8), Some(200.0));
        assert_eq!(ratio_to(Some(0.1), None, 1e8), None);
        assert_eq!(range_position(Some(15.0), Some(10.0), Some(20.0)), Some(50.0));
        assert_eq!(range_position(Some(15.0), Some(10.0), Some(10.0)), None);
        assert_eq!(below_ath(Some(0.05), Some(0.2)), Some(75.0));
    }
}
