//! Monthly-halving reward schedule.
//!
//! Emission drops by a factor of `0.5^(1/12)` at every whole month since
//! genesis, so it halves once a year. The per-block reward splits the
//! per-second emission across however many blocks the network produces.

use serde::Serialize;

/// 365.25 / 12 days.
pub const MONTH_MS: i64 = 2_629_800_000;

pub fn monthly_decay() -> f64 {
    0.5f64.powf(1.0 / 12.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionReading {
    pub months_elapsed: u32,
    /// KAS per second.
    pub emission_per_sec: f64,
    pub bps: f64,
    /// KAS per block.
    pub block_reward: f64,
}

#[derive(Debug, Clone)]
pub struct EmissionModel {
    genesis_ms: i64,
    initial_emission: f64,
}

impl EmissionModel {
    pub fn new(genesis_ms: i64, initial_emission: f64) -> Self {
        Self { genesis_ms, initial_emission }
    }

    /// Whole months since genesis, zero before it.
    pub fn months_elapsed(&self, now_ms: i64) -> u32 {
        let elapsed = now_ms - self.genesis_ms;
        if elapsed <= 0 {
            return 0;
        }
        (elapsed / MONTH_MS).min(u32::MAX as i64) as u32
    }

    pub fn emission_per_sec(&self, now_ms: i64) -> f64 {
        let months = self.months_elapsed(now_ms);
        self.initial_emission * monthly_decay().powi(months.min(i32::MAX as u32) as i32)
    }

    /// None while the block rate is unknown or non-positive.
    pub fn reading(&self, now_ms: i64, bps: f64) -> Option<EmissionReading> {
        if !(bps.is_finite() && bps > 0.0) {
            return None;
        }
        let emission_per_sec = self.emission_per_sec(now_ms);
        Some(EmissionReading {
            months_elapsed: self.months_elapsed(now_ms),
            emission_per_sec,
            bps,
            block_reward: emission_per_sec / bps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENESIS: i64 = 1_651_881_600_000;
    const YEAR_MS: i64 = 12 * MONTH_MS;

    #[test]
    fn test_one_year_after_genesis() {
        let model = EmissionModel::new(GENESIS, 440.0);
        let r = model.reading(GENESIS + YEAR_MS, 10.0).unwrap();
        assert_eq!(r.months_elapsed, 12);
        assert!((r.block_reward - 22.0).abs() < 1e-6, "{}", r.block_reward);
    }

    #[test]
    fn test_before_genesis_is_initial() {
        let model = EmissionModel::new(GENESIS, 440.0);
        assert_eq!(model.months_elapsed(GENESIS - 1), 0);
        assert_eq!(model.emission_per_sec(GENESIS - 5 * MONTH_MS), 440.0);
    }

    #[test]
    fn test_month_boundary() {
        let model = EmissionModel::new(GENESIS, 440.0);
        assert_eq!(model.months_elapsed(GENESIS + MONTH_MS - 1), 0);
        assert_eq!(model.months_elapsed(GENESIS + MONTH_MS), 1);
    }

    #[test]
    fn test_reward_non_increasing() {
        let model = EmissionModel::new(GENESIS, 440.0);
        let mut last = f64::INFINITY;
        for day in 0..(6 * 365) {
            let now = GENESIS + day * 86_400_000;
            let reward = model.reading(now, 10.0).unwrap().block_reward;
            assert!(reward <= last, "day {}", day);
            last = reward;
        }
    }

    #[test]
    fn test_halves_every_year() {
        let model = EmissionModel::new(GENESIS, 440.0);
        for offset in [0, 3 * MONTH_MS + 17, 40 * MONTH_MS] {
            let t = GENESIS + offset;
            let a = model.reading(t, 10.0).unwrap().block_reward;
            let b = model.reading(t + YEAR_MS, 10.0).unwrap().block_reward;
            assert!((a / b - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_bps() {
        let model = EmissionModel::new(GENESIS, 440.0);
        assert!(model.reading(GENESIS, 0.0).is_none());
        assert!(model.reading(GENESIS, f64::NAN).is_none());
    }
}
