//! Mutable terminal state, owned by the engine.

use serde::Serialize;

use crate::feed::extras::{Headline, TokenInfo};
use crate::feed::kaspa::{BlockDagInfo, BlockSummary};
use crate::feed::market::{CoinRow, MarketBoard, SpotPrice};
use crate::indicators::BoundedSeries;
use crate::metrics::{self, DaaVelocity, MarketRatios};

pub const HASH_HISTORY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HashSample {
    pub at_ms: i64,
    pub hashrate_th: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DaaReading {
    pub score: u64,
    pub at_ms: i64,
}

#[derive(Debug, Clone)]
pub struct NetworkState {
    pub hashrate_th: Option<f64>,
    history: BoundedSeries<HashSample>,
    ath_th: f64,
    nominal_bps: f64,
    pub daa: Option<DaaReading>,
    velocity: DaaVelocity,
    pub difficulty: Option<f64>,
    pub dag_width: Option<f64>,
    pub recent_blocks: Vec<BlockSummary>,
    /// Set when the block list is unavailable and the width shown is the last known.
    pub blocks_estimated: bool,
    pub circulating_kas: Option<f64>,
    pub node_count: Option<usize>,
}

impl NetworkState {
    pub fn new(nominal_bps: f64) -> Self {
        Self {
            hashrate_th: None,
            history: BoundedSeries::new(HASH_HISTORY),
            ath_th: 0.0,
            nominal_bps,
            daa: None,
            velocity: DaaVelocity::default(),
            difficulty: None,
            dag_width: None,
            recent_blocks: Vec::new(),
            blocks_estimated: false,
            circulating_kas: None,
            node_count: None,
        }
    }

    /// Stale readings update the shown value but stay out of the history.
    pub fn record_hashrate(&mut self, hashrate_th: f64, at_ms: i64, fresh: bool) {
        if !hashrate_th.is_finite() || hashrate_th < 0.0 {
            return;
        }
        self.hashrate_th = Some(hashrate_th);
        if fresh {
            self.history.push(HashSample { at_ms, hashrate_th });
        }
        self.seed_ath(hashrate_th);
    }

    /// The all-time high only ever rises.
    pub fn seed_ath(&mut self, hashrate_th: f64) {
        if hashrate_th.is_finite() && hashrate_th > self.ath_th {
            self.ath_th = hashrate_th;
        }
    }

    pub fn ath_th(&self) -> f64 {
        self.ath_th
    }

    pub fn hash_history(&self) -> impl Iterator<Item = &HashSample> {
        self.history.iter()
    }

    pub fn hash_values(&self) -> Vec<f64> {
        self.history.iter().map(|s| s.hashrate_th).collect()
    }

    /// Returns the instantaneous velocity when one could be computed.
    pub fn record_blockdag(&mut self, info: &BlockDagInfo, at_ms: i64, fresh: bool) -> Option<f64> {
        if info.difficulty > 0.0 {
            self.difficulty = Some(info.difficulty);
        }
        if !fresh {
            return None;
        }
        self.daa = Some(DaaReading { score: info.virtual_daa_score, at_ms });
        self.velocity.observe(info.virtual_daa_score, at_ms)
    }

    pub fn velocity(&self) -> Option<f64> {
        self.velocity.velocity()
    }

    /// Measured velocity when known, otherwise the nominal rate.
    pub fn bps(&self) -> f64 {
        match self.velocity() {
            Some(v) if v > 0.0 => v,
            _ => self.nominal_bps,
        }
    }

    pub fn record_blocks(&mut self, blocks: Vec<BlockSummary>) {
        self.dag_width = metrics::dag_width(&blocks);
        self.recent_blocks = blocks;
        self.blocks_estimated = false;
    }

    /// Keep the last width; never invent blocks.
    pub fn mark_blocks_estimated(&mut self) {
        self.blocks_estimated = true;
    }

    pub fn shield_ratio(&self) -> Option<f64> {
        metrics::shield_ratio(self.hashrate_th?, self.ath_th)
    }
}

/// One row of the comparison board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Quote {
    pub price: Option<f64>,
    pub change_24h: Option<f64>,
}

impl From<&CoinRow> for Quote {
    fn from(row: &CoinRow) -> Self {
        Quote {
            price: row.current_price,
            change_24h: row.price_change_percentage_24h,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketState {
    pub price: Option<f64>,
    pub change_24h: Option<f64>,
    pub volume_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub ath: Option<f64>,
    pub ath_date: Option<String>,
    pub btc: Quote,
    pub eth: Quote,
    pub gold: Quote,
    pub silver: Quote,
    pub btc_dominance: Option<f64>,
    /// True while only the price-only quote is available.
    pub price_only: bool,
    pub tokens: Vec<TokenInfo>,
    pub headlines: Vec<Headline>,
}

impl MarketState {
    pub fn apply_board(&mut self, board: &MarketBoard) {
        if let Some(kas) = board.coin("kaspa") {
            self.price = kas.current_price.or(self.price);
            self.change_24h = kas.price_change_percentage_24h;
            self.volume_24h = kas.total_volume;
            self.market_cap = kas.market_cap;
            self.high_24h = kas.high_24h;
            self.low_24h = kas.low_24h;
            self.ath = kas.ath.or(self.ath);
            if kas.ath_date.is_some() {
                self.ath_date = kas.ath_date.clone();
            }
            self.price_only = false;
        }
        for (id, slot) in [
            ("bitcoin", &mut self.btc),
            ("ethereum", &mut self.eth),
            ("pax-gold", &mut self.gold),
            ("kinesis-silver", &mut self.silver),
        ] {
            if let Some(row) = board.coin(id) {
                *slot = Quote::from(row);
            }
        }
    }

    /// Price-only fallback. Volume and cap stay as last known.
    pub fn apply_spot(&mut self, spot: &SpotPrice) {
        self.price = Some(spot.usd);
        if spot.change_24h.is_some() {
            self.change_24h = spot.change_24h;
        }
        self.price_only = true;
    }

    pub fn ratios(&self) -> MarketRatios {
        MarketRatios {
            sats_per_kas: metrics::ratio_to(self.price, self.btc.price, 1e8),
            gwei_per_kas: metrics::ratio_to(self.price, self.eth.price, 1e9),
            relative_strength: match (self.change_24h, self.btc.change_24h) {
                (Some(k), Some(b)) => Some(k - b),
                _ => None,
            },
            range_position: metrics::range_position(self.price, self.low_24h, self.high_24h),
            below_ath_pct: metrics::below_ath(self.price, self.ath),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dag(score: u64) -> BlockDagInfo {
        BlockDagInfo {
            virtual_daa_score: score,
            difficulty: 1.0,
            block_count: None,
            network_name: String::new(),
            tip_hashes: Vec::new(),
        }
    }

    #[test]
    fn test_history_bounded_and_fresh_only() {
        let mut n = NetworkState::new(10.0);
        for i in 0..250 {
            n.record_hashrate(i as f64, i, true);
        }
        n.record_hashrate(9_999.0, 300, false);
        assert_eq!(n.hash_history().count(), HASH_HISTORY);
        assert_eq!(n.hashrate_th, Some(9_999.0));
        assert_eq!(n.hash_values().last(), Some(&249.0));
    }

    #[test]
    fn test_ath_monotonic() {
        let mut n = NetworkState::new(10.0);
        n.seed_ath(500.0);
        n.record_hashrate(400.0, 0, true);
        assert_eq!(n.ath_th(), 500.0);
        n.record_hashrate(600.0, 1, true);
        n.seed_ath(550.0);
        assert_eq!(n.ath_th(), 600.0);
        assert!((n.shield_ratio().unwrap() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_bps_falls_back_to_nominal() {
        let mut n = NetworkState::new(10.0);
        assert_eq!(n.bps(), 10.0);
        n.record_blockdag(&dag(0), 0, true);
        n.record_blockdag(&dag(80), 10_000, true);
        assert_eq!(n.bps(), 10.0);
        n.record_blockdag(&dag(160), 20_000, true);
        assert!((n.bps() - 8.0).abs() < 1e-12);
        // Stale readings never move the velocity.
        n.record_blockdag(&dag(10_000), 30_000, false);
        assert!((n.bps() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_blocks_estimated_keeps_width() {
        let mut n = NetworkState::new(10.0);
        let b = |s| BlockSummary { hash: String::new(), daa_score: s, blue_score: None, timestamp_ms: None };
        n.record_blocks(vec![b(1), b(1)]);
        n.mark_blocks_estimated();
        assert_eq!(n.dag_width, Some(2.0));
        assert!(n.blocks_estimated);
    }

    #[test]
    fn test_spot_marks_price_only() {
        let mut m = MarketState::default();
        m.volume_24h = Some(5.0);
        m.apply_spot(&SpotPrice { usd: 0.1, change_24h: None });
        assert!(m.price_only);
        assert_eq!(m.price, Some(0.1));
        assert_eq!(m.volume_24h, Some(5.0));
    }

    #[test]
    fn test_ratios() {
        let mut m = MarketState::default();
        m.price = Some(0.1);
        m.change_24h = Some(5.0);
        m.btc = Quote { price: Some(50_000.0), change_24h: Some(2.0) };
        let r = m.ratios();
        assert!((r.sats_per_kas.unwrap() - 200.0).abs() < 1e-9);
        assert_eq!(r.relative_strength, Some(3.0));
        assert_eq!(r.gwei_per_kas, None);
    }
}
