use crate::cache::{now_ms, SharedCache};
use crate::config::Config;
use crate::emission::{EmissionModel, EmissionReading};
use crate::error::FetchError;
use crate::feed::extras::TokenStatus;
use crate::feed::{cached_sample, Payload, Sample, SourceId};
use crate::health::{self, NetworkHealth};
use crate::ledger::{EntityLedger, LargeMovement};
use crate::logging;
use crate::metrics::{self, AttackCostModel, MiningProjection, RigSpec};
use crate::reliability::{FailureStager, Severity};
use crate::risk::{AlertLevel, RiskInputs, RiskScore, RiskScorer};
use crate::scheduler::{FollowUp, PollOutcome};
use crate::sink::{self, ids, DisplaySink, FeedEvent, SIGNAL_LOST};
use crate::state::{MarketState, NetworkState};
use crate::watchlist::WatchEntry;

fn display_id(source: &SourceId) -> String {
    match source {
        SourceId::Hashrate => ids::HASHRATE.to_string(),
        SourceId::HashrateMax => ids::HASHRATE_ATH.to_string(),
        SourceId::BlockDag => ids::DAA_SCORE.to_string(),
        SourceId::Blocks => ids::BLOCK_FEED.to_string(),
        SourceId::Supply => ids::SUPPLY.to_string(),
        SourceId::Markets | SourceId::SpotPrice => ids::PRICE.to_string(),
        SourceId::Global => ids::DOMINANCE.to_string(),
        SourceId::Balance(address) => ids::balance(address),
        SourceId::Tokens => ids::TOKENS.to_string(),
        SourceId::News => ids::NEWS.to_string(),
        SourceId::Nodes => ids::NODES.to_string(),
    }
}

/// Owns every piece of live state and turns poll outcomes into state
/// changes, display updates and follow-up polls.
pub struct Terminal<S: DisplaySink> {
    network: NetworkState,
    market: MarketState,
    ledger: EntityLedger,
    cache: SharedCache,
    stager: FailureStager,
    emission: EmissionModel,
    attack: AttackCostModel,
    scorer: RiskScorer,
    reading: Option<EmissionReading>,
    level: Option<AlertLevel>,
    nominal_bps: f64,
    flow_top_n: usize,
    /// When the last price-only quote arrived.
    spot_at_ms: Option<i64>,
    /// A spot quote younger than one board cadence still counts as live.
    spot_live_ms: i64,
    sink: S,
}

impl<S: DisplaySink> Terminal<S> {
    pub fn new(cfg: &Config, cache: SharedCache, sink: S) -> Self {
        Self {
            network: NetworkState::new(cfg.nominal_bps),
            market: MarketState::default(),
            ledger: EntityLedger::new(cfg.whale_move_threshold),
            cache,
            stager: FailureStager::default(),
            emission: EmissionModel::new(cfg.emission_genesis_ms, cfg.initial_emission),
            attack: AttackCostModel {
                energy_cost_per_th_hour: cfg.energy_cost_per_th_hour,
                hardware_cost_per_th: cfg.hardware_cost_per_th,
                hours: cfg.attack_hours,
            },
            scorer: RiskScorer::new(cfg.flow_scale),
            reading: None,
            level: None,
            nominal_bps: cfg.nominal_bps,
            flow_top_n: cfg.flow_top_n,
            spot_at_ms: None,
            spot_live_ms: (cfg.market_every_secs as i64).saturating_mul(1000),
            sink,
        }
    }

    /// Track `watch` and ask for the startup polls: the all-time-high seed
    /// and one staggered balance poll per entity.
    pub fn start(&mut self, watch: &[WatchEntry]) -> Vec<FollowUp> {
        let balances = self.ledger.initialize(watch);
        for entity in self.ledger.entities() {
            self.sink.set_value(&ids::balance(&entity.address), sink::UNKNOWN);
        }
        vec![FollowUp::Fetch(SourceId::HashrateMax), FollowUp::Stagger(balances)]
    }

    pub fn tracked_addresses(&self) -> Vec<String> {
        self.ledger.entities().iter().map(|e| e.address.clone()).collect()
    }

    pub fn apply(&mut self, outcome: PollOutcome) -> Vec<FollowUp> {
        self.apply_at(outcome, now_ms())
    }

    pub fn apply_at(&mut self, outcome: PollOutcome, now_ms: i64) -> Vec<FollowUp> {
        match outcome.result {
            Ok(sample) => {
                self.on_success(&outcome.source);
                self.apply_sample(sample, now_ms);
                Vec::new()
            }
            Err(err) => self.on_failure(&outcome.source, &err, now_ms),
        }
    }

    fn on_success(&mut self, source: &SourceId) {
        let before = self.stager.report_success(&source.stage_key());
        if before == Severity::Degraded {
            let id = display_id(source);
            self.sink.set_severity(&id, Severity::Normal);
            self.sink.emit_event(&FeedEvent::SignalRestored { metric: source.stage_key() });
        }
    }

    fn on_failure(&mut self, source: &SourceId, err: &FetchError, now_ms: i64) -> Vec<FollowUp> {
        let key = source.stage_key();
        let before = self.stager.severity(&key);
        let severity = self.stager.report_failure(&key);
        logging::log_fetch_failure(&key, err, self.stager.consecutive_failures(&key));

        let mut follow_ups = Vec::new();
        let cached = self
            .cache
            .lock()
            .ok()
            .and_then(|cache| cached_sample(&cache, source, now_ms));
        logging::log_cache_fallback(&source.cache_key(), cached.is_some());
        match cached {
            Some(sample) => self.apply_sample(sample, now_ms),
            None if *source == SourceId::Markets => {
                follow_ups.push(FollowUp::Fetch(SourceId::SpotPrice));
            }
            None => {}
        }

        match source {
            SourceId::Blocks => {
                self.network.mark_blocks_estimated();
                self.sink.set_value(ids::BLOCK_FEED, "LIVE (EST)");
            }
            SourceId::Balance(address) => {
                if let Some(index) = self.ledger.index_of(address) {
                    self.ledger.mark_offline(index);
                }
            }
            _ => {}
        }

        if severity == Severity::Degraded {
            let id = display_id(source);
            // A live spot quote keeps the price on screen; the severity still shows the outage.
            if !self.spot_price_live(source, now_ms) {
                self.sink.set_value(&id, SIGNAL_LOST);
            }
            if before == Severity::Normal {
                self.sink.set_severity(&id, Severity::Degraded);
                self.sink.emit_event(&FeedEvent::SignalLost { metric: key });
            }
        }
        follow_ups
    }

    fn spot_price_live(&self, source: &SourceId, now_ms: i64) -> bool {
        *source == SourceId::Markets
            && self.market.price_only
            && self.spot_at_ms.map_or(false, |at| now_ms - at <= self.spot_live_ms)
    }

    /// Route one sample into state. Stale samples update shown values but
    /// never extend the hash history or the velocity window.
    fn apply_sample(&mut self, sample: Sample, now_ms: i64) {
        let fresh = sample.is_fresh;
        let at = sample.fetched_at_ms;
        match sample.payload {
            Payload::Hashrate(th) => {
                self.network.record_hashrate(th, at, fresh);
                self.publish_security();
            }
            Payload::HashrateMax(th) => {
                self.network.seed_ath(th);
                self.publish_security();
            }
            Payload::BlockDag(info) => {
                let bps_before = self.network.bps();
                self.network.record_blockdag(&info, at, fresh);
                self.sink.set_value(ids::DAA_SCORE, &sink::thousands(info.virtual_daa_score as f64));
                self.sink.set_value(ids::DIFFICULTY, &sink::opt(self.network.difficulty, |d| format!("{:.3e}", d)));
                self.sink.set_value(ids::BPS, &sink::opt(self.network.velocity(), |v| format!("{:.2}", v)));
                if self.reading.is_none() || self.network.bps() != bps_before {
                    self.refresh_emission_at(now_ms);
                }
            }
            Payload::Blocks(blocks) => {
                self.network.record_blocks(blocks);
                self.sink.set_value(ids::DAG_WIDTH, &sink::opt(self.network.dag_width, |w| format!("{:.2}", w)));
                self.sink.set_value(ids::BLOCK_FEED, "LIVE");
            }
            Payload::Supply(kas) => {
                self.network.circulating_kas = Some(kas);
                self.sink.set_value(ids::SUPPLY, &sink::thousands(kas));
            }
            Payload::Markets(board) => {
                self.market.apply_board(&board);
                self.publish_market();
            }
            Payload::Global(global) => {
                self.market.btc_dominance = Some(global.btc_dominance);
                self.sink.set_value(ids::DOMINANCE, &format!("{:.1}%", global.btc_dominance));
            }
            Payload::SpotPrice(spot) => {
                if fresh {
                    self.spot_at_ms = Some(at);
                }
                self.market.apply_spot(&spot);
                self.publish_market();
            }
            Payload::Balance { address, sompi } => self.apply_balance(&address, sompi),
            Payload::Tokens(tokens) => {
                let trading = tokens
                    .iter()
                    .filter(|t| t.status() == TokenStatus::Trading)
                    .count();
                self.sink.set_value(ids::TOKENS, &format!("{} tokens, {} trading", tokens.len(), trading));
                self.market.tokens = tokens;
            }
            Payload::News(headlines) => {
                if let Some(top) = headlines.first() {
                    self.sink.set_value(ids::NEWS, &top.title);
                }
                self.market.headlines = headlines;
            }
            Payload::Nodes(count) => {
                self.network.node_count = Some(count);
                self.sink.set_value(ids::NODES, &count.to_string());
            }
        }
        self.publish_health();
        self.publish_score();
    }

    fn apply_balance(&mut self, address: &str, sompi: u64) {
        let Some(index) = self.ledger.index_of(address) else {
            return;
        };
        if let Some(LargeMovement { address: moved, rank, delta, balance }) =
            self.ledger.apply_balance_update(index, sompi)
        {
            logging::log_large_movement(&moved, rank, delta, balance);
            self.sink.emit_event(&FeedEvent::LargeMovement { address: moved, rank, delta, balance });
        }
        if let Some(entity) = self.ledger.get(index) {
            if entity.is_synced() {
                self.sink.set_value(&ids::balance(address), &sink::thousands(entity.balance));
            }
        }
        let flow = self.ledger.aggregate_delta(self.flow_top_n);
        self.sink.set_value(ids::FLOW, &sink::opt(flow, |d| format!("{} KAS", sink::thousands(d))));
        let stats = self.ledger.stats();
        self.sink.set_value(
            ids::CONCENTRATION,
            &format!("{:.2}% in {} wallets", stats.percent_of_supply, stats.synced),
        );
    }

    /// Recompute emission and block reward from the current block rate.
    pub fn refresh_emission_at(&mut self, now_ms: i64) -> Option<EmissionReading> {
        let reading = self.emission.reading(now_ms, self.network.bps())?;
        logging::log_emission(reading.emission_per_sec, reading.bps, reading.block_reward);
        self.sink.set_value(ids::EMISSION, &format!("{:.2} KAS/s", reading.emission_per_sec));
        self.sink.set_value(ids::BLOCK_REWARD, &format!("{:.4} KAS", reading.block_reward));
        self.reading = Some(reading);
        self.publish_yield();
        Some(reading)
    }

    pub fn refresh_emission(&mut self) -> Option<EmissionReading> {
        self.refresh_emission_at(now_ms())
    }

    fn publish_security(&mut self) {
        let current = self.network.hashrate_th;
        self.sink.set_value(ids::HASHRATE, &sink::opt(current, sink::hashrate));
        let ath = self.network.ath_th();
        if ath > 0.0 {
            self.sink.set_value(ids::HASHRATE_ATH, &sink::hashrate(ath));
        }
        self.sink.set_value(ids::SHIELD, &sink::opt(self.network.shield_ratio(), |r| format!("{:.1}%", r)));
        let cost = current.and_then(|h| self.attack.estimate(h));
        self.sink.set_value(ids::ATTACK_COST, &sink::opt(cost.map(|c| c.total_usd), sink::usd_compact));
        self.publish_yield();
    }

    fn publish_yield(&mut self) {
        let per_th = match (self.reading, self.network.hashrate_th, self.market.price) {
            (Some(r), Some(h), Some(p)) => metrics::revenue_per_th_day(r.block_reward, r.bps, h, p),
            _ => None,
        };
        self.sink.set_value(ids::YIELD, &sink::opt(per_th, |v| format!("{}/TH/day", sink::usd(v, 4))));
    }

    fn publish_market(&mut self) {
        let m = &self.market;
        let price = sink::opt(m.price, |p| sink::usd(p, 4));
        let change = sink::opt(m.change_24h, sink::signed_pct);
        let volume = sink::opt(m.volume_24h, sink::usd_compact);
        let cap = sink::opt(m.market_cap, sink::usd_compact);
        let ratios = m.ratios();
        self.sink.set_value(ids::PRICE, &price);
        self.sink.set_value(ids::CHANGE, &change);
        self.sink.set_value(ids::VOLUME, &volume);
        self.sink.set_value(ids::MARKET_CAP, &cap);
        self.sink.set_value(ids::SATS, &sink::opt(ratios.sats_per_kas, |s| format!("{:.0} sats", s)));
        self.sink.set_value(ids::GWEI, &sink::opt(ratios.gwei_per_kas, |g| format!("{:.0} gwei", g)));
        self.sink.set_value(ids::REL_STRENGTH, &sink::opt(ratios.relative_strength, sink::signed_pct));
        self.publish_yield();
    }

    fn publish_health(&mut self) {
        let h = self.health();
        self.sink.set_value(ids::HEALTH, &format!("{} ({:.0})", h.status.as_str(), h.score));
    }

    /// Recompute the composite and announce level changes.
    pub fn publish_score(&mut self) -> RiskScore {
        let score = self.risk_score();
        self.sink.set_value(ids::ALERT_SCORE, &score.value.to_string());
        self.sink.set_value(ids::ALERT_LEVEL, score.level.as_str());
        if self.level != Some(score.level) {
            logging::log_risk_score(
                score.value,
                score.level.as_str(),
                &[
                    ("price", score.factors.price),
                    ("hash_trend", score.factors.hash_trend),
                    ("entity_flow", score.factors.entity_flow),
                    ("volume", score.factors.volume),
                ],
            );
            self.sink.emit_event(&FeedEvent::AlertLevelChanged {
                from: self.level,
                to: score.level,
                score: score.value,
            });
            self.level = Some(score.level);
        }
        score
    }

    pub fn risk_score(&self) -> RiskScore {
        let inputs = RiskInputs::snapshot(&self.network, &self.market, &self.ledger, self.flow_top_n);
        self.scorer.score(&inputs)
    }

    pub fn health(&self) -> NetworkHealth {
        health::assess(&self.network, self.nominal_bps)
    }

    /// Mining projection at the current reward, block rate and price.
    pub fn projection(&self, rig: &RigSpec) -> Option<MiningProjection> {
        let reading = self.reading?;
        metrics::project_mining(rig, self.network.hashrate_th?, reading.block_reward, reading.bps, self.market.price?)
    }

    pub fn network(&self) -> &NetworkState {
        &self.network
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn ledger(&self) -> &EntityLedger {
        &self.ledger
    }

    pub fn emission_reading(&self) -> Option<EmissionReading> {
        self.reading
    }

    pub fn severity(&self, source: &SourceId) -> Severity {
        self.stager.severity(&source.stage_key())
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
