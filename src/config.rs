use std::time::Duration;

use anyhow::{anyhow, Result};
use url::Url;

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub explorer_base: String,
    pub market_base: String,
    pub tokens_base: String,
    pub news_url: String,
    pub nodes_url: String,
    pub market_api_key: Option<String>,

    pub fetch_timeout_secs: u64,

    pub market_every_secs: u64,
    pub hashrate_every_secs: u64,
    pub blockdag_every_secs: u64,
    pub blocks_every_secs: u64,
    pub spot_check_every_secs: u64,
    pub tokens_every_secs: u64,
    pub news_every_secs: u64,
    pub supply_every_secs: u64,
    pub nodes_every_secs: u64,
    pub emission_every_secs: u64,
    pub snapshot_every_secs: u64,
    pub stagger_step_ms: u64,

    pub live_ttl_secs: u64,
    pub history_ttl_secs: u64,
    pub cache_path: String,

    /// Unix milliseconds of the first deflationary emission month.
    pub emission_genesis_ms: i64,
    pub initial_emission: f64,
    pub nominal_bps: f64,

    pub energy_cost_per_th_hour: f64,
    pub hardware_cost_per_th: f64,
    pub attack_hours: f64,

    pub whale_move_threshold: f64,
    pub flow_scale: f64,
    pub flow_top_n: usize,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            explorer_base: env_string("KASPA_API_URL", "https://api.kaspa.org"),
            market_base: env_string("COINGECKO_API_URL", "https://api.coingecko.com/api/v3"),
            tokens_base: env_string("KASPLEX_API_URL", "https://api.kasplex.org/v1"),
            news_url: env_string("NEWS_API_URL", "https://min-api.cryptocompare.com/data/v2/news/?categories=KAS"),
            nodes_url: env_string(
                "NODES_URL",
                "https://raw.githubusercontent.com/tmrlvi/kaspa-crawler/master/data/nodes.json",
            ),
            market_api_key: std::env::var("COINGECKO_API_KEY").ok().filter(|k| !k.is_empty()),

            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", 8),

            market_every_secs: env_or("MARKET_SECS", 30),
            hashrate_every_secs: env_or("HASHRATE_SECS", 10),
            blockdag_every_secs: env_or("BLOCKDAG_SECS", 10),
            blocks_every_secs: env_or("BLOCKS_SECS", 5),
            spot_check_every_secs: env_or("SPOT_CHECK_SECS", 3),
            tokens_every_secs: env_or("TOKENS_SECS", 90),
            news_every_secs: env_or("NEWS_SECS", 300),
            supply_every_secs: env_or("SUPPLY_SECS", 300),
            nodes_every_secs: env_or("NODES_SECS", 120),
            emission_every_secs: env_or("EMISSION_SECS", 30),
            snapshot_every_secs: env_or("SNAPSHOT_SECS", 60),
            stagger_step_ms: env_or("STAGGER_MS", 300),

            live_ttl_secs: env_or("CACHE_LIVE_TTL_SECS", 600),
            history_ttl_secs: env_or("CACHE_HISTORY_TTL_SECS", 300),
            cache_path: env_string("CACHE_PATH", "./kaswatch-cache.sqlite"),

            // 2022-05-07T00:00:00Z, start of the monthly reward schedule.
            emission_genesis_ms: env_or("EMISSION_GENESIS_MS", 1_651_881_600_000),
            initial_emission: env_or("INITIAL_EMISSION", 440.0),
            nominal_bps: env_or("NOMINAL_BPS", 10.0),

            energy_cost_per_th_hour: env_or("ENERGY_COST_PER_TH_HOUR", 0.0075),
            hardware_cost_per_th: env_or("HARDWARE_COST_PER_TH", 450.0),
            attack_hours: env_or("ATTACK_HOURS", 1.0),

            whale_move_threshold: env_or("WHALE_THRESHOLD", 1_000_000.0),
            flow_scale: env_or("FLOW_SCALE", 1_000_000.0),
            flow_top_n: env_or("FLOW_TOP_N", 20),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, base) in [
            ("KASPA_API_URL", &self.explorer_base),
            ("COINGECKO_API_URL", &self.market_base),
            ("KASPLEX_API_URL", &self.tokens_base),
            ("NEWS_API_URL", &self.news_url),
            ("NODES_URL", &self.nodes_url),
        ] {
            Url::parse(base).map_err(|e| anyhow!("{} is not a valid url ({}): {}", name, base, e))?;
        }
        if self.fetch_timeout_secs == 0 {
            return Err(anyhow!("FETCH_TIMEOUT_SECS must be positive"));
        }
        let cadences = [
            ("MARKET_SECS", self.market_every_secs),
            ("HASHRATE_SECS", self.hashrate_every_secs),
            ("BLOCKDAG_SECS", self.blockdag_every_secs),
            ("BLOCKS_SECS", self.blocks_every_secs),
            ("SPOT_CHECK_SECS", self.spot_check_every_secs),
            ("TOKENS_SECS", self.tokens_every_secs),
            ("NEWS_SECS", self.news_every_secs),
            ("SUPPLY_SECS", self.supply_every_secs),
            ("NODES_SECS", self.nodes_every_secs),
            ("EMISSION_SECS", self.emission_every_secs),
            ("SNAPSHOT_SECS", self.snapshot_every_secs),
        ];
        if let Some((name, _)) = cadences.iter().find(|(_, secs)| *secs == 0) {
            return Err(anyhow!("{} must be positive", name));
        }
        if self.nominal_bps <= 0.0 {
            return Err(anyhow!("NOMINAL_BPS must be positive"));
        }
        if self.flow_scale <= 0.0 {
            return Err(anyhow!("FLOW_SCALE must be positive"));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn stagger_step(&self) -> Duration {
        Duration::from_millis(self.stagger_step_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::from_env();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(cfg.fetch_timeout_secs));
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let mut cfg = Config::from_env();
        cfg.blocks_every_secs = 0;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("BLOCKS_SECS"), "{}", err);
    }

    #[test]
    fn test_bad_url_rejected() {
        let mut cfg = Config::from_env();
        cfg.explorer_base = "not a url".to_string();
        assert!(cfg.validate().is_err());
    }
}
