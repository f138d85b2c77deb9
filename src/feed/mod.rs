//! Upstream sources: what to fetch, where from, and how to decode it.

use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::cache::{StaleCache, TtlClass};
use crate::config::Config;
use crate::error::FetchError;

pub mod client;
pub mod extras;
pub mod kaspa;
pub mod market;

pub use client::{Fetch, SourceClient};

use extras::{Headline, TokenInfo};
use kaspa::{BlockDagInfo, BlockSummary};
use market::{GlobalInfo, MarketBoard, SpotPrice};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceId {
    Hashrate,
    /// Historical maximum, used once at startup to seed the all-time high.
    HashrateMax,
    BlockDag,
    Blocks,
    Supply,
    Markets,
    Global,
    /// Price-only endpoint used when the full market board is unavailable.
    SpotPrice,
    Balance(String),
    Tokens,
    News,
    Nodes,
}

impl SourceId {
    pub fn cache_key(&self) -> String {
        match self {
            SourceId::Balance(address) => format!("balance:{}", address),
            other => other.metric().to_string(),
        }
    }

    /// Key under which failures of this source are staged.
    pub fn metric(&self) -> &'static str {
        match self {
            SourceId::Hashrate => "hashrate",
            SourceId::HashrateMax => "hashrate_max",
            SourceId::BlockDag => "blockdag",
            SourceId::Blocks => "blocks",
            SourceId::Supply => "supply",
            SourceId::Markets => "market",
            SourceId::Global => "market_global",
            SourceId::SpotPrice => "market_spot",
            SourceId::Balance(_) => "balance",
            SourceId::Tokens => "tokens",
            SourceId::News => "news",
            SourceId::Nodes => "nodes",
        }
    }

    /// Stager key; balances are staged per address.
    pub fn stage_key(&self) -> String {
        self.cache_key()
    }

    pub fn ttl_class(&self) -> TtlClass {
        match self {
            SourceId::HashrateMax => TtlClass::History,
            _ => TtlClass::Live,
        }
    }

    pub fn url(&self, endpoints: &Endpoints) -> String {
        let explorer = endpoints.explorer.trim_end_matches('/');
        let market = endpoints.market.trim_end_matches('/');
        match self {
            SourceId::Hashrate => format!("{}/info/hashrate?stringOnly=false", explorer),
            SourceId::HashrateMax => format!("{}/info/hashrate/max", explorer),
            SourceId::BlockDag => format!("{}/info/blockdag", explorer),
            SourceId::Blocks => format!("{}/blocks?limit=10&includeTransactions=false", explorer),
            SourceId::Supply => format!("{}/info/coinsupply", explorer),
            SourceId::Balance(address) => format!("{}/addresses/{}/balance", explorer, address),
            SourceId::Markets => endpoints.with_market_key(format!(
                "{}/coins/markets?vs_currency=usd&ids={}",
                market,
                market::TRACKED_COINS.join(",")
            )),
            SourceId::Global => endpoints.with_market_key(format!("{}/global", market)),
            SourceId::SpotPrice => endpoints.with_market_key(format!(
                "{}/simple/price?ids=kaspa&vs_currencies=usd&include_24hr_change=true",
                market
            )),
            SourceId::Tokens => format!("{}/krc20/tokenlist", endpoints.tokens.trim_end_matches('/')),
            SourceId::News => endpoints.news.clone(),
            SourceId::Nodes => endpoints.nodes.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub explorer: String,
    pub market: String,
    pub tokens: String,
    pub news: String,
    pub nodes: String,
    pub market_api_key: Option<String>,
}

impl Endpoints {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            explorer: cfg.explorer_base.clone(),
            market: cfg.market_base.clone(),
            tokens: cfg.tokens_base.clone(),
            news: cfg.news_url.clone(),
            nodes: cfg.nodes_url.clone(),
            market_api_key: cfg.market_api_key.clone(),
        }
    }

    fn with_market_key(&self, raw: String) -> String {
        let Some(key) = &self.market_api_key else {
            return raw;
        };
        match Url::parse(&raw) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("x_cg_demo_api_key", key);
                url.to_string()
            }
            Err(_) => raw,
        }
    }
}

/// Decoded body of one upstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Network hash power in TH/s.
    Hashrate(f64),
    HashrateMax(f64),
    BlockDag(BlockDagInfo),
    Blocks(Vec<BlockSummary>),
    /// Circulating supply in KAS.
    Supply(f64),
    Markets(MarketBoard),
    Global(GlobalInfo),
    SpotPrice(SpotPrice),
    Balance { address: String, sompi: u64 },
    Tokens(Vec<TokenInfo>),
    News(Vec<Headline>),
    Nodes(usize),
}

impl Payload {
    pub fn decode(source: &SourceId, raw: &Value) -> Result<Self, FetchError> {
        Ok(match source {
            SourceId::Hashrate => Payload::Hashrate(kaspa::HashrateInfo::deserialize(raw)?.hashrate),
            SourceId::HashrateMax => {
                Payload::HashrateMax(kaspa::HashrateInfo::deserialize(raw)?.hashrate)
            }
            SourceId::BlockDag => Payload::BlockDag(BlockDagInfo::deserialize(raw)?),
            SourceId::Blocks => Payload::Blocks(kaspa::decode_blocks(raw)?),
            SourceId::Supply => Payload::Supply(kaspa::CoinSupply::deserialize(raw)?.circulating_kas()),
            SourceId::Markets => Payload::Markets(MarketBoard::decode(raw)?),
            SourceId::Global => Payload::Global(GlobalInfo::decode(raw)?),
            SourceId::SpotPrice => Payload::SpotPrice(SpotPrice::decode(raw)?),
            SourceId::Balance(address) => Payload::Balance {
                address: address.clone(),
                sompi: kaspa::AddressBalance::deserialize(raw)?.balance,
            },
            SourceId::Tokens => Payload::Tokens(extras::decode_tokens(raw)?),
            SourceId::News => Payload::News(extras::decode_news(raw)?),
            SourceId::Nodes => Payload::Nodes(extras::count_nodes(raw)?),
        })
    }
}

/// One fetched value. Not retained beyond the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub source: SourceId,
    pub payload: Payload,
    pub fetched_at_ms: i64,
    /// False when the sample was served from the stale cache.
    pub is_fresh: bool,
}

/// Rebuild a sample from the cache, if an unexpired entry decodes.
pub fn cached_sample(cache: &StaleCache, source: &SourceId, now_ms: i64) -> Option<Sample> {
    let raw = cache.get_at(&source.cache_key(), now_ms)?;
    let payload = Payload::decode(source, raw).ok()?;
    Some(Sample {
        source: source.clone(),
        payload,
        fetched_at_ms: now_ms,
        is_fresh: false,
    })
}
