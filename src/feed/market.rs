use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

/// Market board ids, in request order.
pub const TRACKED_COINS: [&str; 5] = ["bitcoin", "ethereum", "kaspa", "pax-gold", "kinesis-silver"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRow {
    pub id: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub ath: Option<f64>,
    #[serde(default)]
    pub ath_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketBoard {
    pub rows: Vec<CoinRow>,
}

impl MarketBoard {
    /// The board is only usable when it carries a priced kaspa row.
    pub fn decode(raw: &Value) -> Result<Self, FetchError> {
        let rows: Vec<CoinRow> = Vec::deserialize(raw)?;
        let board = Self { rows };
        match board.coin("kaspa").and_then(|row| row.current_price) {
            Some(_) => Ok(board),
            None => Err(FetchError::Parse("market board has no kaspa price".into())),
        }
    }

    pub fn coin(&self, id: &str) -> Option<&CoinRow> {
        self.rows.iter().find(|row| row.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalInfo {
    /// Bitcoin share of total crypto market cap, in percent.
    pub btc_dominance: f64,
}

#[derive(Deserialize)]
struct RawGlobal {
    data: RawGlobalData,
}

#[derive(Deserialize)]
struct RawGlobalData {
    market_cap_percentage: std::collections::HashMap<String, f64>,
}

impl GlobalInfo {
    pub fn decode(raw: &Value) -> Result<Self, FetchError> {
        let global = RawGlobal::deserialize(raw)?;
        global
            .data
            .market_cap_percentage
            .get("btc")
            .map(|d| GlobalInfo { btc_dominance: *d })
            .ok_or_else(|| FetchError::Parse("global payload has no btc dominance".into()))
    }
}

/// Degraded price-only quote.
#[derive(Debug, Clone, PartialEq)]
pub struct SpotPrice {
    pub usd: f64,
    pub change_24h: Option<f64>,
}

#[derive(Deserialize)]
struct RawSpot {
    kaspa: RawSpotQuote,
}

#[derive(Deserialize)]
struct RawSpotQuote {
    usd: f64,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

impl SpotPrice {
    pub fn decode(raw: &Value) -> Result<Self, FetchError> {
        let spot = RawSpot::deserialize(raw)?;
        Ok(SpotPrice {
            usd: spot.kaspa.usd,
            change_24h: spot.kaspa.usd_24h_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_board_requires_kaspa_price() {
        let ok = json!([
            {"id": "bitcoin", "current_price": 65000.0},
            {"id": "kaspa", "current_price": 0.12, "price_change_percentage_24h": -3.5, "ath": 0.2}
        ]);
        let board = MarketBoard::decode(&ok).unwrap();
        assert_eq!(board.coin("kaspa").unwrap().price_change_percentage_24h, Some(-3.5));
        assert!(board.coin("ethereum").is_none());

        let missing = json!([{"id": "bitcoin", "current_price": 65000.0}]);
        assert!(MarketBoard::decode(&missing).is_err());
        let unpriced = json!([{"id": "kaspa", "current_price": null}]);
        assert!(MarketBoard::decode(&unpriced).is_err());
    }

    #[test]
    fn test_global_dominance() {
        let raw = json!({"data": {"market_cap_percentage": {"btc": 54.2, "eth": 17.0}}});
        assert_eq!(GlobalInfo::decode(&raw).unwrap().btc_dominance, 54.2);
        assert!(GlobalInfo::decode(&json!({"data": {"market_cap_percentage": {}}})).is_err());
    }

    #[test]
    fn test_spot_price() {
        let raw = json!({"kaspa": {"usd": 0.11, "usd_24h_change": 2.0}});
        assert_eq!(SpotPrice::decode(&raw).unwrap(), SpotPrice { usd: 0.11, change_24h: Some(2.0) });
    }
}
