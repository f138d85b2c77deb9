//! Explorer API payloads. Counters arrive as numbers or decimal strings
//! depending on endpoint and server version, so both are accepted.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;

pub const SOMPI_PER_KAS: f64 = 100_000_000.0;

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(u64),
    Float(f64),
    Text(String),
}

pub(crate) fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match Lenient::deserialize(d)? {
        Lenient::Int(n) => Ok(n),
        Lenient::Float(f) if f.is_finite() && f >= 0.0 => Ok(f as u64),
        Lenient::Float(f) => Err(de::Error::custom(format!("not a counter: {}", f))),
        Lenient::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

pub(crate) fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match Lenient::deserialize(d)? {
        Lenient::Int(n) => Ok(n as f64),
        Lenient::Float(f) => Ok(f),
        Lenient::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn lenient_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match Option::<Lenient>::deserialize(d)? {
        None => Ok(None),
        Some(Lenient::Int(n)) => Ok(Some(n)),
        Some(Lenient::Float(f)) if f.is_finite() && f >= 0.0 => Ok(Some(f as u64)),
        Some(Lenient::Float(_)) => Ok(None),
        Some(Lenient::Text(s)) => Ok(s.trim().parse().ok()),
    }
}

/// Hash power in TH/s.
#[derive(Debug, Clone, Deserialize)]
pub struct HashrateInfo {
    #[serde(deserialize_with = "lenient_f64")]
    pub hashrate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDagInfo {
    #[serde(deserialize_with = "lenient_u64")]
    pub virtual_daa_score: u64,
    #[serde(default)]
    pub difficulty: f64,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub block_count: Option<u64>,
    #[serde(default)]
    pub network_name: String,
    #[serde(default)]
    pub tip_hashes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinSupply {
    #[serde(deserialize_with = "lenient_f64")]
    pub circulating_supply: f64,
}

impl CoinSupply {
    pub fn circulating_kas(&self) -> f64 {
        self.circulating_supply / SOMPI_PER_KAS
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressBalance {
    #[serde(deserialize_with = "lenient_u64")]
    pub balance: u64,
}

/// The fields of a recent block the terminal uses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub hash: String,
    pub daa_score: u64,
    pub blue_score: Option<u64>,
    pub timestamp_ms: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeader {
    #[serde(default)]
    hash: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    daa_score: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    blue_score: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    timestamp: Option<u64>,
}

#[derive(Deserialize)]
struct RawVerbose {
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    #[serde(default)]
    header: Option<RawHeader>,
    #[serde(default)]
    verbose_data: Option<RawVerbose>,
}

impl RawBlock {
    fn summarize(self) -> Option<BlockSummary> {
        let header = self.header?;
        let daa_score = header.daa_score?;
        let hash = self
            .verbose_data
            .and_then(|v| v.hash)
            .or(header.hash)
            .unwrap_or_default();
        Some(BlockSummary {
            hash,
            daa_score,
            blue_score: header.blue_score,
            timestamp_ms: header.timestamp,
        })
    }
}

/// Accepts a bare array or an object with a `blocks` array. Blocks without
/// a DAA score are dropped; a batch with none left is malformed.
pub fn decode_blocks(raw: &Value) -> Result<Vec<BlockSummary>, FetchError> {
    let list = match raw {
        Value::Array(_) => raw,
        Value::Object(map) => map
            .get("blocks")
            .ok_or_else(|| FetchError::Parse("missing blocks array".into()))?,
        _ => return Err(FetchError::Parse("blocks payload is not a list".into())),
    };
    let blocks: Vec<RawBlock> = Vec::deserialize(list)?;
    let summaries: Vec<BlockSummary> = blocks.into_iter().filter_map(RawBlock::summarize).collect();
    if summaries.is_empty() {
        return Err(FetchError::Parse("no usable blocks".into()));
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_blockdag_string_counters() {
        let info = BlockDagInfo::deserialize(&json!({
            "networkName": "kaspa-mainnet",
            "blockCount": "123456",
            "difficulty": 1.5e15,
            "virtualDaaScore": "98765432"
        }))
        .unwrap();
        assert_eq!(info.virtual_daa_score, 98_765_432);
        assert_eq!(info.block_count, Some(123_456));
    }

    #[test]
    fn test_blockdag_requires_daa() {
        assert!(BlockDagInfo::deserialize(&json!({"difficulty": 1.0})).is_err());
    }

    #[test]
    fn test_supply_in_kas() {
        let s = CoinSupply::deserialize(&json!({"circulatingSupply": "2500000000000000000"})).unwrap();
        assert!((s.circulating_kas() - 25_000_000_000.0).abs() < 1.0);
    }

    #[test]
    fn test_blocks_wrapped_and_filtered() {
        let raw = json!({
            "blocks": [
                {"header": {"daaScore": "10", "timestamp": "1700000000000"}, "verboseData": {"hash": "aa"}},
                {"header": {"daaScore": 10, "hash": "bb"}},
                {"header": {}},
                {"verboseData": {"hash": "cc"}}
            ]
        });
        let blocks = decode_blocks(&raw).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].hash, "aa");
        assert_eq!(blocks[1].hash, "bb");
        assert_eq!(blocks[0].timestamp_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn test_empty_blocks_rejected() {
        assert!(decode_blocks(&json!([])).is_err());
        assert!(decode_blocks(&json!("nope")).is_err());
    }
}
