//! Secondary panels: KRC-20 token list, headlines and node census.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FetchError;
use crate::feed::kaspa::lenient_f64;

/// Only the head of the token list is kept.
pub const TOKEN_LIMIT: usize = 20;
pub const HEADLINE_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Minting,
    Trading,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub tick: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub max: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub minted: f64,
    #[serde(default)]
    pub state: String,
}

impl TokenInfo {
    pub fn mint_progress(&self) -> f64 {
        let max = if self.max > 0.0 { self.max } else { 1.0 };
        (self.minted / max * 100.0).clamp(0.0, 100.0)
    }

    /// Fully minted tokens trade; the rest are still minting.
    pub fn status(&self) -> TokenStatus {
        if self.mint_progress() >= 100.0 || self.state.eq_ignore_ascii_case("finished") {
            TokenStatus::Trading
        } else {
            TokenStatus::Minting
        }
    }
}

#[derive(Deserialize)]
struct TokenList {
    result: Vec<TokenInfo>,
}

pub fn decode_tokens(raw: &Value) -> Result<Vec<TokenInfo>, FetchError> {
    let list = TokenList::deserialize(raw)?;
    Ok(list
        .result
        .into_iter()
        .filter(|t| !t.tick.trim().is_empty())
        .take(TOKEN_LIMIT)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_on: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NewsEnvelope {
    Bare(Vec<Headline>),
    Data {
        #[serde(rename = "Data")]
        data: Vec<Headline>,
    },
    Articles {
        articles: Vec<Headline>,
    },
}

pub fn decode_news(raw: &Value) -> Result<Vec<Headline>, FetchError> {
    let items = match NewsEnvelope::deserialize(raw)? {
        NewsEnvelope::Bare(items) => items,
        NewsEnvelope::Data { data } => data,
        NewsEnvelope::Articles { articles } => articles,
    };
    Ok(items
        .into_iter()
        .filter(|h| !h.title.trim().is_empty())
        .take(HEADLINE_LIMIT)
        .collect())
}

/// The crawler publishes either a list of nodes or a map keyed by address.
pub fn count_nodes(raw: &Value) -> Result<usize, FetchError> {
    match raw {
        Value::Array(nodes) => Ok(nodes.len()),
        Value::Object(map) => match map.get("nodes") {
            Some(inner) => count_nodes(inner),
            None => Ok(map.len()),
        },
        _ => Err(FetchError::Parse("node census is neither list nor map".into())),
    }
}
