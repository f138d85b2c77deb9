use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use crate::cache::{now_ms, SharedCache};
use crate::error::FetchError;
use crate::feed::{Endpoints, Payload, Sample, SourceId};
use crate::logging::FetchTimer;

/// Anything that can turn a source id into a sample.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, source: &SourceId) -> Result<Sample, FetchError>;
}

/// HTTP client for every upstream. Successful, well-formed responses are
/// written through to the shared stale cache.
pub struct SourceClient {
    client: Client,
    endpoints: Endpoints,
    timeout: Duration,
    cache: SharedCache,
}

impl SourceClient {
    pub fn new(endpoints: Endpoints, timeout: Duration, cache: SharedCache) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kaswatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building http client")?;
        Ok(Self { client, endpoints, timeout, cache })
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let request = async {
            let resp = self
                .client
                .get(url)
                .header(ACCEPT, "application/json")
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Http(status.as_u16()));
            }
            let body = resp.bytes().await?;
            Ok(serde_json::from_slice::<Value>(&body)?)
        };
        // The client timeout covers the connection; this bounds the whole exchange.
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}

#[async_trait]
impl Fetch for SourceClient {
    async fn fetch(&self, source: &SourceId) -> Result<Sample, FetchError> {
        let _timer = FetchTimer::start(source.metric());
        let url = source.url(&self.endpoints);
        let raw = self.get_json(&url).await?;
        let payload = Payload::decode(source, &raw)?;
        let fetched_at_ms = now_ms();
        if let Ok(mut cache) = self.cache.lock() {
            cache.put_at(&source.cache_key(), raw, source.ttl_class(), fetched_at_ms);
        }
        Ok(Sample {
            source: source.clone(),
            payload,
            fetched_at_ms,
            is_fresh: true,
        })
    }
}
