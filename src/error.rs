use thiserror::Error;

/// Classified failure of a single upstream fetch.
///
/// None of these are fatal: the scheduler turns them into a staged
/// failure report plus a cache fallback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("upstream returned HTTP {0}")]
    Http(u16),
    #[error("malformed payload: {0}")]
    Parse(String),
    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Http(_) => "http",
            FetchError::Parse(_) => "parse",
            FetchError::Network(_) => "network",
        }
    }

    /// Whether the next scheduled poll has a reasonable chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Http(status) => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            FetchError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Http(status.as_u16())
        } else if err.is_decode() {
            FetchError::Parse(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}
