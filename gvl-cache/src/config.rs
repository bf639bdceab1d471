use std::time::Duration;
use url::Url;

/// Endpoint of the IAB Global Vendor List, version 3.
pub const DEFAULT_ENDPOINT: &str = "https://vendor-list.consensu.org/v3/vendor-list.json";

/// Maximum age of a stored vendor list: 7 days.
pub const CACHE_TTL: Duration = Duration::from_millis(604_800_000);

#[derive(Debug, Clone)]
pub struct GvlConfig {
    pub endpoint: Url,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for GvlConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).unwrap(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(30),
            cache_ttl: CACHE_TTL,
        }
    }
}
