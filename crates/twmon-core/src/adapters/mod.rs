//! Live provider adapters.
//!
//! Both adapters share an [`UpstreamTransport`]: one HTTP client, one response
//! cache and one request throttle, so the fixed inter-call delay applies across
//! providers and cached responses never consume a throttle slot.

mod finmind;
mod yahoo;

pub use finmind::FinMindAdapter;
pub use yahoo::YahooAdapter;

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheMode, CacheStore};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::throttling::RequestThrottle;
use crate::{MonitorConfig, SourceError};

/// HTTP client plus the cache and throttle shared by every adapter.
#[derive(Clone)]
pub struct UpstreamTransport {
    http_client: Arc<dyn HttpClient>,
    cache: CacheStore,
    cache_mode: CacheMode,
    throttle: RequestThrottle,
    timeout_ms: u64,
}

impl UpstreamTransport {
    pub fn new(http_client: Arc<dyn HttpClient>, cache: CacheStore, throttle: RequestThrottle) -> Self {
        Self {
            http_client,
            cache,
            cache_mode: CacheMode::Use,
            throttle,
            timeout_ms: 10_000,
        }
    }

    /// Transport backed by reqwest and sized from `config`.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            Arc::new(ReqwestHttpClient::new()),
            CacheStore::new(config.cache_ttl()),
            RequestThrottle::new(config.request_delay()),
        )
        .with_timeout_ms(config.timeout_ms)
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Executes `request`, serving from the cache when allowed.
    ///
    /// Only successful responses are cached. Non-success responses are returned to
    /// the caller for provider-specific classification.
    pub(crate) async fn get(
        &self,
        provider: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, SourceError> {
        let key = request.url.clone();
        if let Some(body) = self.cache.lookup(&key, self.cache_mode).await {
            debug!(provider, url = %key, "cache hit");
            return Ok(HttpResponse::ok_json(body));
        }

        self.throttle.wait().await;
        debug!(provider, url = %key, "upstream request");

        let request = request.with_timeout_ms(self.timeout_ms);
        let response = self.http_client.execute(request).await.map_err(|error| {
            SourceError::unavailable(format!("{provider} transport error: {}", error.message()))
        })?;

        if response.is_success() {
            self.cache.store(&key, &response.body, self.cache_mode).await;
        }
        Ok(response)
    }
}
