//! Rate-limited, cached access to the venue adapters.
//!
//! Every outbound quote goes limiter -> adapter; successful results land in
//! the process-wide quote cache. The limiters and the cache are shared by all
//! scan sessions.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::types::{DexLabel, Quote};
use super::QuoteProvider;
use crate::cache::{CachedQuote, QuoteCache, QuoteCacheKey};
use crate::ratelimit::{RateLimiter, RateLimiterConfig, RetryPolicy};
use crate::shared::errors::QuoteError;

pub struct QuoteGateway {
    providers: HashMap<DexLabel, Arc<dyn QuoteProvider>>,
    limiters: HashMap<DexLabel, RateLimiter>,
    retry: RetryPolicy,
    cache: Arc<QuoteCache>,
}

impl QuoteGateway {
    pub fn new(
        providers: Vec<Arc<dyn QuoteProvider>>,
        limiter_config: RateLimiterConfig,
        retry: RetryPolicy,
        cache: Arc<QuoteCache>,
    ) -> Self {
        let mut provider_map = HashMap::new();
        let mut limiters = HashMap::new();
        for provider in providers {
            let venue = provider.venue();
            // One limiter per venue: an exhausted venue cannot starve the rest
            limiters.insert(venue, RateLimiter::new(limiter_config.clone()));
            provider_map.insert(venue, provider);
        }
        Self {
            providers: provider_map,
            limiters,
            retry,
            cache,
        }
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    pub fn has_venue(&self, venue: DexLabel) -> bool {
        self.providers.contains_key(&venue)
    }

    /// Fresh cache entry for the pair/amount, whichever venue produced it.
    pub async fn cached_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Option<CachedQuote> {
        self.cache
            .get(&QuoteCacheKey::new(input_mint, output_mint, amount))
            .await
    }

    /// Quote one venue through its limiter, retrying with exponential backoff
    /// while the upstream keeps throttling. Successful quotes are cached.
    pub async fn fetch_quote(
        &self,
        venue: DexLabel,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        let provider = self
            .providers
            .get(&venue)
            .ok_or_else(|| QuoteError::ProviderUnavailable(format!("no adapter for {}", venue)))?;
        let limiter = &self.limiters[&venue];

        let mut attempt: u32 = 0;
        loop {
            let result = limiter
                .schedule(|| provider.quote(input_mint, output_mint, amount_in, slippage_bps))
                .await;

            match result {
                Ok(quote) => {
                    self.cache
                        .put(
                            QuoteCacheKey::new(input_mint, output_mint, amount_in),
                            quote.clone(),
                        )
                        .await;
                    return Ok(quote);
                }
                Err(QuoteError::Throttled(reason)) if attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "⚠️ {} throttled ({}), retry {}/{} in {}ms",
                        venue,
                        reason,
                        attempt + 1,
                        self.retry.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Quote via {} failed: {}", venue, e);
                    return Err(e);
                }
            }
        }
    }

    /// Probe every adapter's upstream
    pub async fn availability(&self) -> Vec<(DexLabel, bool)> {
        let mut statuses = Vec::new();
        for (venue, provider) in &self.providers {
            statuses.push((*venue, provider.is_available().await));
        }
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchanges::test_support::MockProvider;
    use std::time::Duration;

    fn gateway(providers: Vec<Arc<dyn QuoteProvider>>) -> QuoteGateway {
        QuoteGateway::new(
            providers,
            RateLimiterConfig {
                min_interval: Duration::from_millis(1),
                reservoir: 100,
                refresh_interval: Duration::from_secs(60),
            },
            RetryPolicy {
                base_delay: Duration::from_millis(5),
                max_delay: Duration::from_millis(20),
                max_retries: 3,
            },
            Arc::new(QuoteCache::new(Duration::from_secs(30))),
        )
    }

    #[tokio::test]
    async fn test_successful_quote_is_cached() {
        let provider = Arc::new(MockProvider::new(DexLabel::Raydium).with_rate("a", "b", 99, 100));
        let gw = gateway(vec![provider.clone()]);

        let quote = gw.fetch_quote(DexLabel::Raydium, "a", "b", 1_000, 50).await.unwrap();
        assert_eq!(quote.amount_out, 990);

        let hit = gw.cached_quote("a", "b", 1_000).await.unwrap();
        assert_eq!(hit.venue, DexLabel::Raydium);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let provider = Arc::new(MockProvider::new(DexLabel::Orca));
        let gw = gateway(vec![provider]);

        let err = gw.fetch_quote(DexLabel::Orca, "a", "b", 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::NoLiquidity { .. }));
        assert!(gw.cached_quote("a", "b", 1_000).await.is_none());
    }

    #[tokio::test]
    async fn test_throttled_is_retried_then_propagated() {
        let provider = Arc::new(
            MockProvider::new(DexLabel::Jupiter)
                .with_error("a", "b", QuoteError::Throttled("429".to_string())),
        );
        let gw = gateway(vec![provider.clone()]);

        let err = gw.fetch_quote(DexLabel::Jupiter, "a", "b", 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::Throttled(_)));
        // Initial attempt plus three backoff retries
        assert_eq!(provider.call_count(), 4);
    }

    #[tokio::test]
    async fn test_unknown_venue_is_unavailable() {
        let gw = gateway(vec![Arc::new(MockProvider::new(DexLabel::Raydium))]);
        let err = gw.fetch_quote(DexLabel::Orca, "a", "b", 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::ProviderUnavailable(_)));
    }
}
