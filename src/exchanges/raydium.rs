//! Raydium adapter: prices pairs against the public pairs registry with the
//! constant-product formula.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::types::{DexLabel, Quote, RouteLeg};
use super::{numeric_field, QuoteProvider};
use crate::math;
use crate::shared::errors::QuoteError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
struct RaydiumPool {
    #[serde(rename = "ammId")]
    amm_id: String,
    #[serde(rename = "baseMint")]
    base_mint: String,
    #[serde(rename = "quoteMint")]
    quote_mint: String,
    #[serde(rename = "baseReserve", default)]
    base_reserve: Option<serde_json::Value>,
    #[serde(rename = "quoteReserve", default)]
    quote_reserve: Option<serde_json::Value>,
}

struct PoolRegistry {
    pools: Vec<RaydiumPool>,
    fetched_at: Instant,
}

/// Pool resolved for one quote direction: reserves already oriented so that
/// `reserve_in` backs the input mint.
struct ResolvedPool {
    pool_id: String,
    reserve_in: u64,
    reserve_out: u64,
}

pub struct RaydiumProvider {
    http_client: Client,
    base_url: String,
    registry_ttl: Duration,
    registry: RwLock<Option<PoolRegistry>>,
}

impl RaydiumProvider {
    pub fn new(base_url: String, registry_ttl: Duration) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url,
            registry_ttl,
            registry: RwLock::new(None),
        }
    }

    /// Refresh the pool registry when the snapshot is older than the TTL.
    /// A stale snapshot is kept and served if the upstream fetch fails:
    /// availability wins over freshness while the API is down.
    async fn ensure_registry(&self) -> Result<(), QuoteError> {
        {
            let registry = self.registry.read().await;
            if let Some(snapshot) = registry.as_ref() {
                if snapshot.fetched_at.elapsed() < self.registry_ttl {
                    return Ok(());
                }
            }
        }

        match self.fetch_pools().await {
            Ok(pools) => {
                info!("✅ Raydium registry refreshed: {} pools", pools.len());
                let mut registry = self.registry.write().await;
                *registry = Some(PoolRegistry {
                    pools,
                    fetched_at: Instant::now(),
                });
                Ok(())
            }
            Err(e) => {
                let registry = self.registry.read().await;
                if registry.is_some() {
                    warn!("⚠️ Raydium registry refresh failed, serving stale snapshot: {}", e);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn fetch_pools(&self) -> Result<Vec<RaydiumPool>, QuoteError> {
        let url = format!("{}/main/pairs", self.base_url);
        debug!("🔍 Fetching Raydium pool registry from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::ProviderUnavailable(format!("Raydium request failed: {}", e)))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(QuoteError::Throttled("Raydium returned 429".to_string()))
            }
            status if !status.is_success() => {
                return Err(QuoteError::ProviderUnavailable(format!(
                    "Raydium API error: {}",
                    status
                )))
            }
            _ => {}
        }

        response
            .json::<Vec<RaydiumPool>>()
            .await
            .map_err(|e| QuoteError::ProviderUnavailable(format!("Raydium registry payload: {}", e)))
    }

    /// Find a pool serving the pair, in either orientation. A pool that exists
    /// but carries unusable reserve fields is reported as `InvalidQuoteData`.
    async fn resolve_pool(
        &self,
        input_mint: &str,
        output_mint: &str,
    ) -> Result<ResolvedPool, QuoteError> {
        let registry = self.registry.read().await;
        let pools = registry
            .as_ref()
            .map(|snapshot| &snapshot.pools)
            .ok_or_else(|| QuoteError::ProviderUnavailable("Raydium registry empty".to_string()))?;

        let pool = pools
            .iter()
            .find(|pool| {
                (pool.base_mint == input_mint && pool.quote_mint == output_mint)
                    || (pool.base_mint == output_mint && pool.quote_mint == input_mint)
            })
            .ok_or_else(|| QuoteError::no_liquidity(input_mint, output_mint))?;

        let base_reserve = reserve_amount(pool.base_reserve.as_ref());
        let quote_reserve = reserve_amount(pool.quote_reserve.as_ref());
        let (Some(base_reserve), Some(quote_reserve)) = (base_reserve, quote_reserve) else {
            return Err(QuoteError::InvalidQuoteData(format!(
                "pool {} has unusable reserves",
                pool.amm_id
            )));
        };

        let (reserve_in, reserve_out) = if pool.base_mint == input_mint {
            (base_reserve, quote_reserve)
        } else {
            // Inverse orientation: swap the reserve roles
            (quote_reserve, base_reserve)
        };

        Ok(ResolvedPool {
            pool_id: pool.amm_id.clone(),
            reserve_in,
            reserve_out,
        })
    }

    #[cfg(test)]
    async fn seed_registry(&self, pools: Vec<RaydiumPool>, fetched_at: Instant) {
        let mut registry = self.registry.write().await;
        *registry = Some(PoolRegistry { pools, fetched_at });
    }
}

fn reserve_amount(value: Option<&serde_json::Value>) -> Option<u64> {
    let raw = numeric_field(value?)?;
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some(raw as u64)
}

#[async_trait]
impl QuoteProvider for RaydiumProvider {
    fn venue(&self) -> DexLabel {
        DexLabel::Raydium
    }

    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        self.ensure_registry().await?;
        let pool = self.resolve_pool(input_mint, output_mint).await?;

        let fee_bps = DexLabel::Raydium.fee_bps();
        let amount_out = math::constant_product_out(amount_in, pool.reserve_in, pool.reserve_out, fee_bps);
        if amount_out == 0 {
            return Err(QuoteError::no_liquidity(input_mint, output_mint));
        }

        let fee_amount = (amount_out as u128 * fee_bps as u128 / 10_000u128) as u64;

        Ok(Quote {
            venue: DexLabel::Raydium,
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount_in,
            amount_out,
            min_amount_out: math::apply_slippage(amount_out, slippage_bps),
            price_impact_pct: 0.3,
            route: vec![RouteLeg {
                venue: DexLabel::Raydium.as_str().to_string(),
                pool_id: pool.pool_id,
                input_mint: input_mint.to_string(),
                output_mint: output_mint.to_string(),
                amount_in,
                amount_out,
                fee_amount,
            }],
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/main/version", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("⚠️ Raydium API is not available: {}", e);
                false
            }
        }
    }
}
