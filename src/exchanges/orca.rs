//! Orca adapter: prices pairs against the public pools endpoint with the
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
const DEFAULT_POOL_FEE: f64 = 0.003;

#[derive(Debug, Deserialize)]
struct OrcaPoolsResponse {
    pools: Vec<OrcaPoolEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct OrcaPoolEntry {
    address: String,
    #[serde(rename = "tokenA")]
    token_a: OrcaPoolToken,
    #[serde(rename = "tokenB")]
    token_b: OrcaPoolToken,
    fee: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct OrcaPoolToken {
    mint: String,
    reserve: serde_json::Value,
}

/// Normalized registry entry
#[derive(Debug, Clone)]
struct OrcaPool {
    id: String,
    token_a: String,
    token_b: String,
    reserve_a: Option<u64>,
    reserve_b: Option<u64>,
    fee_bps: u32,
}

struct PoolRegistry {
    pools: Vec<OrcaPool>,
    fetched_at: Instant,
}

pub struct OrcaProvider {
    http_client: Client,
    base_url: String,
    registry_ttl: Duration,
    registry: RwLock<Option<PoolRegistry>>,
}

impl OrcaProvider {
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

    /// Same refresh discipline as the Raydium registry: TTL-bounded snapshot,
    /// stale-on-error when a previous snapshot exists.
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
                info!("✅ Orca registry refreshed: {} pools", pools.len());
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
                    warn!("⚠️ Orca registry refresh failed, serving stale snapshot: {}", e);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn fetch_pools(&self) -> Result<Vec<OrcaPool>, QuoteError> {
        let url = format!("{}/pools", self.base_url);
        debug!("🔍 Fetching Orca pool registry from {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::ProviderUnavailable(format!("Orca request failed: {}", e)))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(QuoteError::Throttled("Orca returned 429".to_string()))
            }
            status if !status.is_success() => {
                return Err(QuoteError::ProviderUnavailable(format!(
                    "Orca API error: {}",
                    status
                )))
            }
            _ => {}
        }

        let body: OrcaPoolsResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::ProviderUnavailable(format!("Orca pools payload: {}", e)))?;

        Ok(body.pools.into_iter().map(normalize_pool).collect())
    }

    /// Direct pool first; otherwise an inverse pool with its reserve roles
    /// swapped. Unrelated pools are never combined into a synthetic rate.
    async fn resolve_pool(
        &self,
        input_mint: &str,
        output_mint: &str,
    ) -> Result<(String, u64, u64, u32), QuoteError> {
        let registry = self.registry.read().await;
        let pools = registry
            .as_ref()
            .map(|snapshot| &snapshot.pools)
            .ok_or_else(|| QuoteError::ProviderUnavailable("Orca registry empty".to_string()))?;

        let (pool, inverted) = match pools
            .iter()
            .find(|pool| pool.token_a == input_mint && pool.token_b == output_mint)
        {
            Some(direct) => (direct, false),
            None => pools
                .iter()
                .find(|pool| pool.token_a == output_mint && pool.token_b == input_mint)
                .map(|inverse| (inverse, true))
                .ok_or_else(|| QuoteError::no_liquidity(input_mint, output_mint))?,
        };

        let (reserve_in, reserve_out) = if inverted {
            (pool.reserve_b, pool.reserve_a)
        } else {
            (pool.reserve_a, pool.reserve_b)
        };
        let (Some(reserve_in), Some(reserve_out)) = (reserve_in, reserve_out) else {
            return Err(QuoteError::InvalidQuoteData(format!(
                "pool {} has unusable reserves",
                pool.id
            )));
        };

        Ok((pool.id.clone(), reserve_in, reserve_out, pool.fee_bps))
    }

    #[cfg(test)]
    async fn seed_registry(&self, pools: Vec<OrcaPool>, fetched_at: Instant) {
        let mut registry = self.registry.write().await;
        *registry = Some(PoolRegistry { pools, fetched_at });
    }
}

fn normalize_pool(entry: OrcaPoolEntry) -> OrcaPool {
    let fee = entry.fee.filter(|f| f.is_finite() && *f >= 0.0).unwrap_or(DEFAULT_POOL_FEE);
    OrcaPool {
        id: entry.address,
        token_a: entry.token_a.mint,
        token_b: entry.token_b.mint,
        reserve_a: reserve_amount(&entry.token_a.reserve),
        reserve_b: reserve_amount(&entry.token_b.reserve),
        fee_bps: (fee * 10_000.0) as u32,
    }
}

fn reserve_amount(value: &serde_json::Value) -> Option<u64> {
    let raw = numeric_field(value)?;
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some(raw as u64)
}

#[async_trait]
impl QuoteProvider for OrcaProvider {
    fn venue(&self) -> DexLabel {
        DexLabel::Orca
    }

    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        self.ensure_registry().await?;
        let (pool_id, reserve_in, reserve_out, fee_bps) =
            self.resolve_pool(input_mint, output_mint).await?;

        let amount_out = math::constant_product_out(amount_in, reserve_in, reserve_out, fee_bps);
        if amount_out == 0 {
            return Err(QuoteError::no_liquidity(input_mint, output_mint));
        }

        let fee_amount = (amount_out as u128 * fee_bps as u128 / 10_000u128) as u64;

        Ok(Quote {
            venue: DexLabel::Orca,
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount_in,
            amount_out,
            min_amount_out: math::apply_slippage(amount_out, slippage_bps),
            price_impact_pct: 0.3,
            route: vec![RouteLeg {
                venue: DexLabel::Orca.as_str().to_string(),
                pool_id,
                input_mint: input_mint.to_string(),
                output_mint: output_mint.to_string(),
                amount_in,
                amount_out,
                fee_amount,
            }],
        })
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/status", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("⚠️ Orca API is not available: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn sol_usdc_pool() -> OrcaPool {
        OrcaPool {
            id: "orca-sol-usdc".to_string(),
            token_a: SOL.to_string(),
            token_b: USDC.to_string(),
            reserve_a: Some(1_000_000_000),
            reserve_b: Some(98_000_000_000),
            fee_bps: 30,
        }
    }

    fn provider() -> OrcaProvider {
        OrcaProvider::new("http://127.0.0.1:9".to_string(), Duration::from_secs(300))
    }

    #[test]
    fn test_normalize_pool_parses_string_and_number_reserves() {
        let entry: OrcaPoolEntry = serde_json::from_str(
            r#"{
                "address": "p1",
                "tokenA": {"mint": "a", "reserve": "123"},
                "tokenB": {"mint": "b", "reserve": 456},
                "fee": 0.0025
            }"#,
        )
        .unwrap();

        let pool = normalize_pool(entry);
        assert_eq!(pool.reserve_a, Some(123));
        assert_eq!(pool.reserve_b, Some(456));
        assert_eq!(pool.fee_bps, 25);
    }

    #[test]
    fn test_normalize_pool_defaults_fee() {
        let entry: OrcaPoolEntry = serde_json::from_str(
            r#"{
                "address": "p1",
                "tokenA": {"mint": "a", "reserve": "1"},
                "tokenB": {"mint": "b", "reserve": "1"}
            }"#,
        )
        .unwrap();

        assert_eq!(normalize_pool(entry).fee_bps, 30);
    }

    #[tokio::test]
    async fn test_quote_uses_direct_pool() {
        let provider = provider();
        provider
            .seed_registry(vec![sol_usdc_pool()], Instant::now())
            .await;

        let quote = provider.quote(SOL, USDC, 10_000_000, 50).await.unwrap();
        assert_eq!(quote.venue, DexLabel::Orca);
        assert_eq!(
            quote.amount_out,
            math::constant_product_out(10_000_000, 1_000_000_000, 98_000_000_000, 30)
        );
    }

    #[tokio::test]
    async fn test_quote_uses_inverse_pool_with_swapped_reserves() {
        let provider = provider();
        provider
            .seed_registry(vec![sol_usdc_pool()], Instant::now())
            .await;

        let quote = provider.quote(USDC, SOL, 98_000_000, 50).await.unwrap();
        assert_eq!(
            quote.amount_out,
            math::constant_product_out(98_000_000, 98_000_000_000, 1_000_000_000, 30)
        );
    }

    #[tokio::test]
    async fn test_unrelated_pools_do_not_answer() {
        let provider = provider();
        provider
            .seed_registry(
                vec![OrcaPool {
                    id: "other".to_string(),
                    token_a: "mintX".to_string(),
                    token_b: "mintY".to_string(),
                    reserve_a: Some(10),
                    reserve_b: Some(10),
                    fee_bps: 30,
                }],
                Instant::now(),
            )
            .await;

        let err = provider.quote(SOL, USDC, 1_000, 50).await.unwrap_err();
        assert!(matches!(err, QuoteError::NoLiquidity { .. }));
    }

    #[tokio::test]
    async fn test_stale_registry_served_when_refresh_fails() {
        // Zero TTL plus an unreachable endpoint: refresh always fails and
        // the stale snapshot must still answer
        let provider = OrcaProvider::new("http://127.0.0.1:9".to_string(), Duration::ZERO);
        provider.seed_registry(vec![sol_usdc_pool()], Instant::now()).await;

        let quote = provider.quote(SOL, USDC, 10_000_000, 50).await.unwrap();
        assert!(quote.amount_out > 0);
    }
}
