//! Quote venue integrations: one adapter per DEX behind a shared capability.

pub mod gateway;
pub mod jupiter;
pub mod orca;
pub mod raydium;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::VenuesCfg;
use crate::shared::errors::QuoteError;
use types::{DexLabel, Quote};

/// Common capability implemented by every venue adapter
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn venue(&self) -> DexLabel;

    /// Quote a single swap of `amount_in` of the input mint.
    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError>;

    /// Upstream health probe
    async fn is_available(&self) -> bool;
}

pub fn create_provider(label: DexLabel, cfg: &VenuesCfg) -> Arc<dyn QuoteProvider> {
    match label {
        DexLabel::Jupiter => Arc::new(jupiter::JupiterProvider::new(cfg.jupiter_url.clone())),
        DexLabel::Raydium => Arc::new(raydium::RaydiumProvider::new(
            cfg.raydium_url.clone(),
            cfg.pool_registry_ttl(),
        )),
        DexLabel::Orca => Arc::new(orca::OrcaProvider::new(
            cfg.orca_url.clone(),
            cfg.pool_registry_ttl(),
        )),
    }
}

/// Reserve fields arrive as strings from some registries and raw numbers from
/// others; accept both.
pub(crate) fn numeric_field(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
