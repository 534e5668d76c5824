use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

use crate::ratelimit::{RateLimiterConfig, RetryPolicy};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanCfg {
    /// Probe amount in native units of the input token
    pub probe_amount: u64,
    pub slippage_bps: u32,
    pub scan_interval_ms: u64,
    /// Bounded first scan for fast feedback
    pub initial_scan_pairs: usize,
    /// Pairs per batch inside a recurring cycle, sized to the reservoir
    pub batch_size: usize,
}

impl Default for ScanCfg {
    fn default() -> Self {
        Self {
            probe_amount: 1_000_000_000,
            slippage_bps: 50,
            scan_interval_ms: 60_000,
            initial_scan_pairs: 10,
            batch_size: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimiterCfg {
    pub min_interval_ms: u64,
    pub reservoir: u32,
    pub refresh_interval_ms: u64,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub max_retries: u32,
}

impl Default for LimiterCfg {
    fn default() -> Self {
        Self {
            min_interval_ms: 1_000,
            reservoir: 60,
            refresh_interval_ms: 60_000,
            retry_base_delay_ms: 1_000,
            retry_max_delay_ms: 10_000,
            max_retries: 3,
        }
    }
}

impl LimiterCfg {
    pub fn limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            min_interval: Duration::from_millis(self.min_interval_ms),
            reservoir: self.reservoir,
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            max_retries: self.max_retries,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheCfg {
    pub quote_ttl_ms: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self { quote_ttl_ms: 30_000 }
    }
}

impl CacheCfg {
    pub fn quote_ttl(&self) -> Duration {
        Duration::from_millis(self.quote_ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VenuesCfg {
    pub jupiter_url: String,
    pub raydium_url: String,
    pub orca_url: String,
    pub pool_registry_ttl_ms: u64,
}

impl Default for VenuesCfg {
    fn default() -> Self {
        Self {
            jupiter_url: "https://quote-api.jup.ag/v6".to_string(),
            raydium_url: "https://api.raydium.io/v2".to_string(),
            orca_url: "https://api.orca.so".to_string(),
            pool_registry_ttl_ms: 300_000,
        }
    }
}

impl VenuesCfg {
    pub fn pool_registry_ttl(&self) -> Duration {
        Duration::from_millis(self.pool_registry_ttl_ms)
    }
}

/// Acceptance band for near-break-even round trips. The default keeps paths
/// down to 99% of the probe amount visible to the operator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToleranceCfg {
    pub band_numerator: u64,
    pub band_denominator: u64,
}

impl Default for ToleranceCfg {
    fn default() -> Self {
        Self {
            band_numerator: 99,
            band_denominator: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanCfg,
    pub limiter: LimiterCfg,
    pub cache: CacheCfg,
    pub venues: VenuesCfg,
    pub tolerance: ToleranceCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())?;
        let cfg: Self = toml::from_str(&s).context("parse Config.toml")?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.scan.probe_amount, 1_000_000_000);
        assert_eq!(cfg.scan.batch_size, 5);
        assert_eq!(cfg.limiter.reservoir, 60);
        assert_eq!(cfg.cache.quote_ttl_ms, 30_000);
        assert_eq!(cfg.tolerance.band_numerator, 99);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [scan]
            probe_amount = 500
            [limiter]
            reservoir = 10
            "#,
        )
        .unwrap();

        assert_eq!(cfg.scan.probe_amount, 500);
        assert_eq!(cfg.scan.batch_size, 5);
        assert_eq!(cfg.limiter.reservoir, 10);
        assert_eq!(cfg.limiter.max_retries, 3);
        assert_eq!(cfg.venues.orca_url, "https://api.orca.so");
    }
}
