//! Collaborator boundaries: settings, opportunities, assets, activity log.
//!
//! The scan engine only ever talks to these traits; the bundled
//! implementations are in-memory (`memory`).

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::errors::StoreError;
use crate::shared::types::Asset;

/// Scanner settings, read once per session at start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageSettings {
    pub min_spread_percentage: f64,
    pub execution_speed: ExecutionSpeed,
    pub min_liquidity: f64,
    /// Venue allow-list for rotation
    pub dexes: Vec<String>,
    pub auto_execution: bool,
}

impl Default for ArbitrageSettings {
    fn default() -> Self {
        Self {
            min_spread_percentage: 1.5,
            execution_speed: ExecutionSpeed::Balanced,
            min_liquidity: 5_000.0,
            dexes: vec![
                "Jupiter".to_string(),
                "Raydium".to_string(),
                "Orca".to_string(),
            ],
            auto_execution: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionSpeed {
    Fastest,
    Balanced,
    Economic,
}

/// Partial settings update; absent fields keep their current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArbitrageSettingsUpdate {
    pub min_spread_percentage: Option<f64>,
    pub execution_speed: Option<ExecutionSpeed>,
    pub min_liquidity: Option<f64>,
    pub dexes: Option<Vec<String>>,
    pub auto_execution: Option<bool>,
}

/// A persisted round-trip opportunity. Identity survives rescans of the same
/// asset: the record is updated in place, never duplicated.
#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageOpportunity {
    pub id: i64,
    pub asset_id: i64,
    pub buy_dex: String,
    pub sell_dex: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub spread_percentage: f64,
    pub estimated_profit: f64,
    pub volume_24h: Option<f64>,
    pub liquidity: Option<f64>,
    pub timestamp: DateTime<Utc>,
    /// Set true only by an explicit execution action, never automatically
    pub executed: bool,
}

/// Fields for a new or refreshed opportunity record
#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub asset_id: i64,
    pub buy_dex: String,
    pub sell_dex: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub spread_percentage: f64,
    pub estimated_profit: f64,
    pub volume_24h: Option<f64>,
    pub liquidity: Option<f64>,
}

/// Opportunity joined with its asset detail for client delivery
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedOpportunity {
    #[serde(flatten)]
    pub opportunity: ArbitrageOpportunity,
    pub token: Asset,
}

#[derive(Debug, Clone)]
pub struct NewAsset {
    pub symbol: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub kind: LogKind,
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_arbitrage_settings(&self) -> Result<ArbitrageSettings, StoreError>;
    async fn update_arbitrage_settings(
        &self,
        update: ArbitrageSettingsUpdate,
    ) -> Result<ArbitrageSettings, StoreError>;
}

#[async_trait]
pub trait OpportunityStore: Send + Sync {
    async fn create(&self, new: NewOpportunity) -> Result<ArbitrageOpportunity, StoreError>;

    /// Refresh the record for the asset if one exists (same identity,
    /// `executed` flag preserved), insert otherwise. The lookup and the write
    /// happen atomically so concurrent cycles touching the same asset cannot
    /// produce duplicates. Returns the record and whether it was created.
    async fn upsert(&self, new: NewOpportunity) -> Result<(ArbitrageOpportunity, bool), StoreError>;

    async fn get(&self, id: i64) -> Result<Option<ArbitrageOpportunity>, StoreError>;

    /// Most-recent-first listing
    async fn list(&self, limit: Option<usize>) -> Result<Vec<ArbitrageOpportunity>, StoreError>;

    async fn find_most_recent(&self, limit: usize) -> Result<Vec<ArbitrageOpportunity>, StoreError>;

    async fn update_executed(
        &self,
        id: i64,
        executed: bool,
    ) -> Result<Option<ArbitrageOpportunity>, StoreError>;
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Asset>, StoreError>;
    async fn get_by_address(&self, address: &str) -> Result<Option<Asset>, StoreError>;
    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<Asset>, StoreError>;
    async fn list_all(&self) -> Result<Vec<Asset>, StoreError>;

    /// First-reference registration; returns the existing record when the
    /// address is already known.
    async fn create(&self, new: NewAsset) -> Result<Asset, StoreError>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn add(&self, kind: LogKind, message: String);
    async fn recent(&self, limit: usize) -> Vec<ActivityLogEntry>;
}
