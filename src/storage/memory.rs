//! In-memory store implementations.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{
    ActivityLog, ActivityLogEntry, ArbitrageOpportunity, ArbitrageSettings,
    ArbitrageSettingsUpdate, AssetStore, LogKind, NewAsset, NewOpportunity, OpportunityStore,
    SettingsStore,
};
use crate::shared::errors::StoreError;
use crate::shared::types::Asset;

pub struct MemorySettingsStore {
    settings: RwLock<ArbitrageSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: ArbitrageSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(ArbitrageSettings::default())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get_arbitrage_settings(&self) -> Result<ArbitrageSettings, StoreError> {
        Ok(self.settings.read().await.clone())
    }

    async fn update_arbitrage_settings(
        &self,
        update: ArbitrageSettingsUpdate,
    ) -> Result<ArbitrageSettings, StoreError> {
        let mut settings = self.settings.write().await;
        if let Some(min_spread) = update.min_spread_percentage {
            settings.min_spread_percentage = min_spread;
        }
        if let Some(speed) = update.execution_speed {
            settings.execution_speed = speed;
        }
        if let Some(min_liquidity) = update.min_liquidity {
            settings.min_liquidity = min_liquidity;
        }
        if let Some(dexes) = update.dexes {
            settings.dexes = dexes;
        }
        if let Some(auto_execution) = update.auto_execution {
            settings.auto_execution = auto_execution;
        }
        Ok(settings.clone())
    }
}

struct OpportunityState {
    records: HashMap<i64, ArbitrageOpportunity>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemoryOpportunityStore {
    state: RwLock<OpportunityState>,
}

impl Default for OpportunityState {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryOpportunityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_recent(records: &HashMap<i64, ArbitrageOpportunity>) -> Vec<ArbitrageOpportunity> {
    let mut all: Vec<ArbitrageOpportunity> = records.values().cloned().collect();
    all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    all
}

#[async_trait]
impl OpportunityStore for MemoryOpportunityStore {
    async fn create(&self, new: NewOpportunity) -> Result<ArbitrageOpportunity, StoreError> {
        let mut state = self.state.write().await;
        let id = state.next_id;
        state.next_id += 1;
        let record = ArbitrageOpportunity {
            id,
            asset_id: new.asset_id,
            buy_dex: new.buy_dex,
            sell_dex: new.sell_dex,
            buy_price: new.buy_price,
            sell_price: new.sell_price,
            spread_percentage: new.spread_percentage,
            estimated_profit: new.estimated_profit,
            volume_24h: new.volume_24h,
            liquidity: new.liquidity,
            timestamp: Utc::now(),
            executed: false,
        };
        state.records.insert(id, record.clone());
        Ok(record)
    }

    async fn upsert(&self, new: NewOpportunity) -> Result<(ArbitrageOpportunity, bool), StoreError> {
        let mut state = self.state.write().await;

        let existing_id = state
            .records
            .values()
            .filter(|record| record.asset_id == new.asset_id)
            .max_by_key(|record| (record.timestamp, record.id))
            .map(|record| record.id);

        if let Some(record) = existing_id.and_then(|id| state.records.get_mut(&id)) {
            record.buy_dex = new.buy_dex;
            record.sell_dex = new.sell_dex;
            record.buy_price = new.buy_price;
            record.sell_price = new.sell_price;
            record.spread_percentage = new.spread_percentage;
            record.estimated_profit = new.estimated_profit;
            record.volume_24h = new.volume_24h;
            record.liquidity = new.liquidity;
            record.timestamp = Utc::now();
            // id and executed flag deliberately untouched
            return Ok((record.clone(), false));
        }

        let id = state.next_id;
        state.next_id += 1;
        let record = ArbitrageOpportunity {
            id,
            asset_id: new.asset_id,
            buy_dex: new.buy_dex,
            sell_dex: new.sell_dex,
            buy_price: new.buy_price,
            sell_price: new.sell_price,
            spread_percentage: new.spread_percentage,
            estimated_profit: new.estimated_profit,
            volume_24h: new.volume_24h,
            liquidity: new.liquidity,
            timestamp: Utc::now(),
            executed: false,
        };
        state.records.insert(id, record.clone());
        Ok((record, true))
    }

    async fn get(&self, id: i64) -> Result<Option<ArbitrageOpportunity>, StoreError> {
        Ok(self.state.read().await.records.get(&id).cloned())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<ArbitrageOpportunity>, StoreError> {
        let state = self.state.read().await;
        let mut all = sorted_recent(&state.records);
        if let Some(limit) = limit {
            all.truncate(limit);
        }
        Ok(all)
    }

    async fn find_most_recent(&self, limit: usize) -> Result<Vec<ArbitrageOpportunity>, StoreError> {
        self.list(Some(limit)).await
    }

    async fn update_executed(
        &self,
        id: i64,
        executed: bool,
    ) -> Result<Option<ArbitrageOpportunity>, StoreError> {
        let mut state = self.state.write().await;
        match state.records.get_mut(&id) {
            Some(record) => {
                record.executed = executed;
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }
}

struct AssetState {
    assets: HashMap<i64, Asset>,
    next_id: i64,
}

pub struct MemoryAssetStore {
    state: RwLock<AssetState>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AssetState {
                assets: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Store pre-populated with the scanner's default token set
    pub fn with_default_assets() -> Self {
        let seed = [
            ("SOL", "Solana", "So11111111111111111111111111111111111111112"),
            ("USDC", "USD Coin", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
            ("USDT", "Tether", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
            ("BONK", "Bonk", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"),
            ("JUP", "Jupiter", "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"),
            ("RAY", "Raydium", "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R"),
            ("ORCA", "Orca", "orcaEKTdK7LKz57vaAYr9QeNsVEPfiu6QeMU1kektZE"),
            ("PYTH", "Pyth Network", "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3"),
        ];
        let mut assets = HashMap::new();
        let mut next_id: i64 = 1;
        for (symbol, name, address) in seed {
            assets.insert(
                next_id,
                Asset {
                    id: next_id,
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    address: address.to_string(),
                },
            );
            next_id += 1;
        }
        Self {
            state: RwLock::new(AssetState { assets, next_id }),
        }
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::with_default_assets()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Asset>, StoreError> {
        Ok(self.state.read().await.assets.get(&id).cloned())
    }

    async fn get_by_address(&self, address: &str) -> Result<Option<Asset>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .assets
            .values()
            .find(|asset| asset.address == address)
            .cloned())
    }

    async fn get_by_symbol(&self, symbol: &str) -> Result<Option<Asset>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .assets
            .values()
            .find(|asset| asset.symbol == symbol)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Asset>, StoreError> {
        let state = self.state.read().await;
        let mut all: Vec<Asset> = state.assets.values().cloned().collect();
        all.sort_by_key(|asset| asset.id);
        Ok(all)
    }

    async fn create(&self, new: NewAsset) -> Result<Asset, StoreError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .assets
            .values()
            .find(|asset| asset.address == new.address)
        {
            return Ok(existing.clone());
        }
        let id = state.next_id;
        state.next_id += 1;
        let asset = Asset {
            id,
            symbol: new.symbol,
            name: new.name,
            address: new.address,
        };
        state.assets.insert(id, asset.clone());
        Ok(asset)
    }
}

#[derive(Default)]
pub struct MemoryActivityLog {
    entries: RwLock<Vec<ActivityLogEntry>>,
}

impl MemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityLog for MemoryActivityLog {
    async fn add(&self, kind: LogKind, message: String) {
        let mut entries = self.entries.write().await;
        entries.push(ActivityLogEntry {
            timestamp: Utc::now(),
            message,
            kind,
        });
    }

    async fn recent(&self, limit: usize) -> Vec<ActivityLogEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity(asset_id: i64, spread: f64) -> NewOpportunity {
        NewOpportunity {
            asset_id,
            buy_dex: "Raydium".to_string(),
            sell_dex: "Orca".to_string(),
            buy_price: 0.98,
            sell_price: 1.01,
            spread_percentage: spread,
            estimated_profit: spread,
            volume_24h: Some(0.0),
            liquidity: Some(10_000.0),
        }
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place_and_preserves_executed() {
        let store = MemoryOpportunityStore::new();
        let (first, created) = store.upsert(opportunity(7, 0.5)).await.unwrap();
        assert!(created);
        store.update_executed(first.id, true).await.unwrap();

        let (second, created) = store.upsert(opportunity(7, 1.2)).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert!(second.executed, "executed flag must survive the rescan");
        assert!((second.spread_percentage - 1.2).abs() < 1e-9);

        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_different_assets_create_distinct_records() {
        let store = MemoryOpportunityStore::new();
        store.upsert(opportunity(1, 0.5)).await.unwrap();
        store.upsert(opportunity(2, 0.5)).await.unwrap();
        assert_eq!(store.list(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let store = MemoryOpportunityStore::new();
        store.create(opportunity(1, 0.1)).await.unwrap();
        store.create(opportunity(2, 0.2)).await.unwrap();
        store.create(opportunity(3, 0.3)).await.unwrap();

        let listed = store.list(Some(2)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].asset_id, 3);
        assert_eq!(listed[1].asset_id, 2);

        let recent = store.find_most_recent(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].asset_id, 3);
    }

    #[tokio::test]
    async fn test_settings_partial_update() {
        let store = MemorySettingsStore::default();
        let updated = store
            .update_arbitrage_settings(ArbitrageSettingsUpdate {
                min_spread_percentage: Some(0.2),
                auto_execution: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!((updated.min_spread_percentage - 0.2).abs() < 1e-9);
        assert!(updated.auto_execution);
        // Untouched fields keep their defaults
        assert_eq!(updated.dexes.len(), 3);
        assert!((updated.min_liquidity - 5_000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_asset_store_lookup_and_first_reference_create() {
        let store = MemoryAssetStore::with_default_assets();
        let sol = store.get_by_symbol("SOL").await.unwrap().unwrap();
        assert_eq!(sol.address, "So11111111111111111111111111111111111111112");
        assert_eq!(
            store.get_by_address(&sol.address).await.unwrap().unwrap().id,
            sol.id
        );

        let created = store
            .create(NewAsset {
                symbol: "WIF".to_string(),
                name: "dogwifhat".to_string(),
                address: "WIFmint111".to_string(),
            })
            .await
            .unwrap();
        // A second create for the same address returns the existing record
        let again = store
            .create(NewAsset {
                symbol: "WIF".to_string(),
                name: "dogwifhat".to_string(),
                address: "WIFmint111".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(created.id, again.id);
    }

    #[tokio::test]
    async fn test_activity_log_recent_is_newest_first() {
        let log = MemoryActivityLog::new();
        log.add(LogKind::Info, "first".to_string()).await;
        log.add(LogKind::Success, "second".to_string()).await;

        let recent = log.recent(10).await;
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[1].message, "first");
    }
}
