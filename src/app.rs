// src/app.rs
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::QuoteCache;
use crate::config::Config;
use crate::exchanges::gateway::QuoteGateway;
use crate::exchanges::types::DexLabel;
use crate::exchanges::{create_provider, QuoteProvider};
use crate::push::{ClientPushChannel, PushEvent};
use crate::scanner::{ScannerConfig, SessionManager};
use crate::storage::memory::{
    MemoryActivityLog, MemoryAssetStore, MemoryOpportunityStore, MemorySettingsStore,
};
use crate::storage::{ArbitrageSettingsUpdate, SettingsStore};

#[derive(Debug, Clone)]
pub struct AppCfg {
    pub config: Config,
    /// Settings overrides applied before the scan starts
    pub min_spread_percentage: Option<f64>,
    pub venues: Option<Vec<String>>,
}

/// Wire the engine together and run one local scan session until Ctrl-C.
pub async fn run(app_cfg: AppCfg) -> Result<()> {
    let config = &app_cfg.config;

    let providers: Vec<Arc<dyn QuoteProvider>> = DexLabel::all()
        .into_iter()
        .map(|label| create_provider(label, &config.venues))
        .collect();

    let cache = Arc::new(QuoteCache::new(config.cache.quote_ttl()));
    let gateway = Arc::new(QuoteGateway::new(
        providers,
        config.limiter.limiter_config(),
        config.limiter.retry_policy(),
        cache,
    ));

    info!("🔍 Probing venue availability...");
    for (venue, available) in gateway.availability().await {
        if available {
            info!("✅ {} API is available", venue);
        } else {
            warn!("⚠️ {} API is not available", venue);
        }
    }

    let settings_store = Arc::new(MemorySettingsStore::default());
    if app_cfg.min_spread_percentage.is_some() || app_cfg.venues.is_some() {
        let updated = settings_store
            .update_arbitrage_settings(ArbitrageSettingsUpdate {
                min_spread_percentage: app_cfg.min_spread_percentage,
                dexes: app_cfg.venues.clone(),
                ..Default::default()
            })
            .await?;
        info!(
            "Settings overridden: min spread {:.2}%, venues {:?}",
            updated.min_spread_percentage, updated.dexes
        );
    }

    let opportunities = Arc::new(MemoryOpportunityStore::new());
    let assets = Arc::new(MemoryAssetStore::with_default_assets());
    let activity = Arc::new(MemoryActivityLog::new());
    let push = Arc::new(ClientPushChannel::new());

    let manager = SessionManager::new(
        gateway,
        settings_store,
        opportunities,
        assets,
        activity,
        push.clone(),
        ScannerConfig::from(config),
    );

    let client_id = Uuid::new_v4().to_string();
    let mut events = push.subscribe(&client_id).await;

    manager.start_scan(&client_id).await?;
    info!("🚀 Scan session {} running, Ctrl-C to stop", client_id);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("🛑 Shutting down...");
                manager.stop_scan(&client_id).await;
                break;
            }
            event = events.recv() => {
                match event {
                    Some(event) => report_event(event),
                    None => break,
                }
            }
        }
    }

    Ok(())
}

fn report_event(event: PushEvent) {
    match event {
        PushEvent::ArbitrageScannerStarted(settings) => {
            info!(
                "Scanner started: min spread {:.2}%, auto execution {}",
                settings.min_spread_percentage, settings.auto_execution
            );
        }
        PushEvent::ArbitrageOpportunities(list) => {
            info!("📊 {} opportunities in the latest cycle", list.len());
            for entry in &list {
                info!(
                    "   {} {} -> {} spread {:.4}% (executed: {})",
                    entry.token.symbol,
                    entry.opportunity.buy_dex,
                    entry.opportunity.sell_dex,
                    entry.opportunity.spread_percentage,
                    entry.opportunity.executed
                );
            }
        }
        PushEvent::NewArbitrageOpportunity(entry) => {
            info!(
                "🎯 New opportunity #{}: {} via {} -> {} ({:.4}%)",
                entry.opportunity.id,
                entry.token.symbol,
                entry.opportunity.buy_dex,
                entry.opportunity.sell_dex,
                entry.opportunity.spread_percentage
            );
        }
        PushEvent::ArbitrageScannerStopped => info!("Scanner stopped"),
        PushEvent::Error { message } => warn!("❌ Scanner error: {}", message),
    }
}
