//! Per-client scan sessions.
//!
//! Each connected client owns at most one session: a settings snapshot, a
//! fixed candidate pair set and one recurring timer. Starting a scan for a
//! client that already has one cancels the old session first, so no two
//! timers ever run for the same client. Provider failures are contained per
//! pair; only session-start failures surface to the client as an error event.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pairs::build_pair_universe;
use super::path_tester::{PathResult, PathTester};
use crate::config::Config;
use crate::exchanges::gateway::QuoteGateway;
use crate::exchanges::types::DexLabel;
use crate::push::{PushChannel, PushEvent};
use crate::shared::errors::{SessionError, StoreError};
use crate::shared::types::{Asset, TokenPair};
use crate::storage::{
    ActivityLog, ArbitrageOpportunity, ArbitrageSettings, AssetStore, EnrichedOpportunity,
    LogKind, NewOpportunity, OpportunityStore, SettingsStore,
};

/// Low spread floor applied during discovery when the configured minimum is
/// strictly positive, so early cycles are not over-filtered.
const DISCOVERY_SPREAD_FLOOR: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub probe_amount: u64,
    pub slippage_bps: u32,
    pub scan_interval: Duration,
    pub initial_scan_pairs: usize,
    pub batch_size: usize,
    pub tolerance_num: u64,
    pub tolerance_den: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            probe_amount: 1_000_000_000,
            slippage_bps: 50,
            scan_interval: Duration::from_secs(60),
            initial_scan_pairs: 10,
            batch_size: 5,
            tolerance_num: 99,
            tolerance_den: 100,
        }
    }
}

impl From<&Config> for ScannerConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            probe_amount: cfg.scan.probe_amount,
            slippage_bps: cfg.scan.slippage_bps,
            scan_interval: Duration::from_millis(cfg.scan.scan_interval_ms),
            initial_scan_pairs: cfg.scan.initial_scan_pairs,
            batch_size: cfg.scan.batch_size,
            tolerance_num: cfg.tolerance.band_numerator,
            tolerance_den: cfg.tolerance.band_denominator,
        }
    }
}

struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Everything a running session task needs, cloned out of the manager
struct SessionContext {
    client_id: String,
    gateway: Arc<QuoteGateway>,
    opportunities: Arc<dyn OpportunityStore>,
    assets: Arc<dyn AssetStore>,
    activity: Arc<dyn ActivityLog>,
    push: Arc<dyn PushChannel>,
    config: ScannerConfig,
    settings: ArbitrageSettings,
    pairs: Vec<TokenPair>,
    venues: Vec<DexLabel>,
}

pub struct SessionManager {
    gateway: Arc<QuoteGateway>,
    settings_store: Arc<dyn SettingsStore>,
    opportunities: Arc<dyn OpportunityStore>,
    assets: Arc<dyn AssetStore>,
    activity: Arc<dyn ActivityLog>,
    push: Arc<dyn PushChannel>,
    config: ScannerConfig,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<QuoteGateway>,
        settings_store: Arc<dyn SettingsStore>,
        opportunities: Arc<dyn OpportunityStore>,
        assets: Arc<dyn AssetStore>,
        activity: Arc<dyn ActivityLog>,
        push: Arc<dyn PushChannel>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            gateway,
            settings_store,
            opportunities,
            assets,
            activity,
            push,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) the scan session for a client. A pre-existing
    /// session for the same client is cancelled before the new one is built.
    pub async fn start_scan(&self, client_id: &str) -> Result<(), SessionError> {
        if self.cancel_session(client_id).await {
            info!("🔁 Superseding existing scan session for client {}", client_id);
        }

        let settings = match self.settings_store.get_arbitrage_settings().await {
            Ok(settings) => settings,
            Err(e) => {
                return Err(self
                    .fail_session_start(client_id, SessionError::ConfigUnavailable(e.to_string()))
                    .await);
            }
        };

        let assets = match self.assets.list_all().await {
            Ok(assets) => assets,
            Err(e) => {
                return Err(self
                    .fail_session_start(client_id, SessionError::AssetsUnavailable(e.to_string()))
                    .await);
            }
        };

        let pairs = build_pair_universe(&assets);
        let venues = allowed_venues(&settings);
        info!(
            "🚀 Starting arbitrage scanner for client {}: {} pairs, venues {:?}",
            client_id,
            pairs.len(),
            venues
        );

        self.push
            .send(
                client_id,
                PushEvent::ArbitrageScannerStarted(settings.clone()),
            )
            .await;
        self.activity
            .add(LogKind::Info, "Arbitrage scanner started".to_string())
            .await;

        let context = SessionContext {
            client_id: client_id.to_string(),
            gateway: self.gateway.clone(),
            opportunities: self.opportunities.clone(),
            assets: self.assets.clone(),
            activity: self.activity.clone(),
            push: self.push.clone(),
            config: self.config.clone(),
            settings,
            pairs,
            venues,
        };

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_session(context, cancel.clone()));

        let mut sessions = self.sessions.lock().await;
        sessions.insert(client_id.to_string(), SessionHandle { cancel, task });
        Ok(())
    }

    /// Explicit stop request from the client
    pub async fn stop_scan(&self, client_id: &str) {
        if self.cancel_session(client_id).await {
            info!("🛑 Arbitrage scanner stopped for client {}", client_id);
            self.activity
                .add(LogKind::Info, "Arbitrage scanner stopped".to_string())
                .await;
        }
        self.push
            .send(client_id, PushEvent::ArbitrageScannerStopped)
            .await;
    }

    /// Client went away: tear the session down without pushing anything
    pub async fn disconnect(&self, client_id: &str) {
        if self.cancel_session(client_id).await {
            debug!("Client {} disconnected, session cancelled", client_id);
        }
    }

    /// Cancel and forget a client's session. Cancellation is synchronous, so
    /// no further cycle can be scheduled once this returns; an in-flight
    /// cycle observes the token and discards its results.
    async fn cancel_session(&self, client_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.remove(client_id) {
            Some(handle) => {
                handle.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn is_scanning(&self, client_id: &str) -> bool {
        self.sessions.lock().await.contains_key(client_id)
    }

    /// Number of live session timers
    pub async fn active_sessions(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, handle| !handle.task.is_finished());
        sessions.len()
    }

    async fn fail_session_start(&self, client_id: &str, error: SessionError) -> SessionError {
        error!("❌ Scan session start failed for {}: {}", client_id, error);
        self.push
            .send(
                client_id,
                PushEvent::Error {
                    message: error.to_string(),
                },
            )
            .await;
        self.activity.add(LogKind::Error, error.to_string()).await;
        error
    }
}

/// Venue allow-list from the settings snapshot; unknown names are skipped,
/// an empty result falls back to every venue.
fn allowed_venues(settings: &ArbitrageSettings) -> Vec<DexLabel> {
    let mut venues: Vec<DexLabel> = settings
        .dexes
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect();
    venues.dedup();
    if venues.is_empty() {
        venues = DexLabel::all().to_vec();
    }
    venues
}

fn effective_min_spread(configured: f64) -> f64 {
    if configured > 0.0 {
        DISCOVERY_SPREAD_FLOOR
    } else {
        configured
    }
}

async fn run_session(context: SessionContext, cancel: CancellationToken) {
    // Bounded first scan for fast feedback
    let initial_count = context.config.initial_scan_pairs.min(context.pairs.len());
    let initial_pairs: Vec<TokenPair> = context.pairs[..initial_count].to_vec();
    info!(
        "🔍 Initial scan for client {} over the first {} pairs",
        context.client_id, initial_count
    );
    run_cycle(&context, &cancel, &initial_pairs, true).await;

    let mut interval = tokio::time::interval(context.config.scan_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The immediate first tick; the initial scan already ran
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        debug!("Recurring scan cycle for client {}", context.client_id);
        run_cycle(&context, &cancel, &context.pairs, false).await;
    }

    debug!("Scan session for client {} wound down", context.client_id);
}

/// One scan cycle over `pairs`. Pairs run in batches sized to stay inside
/// the venue rate limiters' reservoirs instead of bursting the whole set.
async fn run_cycle(
    context: &SessionContext,
    cancel: &CancellationToken,
    pairs: &[TokenPair],
    initial: bool,
) {
    let tester = PathTester::new(
        context.gateway.clone(),
        context.venues.clone(),
        context.config.slippage_bps,
        context.config.tolerance_num,
        context.config.tolerance_den,
    );

    let mut results: Vec<PathResult> = Vec::new();
    let batch_size = context.config.batch_size.max(1);

    for (batch_index, batch) in pairs.chunks(batch_size).enumerate() {
        if cancel.is_cancelled() {
            return;
        }
        debug!(
            "Batch {}/{} for client {} ({} pairs)",
            batch_index + 1,
            (pairs.len() + batch_size - 1) / batch_size,
            context.client_id,
            batch.len()
        );

        for pair in batch {
            if cancel.is_cancelled() {
                return;
            }
            // Both orientations of the pair, each a full round trip
            if let Some(result) = tester
                .test_path(&pair.input_mint, &pair.output_mint, context.config.probe_amount)
                .await
            {
                results.push(result);
            }
            if let Some(result) = tester
                .test_path(&pair.output_mint, &pair.input_mint, context.config.probe_amount)
                .await
            {
                results.push(result);
            }
        }
    }

    let min_spread = effective_min_spread(context.settings.min_spread_percentage);
    let accepted: Vec<PathResult> = results
        .into_iter()
        .filter(|result| result.profit_percentage >= min_spread)
        .collect();
    info!(
        "📊 Scan cycle for client {}: {} opportunities after spread filter (min {:.2}%)",
        context.client_id,
        accepted.len(),
        min_spread
    );

    for result in &accepted {
        if cancel.is_cancelled() {
            // Session was superseded or stopped mid-cycle: discard
            return;
        }
        match persist_result(context, result).await {
            Ok(Some((record, created))) => {
                if created && initial {
                    let enriched = enrich_one(context, record).await;
                    context
                        .push
                        .send(
                            &context.client_id,
                            PushEvent::NewArbitrageOpportunity(Box::new(enriched)),
                        )
                        .await;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "⚠️ Failed to persist opportunity for {}/{}: {}",
                    result.input_mint, result.output_mint, e
                );
            }
        }
    }

    if cancel.is_cancelled() {
        return;
    }

    // The client gets a list every cycle; empty is a valid outcome
    match enriched_list(context).await {
        Ok(list) => {
            context
                .push
                .send(&context.client_id, PushEvent::ArbitrageOpportunities(list))
                .await;
        }
        Err(e) => warn!(
            "⚠️ Failed to load opportunity list for client {}: {}",
            context.client_id, e
        ),
    }
}

/// Store one accepted result, keyed by the input asset. Pairs whose assets
/// are not registered are skipped, matching first-reference semantics of the
/// asset store.
async fn persist_result(
    context: &SessionContext,
    result: &PathResult,
) -> Result<Option<(ArbitrageOpportunity, bool)>, StoreError> {
    let Some(input_asset) = context.assets.get_by_address(&result.input_mint).await? else {
        return Ok(None);
    };
    if context.assets.get_by_address(&result.output_mint).await?.is_none() {
        return Ok(None);
    }

    let new = NewOpportunity {
        asset_id: input_asset.id,
        buy_dex: result.buy_venue.as_str().to_string(),
        sell_dex: result.sell_venue.as_str().to_string(),
        buy_price: result.forward_price,
        sell_price: result.backward_price,
        spread_percentage: result.profit_percentage,
        estimated_profit: result.profit_percentage,
        volume_24h: Some(0.0),
        liquidity: Some(10_000.0),
    };

    let (record, created) = context.opportunities.upsert(new).await?;
    Ok(Some((record, created)))
}

async fn enrich_one(context: &SessionContext, opportunity: ArbitrageOpportunity) -> EnrichedOpportunity {
    let token = context
        .assets
        .get_by_id(opportunity.asset_id)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(Asset::unknown);
    EnrichedOpportunity {
        opportunity,
        token,
    }
}

async fn enriched_list(context: &SessionContext) -> Result<Vec<EnrichedOpportunity>, StoreError> {
    let opportunities = context.opportunities.list(None).await?;
    let enriched = futures::future::join_all(
        opportunities
            .into_iter()
            .map(|opportunity| enrich_one(context, opportunity)),
    )
    .await;
    Ok(enriched)
}
