//! Round-trip path testing with venue rotation.
//!
//! A path is a forward swap followed by a backward swap of the forward
//! output. Quotes are served from the shared cache when fresh, otherwise
//! fetched by rotating round-robin across the allow-listed venues.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::CachedQuote;
use crate::exchanges::gateway::QuoteGateway;
use crate::exchanges::types::{DexLabel, RouteLeg};
use crate::math;

/// Outcome of one accepted round trip
#[derive(Debug, Clone)]
pub struct PathResult {
    pub input_mint: String,
    pub output_mint: String,
    /// Venue that served the forward quote
    pub buy_venue: DexLabel,
    /// Venue that served the backward quote
    pub sell_venue: DexLabel,
    pub forward_price: f64,
    pub backward_price: f64,
    /// Floored to 0 for tolerated but non-profitable paths
    pub profit_percentage: f64,
    pub forward_route: Vec<RouteLeg>,
    pub backward_route: Vec<RouteLeg>,
}

pub struct PathTester {
    gateway: Arc<QuoteGateway>,
    venues: Vec<DexLabel>,
    slippage_bps: u32,
    tolerance_num: u64,
    tolerance_den: u64,
    rotation: AtomicUsize,
}

impl PathTester {
    pub fn new(
        gateway: Arc<QuoteGateway>,
        venues: Vec<DexLabel>,
        slippage_bps: u32,
        tolerance_num: u64,
        tolerance_den: u64,
    ) -> Self {
        Self {
            gateway,
            venues,
            slippage_bps,
            tolerance_num,
            tolerance_den,
            rotation: AtomicUsize::new(0),
        }
    }

    /// Test one round trip. `None` means the pair produced nothing this
    /// cycle: no venue could quote a leg, or the trip fell below the
    /// acceptance band.
    pub async fn test_path(
        &self,
        start_mint: &str,
        end_mint: &str,
        probe_amount: u64,
    ) -> Option<PathResult> {
        let forward = self.quote_with_cache(start_mint, end_mint, probe_amount).await?;
        debug!(
            "Forward quote ({}): {} -> {}",
            forward.venue, probe_amount, forward.quote.amount_out
        );

        // The backward leg depends on the forward output, so ordering within
        // a path is strict
        let backward = self
            .quote_with_cache(end_mint, start_mint, forward.quote.amount_out)
            .await?;
        debug!(
            "Backward quote ({}): {} -> {}",
            backward.venue, forward.quote.amount_out, backward.quote.amount_out
        );

        let initial_amount = probe_amount;
        let final_amount = backward.quote.amount_out;

        if !math::within_band(initial_amount, final_amount, self.tolerance_num, self.tolerance_den) {
            return None;
        }

        let profit_percentage = if final_amount >= initial_amount {
            math::profit_percentage(initial_amount, final_amount)
        } else {
            // Tolerated near-break-even path: visible, but never reported as
            // a loss to act on
            0.0
        };

        info!(
            "🎯 Round trip {} -> {} via {}/{}: {} -> {} ({:.4}%)",
            start_mint,
            end_mint,
            forward.venue,
            backward.venue,
            initial_amount,
            final_amount,
            profit_percentage
        );

        Some(PathResult {
            input_mint: start_mint.to_string(),
            output_mint: end_mint.to_string(),
            buy_venue: forward.venue,
            sell_venue: backward.venue,
            forward_price: forward.quote.amount_out as f64 / probe_amount.max(1) as f64,
            backward_price: backward.quote.amount_out as f64
                / forward.quote.amount_out.max(1) as f64,
            profit_percentage,
            forward_route: forward.quote.route.clone(),
            backward_route: backward.quote.route.clone(),
        })
    }

    /// Cache first, rotation second. The cache is keyed by pair and amount
    /// only, so a hit produced by any venue is honored with its original
    /// venue tag. Rotation makes up to `2 x venue_count` attempts; every
    /// failure advances to the next venue.
    async fn quote_with_cache(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
    ) -> Option<CachedQuote> {
        if self.venues.is_empty() {
            return None;
        }

        if let Some(hit) = self.gateway.cached_quote(input_mint, output_mint, amount).await {
            return Some(hit);
        }

        let max_attempts = self.venues.len() * 2;
        for _ in 0..max_attempts {
            let venue = self.venues[self.rotation.fetch_add(1, Ordering::Relaxed) % self.venues.len()];
            match self
                .gateway
                .fetch_quote(venue, input_mint, output_mint, amount, self.slippage_bps)
                .await
            {
                Ok(quote) => return Some(CachedQuote { quote, venue }),
                Err(e) => {
                    debug!("Quote attempt via {} failed: {}", venue, e);
                }
            }
        }

        debug!(
            "All venues exhausted for {}/{} ({} attempts)",
            input_mint, output_mint, max_attempts
        );
        None
    }
}
