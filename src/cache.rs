//! Process-wide quote cache shared by every scan session.
//!
//! Keyed by (input mint, output mint, amount) so a quote fetched for one
//! client's scan can satisfy another client's scan for the same pair and
//! amount inside the TTL window. Eviction is time-based only: the key space
//! within a scan batch is bounded.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::exchanges::types::{DexLabel, Quote};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteCacheKey {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
}

impl QuoteCacheKey {
    pub fn new(input_mint: &str, output_mint: &str, amount: u64) -> Self {
        Self {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount,
        }
    }
}

/// A cache hit keeps the venue that originally answered the quote
#[derive(Debug, Clone)]
pub struct CachedQuote {
    pub quote: Quote,
    pub venue: DexLabel,
}

struct CacheEntry {
    quote: Quote,
    venue: DexLabel,
    inserted_at: Instant,
}

pub struct QuoteCache {
    ttl: Duration,
    entries: RwLock<HashMap<QuoteCacheKey, CacheEntry>>,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A fresh entry or nothing: entries past the TTL are never returned.
    pub async fn get(&self, key: &QuoteCacheKey) -> Option<CachedQuote> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() >= self.ttl {
            return None;
        }
        debug!(
            "Quote cache hit for {}/{} ({})",
            key.input_mint, key.output_mint, entry.venue
        );
        Some(CachedQuote {
            quote: entry.quote.clone(),
            venue: entry.venue,
        })
    }

    /// Only successful quotes are ever stored; failures never reach here.
    pub async fn put(&self, key: QuoteCacheKey, quote: Quote) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let venue = quote.venue;
        entries.insert(
            key,
            CacheEntry {
                quote,
                venue,
                inserted_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
