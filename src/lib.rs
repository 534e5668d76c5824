//! Arbscan - Solana DEX arbitrage scanner
//!
//! Queries multiple quote venues, caches and rate-limits the queries,
//! computes round-trip profitability for token pairs and maintains one
//! periodic scan session per connected client.

pub mod app;
pub mod cache;
pub mod config;
pub mod exchanges;
pub mod execution;
pub mod math;
pub mod push;
pub mod ratelimit;
pub mod scanner;
pub mod shared;
pub mod storage;

// Re-export main types for convenience
pub use exchanges::gateway::QuoteGateway;
pub use exchanges::types::DexLabel;
pub use scanner::{ScannerConfig, SessionManager};
