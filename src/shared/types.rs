//! Common types used across the application

use serde::{Deserialize, Serialize};

/// Registered token. Created on first reference, immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    /// Mint address on chain, unique per asset
    pub address: String,
}

impl Asset {
    /// Placeholder returned when an opportunity's asset join fails
    pub fn unknown() -> Self {
        Self {
            id: 0,
            symbol: "UNKNOWN".to_string(),
            name: "Unknown Token".to_string(),
            address: String::new(),
        }
    }
}

/// Ordered token pair scanned for round-trip arbitrage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenPair {
    pub input_mint: String,
    pub output_mint: String,
}

impl TokenPair {
    pub fn new(input_mint: impl Into<String>, output_mint: impl Into<String>) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
        }
    }
}
