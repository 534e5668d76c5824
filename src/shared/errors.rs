//! Error handling for the application

use thiserror::Error;

/// Quote provider errors
#[derive(Error, Debug, Clone)]
pub enum QuoteError {
    #[error("No liquidity for {input}/{output}")]
    NoLiquidity { input: String, output: String },

    #[error("Provider throttled the request: {0}")]
    Throttled(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid quote data: {0}")]
    InvalidQuoteData(String),
}

impl QuoteError {
    pub fn no_liquidity(input: &str, output: &str) -> Self {
        Self::NoLiquidity {
            input: input.to_string(),
            output: output.to_string(),
        }
    }
}

/// Scan-session errors. Fatal only to session start, never to a running cycle.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to load arbitrage settings: {0}")]
    ConfigUnavailable(String),

    #[error("Asset list unavailable: {0}")]
    AssetsUnavailable(String),
}

/// Storage boundary errors
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
