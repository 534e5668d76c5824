//! Scripted quote providers for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use super::types::{DexLabel, Quote, RouteLeg};
use super::QuoteProvider;
use crate::shared::errors::QuoteError;

#[derive(Clone)]
enum MockBehavior {
    /// amount_out = amount_in * num / den
    Rate { num: u64, den: u64 },
    Error(QuoteError),
}

/// Deterministic provider scripted per (input, output) direction.
/// Directions with no script answer `NoLiquidity`.
pub(crate) struct MockProvider {
    venue: DexLabel,
    routes: HashMap<(String, String), MockBehavior>,
    calls: AtomicU32,
}

impl MockProvider {
    pub(crate) fn new(venue: DexLabel) -> Self {
        Self {
            venue,
            routes: HashMap::new(),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn with_rate(mut self, input: &str, output: &str, num: u64, den: u64) -> Self {
        self.routes.insert(
            (input.to_string(), output.to_string()),
            MockBehavior::Rate { num, den },
        );
        self
    }

    pub(crate) fn with_error(mut self, input: &str, output: &str, error: QuoteError) -> Self {
        self.routes
            .insert((input.to_string(), output.to_string()), MockBehavior::Error(error));
        self
    }

    /// Every direction fails with the given error
    pub(crate) fn always_failing(venue: DexLabel, error: QuoteError) -> AlwaysFailing {
        AlwaysFailing {
            venue,
            error,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for MockProvider {
    fn venue(&self) -> DexLabel {
        self.venue
    }

    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self
            .routes
            .get(&(input_mint.to_string(), output_mint.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                MockBehavior::Error(QuoteError::no_liquidity(input_mint, output_mint))
            });

        match behavior {
            MockBehavior::Rate { num, den } => {
                let amount_out = (amount_in as u128 * num as u128 / den as u128) as u64;
                Ok(Quote {
                    venue: self.venue,
                    input_mint: input_mint.to_string(),
                    output_mint: output_mint.to_string(),
                    amount_in,
                    amount_out,
                    min_amount_out: crate::math::apply_slippage(amount_out, slippage_bps),
                    price_impact_pct: 0.1,
                    route: vec![RouteLeg {
                        venue: self.venue.as_str().to_string(),
                        pool_id: format!("mock-{}-{}", input_mint, output_mint),
                        input_mint: input_mint.to_string(),
                        output_mint: output_mint.to_string(),
                        amount_in,
                        amount_out,
                        fee_amount: 0,
                    }],
                })
            }
            MockBehavior::Error(error) => Err(error),
        }
    }

    async fn is_available(&self) -> bool {
        true
    }
}

pub(crate) struct AlwaysFailing {
    venue: DexLabel,
    error: QuoteError,
    calls: AtomicU32,
}

impl AlwaysFailing {
    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for AlwaysFailing {
    fn venue(&self) -> DexLabel {
        self.venue
    }

    async fn quote(
        &self,
        _input_mint: &str,
        _output_mint: &str,
        _amount_in: u64,
        _slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    async fn is_available(&self) -> bool {
        false
    }
}
