//! Jupiter aggregator adapter backed by the v6 quote REST API.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{DexLabel, Quote, RouteLeg};
use super::QuoteProvider;
use crate::shared::errors::QuoteError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct JupiterQuoteResponse {
    #[serde(rename = "inAmount")]
    in_amount: Option<String>,
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "otherAmountThreshold")]
    other_amount_threshold: Option<String>,
    #[serde(rename = "priceImpactPct")]
    price_impact_pct: Option<String>,
    #[serde(rename = "routePlan", default)]
    route_plan: Vec<JupiterRoutePlan>,
}

#[derive(Debug, Deserialize)]
struct JupiterRoutePlan {
    #[serde(rename = "swapInfo")]
    swap_info: SwapInfoField,
}

/// The API usually returns one swapInfo object per leg but has been observed
/// returning an array; accept both shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SwapInfoField {
    One(JupiterSwapInfo),
    Many(Vec<JupiterSwapInfo>),
}

impl SwapInfoField {
    fn first(&self) -> Option<&JupiterSwapInfo> {
        match self {
            SwapInfoField::One(info) => Some(info),
            SwapInfoField::Many(infos) => infos.first(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JupiterSwapInfo {
    #[serde(rename = "ammKey")]
    amm_key: String,
    label: Option<String>,
    #[serde(rename = "inputMint")]
    input_mint: String,
    #[serde(rename = "outputMint")]
    output_mint: String,
    #[serde(rename = "inAmount")]
    in_amount: String,
    #[serde(rename = "outAmount")]
    out_amount: String,
    #[serde(rename = "feeAmount")]
    fee_amount: String,
}

pub struct JupiterProvider {
    http_client: Client,
    base_url: String,
}

impl JupiterProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    fn parse_response(
        &self,
        body: JupiterQuoteResponse,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        let amount_out = parse_amount(&body.out_amount)?;
        if amount_out == 0 {
            return Err(QuoteError::no_liquidity(input_mint, output_mint));
        }

        let min_amount_out = match &body.other_amount_threshold {
            Some(raw) => parse_amount(raw)?,
            None => crate::math::apply_slippage(amount_out, slippage_bps),
        };

        let price_impact_pct = body
            .price_impact_pct
            .as_deref()
            .and_then(|raw| raw.parse::<f64>().ok())
            .unwrap_or(0.0);

        let mut route = Vec::new();
        for plan in &body.route_plan {
            if let Some(info) = plan.swap_info.first() {
                route.push(RouteLeg {
                    venue: info
                        .label
                        .clone()
                        .unwrap_or_else(|| DexLabel::Jupiter.as_str().to_string()),
                    pool_id: info.amm_key.clone(),
                    input_mint: info.input_mint.clone(),
                    output_mint: info.output_mint.clone(),
                    amount_in: parse_amount(&info.in_amount)?,
                    amount_out: parse_amount(&info.out_amount)?,
                    fee_amount: parse_amount(&info.fee_amount)?,
                });
            }
        }

        let amount_in = match &body.in_amount {
            Some(raw) => parse_amount(raw)?,
            None => amount_in,
        };

        Ok(Quote {
            venue: DexLabel::Jupiter,
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount_in,
            amount_out,
            min_amount_out,
            price_impact_pct,
            route,
        })
    }
}

fn parse_amount(raw: &str) -> Result<u64, QuoteError> {
    raw.parse::<u64>()
        .map_err(|_| QuoteError::InvalidQuoteData(format!("bad amount field: {:?}", raw)))
}

#[async_trait]
impl QuoteProvider for JupiterProvider {
    fn venue(&self) -> DexLabel {
        DexLabel::Jupiter
    }

    async fn quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount_in: u64,
        slippage_bps: u32,
    ) -> Result<Quote, QuoteError> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}&onlyDirectRoutes=false",
            self.base_url, input_mint, output_mint, amount_in, slippage_bps
        );

        debug!("🔍 Jupiter quote request: {}/{}", input_mint, output_mint);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::ProviderUnavailable(format!("Jupiter request failed: {}", e)))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(QuoteError::Throttled("Jupiter returned 429".to_string()));
            }
            // The quote API answers 400/404 when no route exists for the pair
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                return Err(QuoteError::no_liquidity(input_mint, output_mint));
            }
            status if !status.is_success() => {
                return Err(QuoteError::ProviderUnavailable(format!(
                    "Jupiter API error: {}",
                    status
                )));
            }
            _ => {}
        }

        let body: JupiterQuoteResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::InvalidQuoteData(format!("Jupiter response: {}", e)))?;

        self.parse_response(body, input_mint, output_mint, amount_in, slippage_bps)
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("⚠️ Jupiter API is not available: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> JupiterProvider {
        JupiterProvider::new("https://quote-api.jup.ag/v6".to_string())
    }

    #[test]
    fn test_parse_quote_response() {
        let body: JupiterQuoteResponse = serde_json::from_str(
            r#"{
                "inAmount": "1000000000",
                "outAmount": "998000000",
                "otherAmountThreshold": "993010000",
                "priceImpactPct": "0.12",
                "routePlan": [
                    {
                        "swapInfo": {
                            "ammKey": "pool-1",
                            "label": "Orca",
                            "inputMint": "So111",
                            "outputMint": "EPjF",
                            "inAmount": "1000000000",
                            "outAmount": "998000000",
                            "feeAmount": "2994000",
                            "feeMint": "EPjF"
                        },
                        "percent": 100
                    }
                ]
            }"#,
        )
        .unwrap();

        let quote = provider()
            .parse_response(body, "So111", "EPjF", 1_000_000_000, 50)
            .unwrap();

        assert_eq!(quote.venue, DexLabel::Jupiter);
        assert_eq!(quote.amount_in, 1_000_000_000);
        assert_eq!(quote.amount_out, 998_000_000);
        assert_eq!(quote.min_amount_out, 993_010_000);
        assert!((quote.price_impact_pct - 0.12).abs() < 1e-9);
        assert_eq!(quote.route.len(), 1);
        assert_eq!(quote.route[0].venue, "Orca");
        assert_eq!(quote.route[0].fee_amount, 2_994_000);
    }

    #[test]
    fn test_parse_quote_response_with_swap_info_array() {
        let body: JupiterQuoteResponse = serde_json::from_str(
            r#"{
                "outAmount": "42",
                "routePlan": [
                    {
                        "swapInfo": [{
                            "ammKey": "pool-2",
                            "inputMint": "a",
                            "outputMint": "b",
                            "inAmount": "100",
                            "outAmount": "42",
                            "feeAmount": "1"
                        }],
                        "percent": 100
                    }
                ]
            }"#,
        )
        .unwrap();

        let quote = provider().parse_response(body, "a", "b", 100, 50).unwrap();
        assert_eq!(quote.route[0].pool_id, "pool-2");
        // No label on the leg falls back to the venue name
        assert_eq!(quote.route[0].venue, "Jupiter");
        // No threshold in the payload: derived from slippage
        assert_eq!(quote.min_amount_out, crate::math::apply_slippage(42, 50));
    }

    #[test]
    fn test_malformed_amount_is_invalid_quote_data() {
        let body: JupiterQuoteResponse =
            serde_json::from_str(r#"{"outAmount": "not-a-number", "routePlan": []}"#).unwrap();

        let err = provider()
            .parse_response(body, "a", "b", 100, 50)
            .unwrap_err();
        assert!(matches!(err, QuoteError::InvalidQuoteData(_)));
    }

    #[test]
    fn test_zero_out_amount_is_no_liquidity() {
        let body: JupiterQuoteResponse =
            serde_json::from_str(r#"{"outAmount": "0", "routePlan": []}"#).unwrap();

        let err = provider()
            .parse_response(body, "a", "b", 100, 50)
            .unwrap_err();
        assert!(matches!(err, QuoteError::NoLiquidity { .. }));
    }
}
