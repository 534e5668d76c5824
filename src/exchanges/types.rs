use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of supported quote venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DexLabel {
    Jupiter,
    Raydium,
    Orca,
}

impl DexLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DexLabel::Jupiter => "Jupiter",
            DexLabel::Raydium => "Raydium",
            DexLabel::Orca => "Orca",
        }
    }

    pub fn all() -> [DexLabel; 3] {
        [DexLabel::Jupiter, DexLabel::Raydium, DexLabel::Orca]
    }

    /// Fixed trade fee for the registry-backed venues. Jupiter reports fees
    /// per route leg instead, so its static rate is zero here.
    pub fn fee_bps(&self) -> u32 {
        match self {
            DexLabel::Jupiter => 0,
            DexLabel::Raydium => 30,
            DexLabel::Orca => 30,
        }
    }
}

impl fmt::Display for DexLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DexLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jupiter" => Ok(DexLabel::Jupiter),
            "raydium" => Ok(DexLabel::Raydium),
            "orca" | "whirlpool" => Ok(DexLabel::Orca),
            _ => Err(anyhow::anyhow!("Unknown DEX label: {}", s)),
        }
    }
}

/// One leg of a quoted route with its fee share
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLeg {
    pub venue: String,
    pub pool_id: String,
    pub input_mint: String,
    pub output_mint: String,
    pub amount_in: u64,
    pub amount_out: u64,
    pub fee_amount: u64,
}

/// A venue's estimate for one swap. Transient value object, never mutated
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub venue: DexLabel,
    pub input_mint: String,
    pub output_mint: String,
    pub amount_in: u64,
    pub amount_out: u64,
    /// Worst acceptable output once slippage tolerance is applied
    pub min_amount_out: u64,
    pub price_impact_pct: f64,
    pub route: Vec<RouteLeg>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dex_label_round_trip() {
        for label in DexLabel::all() {
            let parsed: DexLabel = label.as_str().parse().unwrap();
            assert_eq!(parsed, label);
        }
        assert!("pumpswap".parse::<DexLabel>().is_err());
    }

    #[test]
    fn test_registry_venue_fees() {
        assert_eq!(DexLabel::Raydium.fee_bps(), 30);
        assert_eq!(DexLabel::Orca.fee_bps(), 30);
        assert_eq!(DexLabel::Jupiter.fee_bps(), 0);
    }
}
