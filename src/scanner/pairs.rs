//! Candidate pair universe for a scan session.
//!
//! Built once at session start from the registered assets: all ordered pairs
//! among the base set, base <-> popular in both directions, and ordered pairs
//! among the popular set, deduplicated by (input, output).

use std::collections::HashSet;

use crate::shared::types::{Asset, TokenPair};

/// Base tokens with fallback mint addresses used when the asset store does
/// not know the symbol yet.
const BASE_TOKENS: [(&str, &str); 3] = [
    ("SOL", "So11111111111111111111111111111111111111112"),
    ("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    ("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
];

const POPULAR_TOKENS: [(&str, &str); 5] = [
    ("BONK", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"),
    ("JUP", "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN"),
    ("RAY", "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R"),
    ("ORCA", "orcaEKTdK7LKz57vaAYr9QeNsVEPfiu6QeMU1kektZE"),
    ("PYTH", "HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3"),
];

fn resolve(assets: &[Asset], symbol: &str, fallback: &str) -> String {
    assets
        .iter()
        .find(|asset| asset.symbol == symbol)
        .map(|asset| asset.address.clone())
        .unwrap_or_else(|| fallback.to_string())
}

pub fn build_pair_universe(assets: &[Asset]) -> Vec<TokenPair> {
    let bases: Vec<String> = BASE_TOKENS
        .iter()
        .map(|(symbol, fallback)| resolve(assets, symbol, fallback))
        .collect();
    let populars: Vec<String> = POPULAR_TOKENS
        .iter()
        .map(|(symbol, fallback)| resolve(assets, symbol, fallback))
        .collect();

    let mut pairs = Vec::new();

    for base in &bases {
        for other in &bases {
            if base != other {
                pairs.push(TokenPair::new(base.clone(), other.clone()));
            }
        }
        for popular in &populars {
            pairs.push(TokenPair::new(base.clone(), popular.clone()));
            pairs.push(TokenPair::new(popular.clone(), base.clone()));
        }
    }

    for i in 0..populars.len() {
        for j in (i + 1)..populars.len() {
            pairs.push(TokenPair::new(populars[i].clone(), populars[j].clone()));
            pairs.push(TokenPair::new(populars[j].clone(), populars[i].clone()));
        }
    }

    // Dedupe by (input, output), keeping first occurrence order
    let mut seen = HashSet::new();
    pairs.retain(|pair| seen.insert(pair.clone()));
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_size_and_uniqueness() {
        let pairs = build_pair_universe(&[]);
        // 3 bases -> 6 ordered base pairs, 3x5x2 base/popular pairs,
        // C(5,2)x2 popular pairs
        assert_eq!(pairs.len(), 6 + 30 + 20);

        let mut seen = HashSet::new();
        for pair in &pairs {
            assert!(seen.insert(pair.clone()), "duplicate pair {:?}", pair);
            assert_ne!(pair.input_mint, pair.output_mint);
        }
    }

    #[test]
    fn test_registered_asset_addresses_take_priority() {
        let assets = vec![Asset {
            id: 1,
            symbol: "SOL".to_string(),
            name: "Solana".to_string(),
            address: "CustomSolMint".to_string(),
        }];

        let pairs = build_pair_universe(&assets);
        assert!(pairs.iter().any(|pair| pair.input_mint == "CustomSolMint"));
        assert!(!pairs
            .iter()
            .any(|pair| pair.input_mint == "So11111111111111111111111111111111111111112"));
    }

    #[test]
    fn test_first_pairs_cover_the_base_set() {
        // The bounded initial scan takes the head of the list; it must lead
        // with base-to-base pairs
        let pairs = build_pair_universe(&[]);
        assert_eq!(
            pairs[0],
            TokenPair::new(
                "So11111111111111111111111111111111111111112",
                "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
            )
        );
    }
}
