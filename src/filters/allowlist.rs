//! Supported-pair allowlist
//!
//! Static bidirectional set of token-class pairs the bot may quote or trade.
//! Any pair or leg outside this set is never sent to the exchange,
//! regardless of how profitable it looks. Loaded from a JSON config file,
//! with built-in defaults covering the canonical gSwap pairs.
//!
//! Config file: config/pairs_allowlist.json
//!
//! Author: AI-Generated
//! Created: 2026-02-12

use crate::types::{pair_key, TokenClass};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PairAllowlistFile {
    pub version: String,
    #[serde(default)]
    pub last_updated: String,
    pub pairs: Vec<AllowlistPair>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AllowlistPair {
    /// Full token class key, e.g. "GALA|Unit|none|none"
    pub token_a: String,
    pub token_b: String,
    pub symbol: String,
    /// Only "active" entries are enforced; anything else is parked
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub added: Option<String>,
}

// ---------------------------------------------------------------------------
// Precomputed lookup set (built once at load time)
// ---------------------------------------------------------------------------

/// Canonical gSwap pairs used when no config file is supplied.
static DEFAULT_PAIRS: Lazy<Vec<(&str, &str)>> = Lazy::new(|| {
    vec![
        ("GALA", "GUSDC"),
        ("GALA", "GUSDT"),
        ("GALA", "GWETH"),
        ("GALA", "GWBTC"),
        ("GUSDC", "GUSDT"),
        ("GUSDC", "GWETH"),
        ("GUSDC", "GWBTC"),
        ("GWETH", "GWBTC"),
    ]
});

/// Fast-lookup wrapper built from the JSON config. Lookups are
/// order-insensitive: `A/B` and `B/A` resolve to the same entry.
pub struct PairAllowlist {
    allowed_keys: HashSet<String>,
}

impl PairAllowlist {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Load from a JSON file path. Returns an error if the file is missing
    /// or unparseable (caller decides whether to fall back to defaults).
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read allowlist file: {}", path))?;

        let raw: PairAllowlistFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse allowlist JSON: {}", path))?;

        Ok(Self::from_config(raw))
    }

    /// Build from an already-parsed config.
    pub fn from_config(raw: PairAllowlistFile) -> Self {
        let allowed_keys: HashSet<String> = raw
            .pairs
            .iter()
            .filter(|p| p.status == "active")
            .map(|p| {
                pair_key(
                    &TokenClass::new(p.token_a.clone()),
                    &TokenClass::new(p.token_b.clone()),
                )
            })
            .collect();

        info!(
            "Allowlist loaded: {} active pairs ({} listed)",
            allowed_keys.len(),
            raw.pairs.len(),
        );

        Self { allowed_keys }
    }

    /// Build from explicit token-class pairs (tests, embedded defaults).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a TokenClass, &'a TokenClass)>) -> Self {
        let allowed_keys = pairs
            .into_iter()
            .map(|(a, b)| pair_key(a, b))
            .collect();
        Self { allowed_keys }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Main entry point: may this pair be quoted or traded at all?
    pub fn is_pair_allowed(&self, a: &TokenClass, b: &TokenClass) -> bool {
        let allowed = self.allowed_keys.contains(&pair_key(a, b));
        if !allowed {
            debug!("Allowlist: {} / {} rejected: pair not supported", a, b);
        }
        allowed
    }

    /// Number of allowed pairs.
    pub fn allowed_count(&self) -> usize {
        self.allowed_keys.len()
    }
}

/// Built-in defaults: the canonical gSwap pairs, all tokens in the
/// `Unit|none|none` class shape.
impl Default for PairAllowlist {
    fn default() -> Self {
        let allowed_keys = DEFAULT_PAIRS
            .iter()
            .map(|(a, b)| {
                pair_key(
                    &TokenClass::from_parts(a, "Unit", "none", "none"),
                    &TokenClass::from_parts(b, "Unit", "none", "none"),
                )
            })
            .collect();
        Self { allowed_keys }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn token(sym: &str) -> TokenClass {
        TokenClass::from_parts(sym, "Unit", "none", "none")
    }

    fn test_allowlist() -> PairAllowlist {
        let json = r#"{
            "version": "1.0",
            "last_updated": "2026-02-12T00:00:00Z",
            "pairs": [
                {
                    "token_a": "GALA|Unit|none|none",
                    "token_b": "GUSDC|Unit|none|none",
                    "symbol": "GALA/GUSDC",
                    "status": "active"
                },
                {
                    "token_a": "GALA|Unit|none|none",
                    "token_b": "GWETH|Unit|none|none",
                    "symbol": "GALA/GWETH",
                    "status": "parked",
                    "notes": "thin pool, re-enable after liquidity recovers"
                }
            ]
        }"#;
        let raw: PairAllowlistFile = serde_json::from_str(json).unwrap();
        PairAllowlist::from_config(raw)
    }

    #[test]
    fn test_active_pair_allowed_both_directions() {
        let al = test_allowlist();
        assert!(al.is_pair_allowed(&token("GALA"), &token("GUSDC")));
        assert!(al.is_pair_allowed(&token("GUSDC"), &token("GALA")));
    }

    #[test]
    fn test_parked_pair_rejected() {
        let al = test_allowlist();
        assert!(!al.is_pair_allowed(&token("GALA"), &token("GWETH")));
    }

    #[test]
    fn test_unknown_pair_rejected() {
        let al = test_allowlist();
        assert!(!al.is_pair_allowed(&token("GALA"), &token("GWBTC")));
        assert_eq!(al.allowed_count(), 1);
    }

    #[test]
    fn test_defaults_cover_canonical_pairs() {
        let al = PairAllowlist::default();
        assert!(al.is_pair_allowed(&token("GALA"), &token("GUSDC")));
        assert!(al.is_pair_allowed(&token("GWETH"), &token("GWBTC")));
        assert!(!al.is_pair_allowed(&token("GALA"), &token("SILK")));
    }
}
