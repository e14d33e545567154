//! Configuration management
//! Load settings from the environment (.env supported), with defaults that
//! run the bot in dry-run mode against the canonical gSwap pairs.

use crate::types::{TokenClass, TradingPair};
use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Trading pair as configured (full token class keys)
#[derive(Debug, Clone, Deserialize)]
pub struct TradingPairConfig {
    pub token_a: String,
    pub token_b: String,
    pub symbol: String,
}

/// Bot configuration. All fields are read-only after load.
#[derive(Debug, Clone)]
pub struct BotConfig {
    // Detection
    pub min_profit_percent: f64,
    pub max_trade_amount: f64,
    pub enable_direct: bool,
    pub enable_triangular: bool,

    // Execution
    pub max_concurrent_trades: usize,
    pub slippage_tolerance_percent: f64,

    // Caching / pacing
    pub quote_cache_ttl_ms: u64,
    pub poll_interval_ms: u64,

    // Pair universe
    pub allowlist_file: Option<String>,
    pub pairs: Vec<TradingPairConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            min_profit_percent: 1.0,
            max_trade_amount: 1000.0,
            enable_direct: true,
            enable_triangular: true,
            max_concurrent_trades: 3,
            slippage_tolerance_percent: 1.0,
            quote_cache_ttl_ms: 30_000,
            poll_interval_ms: 5_000,
            allowlist_file: None,
            pairs: vec![
                TradingPairConfig {
                    token_a: "GALA|Unit|none|none".into(),
                    token_b: "GUSDC|Unit|none|none".into(),
                    symbol: "GALA/GUSDC".into(),
                },
                TradingPairConfig {
                    token_a: "GUSDC|Unit|none|none".into(),
                    token_b: "GWETH|Unit|none|none".into(),
                    symbol: "GUSDC/GWETH".into(),
                },
                TradingPairConfig {
                    token_a: "GALA|Unit|none|none".into(),
                    token_b: "GWETH|Unit|none|none".into(),
                    symbol: "GALA/GWETH".into(),
                },
            ],
        }
    }
}

impl BotConfig {
    /// Materialize the configured pairs as typed trading pairs.
    pub fn trading_pairs(&self) -> Vec<TradingPair> {
        self.pairs
            .iter()
            .map(|p| {
                TradingPair::new(
                    TokenClass::new(p.token_a.clone()),
                    TokenClass::new(p.token_b.clone()),
                    p.symbol.clone(),
                )
            })
            .collect()
    }
}

pub fn load_config() -> Result<BotConfig> {
    dotenv::dotenv().ok();

    let mut config = BotConfig::default();

    if let Ok(v) = std::env::var("MIN_PROFIT_PERCENT") {
        config.min_profit_percent = v.parse().context("MIN_PROFIT_PERCENT must be a number")?;
    }
    if let Ok(v) = std::env::var("MAX_TRADE_AMOUNT") {
        config.max_trade_amount = v.parse().context("MAX_TRADE_AMOUNT must be a number")?;
    }
    if let Ok(v) = std::env::var("MAX_CONCURRENT_TRADES") {
        config.max_concurrent_trades =
            v.parse().context("MAX_CONCURRENT_TRADES must be an integer")?;
    }
    if let Ok(v) = std::env::var("SLIPPAGE_TOLERANCE_PERCENT") {
        config.slippage_tolerance_percent = v
            .parse()
            .context("SLIPPAGE_TOLERANCE_PERCENT must be a number")?;
    }
    if let Ok(v) = std::env::var("QUOTE_CACHE_TTL_MS") {
        config.quote_cache_ttl_ms = v.parse().context("QUOTE_CACHE_TTL_MS must be an integer")?;
    }
    if let Ok(v) = std::env::var("POLL_INTERVAL_MS") {
        config.poll_interval_ms = v.parse().context("POLL_INTERVAL_MS must be an integer")?;
    }
    if let Ok(v) = std::env::var("ENABLE_DIRECT") {
        config.enable_direct = v.parse().context("ENABLE_DIRECT must be true/false")?;
    }
    if let Ok(v) = std::env::var("ENABLE_TRIANGULAR") {
        config.enable_triangular = v.parse().context("ENABLE_TRIANGULAR must be true/false")?;
    }
    if let Ok(v) = std::env::var("PAIR_ALLOWLIST_FILE") {
        config.allowlist_file = Some(v);
    }
    if let Ok(raw) = std::env::var("TRADING_PAIRS") {
        config.pairs = parse_pairs(&raw)?;
    }

    validate(&config)?;
    Ok(config)
}

/// Parse `classA:classB:SYMBOL` triples separated by commas, e.g.
/// `GALA|Unit|none|none:GUSDC|Unit|none|none:GALA/GUSDC`.
fn parse_pairs(raw: &str) -> Result<Vec<TradingPairConfig>> {
    raw.split(',')
        .map(|pair_str| {
            let parts: Vec<&str> = pair_str.trim().split(':').collect();
            if parts.len() != 3 {
                bail!("Invalid trading pair format: {}", pair_str);
            }
            Ok(TradingPairConfig {
                token_a: parts[0].to_string(),
                token_b: parts[1].to_string(),
                symbol: parts[2].to_string(),
            })
        })
        .collect()
}

fn validate(config: &BotConfig) -> Result<()> {
    if !config.min_profit_percent.is_finite() || config.min_profit_percent < 0.0 {
        bail!("MIN_PROFIT_PERCENT must be finite and non-negative");
    }
    if !config.max_trade_amount.is_finite() || config.max_trade_amount <= 0.0 {
        bail!("MAX_TRADE_AMOUNT must be finite and positive");
    }
    if config.max_concurrent_trades == 0 {
        bail!("MAX_CONCURRENT_TRADES must be at least 1");
    }
    if config.quote_cache_ttl_ms == 0 {
        bail!("QUOTE_CACHE_TTL_MS must be positive");
    }
    if config.pairs.is_empty() {
        bail!("at least one trading pair is required");
    }
    Ok(())
}
