//! Opportunity Detector
//!
//! Aggregates the strategy evaluators over one detection pass: runs the
//! enabled evaluators against a shared balance snapshot, deduplicates by
//! entry/exit/size (keeping the higher-profit duplicate), and ranks the
//! survivors by profit percentage. Relative priority between opportunities
//! is decided here and nowhere else; execution is someone else's job.
//!
//! Author: AI-Generated
//! Created: 2026-02-13

use crate::arbitrage::direct::DirectArbitrage;
use crate::arbitrage::triangular::TriangularArbitrage;
use crate::balance::BalanceSnapshot;
use crate::config::BotConfig;
use crate::exchange::SwapError;
use crate::filters::PairAllowlist;
use crate::quotes::QuoteCache;
use crate::types::{ArbitrageOpportunity, TradingPair};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the configured evaluators and ranks what they find.
pub struct OpportunityDetector {
    direct: DirectArbitrage,
    triangular: TriangularArbitrage,
    enable_direct: bool,
    enable_triangular: bool,
}

impl OpportunityDetector {
    pub fn new(config: &BotConfig, quotes: Arc<QuoteCache>, allowlist: Arc<PairAllowlist>) -> Self {
        Self {
            direct: DirectArbitrage::new(
                Arc::clone(&quotes),
                config.min_profit_percent,
                config.max_trade_amount,
            ),
            triangular: TriangularArbitrage::new(
                quotes,
                allowlist,
                config.min_profit_percent,
                config.max_trade_amount,
            ),
            enable_direct: config.enable_direct,
            enable_triangular: config.enable_triangular,
        }
    }

    /// One full detection pass over the live pair list.
    ///
    /// Rate limiting from the exchange pauses the pass: whatever was found
    /// so far is still ranked and returned, but no further quoting happens
    /// until the next pass.
    pub async fn detect_all(
        &self,
        pairs: &[TradingPair],
        snapshot: &BalanceSnapshot,
    ) -> Vec<ArbitrageOpportunity> {
        let mut found: Vec<ArbitrageOpportunity> = Vec::new();

        if self.enable_direct {
            let results = join_all(
                pairs
                    .iter()
                    .map(|pair| self.direct.evaluate_pair(pair, snapshot)),
            )
            .await;

            for result in results {
                match result {
                    Ok(Some(opp)) => found.push(opp),
                    Ok(None) => {}
                    Err(SwapError::RateLimited) => {
                        warn!("Detection pass paused: exchange API rate limited");
                        return Self::rank(found);
                    }
                    Err(e) => warn!("direct evaluation failed: {}", e),
                }
            }
        }

        if self.enable_triangular {
            match self.triangular.evaluate(pairs, snapshot).await {
                Ok(mut opps) => found.append(&mut opps),
                Err(SwapError::RateLimited) => {
                    warn!("Detection pass paused: exchange API rate limited")
                }
                Err(e) => warn!("triangular evaluation failed: {}", e),
            }
        }

        let ranked = Self::rank(found);
        if !ranked.is_empty() {
            info!(
                "Detection pass: {} opportunities, best {:+.2}%",
                ranked.len(),
                ranked[0].profit_percentage
            );
        }
        ranked
    }

    /// Targeted evaluation of a single pair, used when a swap event names
    /// the pair that just moved. Direct-only: a one-pair context has no
    /// cycle to walk.
    pub async fn detect_pair(
        &self,
        pair: &TradingPair,
        snapshot: &BalanceSnapshot,
    ) -> Vec<ArbitrageOpportunity> {
        if !self.enable_direct {
            return Vec::new();
        }
        match self.direct.evaluate_pair(pair, snapshot).await {
            Ok(Some(opp)) => vec![opp],
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("pair evaluation failed for {}: {}", pair.symbol, e);
                Vec::new()
            }
        }
    }

    /// Dedup by entry/exit/size keeping the higher profit, then sort
    /// descending by profit percentage.
    fn rank(found: Vec<ArbitrageOpportunity>) -> Vec<ArbitrageOpportunity> {
        let mut best: HashMap<String, ArbitrageOpportunity> = HashMap::new();
        for opp in found {
            match best.get(&opp.dedup_key()) {
                Some(existing) if existing.profit_percentage >= opp.profit_percentage => {}
                _ => {
                    best.insert(opp.dedup_key(), opp);
                }
            }
        }

        let mut ranked: Vec<ArbitrageOpportunity> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.profit_percentage
                .partial_cmp(&a.profit_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::MockExchange;
    use crate::types::TokenClass;
    use std::collections::HashMap;
    use std::time::Duration;

    fn token(sym: &str) -> TokenClass {
        TokenClass::from_parts(sym, "Unit", "none", "none")
    }

    fn config() -> BotConfig {
        BotConfig {
            min_profit_percent: 0.5,
            max_trade_amount: 1000.0,
            ..BotConfig::default()
        }
    }

    fn detector(ex: Arc<MockExchange>, config: &BotConfig) -> OpportunityDetector {
        let allowlist = Arc::new(PairAllowlist::default());
        let quotes = Arc::new(QuoteCache::new(
            ex,
            Arc::clone(&allowlist),
            Duration::from_millis(config.quote_cache_ttl_ms),
        ));
        OpportunityDetector::new(config, quotes, allowlist)
    }

    fn snapshot(balances: &[(&str, f64)]) -> BalanceSnapshot {
        let map: HashMap<TokenClass, f64> =
            balances.iter().map(|(s, v)| (token(s), *v)).collect();
        BalanceSnapshot::new(map)
    }

    fn gala_gusdc() -> TradingPair {
        TradingPair::new(token("GALA"), token("GUSDC"), "GALA/GUSDC".into())
    }

    fn gala_gweth() -> TradingPair {
        TradingPair::new(token("GALA"), token("GWETH"), "GALA/GWETH".into())
    }

    #[tokio::test]
    async fn test_detect_all_finds_direct_opportunity() {
        let ex = Arc::new(MockExchange::new());
        ex.set_exact(&token("GALA"), &token("GUSDC"), 1000.0, 5000.0);
        ex.set_exact(&token("GUSDC"), &token("GALA"), 5000.0, 1010.0);

        let cfg = config();
        let opps = detector(ex, &cfg)
            .detect_all(&[gala_gusdc()], &snapshot(&[("GALA", 5000.0)]))
            .await;

        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].strategy(), "direct");
        assert!((opps[0].profit_percentage - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_detect_all_empty_when_round_trip_loses() {
        let ex = Arc::new(MockExchange::new());
        ex.set_exact(&token("GALA"), &token("GUSDC"), 1000.0, 5000.0);
        ex.set_exact(&token("GUSDC"), &token("GALA"), 5000.0, 995.0);

        let cfg = config();
        let opps = detector(ex, &cfg)
            .detect_all(&[gala_gusdc()], &snapshot(&[("GALA", 5000.0)]))
            .await;
        assert!(opps.is_empty());
    }

    #[tokio::test]
    async fn test_ranking_sorts_descending_by_profit() {
        let ex = Arc::new(MockExchange::new());
        // GALA/GUSDC +1%, GALA/GWETH +3%
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GALA"), 0.202);
        ex.set_rate(&token("GALA"), &token("GWETH"), 0.001);
        ex.set_rate(&token("GWETH"), &token("GALA"), 1030.0);

        let cfg = config();
        let opps = detector(ex, &cfg)
            .detect_all(
                &[gala_gusdc(), gala_gweth()],
                &snapshot(&[("GALA", 5000.0)]),
            )
            .await;

        assert_eq!(opps.len(), 2);
        assert!(opps[0].profit_percentage > opps[1].profit_percentage);
        assert_eq!(opps[0].exit_token_symbol, "GWETH");
    }

    #[tokio::test]
    async fn test_duplicate_pair_deduplicated() {
        let ex = Arc::new(MockExchange::new());
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GALA"), 0.202);

        let cfg = config();
        let opps = detector(ex, &cfg)
            .detect_all(
                &[gala_gusdc(), gala_gusdc()],
                &snapshot(&[("GALA", 5000.0)]),
            )
            .await;
        assert_eq!(opps.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_evaluators_produce_nothing() {
        let ex = Arc::new(MockExchange::new());
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GALA"), 0.202);

        let cfg = BotConfig {
            enable_direct: false,
            enable_triangular: false,
            ..config()
        };
        let opps = detector(ex, &cfg)
            .detect_all(&[gala_gusdc()], &snapshot(&[("GALA", 5000.0)]))
            .await;
        assert!(opps.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_pauses_pass_without_panicking() {
        let ex = Arc::new(MockExchange::new());
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GALA"), 0.202);
        ex.fail_quotes(&token("GALA"), &token("GUSDC"), 1, SwapError::RateLimited);

        let cfg = config();
        let opps = detector(ex, &cfg)
            .detect_all(&[gala_gusdc()], &snapshot(&[("GALA", 5000.0)]))
            .await;
        assert!(opps.is_empty());
    }

    #[tokio::test]
    async fn test_detect_pair_single_swap_trigger() {
        let ex = Arc::new(MockExchange::new());
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GALA"), 0.202);

        let cfg = config();
        let opps = detector(ex, &cfg)
            .detect_pair(&gala_gusdc(), &snapshot(&[("GALA", 5000.0)]))
            .await;
        assert_eq!(opps.len(), 1);
        assert_eq!(opps[0].entry_token_symbol, "GALA");
    }
}
