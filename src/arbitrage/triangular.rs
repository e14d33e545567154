//! Triangular arbitrage evaluator
//!
//! Enumerates 3-token directed cycles over the graph of supported,
//! currently-listed pairs and evaluates each in two passes: a cheap probe at
//! nominal unit size to filter dead cycles, then a sizing pass at the real
//! candidate amount. Probing first bounds the number of full-size quote
//! calls against a rate-limited API.
//!
//! Author: AI-Generated
//! Created: 2026-02-13

use crate::arbitrage::direct::BALANCE_UTILIZATION;
use crate::balance::{check_trading_funds, BalanceSnapshot};
use crate::exchange::SwapError;
use crate::filters::PairAllowlist;
use crate::quotes::QuoteCache;
use crate::types::{
    pair_key, ArbitrageOpportunity, OpportunityDetail, SwapQuote, TokenClass, TradeLeg,
    TradingPair,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Nominal amount for the probe pass.
const PROBE_AMOUNT: f64 = 1.0;

/// Searches 3-token cycles for a profitable loop back to the entry token.
pub struct TriangularArbitrage {
    quotes: Arc<QuoteCache>,
    allowlist: Arc<PairAllowlist>,
    min_profit_pct: f64,
    max_trade_amount: f64,
}

impl TriangularArbitrage {
    pub fn new(
        quotes: Arc<QuoteCache>,
        allowlist: Arc<PairAllowlist>,
        min_profit_pct: f64,
        max_trade_amount: f64,
    ) -> Self {
        Self {
            quotes,
            allowlist,
            min_profit_pct,
            max_trade_amount,
        }
    }

    /// Evaluate every directed 3-cycle over the live pair list.
    pub async fn evaluate(
        &self,
        pairs: &[TradingPair],
        snapshot: &BalanceSnapshot,
    ) -> Result<Vec<ArbitrageOpportunity>, SwapError> {
        // Edges: pairs both supported and currently listed
        let mut edges: HashSet<String> = HashSet::new();
        let mut tokens: Vec<TokenClass> = Vec::new();
        for pair in pairs {
            if !self.allowlist.is_pair_allowed(&pair.token_a, &pair.token_b) {
                continue;
            }
            edges.insert(pair.pair_key());
            for token in [&pair.token_a, &pair.token_b] {
                if !tokens.contains(token) {
                    tokens.push(token.clone());
                }
            }
        }

        if tokens.len() < 3 {
            return Ok(Vec::new());
        }

        let mut seen_cycles: HashSet<String> = HashSet::new();
        let mut found = Vec::new();

        for i in 0..tokens.len() {
            for j in (i + 1)..tokens.len() {
                for k in (j + 1)..tokens.len() {
                    let triple = [&tokens[i], &tokens[j], &tokens[k]];
                    if !(edges.contains(&pair_key(triple[0], triple[1]))
                        && edges.contains(&pair_key(triple[1], triple[2]))
                        && edges.contains(&pair_key(triple[2], triple[0])))
                    {
                        continue;
                    }

                    // All 6 directed orderings of the triple; each ordered
                    // cycle is evaluated exactly once
                    for (a, b, c) in [
                        (0, 1, 2),
                        (0, 2, 1),
                        (1, 0, 2),
                        (1, 2, 0),
                        (2, 0, 1),
                        (2, 1, 0),
                    ] {
                        let (x, y, z) = (triple[a], triple[b], triple[c]);
                        let cycle_key = format!("{}->{}->{}", x, y, z);
                        if !seen_cycles.insert(cycle_key) {
                            continue;
                        }

                        if let Some(opp) = self.evaluate_cycle(x, y, z, snapshot).await? {
                            found.push(opp);
                        }
                    }
                }
            }
        }

        Ok(found)
    }

    /// Probe then size one directed cycle X -> Y -> Z -> X.
    async fn evaluate_cycle(
        &self,
        x: &TokenClass,
        y: &TokenClass,
        z: &TokenClass,
        snapshot: &BalanceSnapshot,
    ) -> Result<Option<ArbitrageOpportunity>, SwapError> {
        // Probe pass: chain the cycle at nominal size before committing to
        // full-size quotes
        let probe = match self.quote_cycle(x, y, z, PROBE_AMOUNT).await? {
            Some(q) => q,
            None => return Ok(None),
        };
        let probe_final = probe[2].output_amount;
        let probe_pct = (probe_final - PROBE_AMOUNT) / PROBE_AMOUNT * 100.0;
        if probe_final <= PROBE_AMOUNT || !probe_pct.is_finite() || probe_pct < self.min_profit_pct
        {
            return Ok(None);
        }

        // Sizing pass at the real candidate amount
        let balance_x = snapshot.balance_of(x);
        let candidate_size = self.max_trade_amount.min(BALANCE_UTILIZATION * balance_x);
        if !candidate_size.is_finite() || candidate_size <= 0.0 {
            debug!(
                "cycle {}->{}->{}: probe +{:.3}% but no usable balance",
                x.symbol(),
                y.symbol(),
                z.symbol(),
                probe_pct
            );
            return Ok(None);
        }

        let sized = match self.quote_cycle(x, y, z, candidate_size).await? {
            Some(q) => q,
            None => return Ok(None),
        };
        let final_amount = sized[2].output_amount;
        let profit_amount = final_amount - candidate_size;
        let profit_pct = profit_amount / candidate_size * 100.0;
        if !profit_amount.is_finite() || !profit_pct.is_finite() {
            return Ok(None);
        }
        if profit_amount <= 0.0 || profit_pct < self.min_profit_pct {
            return Ok(None);
        }

        let hops = [(x, y), (y, z), (z, x)];
        let path: Vec<TradeLeg> = sized
            .iter()
            .zip(hops)
            .map(|(quote, (from, to))| TradeLeg {
                from_symbol: from.symbol().to_string(),
                from_token_class: from.clone(),
                to_symbol: to.symbol().to_string(),
                to_token_class: to.clone(),
                quote: quote.clone(),
                input_amount: quote.input_amount,
                output_amount: quote.output_amount,
            })
            .collect();

        let funds = check_trading_funds(candidate_size, x, snapshot);

        info!(
            "Triangular arbitrage: {} -> {} -> {} -> {} | size {:.4} | profit {:.4} ({:.2}%)",
            x.symbol(),
            y.symbol(),
            z.symbol(),
            x.symbol(),
            candidate_size,
            profit_amount,
            profit_pct
        );

        Ok(Some(ArbitrageOpportunity {
            id: format!(
                "tri_{}_{}_{}_{}",
                x.symbol(),
                y.symbol(),
                z.symbol(),
                Uuid::new_v4().simple()
            ),
            entry_token_class: x.clone(),
            entry_token_symbol: x.symbol().to_string(),
            exit_token_class: x.clone(),
            exit_token_symbol: x.symbol().to_string(),
            profit_percentage: profit_pct,
            estimated_profit: profit_amount,
            max_trade_amount: candidate_size,
            has_funds: funds.has_funds,
            current_balance: funds.current_balance,
            shortfall: funds.shortfall,
            timestamp: Utc::now(),
            current_market_price: None,
            price_discrepancy: None,
            confidence: None,
            detail: OpportunityDetail::Triangular {
                path,
                reference_input_amount: candidate_size,
                reference_output_amount: final_amount,
            },
        }))
    }

    /// Chain the three legs of a cycle, feeding each quote's output into the
    /// next leg. Any absent or unsound quote aborts the cycle.
    async fn quote_cycle(
        &self,
        x: &TokenClass,
        y: &TokenClass,
        z: &TokenClass,
        start_amount: f64,
    ) -> Result<Option<[SwapQuote; 3]>, SwapError> {
        let q1 = match self.fetch_quote(x, y, start_amount).await? {
            Some(q) => q,
            None => return Ok(None),
        };
        let q2 = match self.fetch_quote(y, z, q1.output_amount).await? {
            Some(q) => q,
            None => return Ok(None),
        };
        let q3 = match self.fetch_quote(z, x, q2.output_amount).await? {
            Some(q) => q,
            None => return Ok(None),
        };
        Ok(Some([q1, q2, q3]))
    }

    async fn fetch_quote(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
    ) -> Result<Option<SwapQuote>, SwapError> {
        match self.quotes.get_quote(input, output, amount).await {
            Ok(Some(q)) if q.is_sound() => Ok(Some(q)),
            Ok(_) => Ok(None),
            Err(SwapError::RateLimited) => Err(SwapError::RateLimited),
            Err(e) => {
                debug!("quote {} -> {} failed: {}", input.symbol(), output.symbol(), e);
                Ok(None)
            }
        }
    }
}
