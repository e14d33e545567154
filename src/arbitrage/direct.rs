//! Direct two-leg arbitrage evaluator
//!
//! Tests a single pair round trip (A -> B -> A) at the actual intended trade
//! size rather than a fixed probe amount, so price-impact-sensitive
//! profitability on thin pools is captured. Every arithmetic step filters
//! non-finite values; a candidate that fails any filter is rejected, never
//! emitted with a bad number.
//!
//! Author: AI-Generated
//! Created: 2026-02-13

use crate::balance::{check_trading_funds, BalanceSnapshot};
use crate::exchange::SwapError;
use crate::quotes::QuoteCache;
use crate::types::{ArbitrageOpportunity, OpportunityDetail, SwapQuote, TokenClass, TradingPair};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Fraction of the wallet balance a single trade may commit.
pub(crate) const BALANCE_UTILIZATION: f64 = 0.8;

/// Evaluates one trading pair for a profitable round trip.
pub struct DirectArbitrage {
    quotes: Arc<QuoteCache>,
    min_profit_pct: f64,
    max_trade_amount: f64,
}

impl DirectArbitrage {
    pub fn new(quotes: Arc<QuoteCache>, min_profit_pct: f64, max_trade_amount: f64) -> Self {
        Self {
            quotes,
            min_profit_pct,
            max_trade_amount,
        }
    }

    /// Evaluate the round trip for `pair`, entering with `pair.token_a`.
    ///
    /// Returns `Ok(None)` for every rejected candidate. Only rate limiting
    /// propagates as an error: it is the caller's signal to pause the
    /// whole detection pass.
    pub async fn evaluate_pair(
        &self,
        pair: &TradingPair,
        snapshot: &BalanceSnapshot,
    ) -> Result<Option<ArbitrageOpportunity>, SwapError> {
        let token_a = &pair.token_a;
        let token_b = &pair.token_b;

        let balance_a = snapshot.balance_of(token_a);
        let candidate_size = self.max_trade_amount.min(BALANCE_UTILIZATION * balance_a);
        if !candidate_size.is_finite() || candidate_size <= 0.0 {
            debug!("{}: no usable trade size (balance {})", pair.symbol, balance_a);
            return Ok(None);
        }

        let leg1 = match self.fetch_quote(token_a, token_b, candidate_size).await? {
            Some(q) => q,
            None => return Ok(None),
        };

        let leg2 = match self.fetch_quote(token_b, token_a, leg1.output_amount).await? {
            Some(q) => q,
            None => return Ok(None),
        };

        let profit_amount = leg2.output_amount - candidate_size;
        let profit_pct = profit_amount / candidate_size * 100.0;
        if !profit_amount.is_finite() || !profit_pct.is_finite() {
            return Ok(None);
        }
        if profit_amount <= 0.0 || profit_pct < self.min_profit_pct {
            debug!(
                "{}: round trip not profitable ({:+.4}%)",
                pair.symbol, profit_pct
            );
            return Ok(None);
        }

        let buy_price = leg1.input_amount / leg1.output_amount;
        let sell_price = leg2.output_amount / leg2.input_amount;
        if !buy_price.is_finite() || !sell_price.is_finite() {
            return Ok(None);
        }

        let funds = check_trading_funds(candidate_size, token_a, snapshot);
        if !funds.has_funds {
            debug!(
                "{}: profitable but short {:.4} {}",
                pair.symbol,
                funds.shortfall,
                token_a.symbol()
            );
        }

        let price_discrepancy = (buy_price - sell_price).abs() / buy_price * 100.0;

        info!(
            "Direct arbitrage: {} | size {:.4} | profit {:.4} ({:.2}%)",
            pair.symbol, candidate_size, profit_amount, profit_pct
        );

        Ok(Some(ArbitrageOpportunity {
            id: format!(
                "direct_{}_{}_{}",
                token_a.symbol(),
                token_b.symbol(),
                Uuid::new_v4().simple()
            ),
            entry_token_class: token_a.clone(),
            entry_token_symbol: token_a.symbol().to_string(),
            exit_token_class: token_b.clone(),
            exit_token_symbol: token_b.symbol().to_string(),
            profit_percentage: profit_pct,
            estimated_profit: profit_amount,
            max_trade_amount: candidate_size,
            has_funds: funds.has_funds,
            current_balance: funds.current_balance,
            shortfall: funds.shortfall,
            timestamp: Utc::now(),
            current_market_price: Some(sell_price),
            price_discrepancy: price_discrepancy.is_finite().then_some(price_discrepancy),
            confidence: None,
            detail: OpportunityDetail::Direct {
                token_a: token_a.symbol().to_string(),
                token_b: token_b.symbol().to_string(),
                token_class_a: token_a.clone(),
                token_class_b: token_b.clone(),
                buy_price,
                sell_price,
                quote_a_to_b: leg1,
                quote_b_to_a: leg2,
            },
        }))
    }

    /// Quote one leg, folding soft failures into rejection. A quote with a
    /// non-finite or non-positive output is as useless as no quote.
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
