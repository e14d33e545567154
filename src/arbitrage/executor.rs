//! Trade Executor
//!
//! Drives one admitted opportunity through its execution state machine:
//! re-validates every cached quote against the amount actually being traded,
//! executes the ordered swap legs, retries transient failures with jittered
//! exponential backoff, honors cooperative cancellation at the leg
//! boundaries, and enforces the global concurrency ceiling as a pure
//! admission check (rejected opportunities are dropped, never queued).
//!
//! An in-flight swap cannot be interrupted; cancellation only guarantees
//! that no further leg starts; a leg that already reached the exchange may
//! still have happened, and its receipt is kept on the record.
//!
//! Author: AI-Generated
//! Created: 2026-02-13
//! Modified: 2026-02-14 - Stale-price failures invalidate the cached quote
//!                        so the retry re-quotes instead of reusing it

use crate::exchange::SwapClient;
use crate::quotes::QuoteCache;
use crate::types::{
    ArbitrageOpportunity, ExecutionStatus, OpportunityDetail, SwapQuote, SwapResult, TokenClass,
    TradeExecution, TradeLeg, TradeStats,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Fixed error recorded when admission is rejected at the ceiling.
pub const ADMISSION_ERROR: &str = "Maximum concurrent trades reached";

/// Fixed reason recorded on cooperative cancellation.
pub const CANCELLED_REASON: &str = "Trade cancelled by request";

/// Executor tuning knobs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_concurrent_trades: usize,
    pub slippage_tolerance_pct: f64,
    /// Attempts per swap leg, including the first (3 = initial + 2 retries)
    pub max_swap_attempts: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_trades: 3,
            slippage_tolerance_pct: 1.0,
            max_swap_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            retry_max_delay: Duration::from_secs(5),
        }
    }
}

/// Cross-execution view of one in-flight trade.
struct ActiveTrade {
    status: ExecutionStatus,
    cancel_requested: Arc<AtomicBool>,
}

/// Why a run stopped before completing.
enum TradeHalt {
    Cancelled,
    Failed(String),
}

/// Executes opportunities under a concurrency ceiling.
///
/// Each `TradeExecution` record is owned exclusively by its `execute` call
/// until terminal; cross-execution shared state is limited to the active
/// map, the admission counter, and the append-only history.
pub struct TradeExecutor {
    client: Arc<dyn SwapClient>,
    quotes: Arc<QuoteCache>,
    config: ExecutorConfig,
    active: DashMap<String, ActiveTrade>,
    active_count: AtomicUsize,
    history: RwLock<Vec<TradeExecution>>,
}

impl TradeExecutor {
    pub fn new(client: Arc<dyn SwapClient>, quotes: Arc<QuoteCache>, config: ExecutorConfig) -> Self {
        Self {
            client,
            quotes,
            config,
            active: DashMap::new(),
            active_count: AtomicUsize::new(0),
            history: RwLock::new(Vec::new()),
        }
    }

    /// Run one opportunity to a terminal state and return its record.
    pub async fn execute(&self, opportunity: ArbitrageOpportunity) -> TradeExecution {
        let mut execution = TradeExecution::new(opportunity);

        // Admission: reserve a slot or fail without touching the exchange
        let max = self.config.max_concurrent_trades;
        let admitted = self
            .active_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok();
        if !admitted {
            warn!(
                "Rejected {} ({}): {}",
                execution.id,
                execution.opportunity.strategy(),
                ADMISSION_ERROR
            );
            execution.status = ExecutionStatus::Failed;
            execution.error = Some(ADMISSION_ERROR.to_string());
            execution.end_time = Some(Utc::now());
            self.history.write().await.push(execution.clone());
            return execution;
        }

        let cancel = Arc::new(AtomicBool::new(false));
        self.active.insert(
            execution.id.clone(),
            ActiveTrade {
                status: ExecutionStatus::Pending,
                cancel_requested: Arc::clone(&cancel),
            },
        );

        info!(
            "Executing {} | {} | entry {} | size {:.4} | expected {:+.2}%",
            execution.id,
            execution.opportunity.strategy(),
            execution.opportunity.entry_token_symbol,
            execution.opportunity.max_trade_amount,
            execution.opportunity.profit_percentage
        );

        let outcome = match execution.opportunity.detail.clone() {
            OpportunityDetail::Direct {
                token_class_a,
                token_class_b,
                quote_a_to_b,
                quote_b_to_a,
                ..
            } => {
                self.run_direct(
                    &mut execution,
                    &cancel,
                    &token_class_a,
                    &token_class_b,
                    &quote_a_to_b,
                    &quote_b_to_a,
                )
                .await
            }
            OpportunityDetail::Triangular { path, .. } => {
                self.run_path(&mut execution, &cancel, &path).await
            }
        };

        match outcome {
            Ok(actual_profit) => {
                execution.status = ExecutionStatus::Completed;
                execution.actual_profit = Some(actual_profit);
                info!("Completed {} | profit {:+.4}", execution.id, actual_profit);
            }
            Err(TradeHalt::Cancelled) => {
                execution.status = ExecutionStatus::Cancelled;
                execution.error = Some(CANCELLED_REASON.to_string());
                info!("Cancelled {}", execution.id);
            }
            Err(TradeHalt::Failed(reason)) => {
                execution.status = ExecutionStatus::Failed;
                execution.error = Some(reason.clone());
                warn!("Failed {} | {}", execution.id, reason);
            }
        }
        execution.end_time = Some(Utc::now());

        // Terminal bookkeeping: leave the active set, free the slot, archive
        self.active.remove(&execution.id);
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        self.history.write().await.push(execution.clone());

        execution
    }

    /// Request cooperative cancellation of an active execution.
    ///
    /// Returns `true` only on the first cancel of a live execution;
    /// repeat calls and calls against terminal executions return `false`.
    pub fn cancel(&self, execution_id: &str) -> bool {
        match self.active.get(execution_id) {
            Some(trade) => !trade.cancel_requested.swap(true, Ordering::SeqCst),
            None => false,
        }
    }

    /// Ids and states of currently active (non-terminal) executions.
    pub fn active_executions(&self) -> Vec<(String, ExecutionStatus)> {
        self.active
            .iter()
            .map(|e| (e.key().clone(), e.value().status))
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Terminal execution records, oldest first.
    pub async fn history(&self) -> Vec<TradeExecution> {
        self.history.read().await.clone()
    }

    /// Statistics derived from history plus the active set.
    pub async fn stats(&self) -> TradeStats {
        let history = self.history.read().await;
        let completed = history
            .iter()
            .filter(|e| e.status == ExecutionStatus::Completed)
            .count();
        let failed = history
            .iter()
            .filter(|e| e.status == ExecutionStatus::Failed)
            .count();
        let cancelled = history
            .iter()
            .filter(|e| e.status == ExecutionStatus::Cancelled)
            .count();
        let active = self.active_count();
        let total_profit: f64 = history.iter().filter_map(|e| e.actual_profit).sum();

        TradeStats {
            total_trades: history.len() + active,
            completed_trades: completed,
            failed_trades: failed,
            cancelled_trades: cancelled,
            active_trades: active,
            total_profit,
            average_profit: if completed > 0 {
                total_profit / completed as f64
            } else {
                0.0
            },
            success_rate: if history.is_empty() {
                0.0
            } else {
                completed as f64 / history.len() as f64 * 100.0
            },
        }
    }

    // ------------------------------------------------------------------
    // Flows
    // ------------------------------------------------------------------

    /// Direct A -> B -> A: buy leg then sell leg, selling exactly what the
    /// buy actually produced.
    async fn run_direct(
        &self,
        execution: &mut TradeExecution,
        cancel: &AtomicBool,
        token_a: &TokenClass,
        token_b: &TokenClass,
        quote_a_to_b: &SwapQuote,
        quote_b_to_a: &SwapQuote,
    ) -> Result<f64, TradeHalt> {
        let buy_input = execution.opportunity.max_trade_amount;
        Self::validate_quote(quote_a_to_b, token_a, token_b, buy_input, "buy")?;

        self.set_status(execution, ExecutionStatus::Buying);
        let buy = self
            .execute_leg(token_a, token_b, buy_input, quote_a_to_b, cancel)
            .await?;
        let sell_input = buy.output_amount;
        execution.buy_swap = Some(buy);
        Self::checkpoint(cancel)?;

        Self::validate_quote(quote_b_to_a, token_b, token_a, sell_input, "sell")?;

        self.set_status(execution, ExecutionStatus::Selling);
        let sell = self
            .execute_leg(token_b, token_a, sell_input, quote_b_to_a, cancel)
            .await?;
        let sell_output = sell.output_amount;
        execution.sell_swap = Some(sell);
        Self::checkpoint(cancel)?;

        Ok(sell_output - buy_input)
    }

    /// Multi-leg cycle: first leg buys, interior legs convert, last leg
    /// sells. Each leg trades the previous leg's actual output.
    async fn run_path(
        &self,
        execution: &mut TradeExecution,
        cancel: &AtomicBool,
        path: &[TradeLeg],
    ) -> Result<f64, TradeHalt> {
        let starting_input = execution.opportunity.max_trade_amount;
        let mut current_amount = starting_input;
        let last = path.len().saturating_sub(1);

        for (i, leg) in path.iter().enumerate() {
            Self::validate_quote(
                &leg.quote,
                &leg.from_token_class,
                &leg.to_token_class,
                current_amount,
                "path",
            )?;

            let status = if i == 0 {
                ExecutionStatus::Buying
            } else if i == last {
                ExecutionStatus::Selling
            } else {
                ExecutionStatus::Converting
            };
            self.set_status(execution, status);

            let result = self
                .execute_leg(
                    &leg.from_token_class,
                    &leg.to_token_class,
                    current_amount,
                    &leg.quote,
                    cancel,
                )
                .await?;
            current_amount = result.output_amount;

            if i == 0 {
                execution.buy_swap = Some(result);
            } else if i == last {
                execution.sell_swap = Some(result);
            } else {
                execution.intermediate_swaps.push(result);
            }
            Self::checkpoint(cancel)?;
        }

        Ok(current_amount - starting_input)
    }

    // ------------------------------------------------------------------
    // Per-swap execution
    // ------------------------------------------------------------------

    /// Execute a single leg with retry. A stale-price failure invalidates
    /// the cached quote for this exact route+amount and drops the
    /// precomputed quote, so the next attempt re-quotes.
    async fn execute_leg(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
        quote: &SwapQuote,
        cancel: &AtomicBool,
    ) -> Result<SwapResult, TradeHalt> {
        let mut precomputed = Some(quote);

        for attempt in 1..=self.config.max_swap_attempts {
            Self::checkpoint(cancel)?;

            match self
                .client
                .execute_swap(
                    input,
                    output,
                    amount,
                    self.config.slippage_tolerance_pct,
                    precomputed,
                )
                .await
            {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if e.is_stale_price() {
                        self.quotes.invalidate(input, output, amount);
                        precomputed = None;
                        warn!(
                            "Stale price on {} -> {} (attempt {}): re-quoting",
                            input.symbol(),
                            output.symbol(),
                            attempt
                        );
                    }
                    if attempt == self.config.max_swap_attempts {
                        return Err(TradeHalt::Failed(format!(
                            "swap {} -> {} failed after {} attempts: {}",
                            input.symbol(),
                            output.symbol(),
                            attempt,
                            e
                        )));
                    }
                    let delay = self.backoff_delay(attempt);
                    debug!(
                        "Swap {} -> {} attempt {} failed ({}), retrying in {:?}",
                        input.symbol(),
                        output.symbol(),
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        // Loop always returns on the last attempt
        Err(TradeHalt::Failed("retry loop exhausted".to_string()))
    }

    /// Jittered exponential backoff: base * 2^(attempt-1), capped, then
    /// scaled by a random factor in [0.5, 1.0) to spread retry storms.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exp.min(self.config.retry_max_delay);
        capped.mul_f64(0.5 + rand::random::<f64>() * 0.5)
    }

    /// Cached quotes become invalid when the pair or amount drifted from
    /// what execution actually needs; trading on them would realize a price
    /// that was never quoted.
    fn validate_quote(
        quote: &SwapQuote,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
        leg_name: &str,
    ) -> Result<(), TradeHalt> {
        if !quote.is_sound() || !quote.covers(input, output, amount) {
            return Err(TradeHalt::Failed(format!(
                "stale {} quote: expected {} -> {} at {}, quoted {} -> {} at {}",
                leg_name,
                input.symbol(),
                output.symbol(),
                amount,
                quote.input_token.symbol(),
                quote.output_token.symbol(),
                quote.input_amount
            )));
        }
        Ok(())
    }

    fn checkpoint(cancel: &AtomicBool) -> Result<(), TradeHalt> {
        if cancel.load(Ordering::SeqCst) {
            Err(TradeHalt::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_status(&self, execution: &mut TradeExecution, status: ExecutionStatus) {
        execution.status = status;
        if let Some(mut trade) = self.active.get_mut(&execution.id) {
            trade.status = status;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{MockExchange, SwapError};
    use crate::filters::PairAllowlist;

    fn token(sym: &str) -> TokenClass {
        TokenClass::from_parts(sym, "Unit", "none", "none")
    }

    fn quote(input: &TokenClass, output: &TokenClass, amount_in: f64, amount_out: f64) -> SwapQuote {
        SwapQuote {
            input_token: input.clone(),
            output_token: output.clone(),
            input_amount: amount_in,
            output_amount: amount_out,
            price_impact: 0.05,
            fee_tier: 500,
            route: vec![input.to_string(), output.to_string()],
        }
    }

    /// Direct GALA/GUSDC opportunity sized at 1000: 1000 -> 5000 -> 1010.
    fn direct_opp() -> ArbitrageOpportunity {
        let gala = token("GALA");
        let gusdc = token("GUSDC");
        ArbitrageOpportunity {
            id: "opp_direct_test".to_string(),
            entry_token_class: gala.clone(),
            entry_token_symbol: "GALA".to_string(),
            exit_token_class: gusdc.clone(),
            exit_token_symbol: "GUSDC".to_string(),
            profit_percentage: 1.0,
            estimated_profit: 10.0,
            max_trade_amount: 1000.0,
            has_funds: true,
            current_balance: 5000.0,
            shortfall: 0.0,
            timestamp: Utc::now(),
            current_market_price: Some(0.202),
            price_discrepancy: Some(1.0),
            confidence: None,
            detail: OpportunityDetail::Direct {
                token_a: "GALA".to_string(),
                token_b: "GUSDC".to_string(),
                token_class_a: gala.clone(),
                token_class_b: gusdc.clone(),
                buy_price: 0.2,
                sell_price: 0.202,
                quote_a_to_b: quote(&gala, &gusdc, 1000.0, 5000.0),
                quote_b_to_a: quote(&gusdc, &gala, 5000.0, 1010.0),
            },
        }
    }

    /// Triangular GALA -> GUSDC -> GWBTC -> GALA opportunity sized at 500.
    fn triangular_opp() -> ArbitrageOpportunity {
        let gala = token("GALA");
        let gusdc = token("GUSDC");
        let gwbtc = token("GWBTC");
        let q1 = quote(&gala, &gusdc, 500.0, 2500.0);
        let q2 = quote(&gusdc, &gwbtc, 2500.0, 2.5);
        let q3 = quote(&gwbtc, &gala, 2.5, 510.0);
        let legs = vec![
            TradeLeg {
                from_symbol: "GALA".into(),
                from_token_class: gala.clone(),
                to_symbol: "GUSDC".into(),
                to_token_class: gusdc.clone(),
                input_amount: q1.input_amount,
                output_amount: q1.output_amount,
                quote: q1,
            },
            TradeLeg {
                from_symbol: "GUSDC".into(),
                from_token_class: gusdc.clone(),
                to_symbol: "GWBTC".into(),
                to_token_class: gwbtc.clone(),
                input_amount: q2.input_amount,
                output_amount: q2.output_amount,
                quote: q2,
            },
            TradeLeg {
                from_symbol: "GWBTC".into(),
                from_token_class: gwbtc.clone(),
                to_symbol: "GALA".into(),
                to_token_class: gala.clone(),
                input_amount: q3.input_amount,
                output_amount: q3.output_amount,
                quote: q3,
            },
        ];
        ArbitrageOpportunity {
            id: "opp_tri_test".to_string(),
            entry_token_class: gala.clone(),
            entry_token_symbol: "GALA".to_string(),
            exit_token_class: gala.clone(),
            exit_token_symbol: "GALA".to_string(),
            profit_percentage: 2.0,
            estimated_profit: 10.0,
            max_trade_amount: 500.0,
            has_funds: true,
            current_balance: 1000.0,
            shortfall: 0.0,
            timestamp: Utc::now(),
            current_market_price: None,
            price_discrepancy: None,
            confidence: None,
            detail: OpportunityDetail::Triangular {
                path: legs,
                reference_input_amount: 500.0,
                reference_output_amount: 510.0,
            },
        }
    }

    /// Market matching the direct opportunity's quotes.
    fn seed_direct_market(ex: &MockExchange) {
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GALA"), 0.202);
    }

    fn seed_triangular_market(ex: &MockExchange) {
        ex.set_rate(&token("GALA"), &token("GUSDC"), 5.0);
        ex.set_rate(&token("GUSDC"), &token("GWBTC"), 0.001);
        ex.set_rate(&token("GWBTC"), &token("GALA"), 204.0);
    }

    fn fast_config(max_concurrent: usize) -> ExecutorConfig {
        ExecutorConfig {
            max_concurrent_trades: max_concurrent,
            slippage_tolerance_pct: 1.0,
            max_swap_attempts: 3,
            retry_base_delay: Duration::from_millis(2),
            retry_max_delay: Duration::from_millis(10),
        }
    }

    fn executor(ex: Arc<MockExchange>, config: ExecutorConfig) -> (Arc<TradeExecutor>, Arc<QuoteCache>) {
        let quotes = Arc::new(QuoteCache::new(
            Arc::clone(&ex) as Arc<dyn SwapClient>,
            Arc::new(PairAllowlist::default()),
            Duration::from_millis(30_000),
        ));
        (
            Arc::new(TradeExecutor::new(ex, Arc::clone(&quotes), config)),
            quotes,
        )
    }

    #[tokio::test]
    async fn test_direct_round_trip_completes() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        let result = exec.execute(direct_opp()).await;

        assert_eq!(result.status, ExecutionStatus::Completed);
        let buy = result.buy_swap.as_ref().expect("buy receipt");
        let sell = result.sell_swap.as_ref().expect("sell receipt");
        assert_eq!(
            result.actual_profit,
            Some(sell.output_amount - buy.input_amount)
        );
        assert_eq!(result.actual_profit, Some(10.0));
        assert!(result.end_time.is_some());
        assert!(!buy.transaction_hash.is_empty());

        // Removed from the active set, archived exactly once
        assert_eq!(exec.active_count(), 0);
        let history = exec.history().await;
        assert_eq!(
            history.iter().filter(|e| e.id == result.id).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_triangular_path_completes_with_intermediate_receipts() {
        let ex = Arc::new(MockExchange::new());
        seed_triangular_market(&ex);
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        let result = exec.execute(triangular_opp()).await;

        assert_eq!(result.status, ExecutionStatus::Completed);
        assert!(result.buy_swap.is_some());
        assert!(result.sell_swap.is_some());
        assert_eq!(result.intermediate_swaps.len(), 1);
        // 500 -> 2500 -> 2.5 -> 510
        assert_eq!(result.actual_profit, Some(10.0));
        assert_eq!(ex.swap_calls(), 3);
    }

    #[tokio::test]
    async fn test_admission_ceiling_rejects_excess_without_swapping() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        ex.set_swap_delay(80);
        let (exec, _) = executor(Arc::clone(&ex), fast_config(1));

        let first = {
            let exec = Arc::clone(&exec);
            tokio::spawn(async move { exec.execute(direct_opp()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(exec.active_count(), 1);

        // Ceiling reached: the next admission fails immediately and never
        // reaches execute_swap
        let swaps_before = ex.swap_calls();
        let rejected = exec.execute(direct_opp()).await;
        assert_eq!(rejected.status, ExecutionStatus::Failed);
        assert_eq!(rejected.error.as_deref(), Some(ADMISSION_ERROR));
        assert!(rejected.buy_swap.is_none());
        assert_eq!(ex.swap_calls(), swaps_before);

        let first = first.await.unwrap();
        assert_eq!(first.status, ExecutionStatus::Completed);
        assert_eq!(exec.active_count(), 0);

        // Slot freed: admission works again
        ex.set_swap_delay(0);
        let third = exec.execute(direct_opp()).await;
        assert_eq!(third.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn test_cancellation_is_cooperative_and_idempotent() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        ex.set_swap_delay(80);
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        let handle = {
            let exec = Arc::clone(&exec);
            tokio::spawn(async move { exec.execute(direct_opp()).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (id, status) = exec.active_executions().pop().expect("one active");
        assert_eq!(status, ExecutionStatus::Buying);

        assert!(exec.cancel(&id));
        // Second cancel of the same execution returns false
        assert!(!exec.cancel(&id));

        let result = handle.await.unwrap();
        assert_eq!(result.status, ExecutionStatus::Cancelled);
        assert_eq!(result.error.as_deref(), Some(CANCELLED_REASON));
        // The in-flight buy completed on the exchange; its receipt is kept,
        // but no sell leg was started
        assert!(result.buy_swap.is_some());
        assert!(result.sell_swap.is_none());
        assert_eq!(ex.swap_calls(), 1);

        // Cancelling a terminal execution returns false
        assert!(!exec.cancel(&id));
    }

    #[tokio::test]
    async fn test_transient_failures_retry_then_succeed() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        ex.fail_swaps(
            &token("GALA"),
            &token("GUSDC"),
            2,
            SwapError::Transient("rpc timeout".into()),
        );
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        let result = exec.execute(direct_opp()).await;
        assert_eq!(result.status, ExecutionStatus::Completed);
        // Buy: 2 failures + 1 success; sell: 1 call
        assert_eq!(ex.swap_calls(), 4);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_fails_execution() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        ex.fail_swaps(
            &token("GALA"),
            &token("GUSDC"),
            3,
            SwapError::Transient("rpc timeout".into()),
        );
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        let result = exec.execute(direct_opp()).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("rpc timeout"));
        assert!(result.sell_swap.is_none());
        assert_eq!(exec.active_count(), 0);
        assert_eq!(exec.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_price_failure_invalidates_cached_quote() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        let (exec, quotes) = executor(Arc::clone(&ex), fast_config(3));

        // Prime the cache with the buy-leg quote, as a detection pass would
        quotes
            .get_quote(&token("GALA"), &token("GUSDC"), 1000.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(quotes.cached_count(), 1);

        ex.fail_swaps(
            &token("GALA"),
            &token("GUSDC"),
            1,
            SwapError::StalePrice("slippage tolerance exceeded".into()),
        );

        let result = exec.execute(direct_opp()).await;
        assert_eq!(result.status, ExecutionStatus::Completed);
        // The stale-price attempt evicted the cached buy quote
        assert_eq!(quotes.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_drifted_quote_fails_fast_without_swapping() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        // Opportunity sized at 1000 but carrying a quote for 900
        let mut opp = direct_opp();
        if let OpportunityDetail::Direct {
            ref mut quote_a_to_b,
            ..
        } = opp.detail
        {
            quote_a_to_b.input_amount = 900.0;
        }

        let result = exec.execute(opp).await;
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert!(result.error.as_deref().unwrap().contains("stale buy quote"));
        assert_eq!(ex.swap_calls(), 0);
    }

    #[tokio::test]
    async fn test_stats_derived_from_history_and_active() {
        let ex = Arc::new(MockExchange::new());
        seed_direct_market(&ex);
        let (exec, _) = executor(Arc::clone(&ex), fast_config(3));

        exec.execute(direct_opp()).await;
        ex.fail_swaps(
            &token("GALA"),
            &token("GUSDC"),
            3,
            SwapError::Transient("down".into()),
        );
        exec.execute(direct_opp()).await;

        let stats = exec.stats().await;
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.completed_trades, 1);
        assert_eq!(stats.failed_trades, 1);
        assert_eq!(stats.cancelled_trades, 0);
        assert_eq!(stats.active_trades, 0);
        assert_eq!(stats.total_profit, 10.0);
        assert_eq!(stats.average_profit, 10.0);
        assert_eq!(stats.success_rate, 50.0);
    }
}
