//! Simulated exchange
//!
//! Deterministic in-memory `SwapClient`/`BalanceSource` used for dry-run
//! operation and as the shared test fixture. Quotes come from a linear rate
//! table with optional exact-amount overrides; swap failures can be scripted
//! per route to exercise the executor's retry and invalidation paths.
//!
//! Author: AI-Generated
//! Created: 2026-02-12

use crate::balance::BalanceSnapshot;
use crate::exchange::{BalanceSource, SwapClient, SwapError};
use crate::types::{SwapQuote, SwapResult, TokenClass};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Scripted failure plan for one route: the next `remaining` swaps fail.
#[derive(Debug, Clone)]
struct FailPlan {
    remaining: u32,
    error: SwapError,
}

/// In-memory exchange with a programmable market.
pub struct MockExchange {
    /// Linear rates: output = input_amount * rate, keyed `input->output`
    rates: DashMap<String, f64>,
    /// Exact-amount overrides, keyed `input->output@amount`; win over rates
    exact: DashMap<String, f64>,
    /// Scripted swap failures per route
    fail_plans: DashMap<String, FailPlan>,
    /// Scripted quote failures per route
    quote_fail_plans: DashMap<String, FailPlan>,
    /// Wallet balances served through `BalanceSource`
    balances: DashMap<TokenClass, f64>,
    /// Artificial swap latency, for exercising in-flight behavior
    swap_delay_ms: AtomicU64,
    quote_calls: AtomicUsize,
    swap_calls: AtomicUsize,
}

fn route_key(input: &TokenClass, output: &TokenClass) -> String {
    format!("{}->{}", input, output)
}

fn exact_key(input: &TokenClass, output: &TokenClass, amount: f64) -> String {
    format!("{}->{}@{}", input, output, amount)
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            rates: DashMap::new(),
            exact: DashMap::new(),
            fail_plans: DashMap::new(),
            quote_fail_plans: DashMap::new(),
            balances: DashMap::new(),
            swap_delay_ms: AtomicU64::new(0),
            quote_calls: AtomicUsize::new(0),
            swap_calls: AtomicUsize::new(0),
        }
    }

    /// Small demo market for dry-run mode: three pairs with a mild
    /// triangular inefficiency on GALA -> GUSDC -> GWETH -> GALA.
    pub fn demo_market() -> Self {
        let ex = Self::new();
        let gala = TokenClass::from_parts("GALA", "Unit", "none", "none");
        let gusdc = TokenClass::from_parts("GUSDC", "Unit", "none", "none");
        let gweth = TokenClass::from_parts("GWETH", "Unit", "none", "none");

        ex.set_rate(&gala, &gusdc, 0.016);
        ex.set_rate(&gusdc, &gala, 61.8);
        ex.set_rate(&gusdc, &gweth, 0.00040);
        ex.set_rate(&gweth, &gusdc, 2480.0);
        ex.set_rate(&gala, &gweth, 0.0000063);
        ex.set_rate(&gweth, &gala, 160_500.0);

        ex.set_balance(&gala, 25_000.0);
        ex.set_balance(&gusdc, 400.0);
        ex.set_balance(&gweth, 0.15);
        ex
    }

    pub fn set_rate(&self, input: &TokenClass, output: &TokenClass, rate: f64) {
        self.rates.insert(route_key(input, output), rate);
    }

    /// Exact-amount override; takes precedence over the linear rate.
    pub fn set_exact(&self, input: &TokenClass, output: &TokenClass, amount: f64, output_amount: f64) {
        self.exact.insert(exact_key(input, output, amount), output_amount);
    }

    pub fn clear_route(&self, input: &TokenClass, output: &TokenClass) {
        self.rates.remove(&route_key(input, output));
    }

    pub fn set_balance(&self, token: &TokenClass, amount: f64) {
        self.balances.insert(token.clone(), amount);
    }

    /// Script the next `times` swaps on this route to fail with `error`.
    pub fn fail_swaps(&self, input: &TokenClass, output: &TokenClass, times: u32, error: SwapError) {
        self.fail_plans.insert(
            route_key(input, output),
            FailPlan {
                remaining: times,
                error,
            },
        );
    }

    /// Script the next `times` quote lookups on this route to fail.
    pub fn fail_quotes(&self, input: &TokenClass, output: &TokenClass, times: u32, error: SwapError) {
        self.quote_fail_plans.insert(
            route_key(input, output),
            FailPlan {
                remaining: times,
                error,
            },
        );
    }

    /// Delay every swap by `ms`, holding it "in flight" for that long.
    pub fn set_swap_delay(&self, ms: u64) {
        self.swap_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn quote_calls(&self) -> usize {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn swap_calls(&self) -> usize {
        self.swap_calls.load(Ordering::SeqCst)
    }

    /// Resolve a quote output for a route, if the market knows it.
    fn output_for(&self, input: &TokenClass, output: &TokenClass, amount: f64) -> Option<f64> {
        if let Some(exact) = self.exact.get(&exact_key(input, output, amount)) {
            return Some(*exact);
        }
        self.rates
            .get(&route_key(input, output))
            .map(|rate| amount * *rate)
    }
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapClient for MockExchange {
    async fn quote(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
    ) -> Result<Option<SwapQuote>, SwapError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(mut plan) = self.quote_fail_plans.get_mut(&route_key(input, output)) {
            if plan.remaining > 0 {
                plan.remaining -= 1;
                return Err(plan.error.clone());
            }
        }

        Ok(self.output_for(input, output, amount).map(|out| SwapQuote {
            input_token: input.clone(),
            output_token: output.clone(),
            input_amount: amount,
            output_amount: out,
            price_impact: 0.05,
            fee_tier: 500,
            route: vec![input.to_string(), output.to_string()],
        }))
    }

    async fn execute_swap(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
        _slippage_tolerance_pct: f64,
        _precomputed_quote: Option<&SwapQuote>,
    ) -> Result<SwapResult, SwapError> {
        let call_no = self.swap_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = self.swap_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }

        // Scripted failure, if any remain for this route
        let key = route_key(input, output);
        if let Some(mut plan) = self.fail_plans.get_mut(&key) {
            if plan.remaining > 0 {
                plan.remaining -= 1;
                return Err(plan.error.clone());
            }
        }

        let out = self
            .output_for(input, output, amount)
            .ok_or_else(|| SwapError::Rejected(format!("no route {} -> {}", input, output)))?;

        Ok(SwapResult {
            transaction_hash: format!("mock_tx_{:08}", call_no),
            input_amount: amount,
            output_amount: out,
            actual_price: if amount > 0.0 { out / amount } else { 0.0 },
            gas_used: 1.0,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl BalanceSource for MockExchange {
    async fn snapshot(&self, _force_refresh: bool) -> BalanceSnapshot {
        let balances: HashMap<TokenClass, f64> = self
            .balances
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        BalanceSnapshot::new(balances)
    }
}
