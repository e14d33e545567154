// Core data structures shared across detection and execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified token identity on gSwap:
/// `collection|category|type|additionalKey` (e.g. `GALA|Unit|none|none`).
/// Equality is exact string equality; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenClass(String);

impl TokenClass {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Build from the four class segments.
    pub fn from_parts(collection: &str, category: &str, token_type: &str, additional: &str) -> Self {
        Self(format!("{}|{}|{}|{}", collection, category, token_type, additional))
    }

    /// Human-readable symbol: the collection segment of the class key.
    pub fn symbol(&self) -> &str {
        self.0.split('|').next().unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trading pair under observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingPair {
    pub token_a: TokenClass,
    pub token_b: TokenClass,
    pub symbol: String,
}

impl TradingPair {
    pub fn new(token_a: TokenClass, token_b: TokenClass, symbol: String) -> Self {
        Self {
            token_a,
            token_b,
            symbol,
        }
    }

    /// Order-insensitive key: the two class strings sorted and joined.
    /// `A/B` and `B/A` map to the same key.
    pub fn pair_key(&self) -> String {
        pair_key(&self.token_a, &self.token_b)
    }
}

/// Order-insensitive pair key for two token classes.
pub fn pair_key(a: &TokenClass, b: &TokenClass) -> String {
    let mut keys = [a.as_str(), b.as_str()];
    keys.sort_unstable();
    format!("{}::{}", keys[0], keys[1])
}

/// Price estimate for a hypothetical swap. Immutable once produced by the
/// quote source; not a binding execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub input_token: TokenClass,
    pub output_token: TokenClass,
    pub input_amount: f64,
    pub output_amount: f64,
    /// Estimated price impact of this trade size, percent
    pub price_impact: f64,
    /// Pool fee tier in basis points
    pub fee_tier: u32,
    /// Token classes visited by the routed swap, input first
    pub route: Vec<String>,
}

impl SwapQuote {
    /// A quote is numerically sound when both amounts are finite and the
    /// output is strictly positive.
    pub fn is_sound(&self) -> bool {
        self.input_amount.is_finite()
            && self.output_amount.is_finite()
            && self.output_amount > 0.0
    }

    /// Does this quote cover exactly the given route and input amount?
    /// Amount drift of any size invalidates the quote for execution.
    pub fn covers(&self, input: &TokenClass, output: &TokenClass, amount: f64) -> bool {
        self.input_token == *input && self.output_token == *output && self.input_amount == amount
    }
}

/// Receipt returned by the swap-execution collaborator. Treated as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResult {
    pub transaction_hash: String,
    pub input_amount: f64,
    pub output_amount: f64,
    pub actual_price: f64,
    pub gas_used: f64,
    pub timestamp: DateTime<Utc>,
}

/// One atomic swap within a multi-leg trade path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLeg {
    pub from_symbol: String,
    pub from_token_class: TokenClass,
    pub to_symbol: String,
    pub to_token_class: TokenClass,
    pub quote: SwapQuote,
    pub input_amount: f64,
    pub output_amount: f64,
}

/// Strategy-specific payload of an opportunity. Consumers match exhaustively;
/// there is no inheritance hierarchy to probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum OpportunityDetail {
    Direct {
        token_a: String,
        token_b: String,
        token_class_a: TokenClass,
        token_class_b: TokenClass,
        buy_price: f64,
        sell_price: f64,
        quote_a_to_b: SwapQuote,
        quote_b_to_a: SwapQuote,
    },
    Triangular {
        /// Closed cycle of legs; first input token equals last output token
        path: Vec<TradeLeg>,
        reference_input_amount: f64,
        reference_output_amount: f64,
    },
}

/// Detected arbitrage opportunity.
///
/// Invariant: `profit_percentage` is finite and at or above the configured
/// minimum threshold; evaluators reject candidates instead of emitting one
/// with a bad value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub entry_token_class: TokenClass,
    pub entry_token_symbol: String,
    pub exit_token_class: TokenClass,
    pub exit_token_symbol: String,
    pub profit_percentage: f64,
    /// Expected profit in units of the entry token at the sized trade amount
    pub estimated_profit: f64,
    /// Sized candidate trade amount this opportunity was evaluated at
    pub max_trade_amount: f64,
    pub has_funds: bool,
    pub current_balance: f64,
    pub shortfall: f64,
    pub timestamp: DateTime<Utc>,
    /// Best-effort diagnostics only; never correctness-relevant
    pub current_market_price: Option<f64>,
    pub price_discrepancy: Option<f64>,
    pub confidence: Option<f64>,
    #[serde(flatten)]
    pub detail: OpportunityDetail,
}

impl ArbitrageOpportunity {
    pub fn strategy(&self) -> &'static str {
        match self.detail {
            OpportunityDetail::Direct { .. } => "direct",
            OpportunityDetail::Triangular { .. } => "triangular",
        }
    }

    /// Dedup key: entry/exit token classes plus the sized trade amount.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}::{}::{}",
            self.entry_token_class, self.exit_token_class, self.max_trade_amount
        )
    }
}

/// Execution lifecycle state.
/// Pending -> Buying -> (Converting xN ->) Selling -> Completed,
/// with Failed and Cancelled reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Buying,
    Converting,
    Selling,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Buying => "buying",
            ExecutionStatus::Converting => "converting",
            ExecutionStatus::Selling => "selling",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Record of one opportunity execution. Owned exclusively by its executor run
/// until a terminal status, then archived read-only into history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeExecution {
    pub id: String,
    pub opportunity: ArbitrageOpportunity,
    pub buy_swap: Option<SwapResult>,
    pub sell_swap: Option<SwapResult>,
    pub intermediate_swaps: Vec<SwapResult>,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Realized profit in entry-token units; only set on Completed
    pub actual_profit: Option<f64>,
    pub error: Option<String>,
}

impl TradeExecution {
    pub fn new(opportunity: ArbitrageOpportunity) -> Self {
        Self {
            id: format!("exec_{}", uuid::Uuid::new_v4()),
            opportunity,
            buy_swap: None,
            sell_swap: None,
            intermediate_swaps: Vec::new(),
            status: ExecutionStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            actual_profit: None,
            error: None,
        }
    }
}

/// Aggregate execution statistics, derived on demand from history plus the
/// active set, never stored redundantly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeStats {
    pub total_trades: usize,
    pub completed_trades: usize,
    pub failed_trades: usize,
    pub cancelled_trades: usize,
    pub active_trades: usize,
    pub total_profit: f64,
    pub average_profit: f64,
    pub success_rate: f64,
}
