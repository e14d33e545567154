//! gSwap Arbitrage Bot Library
//!
//! Components for cross-rate arbitrage on gSwap: detection walks direct and
//! triangular cycles over a live quote graph with TTL caching, execution
//! drives admitted opportunities through a retrying, cancellable state
//! machine under a global concurrency ceiling.
//!
//! Author: AI-Generated
//! Created: 2026-02-12

pub mod arbitrage;
pub mod balance;
pub mod config;
pub mod exchange;
pub mod filters;
pub mod quotes;
pub mod types;

// Re-export commonly used types
pub use arbitrage::{ExecutorConfig, OpportunityDetector, TradeExecutor};
pub use balance::{check_trading_funds, BalanceSnapshot, FundsCheck};
pub use config::{load_config, BotConfig};
pub use exchange::{BalanceSource, MockExchange, SwapClient, SwapError};
pub use filters::PairAllowlist;
pub use quotes::QuoteCache;
pub use types::{
    ArbitrageOpportunity, ExecutionStatus, OpportunityDetail, SwapQuote, SwapResult, TokenClass,
    TradeExecution, TradeStats, TradingPair,
};
