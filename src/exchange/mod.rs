//! Exchange collaborator boundary
//!
//! The core never talks to gSwap directly: quote lookup, swap submission and
//! balance snapshots come through the traits below, implemented by a real
//! transport client elsewhere or by the in-repo simulated exchange.
//! Failures cross this boundary as structured `SwapError` kinds, not as
//! message strings to be sniffed downstream.
//!
//! Author: AI-Generated
//! Created: 2026-02-12

pub mod mock;

pub use mock::MockExchange;

use crate::balance::BalanceSnapshot;
use crate::types::{SwapQuote, SwapResult, TokenClass};
use async_trait::async_trait;
use thiserror::Error;

/// Failure taxonomy at the exchange boundary.
///
/// `Quote` returning `Ok(None)` is the soft "no liquidity / unsupported"
/// outcome and is not an error; these variants cover the paths that do fail.
#[derive(Debug, Clone, Error)]
pub enum SwapError {
    /// Upstream API rate limiting; callers should pause further detection
    #[error("rate limited by exchange API")]
    RateLimited,

    /// Quoted price no longer matches the pool (slippage, price impact,
    /// tolerance exceeded). Cached quotes for the route must be re-fetched.
    #[error("stale price: {0}")]
    StalePrice(String),

    /// Transient network or on-chain failure; worth retrying
    #[error("transient failure: {0}")]
    Transient(String),

    /// Definitive rejection (bad parameters, unsupported operation)
    #[error("swap rejected: {0}")]
    Rejected(String),
}

impl SwapError {
    /// True when the failed leg's cached quote must be invalidated so the
    /// next attempt re-quotes instead of reusing the same drifted price.
    pub fn is_stale_price(&self) -> bool {
        matches!(self, SwapError::StalePrice(_))
    }

    /// Map a stringly-typed transport error onto the taxonomy. Adapters for
    /// clients that only expose message text funnel through here; the
    /// substring set mirrors what the exchange actually emits for price
    /// drift (slippage / price impact / quote / tolerance).
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("rate limit") || lower.contains("429") {
            SwapError::RateLimited
        } else if lower.contains("slippage")
            || lower.contains("price impact")
            || lower.contains("quote")
            || lower.contains("tolerance")
        {
            SwapError::StalePrice(message.to_string())
        } else {
            SwapError::Transient(message.to_string())
        }
    }
}

/// Quote and swap access to the exchange.
///
/// `quote` fails soft: `Ok(None)` means no liquidity (or an unsupported
/// route) and is a normal skip for detection, never an error path.
#[async_trait]
pub trait SwapClient: Send + Sync {
    async fn quote(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
    ) -> Result<Option<SwapQuote>, SwapError>;

    /// Submit a swap. Implementations must return a populated transaction
    /// hash on success.
    async fn execute_swap(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
        slippage_tolerance_pct: f64,
        precomputed_quote: Option<&SwapQuote>,
    ) -> Result<SwapResult, SwapError>;
}

/// Wallet balance snapshots.
///
/// Implementations may serve a previously cached snapshot when a refresh
/// fails, so detection keeps running on slightly stale balances instead of
/// stalling.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn snapshot(&self, force_refresh: bool) -> BalanceSnapshot;
}
