//! Wallet balance snapshots and the pure funds check.
//!
//! A snapshot is fetched once per detection pass (through `BalanceSource`)
//! and reused across every evaluation in that pass, so all candidates are
//! judged against the same view of the wallet.

use crate::types::TokenClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable point-in-time view of wallet balances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    balances: HashMap<TokenClass, f64>,
    pub fetched_at: DateTime<Utc>,
}

impl BalanceSnapshot {
    pub fn new(balances: HashMap<TokenClass, f64>) -> Self {
        Self {
            balances,
            fetched_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// Balance for a token class; unknown tokens read as zero.
    pub fn balance_of(&self, token: &TokenClass) -> f64 {
        self.balances.get(token).copied().unwrap_or(0.0)
    }
}

/// Outcome of a funds check against one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsCheck {
    pub has_funds: bool,
    pub current_balance: f64,
    pub shortfall: f64,
}

/// Pure function of the snapshot, no I/O. Insufficient funds is not an
/// error; callers surface the flag on the opportunity instead of blocking
/// detection.
pub fn check_trading_funds(
    required_amount: f64,
    token: &TokenClass,
    snapshot: &BalanceSnapshot,
) -> FundsCheck {
    let current_balance = snapshot.balance_of(token);
    let has_funds = current_balance >= required_amount;
    FundsCheck {
        has_funds,
        current_balance,
        shortfall: if has_funds {
            0.0
        } else {
            required_amount - current_balance
        },
    }
}
