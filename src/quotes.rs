//! TTL quote cache
//!
//! Write-through wrapper around the exchange quote call, shared by every
//! detector. Entries are keyed `input::output::amount` with exact amount
//! match (no interpolation) and expire after the configured TTL. The cache
//! is advisory: a miss or stale hit always falls through to a live fetch,
//! which repopulates the entry. Last write wins; staleness inside the TTL
//! window is tolerated by design.
//!
//! Author: AI-Generated
//! Created: 2026-02-12

use crate::exchange::{SwapClient, SwapError};
use crate::filters::PairAllowlist;
use crate::types::{SwapQuote, TokenClass};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone)]
struct CachedQuote {
    quote: SwapQuote,
    fetched_at: Instant,
}

/// Shared quote lookup with TTL caching and allowlist short-circuit.
pub struct QuoteCache {
    client: Arc<dyn SwapClient>,
    allowlist: Arc<PairAllowlist>,
    entries: DashMap<String, CachedQuote>,
    ttl: Duration,
}

fn cache_key(input: &TokenClass, output: &TokenClass, amount: f64) -> String {
    format!("{}::{}::{}", input, output, amount)
}

impl QuoteCache {
    pub fn new(client: Arc<dyn SwapClient>, allowlist: Arc<PairAllowlist>, ttl: Duration) -> Self {
        Self {
            client,
            allowlist,
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a quote for swapping `amount` of `input` into `output`.
    ///
    /// A pair outside the allowlist short-circuits to absent without a
    /// network call. Within the TTL a cached quote is returned unchanged;
    /// otherwise the live source is consulted and a non-absent result is
    /// written through before being returned.
    pub async fn get_quote(
        &self,
        input: &TokenClass,
        output: &TokenClass,
        amount: f64,
    ) -> Result<Option<SwapQuote>, SwapError> {
        if !self.allowlist.is_pair_allowed(input, output) {
            return Ok(None);
        }

        let key = cache_key(input, output, amount);
        if let Some(entry) = self.entries.get(&key) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!("Quote cache hit: {}", key);
                return Ok(Some(entry.quote.clone()));
            }
        }

        let quote = self.client.quote(input, output, amount).await?;
        if let Some(ref q) = quote {
            self.entries.insert(
                key,
                CachedQuote {
                    quote: q.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }
        Ok(quote)
    }

    /// Drop the cached entry for one exact route+amount. Used by the
    /// executor when a swap fails on stale pricing, so the retry re-quotes.
    pub fn invalidate(&self, input: &TokenClass, output: &TokenClass, amount: f64) -> bool {
        self.entries.remove(&cache_key(input, output, amount)).is_some()
    }

    /// Remove every entry past the TTL; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| e.fetched_at.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn cached_count(&self) -> usize {
        self.entries.len()
    }
}
