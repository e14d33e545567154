//! gSwap Arbitrage Bot
//!
//! Main entry point. Polls the configured pair universe, runs a detection
//! pass against a fresh balance snapshot, and hands fund-covered
//! opportunities to the trade executor as concurrent tasks.
//!
//! Runs against the in-process simulated market by default; `--live` is a
//! guarded refusal until an external gSwap transport client is wired in.
//!
//! Author: AI-Generated
//! Created: 2026-02-12
//! Modified: 2026-02-14 - Periodic stats line + quote cache purge per pass

use anyhow::Result;
use clap::Parser;
use gswap_arb_bot::arbitrage::{ExecutorConfig, OpportunityDetector, TradeExecutor};
use gswap_arb_bot::config::load_config;
use gswap_arb_bot::exchange::{BalanceSource, MockExchange, SwapClient};
use gswap_arb_bot::filters::PairAllowlist;
use gswap_arb_bot::quotes::QuoteCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// gSwap Arbitrage Bot: cross-rate cycle detection and execution
#[derive(Parser)]
#[command(name = "gswap-arb-bot")]
struct Args {
    /// Execute against the live exchange instead of the simulated market
    #[arg(long, default_value_t = false)]
    live: bool,

    /// Pair allowlist JSON path (built-in gSwap pairs when omitted)
    #[arg(long, env = "PAIR_ALLOWLIST_FILE")]
    allowlist: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    if args.live {
        anyhow::bail!(
            "Live trading needs an external gSwap transport client wired into \
             SwapClient; run without --live to use the simulated market"
        );
    }

    let mut config = load_config()?;
    if args.allowlist.is_some() {
        config.allowlist_file = args.allowlist.clone();
    }

    info!("gSwap Arbitrage Bot starting (dry run, simulated market)...");
    info!("Min profit threshold: {:.2}%", config.min_profit_percent);
    info!("Max trade amount: {:.2}", config.max_trade_amount);
    info!("Max concurrent trades: {}", config.max_concurrent_trades);
    info!("Quote cache TTL: {}ms", config.quote_cache_ttl_ms);
    info!(
        "Strategies: direct={} triangular={}",
        config.enable_direct, config.enable_triangular
    );
    info!("Trading pairs: {}", config.pairs.len());

    let allowlist = Arc::new(match config.allowlist_file.as_deref() {
        Some(path) => PairAllowlist::load(path)?,
        None => PairAllowlist::default(),
    });
    info!("Allowlist: {} supported pairs", allowlist.allowed_count());

    let exchange = Arc::new(MockExchange::demo_market());
    warn!("DRY RUN mode: trades settle against the simulated market only");

    let quotes = Arc::new(QuoteCache::new(
        Arc::clone(&exchange) as Arc<dyn SwapClient>,
        Arc::clone(&allowlist),
        Duration::from_millis(config.quote_cache_ttl_ms),
    ));
    let detector = OpportunityDetector::new(&config, Arc::clone(&quotes), Arc::clone(&allowlist));
    let executor = Arc::new(TradeExecutor::new(
        Arc::clone(&exchange) as Arc<dyn SwapClient>,
        Arc::clone(&quotes),
        ExecutorConfig {
            max_concurrent_trades: config.max_concurrent_trades,
            slippage_tolerance_pct: config.slippage_tolerance_percent,
            ..ExecutorConfig::default()
        },
    ));

    let pairs = config.trading_pairs();
    let mut interval = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    let mut pass: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                pass += 1;

                // One snapshot per pass; every evaluation sees the same wallet
                let snapshot = exchange.snapshot(false).await;
                let opportunities = detector.detect_all(&pairs, &snapshot).await;

                for opp in opportunities {
                    if !opp.has_funds {
                        info!(
                            "Skipping {} ({}): short {:.4} {}",
                            opp.id, opp.strategy(), opp.shortfall, opp.entry_token_symbol
                        );
                        continue;
                    }
                    let executor = Arc::clone(&executor);
                    tokio::spawn(async move {
                        executor.execute(opp).await;
                    });
                }

                quotes.purge_expired();

                if pass % 12 == 0 {
                    let stats = executor.stats().await;
                    info!(
                        "Stats: {} trades | {} completed, {} failed, {} cancelled, {} active | profit {:.4} | success {:.1}%",
                        stats.total_trades,
                        stats.completed_trades,
                        stats.failed_trades,
                        stats.cancelled_trades,
                        stats.active_trades,
                        stats.total_profit,
                        stats.success_rate,
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    let stats = executor.stats().await;
    info!(
        "Final: {} trades, {} completed, total profit {:.4}",
        stats.total_trades, stats.completed_trades, stats.total_profit
    );

    Ok(())
}
