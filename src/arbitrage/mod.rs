//! Arbitrage detection and execution
//!
//! `direct` and `triangular` evaluate candidate trades, `detector`
//! aggregates and ranks them, `executor` drives admitted opportunities
//! through the execution state machine.

pub mod detector;
pub mod direct;
pub mod executor;
pub mod triangular;

pub use detector::OpportunityDetector;
pub use direct::DirectArbitrage;
pub use executor::{ExecutorConfig, TradeExecutor, ADMISSION_ERROR, CANCELLED_REASON};
pub use triangular::TriangularArbitrage;
