//! Bondcurve Exchange
//!
//! The exchange service: owns the market state and the host runtime behind a
//! single lock, and exposes the stateful operations and readers callers use.

pub mod config;
pub mod exchange;
pub mod metrics;
pub mod wallet;

pub use config::{CurveConfig, ExchangeConfig, TokenMetadata};
pub use exchange::{Exchange, SEED_MINT_UNITS};
pub use metrics::{ExchangeMetrics, MetricsSnapshot, SharedMetrics};
pub use wallet::WalletHost;
