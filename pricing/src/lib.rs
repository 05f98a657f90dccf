//! Bondcurve Pricing Engine
//!
//! Linear bonding curve that prices units against a reserve currency, and the
//! buy / sell-all operations that move units and reserve across it.
//!
//! # Features
//!
//! - Price rises with cumulative trading volume, in both directions
//! - Pure quotes at the current price
//! - Sales apply every effect before paying out, and roll back if the host
//!   rejects the payment
//!
//! # Example
//!
//! ```rust,ignore
//! use bondcurve_pricing::{MarketState, PricingEngine};
//!
//! let engine = PricingEngine::default();
//! let mut state = MarketState::new();
//!
//! let receipt = engine.buy(&mut state, &mut host, buyer, 1_000_000_000_000_000)?;
//! let payout = engine.sell_all(&mut state, &mut host, buyer)?;
//! ```

pub mod curve;
pub mod engine;
pub mod error;
pub mod host;
pub mod state;
pub mod trade;

pub use curve::{BondingCurve, DEFAULT_BASE_PRICE, DEFAULT_SLOPE_DENOMINATOR};
pub use engine::PricingEngine;
pub use error::{HostError, HostResult};
pub use host::ReserveHost;
#[cfg(any(test, feature = "test-utils"))]
pub use host::{ObservedState, RecordingHost};
pub use state::{MarketSnapshot, MarketState};
pub use trade::{TradeReceipt, TradeSide};
