//! Bondcurve Common Types
//!
//! This crate contains shared types used across the bondcurve exchange,
//! including identities, fixed-point amounts, the error taxonomy and the
//! notifications emitted by completed operations.

pub mod identifiers;
pub mod monetary;
pub mod error;
pub mod events;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;
pub use events::*;
