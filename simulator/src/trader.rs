//! Simulated traders.

use bondcurve_common::Address;

/// A simulated trader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trader {
    /// Trader name, also the label its identity is derived from.
    pub name: String,
    /// Trader identity.
    pub address: Address,
}

impl Trader {
    /// Create a trader whose identity is derived from `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let address = Address::from_label(&name);
        Self { name, address }
    }
}

/// Trader factory for creating test traders.
pub struct TraderFactory;

impl TraderFactory {
    /// Create N simulated traders.
    pub fn create_traders(count: usize) -> Vec<Trader> {
        const NAMES: [&str; 10] = [
            "alice", "bob", "carol", "dave", "erin", "frank", "grace", "heidi", "ivan", "judy",
        ];

        (0..count)
            .map(|i| match NAMES.get(i) {
                Some(name) => Trader::new(*name),
                None => Trader::new(format!("trader-{}", i + 1)),
            })
            .collect()
    }
}
