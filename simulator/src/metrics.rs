//! Simulation metrics.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;


/// Rejection code for a payment the caller's wallet could not cover.
///
/// The call never reaches the exchange, so there is no exchange error code.
pub const WALLET_INSUFFICIENT: &str = "WALLET_INSUFFICIENT";

/// Outcome of one simulated operation: unit on success, rejection code on failure.
pub type Outcome = Result<(), &'static str>;

/// Operation kinds the simulator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Buy,
    SellAll,
    Transfer,
    Approve,
    TransferFrom,
    SeedMint,
    Deposit,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Buy => "buy",
            OpKind::SellAll => "sell_all",
            OpKind::Transfer => "transfer",
            OpKind::Approve => "approve",
            OpKind::TransferFrom => "transfer_from",
            OpKind::SeedMint => "seed_mint",
            OpKind::Deposit => "deposit",
        };
        f.write_str(name)
    }
}

/// Attempt counters for one operation kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpStats {
    pub attempted: u64,
    pub succeeded: u64,
}

/// Simulation metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Operations attempted.
    pub total_operations: u64,
    /// Operations committed.
    pub successful_operations: u64,
    /// Operations rejected.
    pub failed_operations: u64,
    /// Per-kind counters.
    pub by_kind: BTreeMap<OpKind, OpStats>,
    /// Rejections by error code.
    pub rejections: BTreeMap<&'static str, u64>,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one operation.
    pub fn record(&mut self, kind: OpKind, outcome: &Outcome) {
        self.total_operations += 1;
        let stats = self.by_kind.entry(kind).or_default();
        stats.attempted += 1;

        match outcome {
            Ok(()) => {
                self.successful_operations += 1;
                stats.succeeded += 1;
            }
            Err(code) => {
                self.failed_operations += 1;
                *self.rejections.entry(code).or_insert(0) += 1;
            }
        }
    }

    /// Rejections recorded under `code`.
    #[allow(dead_code)]
    pub fn rejections_for(&self, code: &str) -> u64 {
        self.rejections.get(code).copied().unwrap_or(0)
    }

    /// Get success rate.
    pub fn success_rate(&self) -> f64 {
        if self.total_operations == 0 {
            return 0.0;
        }

        self.successful_operations as f64 / self.total_operations as f64
    }
}
