//! The host runtime collaborator.

use bondcurve_common::{Address, Amount};
use bondcurve_ledger::JournalBatch;

use crate::error::HostResult;
use crate::state::MarketState;

/// The host runtime as seen by the exchange.
///
/// The exchange touches the outside world only through this trait: paying
/// reserve currency out, and publishing notifications of committed
/// operations. Incoming sender identity and attached reserve arrive as call
/// arguments.
pub trait ReserveHost: Send {
    /// Get the host name.
    fn name(&self) -> &str;

    /// Pay `amount` of reserve currency to `to`.
    ///
    /// Called after every effect of the sale has been applied; `committed`
    /// is the post-sale state, and is all that external code run during the
    /// transfer can observe.
    fn send_reserve(&mut self, to: &Address, amount: Amount, committed: &MarketState)
        -> HostResult<()>;

    /// Deliver the notifications of a committed operation.
    fn publish(&mut self, batch: &JournalBatch);
}

/// State observed by a [`RecordingHost`] during an outbound transfer.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedState {
    pub recipient_balance: Amount,
    pub total_supply: Amount,
    pub cumulative_volume: Amount,
    pub reserve_pool: Amount,
}

/// Recording host for testing.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct RecordingHost {
    /// Successful payments in order.
    pub payments: Vec<(Address, Amount)>,
    /// Published notifications in order.
    pub published: Vec<bondcurve_common::Notification>,
    /// State seen at each payment attempt.
    pub observed: Vec<ObservedState>,
    reject_reason: Option<String>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingHost {
    /// Create a new recording host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent payment fail.
    pub fn reject_payments(&mut self, reason: impl Into<String>) {
        self.reject_reason = Some(reason.into());
    }

    /// Accept payments again.
    pub fn accept_payments(&mut self) {
        self.reject_reason = None;
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ReserveHost for RecordingHost {
    fn name(&self) -> &str {
        "recording"
    }

    fn send_reserve(
        &mut self,
        to: &Address,
        amount: Amount,
        committed: &MarketState,
    ) -> HostResult<()> {
        self.observed.push(ObservedState {
            recipient_balance: committed.ledger.balance_of(to),
            total_supply: committed.ledger.total_supply(),
            cumulative_volume: committed.cumulative_volume,
            reserve_pool: committed.reserve_pool,
        });

        if let Some(reason) = &self.reject_reason {
            return Err(crate::error::HostError::Rejected {
                recipient: *to,
                amount,
                reason: reason.clone(),
            });
        }

        self.payments.push((*to, amount));
        Ok(())
    }

    fn publish(&mut self, batch: &JournalBatch) {
        self.published.extend(batch.entries.iter().cloned());
    }
}
