//! In-process reserve host.
//!
//! Holds reserve-currency wallets for every identity the exchange pays out
//! to, and keeps the sequenced notification log.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use bondcurve_common::{checked_add, Address, Amount, NotificationRecord};
use bondcurve_ledger::JournalBatch;
use bondcurve_pricing::{HostError, HostResult, MarketState, ReserveHost};

/// Wallet-backed host runtime.
#[derive(Debug, Default)]
pub struct WalletHost {
    wallets: HashMap<Address, Amount>,
    refusing: HashSet<Address>,
    log: Vec<NotificationRecord>,
    next_sequence: u64,
}

impl WalletHost {
    /// Create a host with no wallets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve balance held by `account`.
    pub fn wallet_of(&self, account: &Address) -> Amount {
        self.wallets.get(account).copied().unwrap_or(0)
    }

    /// Sum of all wallets.
    pub fn total_in_wallets(&self) -> Amount {
        self.wallets.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    /// Credit `amount` to `account`.
    pub fn fund(&mut self, account: Address, amount: Amount) -> HostResult<Amount> {
        let balance = checked_add(self.wallet_of(&account), amount, "wallet credit")
            .map_err(|e| HostError::Unavailable(e.to_string()))?;
        self.wallets.insert(account, balance);
        Ok(balance)
    }

    /// Take `amount` out of `account` to attach to a call.
    pub fn debit(&mut self, account: Address, amount: Amount) -> HostResult<Amount> {
        let have = self.wallet_of(&account);
        if have < amount {
            return Err(HostError::Rejected {
                recipient: account,
                amount,
                reason: format!("wallet holds only {}", have),
            });
        }
        let balance = have - amount;
        self.wallets.insert(account, balance);
        Ok(balance)
    }

    /// Make `account` refuse incoming payouts.
    pub fn refuse_payments_to(&mut self, account: Address) {
        self.refusing.insert(account);
    }

    /// Let `account` receive payouts again.
    pub fn accept_payments_to(&mut self, account: &Address) {
        self.refusing.remove(account);
    }

    /// All notifications published so far, in order.
    pub fn notifications(&self) -> &[NotificationRecord] {
        &self.log
    }

    /// Remove and return the notification log.
    pub fn drain_notifications(&mut self) -> Vec<NotificationRecord> {
        std::mem::take(&mut self.log)
    }

    /// The notification log as JSON lines.
    pub fn notifications_json(&self) -> serde_json::Result<Vec<String>> {
        self.log.iter().map(NotificationRecord::to_json).collect()
    }
}

impl ReserveHost for WalletHost {
    fn name(&self) -> &str {
        "wallet"
    }

    fn send_reserve(
        &mut self,
        to: &Address,
        amount: Amount,
        committed: &MarketState,
    ) -> HostResult<()> {
        if self.refusing.contains(to) {
            return Err(HostError::Rejected {
                recipient: *to,
                amount,
                reason: "recipient refuses payment".to_string(),
            });
        }

        self.fund(*to, amount)?;

        debug!(
            to = %to,
            amount = %amount,
            pool = %committed.reserve_pool,
            "Reserve paid out"
        );

        Ok(())
    }

    fn publish(&mut self, batch: &JournalBatch) {
        for notification in &batch.entries {
            self.log.push(NotificationRecord::new(
                self.next_sequence,
                batch.operation_id,
                notification.clone(),
            ));
            self.next_sequence += 1;
        }
    }
}
