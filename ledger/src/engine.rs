//! Core ledger implementation.

use std::collections::HashMap;

use tracing::{debug, instrument};

use bondcurve_common::{checked_add, checked_sub, Address, Amount, ExchangeError, Notification, Result};

use crate::account::{Account, Allowance};
use crate::balance::{SupplyChange, SupplyChangeKind};
use crate::journal::JournalBatch;

/// The unit ledger: total supply, balances and allowances.
///
/// Every operation validates all of its preconditions and computes every
/// checked result before writing, so a rejected call leaves the ledger
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total units in existence.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an account (zero when unknown).
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Remaining amount `spender` may move out of `owner`'s account.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Accounts holding a non-zero balance, ordered by address.
    pub fn holders(&self) -> Vec<Account> {
        let mut holders: Vec<Account> = self
            .balances
            .iter()
            .filter(|(_, balance)| **balance > 0)
            .map(|(address, balance)| Account::new(*address, *balance))
            .collect();
        holders.sort_by_key(|a| a.address);
        holders
    }

    /// Non-zero allowances, ordered by owner then spender.
    pub fn allowances(&self) -> Vec<Allowance> {
        let mut allowances: Vec<Allowance> = self
            .allowances
            .iter()
            .filter(|(_, remaining)| **remaining > 0)
            .map(|((owner, spender), remaining)| Allowance {
                owner: *owner,
                spender: *spender,
                remaining: *remaining,
            })
            .collect();
        allowances.sort_by_key(|a| (a.owner, a.spender));
        allowances
    }

    /// Number of accounts holding a non-zero balance.
    pub fn account_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Create units for `to`.
    #[instrument(skip(self, journal), fields(to = %to))]
    pub fn mint(
        &mut self,
        to: Address,
        amount: Amount,
        journal: &mut JournalBatch,
    ) -> Result<SupplyChange> {
        if to.is_null() {
            return Err(ExchangeError::InvalidRecipient);
        }

        let balance_before = self.balance_of(&to);
        let balance_after = checked_add(balance_before, amount, "mint balance")?;
        let supply_before = self.total_supply;
        let supply_after = checked_add(supply_before, amount, "mint supply")?;

        self.total_supply = supply_after;
        self.balances.insert(to, balance_after);

        journal.push(Notification::Transfer {
            from: Address::NULL,
            to,
            amount,
        });

        debug!(amount = %amount, supply = %supply_after, "Minted units");

        Ok(SupplyChange {
            account: to,
            kind: SupplyChangeKind::Mint,
            amount,
            balance_before,
            balance_after,
            supply_before,
            supply_after,
        })
    }

    /// Destroy units held by `from`.
    #[instrument(skip(self, journal), fields(from = %from))]
    pub fn burn(
        &mut self,
        from: Address,
        amount: Amount,
        journal: &mut JournalBatch,
    ) -> Result<SupplyChange> {
        if from.is_null() {
            return Err(ExchangeError::InvalidSender);
        }

        let balance_before = self.balance_of(&from);
        if balance_before < amount {
            return Err(ExchangeError::InsufficientBalance {
                account: from,
                have: balance_before,
                need: amount,
            });
        }

        let balance_after = checked_sub(balance_before, amount, "burn balance")?;
        let supply_before = self.total_supply;
        let supply_after = checked_sub(supply_before, amount, "burn supply")?;

        self.total_supply = supply_after;
        self.balances.insert(from, balance_after);

        journal.push(Notification::Transfer {
            from,
            to: Address::NULL,
            amount,
        });

        debug!(amount = %amount, supply = %supply_after, "Burned units");

        Ok(SupplyChange {
            account: from,
            kind: SupplyChangeKind::Burn,
            amount,
            balance_before,
            balance_after,
            supply_before,
            supply_after,
        })
    }

    /// Undo a mint or burn recorded by [`Ledger::mint`] or [`Ledger::burn`].
    ///
    /// The caller is responsible for discarding the notification the original
    /// call pushed to its journal.
    pub fn revert(&mut self, change: &SupplyChange) -> Result<()> {
        let balance = self.balance_of(&change.account);

        let (balance, supply) = match change.kind {
            SupplyChangeKind::Mint => (
                checked_sub(balance, change.amount, "revert mint balance")?,
                checked_sub(self.total_supply, change.amount, "revert mint supply")?,
            ),
            SupplyChangeKind::Burn => (
                checked_add(balance, change.amount, "revert burn balance")?,
                checked_add(self.total_supply, change.amount, "revert burn supply")?,
            ),
        };

        self.total_supply = supply;
        self.balances.insert(change.account, balance);

        debug!(
            account = %change.account,
            kind = ?change.kind,
            amount = %change.amount,
            "Reverted supply change"
        );

        Ok(())
    }

    /// Move units from `caller` to `to`.
    #[instrument(skip(self, journal), fields(caller = %caller, to = %to))]
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
        journal: &mut JournalBatch,
    ) -> Result<bool> {
        if to.is_null() {
            return Err(ExchangeError::InvalidRecipient);
        }

        self.move_balance(caller, to, amount)?;

        journal.push(Notification::Transfer {
            from: caller,
            to,
            amount,
        });

        Ok(true)
    }

    /// Set `spender`'s allowance over `caller`'s balance.
    ///
    /// Overwrites any existing allowance; it does not add to it.
    #[instrument(skip(self, journal), fields(caller = %caller, spender = %spender))]
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
        journal: &mut JournalBatch,
    ) -> Result<bool> {
        self.allowances.insert((caller, spender), amount);

        journal.push(Notification::Approval {
            owner: caller,
            spender,
            amount,
        });

        debug!(amount = %amount, "Allowance set");

        Ok(true)
    }

    /// Move units out of `from` on its behalf, consuming `caller`'s allowance.
    #[instrument(skip(self, journal), fields(caller = %caller, from = %from, to = %to))]
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
        journal: &mut JournalBatch,
    ) -> Result<bool> {
        if to.is_null() {
            return Err(ExchangeError::InvalidRecipient);
        }

        let have = self.balance_of(&from);
        if have < amount {
            return Err(ExchangeError::InsufficientBalance {
                account: from,
                have,
                need: amount,
            });
        }

        let allowed = self.allowance(&from, &caller);
        if allowed < amount {
            return Err(ExchangeError::AllowanceExceeded {
                spender: caller,
                allowed,
                need: amount,
            });
        }

        let remaining = checked_sub(allowed, amount, "allowance")?;
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, caller), remaining);

        journal.push(Notification::Transfer { from, to, amount });

        Ok(true)
    }

    /// Check that balances sum to the total supply.
    pub fn verify_integrity(&self) -> bool {
        self.balances
            .values()
            .try_fold(0u128, |sum, balance| sum.checked_add(*balance))
            .map(|sum| sum == self.total_supply)
            .unwrap_or(false)
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        let from_balance = self.balance_of(&from);
        if from_balance < amount {
            return Err(ExchangeError::InsufficientBalance {
                account: from,
                have: from_balance,
                need: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let from_after = checked_sub(from_balance, amount, "transfer debit")?;
        let to_after = checked_add(self.balance_of(&to), amount, "transfer credit")?;

        self.balances.insert(from, from_after);
        self.balances.insert(to, to_after);

        debug!(from = %from, to = %to, amount = %amount, "Moved balance");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bondcurve_common::{units, OperationId};

    fn journal() -> JournalBatch {
        JournalBatch::new(OperationId::new())
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn carol() -> Address {
        Address::from_label("carol")
    }

    fn funded(amount: Amount) -> Ledger {
        let mut ledger = Ledger::new();
        ledger.mint(alice(), amount, &mut journal()).unwrap();
        ledger
    }

    #[test]
    fn test_mint_increases_supply_and_balance() {
        let mut ledger = Ledger::new();
        let mut batch = journal();

        let change = ledger.mint(alice(), units(5), &mut batch).unwrap();

        assert_eq!(ledger.total_supply(), units(5));
        assert_eq!(ledger.balance_of(&alice()), units(5));
        assert!(change.is_consistent());
        assert_eq!(
            batch.entries,
            vec![Notification::Transfer {
                from: Address::NULL,
                to: alice(),
                amount: units(5),
            }]
        );
    }

    #[test]
    fn test_mint_to_null_rejected() {
        let mut ledger = Ledger::new();
        let mut batch = journal();

        let result = ledger.mint(Address::NULL, 1, &mut batch);

        assert_eq!(result, Err(ExchangeError::InvalidRecipient));
        assert_eq!(ledger.total_supply(), 0);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_mint_overflow_is_atomic() {
        let mut ledger = funded(u128::MAX);

        let result = ledger.mint(bob(), 1, &mut journal());

        assert!(matches!(result, Err(ExchangeError::ArithmeticOverflow(_))));
        assert_eq!(ledger.balance_of(&bob()), 0);
        assert_eq!(ledger.total_supply(), u128::MAX);
    }

    #[test]
    fn test_burn() {
        let mut ledger = funded(units(5));
        let mut batch = journal();

        ledger.burn(alice(), units(2), &mut batch).unwrap();

        assert_eq!(ledger.total_supply(), units(3));
        assert_eq!(ledger.balance_of(&alice()), units(3));
        assert!(batch.entries[0].is_burn());
    }

    #[test]
    fn test_burn_rejections() {
        let mut ledger = funded(units(1));

        assert_eq!(
            ledger.burn(Address::NULL, 1, &mut journal()),
            Err(ExchangeError::InvalidSender)
        );
        assert!(matches!(
            ledger.burn(alice(), units(2), &mut journal()),
            Err(ExchangeError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of(&alice()), units(1));
    }

    #[test]
    fn test_revert_burn() {
        let mut ledger = funded(units(5));
        let change = ledger.burn(alice(), units(5), &mut journal()).unwrap();

        ledger.revert(&change).unwrap();

        assert_eq!(ledger.balance_of(&alice()), units(5));
        assert_eq!(ledger.total_supply(), units(5));
        assert!(ledger.verify_integrity());
    }

    #[test]
    fn test_transfer() {
        let mut ledger = funded(units(10));
        let mut batch = journal();

        assert!(ledger.transfer(alice(), bob(), units(4), &mut batch).unwrap());

        assert_eq!(ledger.balance_of(&alice()), units(6));
        assert_eq!(ledger.balance_of(&bob()), units(4));
        assert_eq!(ledger.total_supply(), units(10));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_transfer_rejections() {
        let mut ledger = funded(units(1));

        assert_eq!(
            ledger.transfer(alice(), Address::NULL, 1, &mut journal()),
            Err(ExchangeError::InvalidRecipient)
        );
        assert!(matches!(
            ledger.transfer(alice(), bob(), units(2), &mut journal()),
            Err(ExchangeError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.balance_of(&alice()), units(1));
        assert_eq!(ledger.balance_of(&bob()), 0);
    }

    #[test]
    fn test_self_transfer_keeps_balance() {
        let mut ledger = funded(units(3));
        let mut batch = journal();

        ledger.transfer(alice(), alice(), units(3), &mut batch).unwrap();

        assert_eq!(ledger.balance_of(&alice()), units(3));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_approve_overwrites() {
        let mut ledger = Ledger::new();

        ledger.approve(alice(), bob(), 100, &mut journal()).unwrap();
        ledger.approve(alice(), bob(), 30, &mut journal()).unwrap();

        assert_eq!(ledger.allowance(&alice(), &bob()), 30);
        assert_eq!(ledger.allowance(&bob(), &alice()), 0);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut ledger = funded(units(10));
        ledger.approve(alice(), bob(), units(4), &mut journal()).unwrap();

        let mut batch = journal();
        ledger
            .transfer_from(bob(), alice(), carol(), units(3), &mut batch)
            .unwrap();

        assert_eq!(ledger.balance_of(&alice()), units(7));
        assert_eq!(ledger.balance_of(&carol()), units(3));
        assert_eq!(ledger.allowance(&alice(), &bob()), units(1));
        assert_eq!(
            batch.entries,
            vec![Notification::Transfer {
                from: alice(),
                to: carol(),
                amount: units(3),
            }]
        );
    }

    #[test]
    fn test_transfer_from_without_approval() {
        let mut ledger = funded(units(10));

        let result = ledger.transfer_from(bob(), alice(), carol(), 1, &mut journal());

        assert!(matches!(result, Err(ExchangeError::AllowanceExceeded { .. })));
        assert_eq!(ledger.balance_of(&alice()), units(10));
    }

    #[test]
    fn test_transfer_from_check_order() {
        let mut ledger = funded(units(1));

        // Null recipient is reported before balance and allowance.
        assert_eq!(
            ledger.transfer_from(bob(), alice(), Address::NULL, units(5), &mut journal()),
            Err(ExchangeError::InvalidRecipient)
        );
        // Balance is reported before allowance.
        assert!(matches!(
            ledger.transfer_from(bob(), alice(), carol(), units(5), &mut journal()),
            Err(ExchangeError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn test_holders_and_integrity() {
        let mut ledger = funded(units(10));
        ledger.transfer(alice(), bob(), units(10), &mut journal()).unwrap();

        let holders = ledger.holders();
        assert_eq!(holders, vec![Account::new(bob(), units(10))]);
        assert_eq!(ledger.account_count(), 1);
        assert!(ledger.verify_integrity());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Mint(usize, u64),
            Burn(usize, u64),
            Transfer(usize, usize, u64),
            Approve(usize, usize, u64),
            TransferFrom(usize, usize, usize, u64),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..4usize, any::<u64>()).prop_map(|(a, n)| Op::Mint(a, n)),
                (0..4usize, any::<u64>()).prop_map(|(a, n)| Op::Burn(a, n)),
                (0..4usize, 0..4usize, any::<u64>()).prop_map(|(a, b, n)| Op::Transfer(a, b, n)),
                (0..4usize, 0..4usize, any::<u64>()).prop_map(|(a, b, n)| Op::Approve(a, b, n)),
                (0..4usize, 0..4usize, 0..4usize, any::<u64>())
                    .prop_map(|(a, b, c, n)| Op::TransferFrom(a, b, c, n)),
            ]
        }

        proptest! {
            #[test]
            fn balances_always_sum_to_supply(ops in prop::collection::vec(op(), 1..64)) {
                let people = [alice(), bob(), carol(), Address::NULL];
                let mut ledger = Ledger::new();

                for op in ops {
                    let mut batch = journal();
                    let before = ledger.clone();
                    let result = match op {
                        Op::Mint(a, n) => ledger.mint(people[a], n as Amount, &mut batch).map(|_| ()),
                        Op::Burn(a, n) => ledger.burn(people[a], n as Amount, &mut batch).map(|_| ()),
                        Op::Transfer(a, b, n) => {
                            ledger.transfer(people[a], people[b], n as Amount, &mut batch).map(|_| ())
                        }
                        Op::Approve(a, b, n) => {
                            ledger.approve(people[a], people[b], n as Amount, &mut batch).map(|_| ())
                        }
                        Op::TransferFrom(a, b, c, n) => ledger
                            .transfer_from(people[a], people[b], people[c], n as Amount, &mut batch)
                            .map(|_| ()),
                    };

                    if result.is_err() {
                        prop_assert_eq!(ledger.total_supply(), before.total_supply());
                        prop_assert_eq!(ledger.holders(), before.holders());
                        prop_assert_eq!(ledger.allowances(), before.allowances());
                        prop_assert!(batch.is_empty());
                    }
                    prop_assert!(ledger.verify_integrity());
                    prop_assert_eq!(ledger.balance_of(&Address::NULL), 0);
                }
            }
        }
    }
}
