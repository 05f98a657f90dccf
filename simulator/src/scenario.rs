//! Simulation scenarios.
//!
//! Amounts are human decimals (`"0.001"`), parsed with 18 fractional digits.
//! Traders are referred to by name; any name resolves to an identity.

use serde::{Deserialize, Serialize};

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Needs the seed-mint backdoor.
    pub requires_seed_mint: bool,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Credit reserve currency to a trader's wallet.
    Fund { trader: String, amount: String },
    /// Buy with reserve taken from the trader's wallet.
    Buy { trader: String, reserve: String },
    /// Sell the trader's whole balance.
    SellAll { trader: String },
    /// Direct transfer.
    Transfer { from: String, to: String, amount: String },
    /// Set an allowance.
    Approve { owner: String, spender: String, amount: String },
    /// Delegated transfer.
    TransferFrom {
        spender: String,
        from: String,
        to: String,
        amount: String,
    },
    /// Seed mint to a trader.
    SeedMint { trader: String },
    /// Send reserve with no instruction.
    Deposit { trader: String, amount: String },
    /// Make a trader refuse payouts.
    RefusePayments { trader: String },
    /// Let a trader receive payouts again.
    AcceptPayments { trader: String },
    /// Assert a condition.
    Assert { condition: AssertCondition },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssertCondition {
    /// The previous operation committed.
    LastSucceeded,
    /// The previous operation was rejected with this error code.
    LastRejected { code: String },
    /// Unit balance equals.
    BalanceEquals { trader: String, amount: String },
    /// Current price equals.
    PriceEquals { amount: String },
    /// Reserve pool equals.
    PoolEquals { amount: String },
    /// Balances sum to the total supply.
    Integrity,
}

fn s(value: &str) -> String {
    value.to_string()
}

fn buy(trader: &str, reserve: &str) -> ScenarioStep {
    ScenarioStep::Buy {
        trader: s(trader),
        reserve: s(reserve),
    }
}

fn sell_all(trader: &str) -> ScenarioStep {
    ScenarioStep::SellAll { trader: s(trader) }
}

fn fund(trader: &str, amount: &str) -> ScenarioStep {
    ScenarioStep::Fund {
        trader: s(trader),
        amount: s(amount),
    }
}

fn assert(condition: AssertCondition) -> ScenarioStep {
    ScenarioStep::Assert { condition }
}

fn rejected(code: &str) -> ScenarioStep {
    assert(AssertCondition::LastRejected { code: s(code) })
}

fn balance(trader: &str, amount: &str) -> ScenarioStep {
    assert(AssertCondition::BalanceEquals {
        trader: s(trader),
        amount: s(amount),
    })
}

impl Scenario {
    /// Names accepted by [`Scenario::load`].
    pub const NAMES: [&'static str; 5] = [
        "curve-walk",
        "round-trip",
        "allowance",
        "bank-run",
        "seed-mint-drain",
    ];

    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "curve-walk" => Ok(Self::curve_walk()),
            "round-trip" => Ok(Self::round_trip()),
            "allowance" => Ok(Self::allowance()),
            "bank-run" => Ok(Self::bank_run()),
            "seed-mint-drain" => Ok(Self::seed_mint_drain()),
            _ => Err(anyhow::anyhow!(
                "Unknown scenario: {} (expected one of {})",
                name,
                Self::NAMES.join(", ")
            )),
        }
    }

    /// First buys against an empty market.
    fn curve_walk() -> Self {
        Self {
            name: s("curve-walk"),
            description: s("Price starts at the base and rises with every buy"),
            requires_seed_mint: false,
            steps: vec![
                fund("alice", "10"),
                assert(AssertCondition::PriceEquals { amount: s("0.001") }),
                buy("alice", "0.001"),
                assert(AssertCondition::LastSucceeded),
                balance("alice", "1"),
                assert(AssertCondition::PriceEquals {
                    amount: s("0.001000001"),
                }),
                buy("alice", "0"),
                rejected("ZERO_PAYMENT"),
                buy("alice", "0.000000000000000001"),
                assert(AssertCondition::LastSucceeded),
                buy("alice", "1"),
                assert(AssertCondition::LastSucceeded),
                assert(AssertCondition::Integrity),
            ],
        }
    }

    /// Buy then sell back at the moved price.
    fn round_trip() -> Self {
        Self {
            name: s("round-trip"),
            description: s("A seller is owed more than was paid in once the price has moved"),
            requires_seed_mint: false,
            steps: vec![
                fund("alice", "10"),
                fund("bob", "10"),
                buy("alice", "1"),
                assert(AssertCondition::PoolEquals { amount: s("1") }),
                sell_all("alice"),
                rejected("RESERVE_INSUFFICIENT"),
                ScenarioStep::Deposit {
                    trader: s("bob"),
                    amount: s("1"),
                },
                assert(AssertCondition::PoolEquals { amount: s("2") }),
                ScenarioStep::RefusePayments { trader: s("alice") },
                sell_all("alice"),
                rejected("TRANSFER_FAILED"),
                balance("alice", "1000"),
                ScenarioStep::AcceptPayments { trader: s("alice") },
                sell_all("alice"),
                assert(AssertCondition::LastSucceeded),
                balance("alice", "0"),
                sell_all("alice"),
                rejected("NO_HOLDINGS"),
                assert(AssertCondition::Integrity),
            ],
        }
    }

    /// Allowances and delegated transfers.
    fn allowance() -> Self {
        Self {
            name: s("allowance"),
            description: s("Delegated transfers consume allowances; approve overwrites"),
            requires_seed_mint: false,
            steps: vec![
                fund("alice", "1"),
                buy("alice", "0.001"),
                ScenarioStep::TransferFrom {
                    spender: s("bob"),
                    from: s("alice"),
                    to: s("carol"),
                    amount: s("0.1"),
                },
                rejected("ALLOWANCE_EXCEEDED"),
                ScenarioStep::Approve {
                    owner: s("alice"),
                    spender: s("bob"),
                    amount: s("0.5"),
                },
                ScenarioStep::Approve {
                    owner: s("alice"),
                    spender: s("bob"),
                    amount: s("0.25"),
                },
                ScenarioStep::TransferFrom {
                    spender: s("bob"),
                    from: s("alice"),
                    to: s("carol"),
                    amount: s("0.25"),
                },
                assert(AssertCondition::LastSucceeded),
                balance("carol", "0.25"),
                balance("alice", "0.75"),
                ScenarioStep::TransferFrom {
                    spender: s("bob"),
                    from: s("alice"),
                    to: s("carol"),
                    amount: s("0.000000000000000001"),
                },
                rejected("ALLOWANCE_EXCEEDED"),
                ScenarioStep::Transfer {
                    from: s("carol"),
                    to: s("alice"),
                    amount: s("1"),
                },
                rejected("INSUFFICIENT_BALANCE"),
                assert(AssertCondition::Integrity),
            ],
        }
    }

    /// Everyone sells; the last seller finds the pool short.
    fn bank_run() -> Self {
        Self {
            name: s("bank-run"),
            description: s("Sales price above what buyers paid, so the last seller is blocked"),
            requires_seed_mint: false,
            steps: vec![
                fund("alice", "1"),
                fund("bob", "1"),
                fund("carol", "1"),
                buy("alice", "0.01"),
                buy("bob", "0.01"),
                buy("carol", "0.01"),
                sell_all("alice"),
                assert(AssertCondition::LastSucceeded),
                sell_all("bob"),
                assert(AssertCondition::LastSucceeded),
                sell_all("carol"),
                rejected("RESERVE_INSUFFICIENT"),
                assert(AssertCondition::Integrity),
            ],
        }
    }

    /// Unbacked units redeemed against other buyers' reserve.
    fn seed_mint_drain() -> Self {
        Self {
            name: s("seed-mint-drain"),
            description: s("Seed-minted units sell against reserve paid in by others"),
            requires_seed_mint: true,
            steps: vec![
                fund("bob", "5"),
                buy("bob", "2"),
                ScenarioStep::SeedMint { trader: s("alice") },
                assert(AssertCondition::LastSucceeded),
                balance("alice", "1000"),
                sell_all("alice"),
                assert(AssertCondition::LastSucceeded),
                sell_all("bob"),
                rejected("RESERVE_INSUFFICIENT"),
                assert(AssertCondition::Integrity),
            ],
        }
    }
}
