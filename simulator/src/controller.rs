//! Simulation controller.

use anyhow::{bail, Context};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use bondcurve_common::{format_units, parse_units, units, Address, Amount, ExchangeError};
use bondcurve_exchange::{Exchange, ExchangeConfig, MetricsSnapshot, WalletHost};

use crate::metrics::{OpKind, Outcome, SimulationMetrics, WALLET_INSUFFICIENT};
use crate::scenario::{AssertCondition, Scenario, ScenarioStep};
use crate::trader::{Trader, TraderFactory};

/// Reserve every trader starts with in random mode.
const INITIAL_WALLET_UNITS: u64 = 10;

/// Final state of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub price: String,
    pub reserve_pool: String,
    pub total_supply: String,
    pub cumulative_volume: String,
    pub holders: usize,
    pub integrity: bool,
    pub simulation: SimulationMetrics,
    pub exchange: MetricsSnapshot,
}

/// Controls the simulation.
pub struct SimulationController {
    /// Exchange under test.
    exchange: Exchange<WalletHost>,
    /// Simulated traders.
    traders: Vec<Trader>,
    /// Random number generator.
    rng: StdRng,
    /// Simulation metrics.
    metrics: SimulationMetrics,
    /// Print notifications as JSON lines.
    print_events: bool,
    /// Reserve that entered the system through funding.
    funded_total: Amount,
    /// Outcome of the most recent operation.
    last_outcome: Option<Outcome>,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(
        config: ExchangeConfig,
        trader_count: usize,
        seed: Option<u64>,
        print_events: bool,
    ) -> anyhow::Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let exchange = Exchange::new(config, WalletHost::new()).context("creating exchange")?;

        Ok(Self {
            exchange,
            traders: TraderFactory::create_traders(trader_count),
            rng,
            metrics: SimulationMetrics::new(),
            print_events,
            funded_total: 0,
            last_outcome: None,
        })
    }

    /// Run a scenario, failing on the first unmet assertion.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<()> {
        info!(
            scenario = %scenario.name,
            steps = scenario.steps.len(),
            "Running scenario: {}",
            scenario.description
        );

        for (index, step) in scenario.steps.iter().enumerate() {
            self.execute_step(step)
                .await
                .with_context(|| format!("step {} ({:?})", index + 1, step))?;
            self.flush_events().await?;
        }

        self.check_reserve_conservation().await
    }

    /// Run seeded random trading, then sell everyone out.
    pub async fn run_random(&mut self, rounds: usize) -> anyhow::Result<()> {
        if self.traders.is_empty() {
            bail!("random mode needs at least one trader");
        }

        info!(traders = self.traders.len(), rounds, "Running random simulation");

        for trader in self.traders.clone() {
            self.fund(trader.address, units(INITIAL_WALLET_UNITS)).await?;
        }

        for round in 0..rounds {
            self.random_action().await?;
            self.flush_events().await?;

            if !self.exchange.verify_integrity().await {
                bail!("ledger integrity violated after round {}", round + 1);
            }
        }

        self.sell_everyone_out().await?;
        self.check_reserve_conservation().await
    }

    /// Build the final report.
    pub async fn report(&self) -> anyhow::Result<SimulationReport> {
        let snapshot = self.exchange.snapshot().await?;

        Ok(SimulationReport {
            price: format_units(snapshot.price),
            reserve_pool: format_units(snapshot.reserve_pool),
            total_supply: format_units(snapshot.total_supply),
            cumulative_volume: format_units(snapshot.cumulative_volume),
            holders: snapshot.holders,
            integrity: self.exchange.verify_integrity().await,
            simulation: self.metrics.clone(),
            exchange: self.exchange.metrics().snapshot(),
        })
    }

    /// Prometheus text for the exchange counters.
    pub fn prometheus(&self) -> String {
        self.exchange.metrics().to_prometheus()
    }

    // --- Private methods ---

    async fn execute_step(&mut self, step: &ScenarioStep) -> anyhow::Result<()> {
        match step {
            ScenarioStep::Fund { trader, amount } => {
                self.fund(Address::from_label(trader), parse_units(amount)?)
                    .await?;
            }
            ScenarioStep::Buy { trader, reserve } => {
                self.buy(Address::from_label(trader), parse_units(reserve)?)
                    .await;
            }
            ScenarioStep::SellAll { trader } => {
                self.sell_all(Address::from_label(trader)).await;
            }
            ScenarioStep::Transfer { from, to, amount } => {
                let result = self
                    .exchange
                    .transfer(
                        Address::from_label(from),
                        Address::from_label(to),
                        parse_units(amount)?,
                    )
                    .await;
                self.track(OpKind::Transfer, result);
            }
            ScenarioStep::Approve {
                owner,
                spender,
                amount,
            } => {
                let result = self
                    .exchange
                    .approve(
                        Address::from_label(owner),
                        Address::from_label(spender),
                        parse_units(amount)?,
                    )
                    .await;
                self.track(OpKind::Approve, result);
            }
            ScenarioStep::TransferFrom {
                spender,
                from,
                to,
                amount,
            } => {
                let result = self
                    .exchange
                    .transfer_from(
                        Address::from_label(spender),
                        Address::from_label(from),
                        Address::from_label(to),
                        parse_units(amount)?,
                    )
                    .await;
                self.track(OpKind::TransferFrom, result);
            }
            ScenarioStep::SeedMint { trader } => {
                let result = self.exchange.seed_mint(Address::from_label(trader)).await;
                self.track(OpKind::SeedMint, result);
            }
            ScenarioStep::Deposit { trader, amount } => {
                self.deposit(Address::from_label(trader), parse_units(amount)?)
                    .await;
            }
            ScenarioStep::RefusePayments { trader } => {
                let account = Address::from_label(trader);
                self.exchange
                    .with_host(|h| h.refuse_payments_to(account))
                    .await;
            }
            ScenarioStep::AcceptPayments { trader } => {
                let account = Address::from_label(trader);
                self.exchange
                    .with_host(|h| h.accept_payments_to(&account))
                    .await;
            }
            ScenarioStep::Assert { condition } => {
                self.check(condition).await?;
            }
        }

        Ok(())
    }

    async fn check(&self, condition: &AssertCondition) -> anyhow::Result<()> {
        match condition {
            AssertCondition::LastSucceeded => match &self.last_outcome {
                Some(Ok(())) => {}
                Some(Err(got)) => bail!("expected success, got {}", got),
                None => bail!("no operation has run yet"),
            },
            AssertCondition::LastRejected { code } => match &self.last_outcome {
                Some(Err(got)) if got == code => {}
                Some(Err(got)) => bail!("expected {}, got {}", code, got),
                Some(Ok(())) => bail!("expected {}, operation succeeded", code),
                None => bail!("no operation has run yet"),
            },
            AssertCondition::BalanceEquals { trader, amount } => {
                let expected = parse_units(amount)?;
                let actual = self.exchange.balance_of(&Address::from_label(trader)).await;
                if actual != expected {
                    bail!(
                        "{} holds {}, expected {}",
                        trader,
                        format_units(actual),
                        amount
                    );
                }
            }
            AssertCondition::PriceEquals { amount } => {
                let expected = parse_units(amount)?;
                let actual = self.exchange.current_price_per_token().await?;
                if actual != expected {
                    bail!("price is {}, expected {}", format_units(actual), amount);
                }
            }
            AssertCondition::PoolEquals { amount } => {
                let expected = parse_units(amount)?;
                let actual = self.exchange.reserve_pool().await;
                if actual != expected {
                    bail!("pool is {}, expected {}", format_units(actual), amount);
                }
            }
            AssertCondition::Integrity => {
                if !self.exchange.verify_integrity().await {
                    bail!("balances do not sum to total supply");
                }
            }
        }

        debug!(?condition, "Assertion held");
        Ok(())
    }

    async fn random_action(&mut self) -> anyhow::Result<()> {
        let index = self.rng.gen_range(0..self.traders.len());
        let trader = self.traders[index].address;
        let roll = self.rng.gen_range(0..100u32);
        debug!(trader = %self.traders[index].name, roll, "Random action");

        match roll {
            0..=54 => {
                // Between 0.0001 and 0.1 reserve, with the odd dust payment.
                let reserve = if self.rng.gen_bool(0.05) {
                    self.rng.gen_range(0..1_000)
                } else {
                    self.rng.gen_range(units(1) / 10_000..=units(1) / 10)
                };
                self.buy(trader, reserve).await;
            }
            55..=79 => {
                self.sell_all(trader).await;
            }
            80..=94 => {
                let to = self.traders[self.rng.gen_range(0..self.traders.len())].address;
                let held = self.exchange.balance_of(&trader).await;
                let amount = if held == 0 {
                    1
                } else {
                    self.rng.gen_range(0..=held)
                };
                let result = self.exchange.transfer(trader, to, amount).await;
                self.track(OpKind::Transfer, result);
            }
            _ => {
                let amount = self.rng.gen_range(0..units(1) / 100);
                self.deposit(trader, amount).await;
            }
        }

        Ok(())
    }

    async fn sell_everyone_out(&mut self) -> anyhow::Result<()> {
        for trader in self.traders.clone() {
            if self.exchange.balance_of(&trader.address).await > 0 {
                self.sell_all(trader.address).await;
            }
        }
        self.flush_events().await?;

        let supply = self.exchange.total_supply().await;
        if supply > 0 {
            warn!(
                remaining_supply = %format_units(supply),
                "Pool could not pay out every holder"
            );
        }

        Ok(())
    }

    async fn fund(&mut self, account: Address, amount: Amount) -> anyhow::Result<()> {
        self.exchange
            .with_host(|h| h.fund(account, amount))
            .await
            .context("funding wallet")?;
        self.funded_total = self
            .funded_total
            .checked_add(amount)
            .context("funding total overflowed")?;
        Ok(())
    }

    async fn buy(&mut self, trader: Address, reserve: Amount) {
        if !self.attach(OpKind::Buy, trader, reserve).await {
            return;
        }
        let result = self.exchange.buy(trader, reserve).await;
        if result.is_err() {
            self.refund(trader, reserve).await;
        }
        let result = result.map(|receipt| debug!("{}", receipt.summary()));
        self.track(OpKind::Buy, result);
    }

    async fn sell_all(&mut self, trader: Address) {
        let result = self
            .exchange
            .sell_all(trader)
            .await
            .map(|receipt| debug!("{}", receipt.summary()));
        self.track(OpKind::SellAll, result);
    }

    async fn deposit(&mut self, trader: Address, amount: Amount) {
        if !self.attach(OpKind::Deposit, trader, amount).await {
            return;
        }
        let result = self.exchange.deposit(trader, amount).await;
        if result.is_err() {
            self.refund(trader, amount).await;
        }
        self.track(OpKind::Deposit, result);
    }

    /// Take reserve out of the caller's wallet to attach to a call.
    ///
    /// A shortfall is recorded against `kind` and the call is skipped.
    async fn attach(&mut self, kind: OpKind, trader: Address, amount: Amount) -> bool {
        match self.exchange.with_host(|h| h.debit(trader, amount)).await {
            Ok(_) => true,
            Err(err) => {
                debug!(op = %kind, trader = %trader, error = %err, "Wallet cannot cover payment");
                self.finish(kind, Err(WALLET_INSUFFICIENT));
                false
            }
        }
    }

    /// Return attached reserve after a rejected call.
    async fn refund(&self, trader: Address, amount: Amount) {
        if let Err(err) = self.exchange.with_host(|h| h.fund(trader, amount)).await {
            warn!(trader = %trader, error = %err, "Refund failed");
        }
    }

    fn track<T>(&mut self, kind: OpKind, result: Result<T, ExchangeError>) {
        let outcome = result.map(|_| ()).map_err(|err| err.error_code());
        if let Err(code) = outcome {
            debug!(op = %kind, error_code = code, "Operation rejected");
        }
        self.finish(kind, outcome);
    }

    fn finish(&mut self, kind: OpKind, outcome: Outcome) {
        self.metrics.record(kind, &outcome);
        self.last_outcome = Some(outcome);
    }

    async fn flush_events(&self) -> anyhow::Result<()> {
        let records = self.exchange.with_host(|h| h.drain_notifications()).await;
        if self.print_events {
            for record in records {
                println!("{}", record.to_json()?);
            }
        }
        Ok(())
    }

    /// Reserve can only move between wallets and the pool.
    async fn check_reserve_conservation(&self) -> anyhow::Result<()> {
        let in_wallets = self.exchange.with_host(|h| h.total_in_wallets()).await;
        let pool = self.exchange.reserve_pool().await;

        if in_wallets.checked_add(pool) != Some(self.funded_total) {
            bail!(
                "reserve not conserved: wallets {} + pool {} != funded {}",
                format_units(in_wallets),
                format_units(pool),
                format_units(self.funded_total)
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(seed_mint: bool) -> SimulationController {
        let config = ExchangeConfig {
            seed_mint_enabled: seed_mint,
            ..ExchangeConfig::default()
        };
        SimulationController::new(config, 4, Some(7), false).unwrap()
    }

    #[tokio::test]
    async fn test_named_scenarios_pass() {
        for name in Scenario::NAMES {
            let scenario = Scenario::load(name).unwrap();
            let mut controller = controller(scenario.requires_seed_mint);

            controller.run_scenario(&scenario).await.unwrap();

            let report = controller.report().await.unwrap();
            assert!(report.integrity, "{}", name);
        }
    }

    #[tokio::test]
    async fn test_seed_mint_scenario_fails_when_disabled() {
        let scenario = Scenario::load("seed-mint-drain").unwrap();
        let mut controller = controller(false);

        assert!(controller.run_scenario(&scenario).await.is_err());
    }

    #[tokio::test]
    async fn test_random_run_keeps_invariants() {
        let mut controller = controller(false);

        controller.run_random(200).await.unwrap();

        let report = controller.report().await.unwrap();
        assert!(report.integrity);
        let sim = &report.simulation;
        assert_eq!(
            sim.total_operations,
            sim.successful_operations + sim.failed_operations
        );
        assert!(sim.total_operations >= 200);
        assert!(report.exchange.buys > 0);
    }

    #[tokio::test]
    async fn test_failed_buy_refunds_wallet() {
        let mut controller = controller(false);
        let alice = Address::from_label("alice");
        controller.fund(alice, 100).await.unwrap();

        controller.buy(alice, 0).await;
        controller.buy(alice, 101).await;

        assert_eq!(
            controller.exchange.with_host(|h| h.wallet_of(&alice)).await,
            100
        );
        assert_eq!(controller.metrics.rejections_for("ZERO_PAYMENT"), 1);
        assert_eq!(controller.metrics.rejections_for(WALLET_INSUFFICIENT), 1);
        assert_eq!(controller.metrics.rejections_for("TRANSFER_FAILED"), 0);
        assert_eq!(controller.exchange.metrics().snapshot().buys, 0);
        controller.check_reserve_conservation().await.unwrap();
    }
}
