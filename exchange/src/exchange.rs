//! Core exchange implementation.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use bondcurve_common::{units, Address, Amount, ExchangeError, OperationId, Result};
use bondcurve_ledger::{Account, Allowance, JournalBatch, Ledger};
use bondcurve_pricing::{MarketSnapshot, MarketState, PricingEngine, ReserveHost, TradeReceipt};

use crate::config::ExchangeConfig;
use crate::metrics::{ExchangeMetrics, SharedMetrics};

/// Whole units minted by one seed mint.
pub const SEED_MINT_UNITS: u64 = 1000;

/// Everything a call needs exclusive access to.
struct Market<H> {
    state: MarketState,
    host: H,
}

/// The exchange service.
///
/// One mutex serializes every call, so each operation observes the state left
/// by the previous one and nothing else.
pub struct Exchange<H: ReserveHost> {
    config: ExchangeConfig,
    engine: PricingEngine,
    market: Mutex<Market<H>>,
    metrics: SharedMetrics,
}

impl<H: ReserveHost> Exchange<H> {
    /// Create an exchange with empty state.
    pub fn new(config: ExchangeConfig, host: H) -> Result<Self> {
        config.validate()?;
        let engine = PricingEngine::new(config.curve.build()?);

        info!(
            name = %config.token.name,
            symbol = %config.token.symbol,
            base_price = %engine.curve().base_price(),
            slope_denominator = %engine.curve().slope_denominator(),
            seed_mint = config.seed_mint_enabled,
            host = host.name(),
            "Exchange created"
        );

        Ok(Self {
            config,
            engine,
            market: Mutex::new(Market {
                state: MarketState::new(),
                host,
            }),
            metrics: Arc::new(ExchangeMetrics::new()),
        })
    }

    // --- Stateful operations ---

    /// Buy units with `reserve_attached`.
    pub async fn buy(&self, caller: Address, reserve_attached: Amount) -> Result<TradeReceipt> {
        let mut guard = self.market.lock().await;
        let Market { state, host } = &mut *guard;
        let result = self.engine.buy(state, host, caller, reserve_attached);
        self.record(result, ExchangeMetrics::buy)
    }

    /// Sell the caller's whole balance.
    pub async fn sell_all(&self, caller: Address) -> Result<TradeReceipt> {
        let mut guard = self.market.lock().await;
        let Market { state, host } = &mut *guard;
        let result = self.engine.sell_all(state, host, caller);
        self.record(result, ExchangeMetrics::sell)
    }

    /// Move units from the caller to `to`.
    pub async fn transfer(&self, caller: Address, to: Address, amount: Amount) -> Result<bool> {
        self.with_ledger(ExchangeMetrics::transfer, |ledger, batch| {
            ledger.transfer(caller, to, amount, batch)
        })
        .await
    }

    /// Set `spender`'s allowance over the caller's units.
    pub async fn approve(&self, caller: Address, spender: Address, amount: Amount) -> Result<bool> {
        self.with_ledger(ExchangeMetrics::approval, |ledger, batch| {
            ledger.approve(caller, spender, amount, batch)
        })
        .await
    }

    /// Move units out of `from` using the caller's allowance.
    pub async fn transfer_from(
        &self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool> {
        self.with_ledger(ExchangeMetrics::transfer, |ledger, batch| {
            ledger.transfer_from(caller, from, to, amount, batch)
        })
        .await
    }

    /// Mint a fixed block of units to the caller without payment.
    ///
    /// Test-mode only. Leaves cumulative volume and the reserve pool alone,
    /// so the minted units are unbacked.
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn seed_mint(&self, caller: Address) -> Result<Amount> {
        if !self.config.seed_mint_enabled {
            let err = ExchangeError::SeedMintDisabled;
            warn!(error_code = err.error_code(), "Seed mint rejected");
            self.metrics.rejected(&err);
            return Err(err);
        }

        let amount = units(SEED_MINT_UNITS);
        self.with_ledger(ExchangeMetrics::seed_mint, |ledger, batch| {
            ledger.mint(caller, amount, batch).map(|_| amount)
        })
        .await
    }

    /// Accept reserve currency sent with no instruction.
    pub async fn deposit(&self, sender: Address, amount: Amount) -> Result<Amount> {
        let mut guard = self.market.lock().await;
        let result = self.engine.deposit(&mut guard.state, sender, amount);
        self.record(result, ExchangeMetrics::deposit)
    }

    // --- Readers ---

    /// Current price per whole unit.
    pub async fn current_price_per_token(&self) -> Result<Amount> {
        let guard = self.market.lock().await;
        self.engine.current_price(&guard.state)
    }

    /// Units that `reserve` would buy right now.
    pub async fn quote_tokens_for_wei(&self, reserve: Amount) -> Result<Amount> {
        let guard = self.market.lock().await;
        self.engine.quote_units_for_reserve(&guard.state, reserve)
    }

    /// Reserve that selling `amount` units would pay right now.
    pub async fn quote_wei_for_tokens(&self, amount: Amount) -> Result<Amount> {
        let guard = self.market.lock().await;
        self.engine.quote_reserve_for_units(&guard.state, amount)
    }

    pub async fn balance_of(&self, account: &Address) -> Amount {
        self.market.lock().await.state.ledger.balance_of(account)
    }

    pub async fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.market.lock().await.state.ledger.allowance(owner, spender)
    }

    pub async fn total_supply(&self) -> Amount {
        self.market.lock().await.state.ledger.total_supply()
    }

    pub async fn reserve_pool(&self) -> Amount {
        self.market.lock().await.state.reserve_pool
    }

    pub async fn cumulative_volume(&self) -> Amount {
        self.market.lock().await.state.cumulative_volume
    }

    /// Non-zero holders sorted by identity.
    pub async fn holders(&self) -> Vec<Account> {
        self.market.lock().await.state.ledger.holders()
    }

    /// Recorded allowances.
    pub async fn allowances(&self) -> Vec<Allowance> {
        self.market.lock().await.state.ledger.allowances()
    }

    /// Point-in-time market summary.
    pub async fn snapshot(&self) -> Result<MarketSnapshot> {
        let guard = self.market.lock().await;
        let price = self.engine.current_price(&guard.state)?;
        Ok(guard.state.snapshot(price))
    }

    /// Check that balances sum to the total supply.
    pub async fn verify_integrity(&self) -> bool {
        self.market.lock().await.state.ledger.verify_integrity()
    }

    pub fn name(&self) -> &str {
        &self.config.token.name
    }

    pub fn symbol(&self) -> &str {
        &self.config.token.symbol
    }

    pub fn decimals(&self) -> u32 {
        self.config.token.decimals
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Run `f` against the host while holding the exchange lock.
    pub async fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        let mut guard = self.market.lock().await;
        f(&mut guard.host)
    }

    // --- Private methods ---

    async fn with_ledger<T>(
        &self,
        committed: fn(&ExchangeMetrics),
        op: impl FnOnce(&mut Ledger, &mut JournalBatch) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.market.lock().await;
        let Market { state, host } = &mut *guard;

        let mut batch = JournalBatch::new(OperationId::new());
        let result = op(&mut state.ledger, &mut batch);
        if result.is_ok() {
            host.publish(&batch);
        }

        self.record(result, committed)
    }

    fn record<T>(&self, result: Result<T>, committed: fn(&ExchangeMetrics)) -> Result<T> {
        match result {
            Ok(value) => {
                committed(&self.metrics);
                Ok(value)
            }
            Err(err) => {
                warn!(error_code = err.error_code(), error = %err, "Operation rejected");
                self.metrics.rejected(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::WalletHost;
    use bondcurve_common::{Notification, UNIT};
    use bondcurve_pricing::{RecordingHost, DEFAULT_BASE_PRICE};

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    fn carol() -> Address {
        Address::from_label("carol")
    }

    fn create_exchange() -> Exchange<RecordingHost> {
        Exchange::new(ExchangeConfig::default(), RecordingHost::new()).unwrap()
    }

    fn create_test_mode_exchange() -> Exchange<RecordingHost> {
        let config = ExchangeConfig {
            seed_mint_enabled: true,
            ..ExchangeConfig::default()
        };
        Exchange::new(config, RecordingHost::new()).unwrap()
    }

    #[tokio::test]
    async fn test_exchange_creation() {
        let exchange = create_exchange();

        assert_eq!(exchange.name(), "Bonding Curve Unit");
        assert_eq!(exchange.symbol(), "BCU");
        assert_eq!(exchange.decimals(), 18);
        assert_eq!(exchange.total_supply().await, 0);
        assert_eq!(exchange.cumulative_volume().await, 0);
        assert_eq!(
            exchange.current_price_per_token().await.unwrap(),
            DEFAULT_BASE_PRICE
        );
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = ExchangeConfig::default();
        config.curve.base_price = 0;

        assert!(matches!(
            Exchange::new(config, RecordingHost::new()),
            Err(ExchangeError::ConfigurationError(_))
        ));
    }

    #[tokio::test]
    async fn test_buy_scenario() {
        let exchange = create_exchange();

        let receipt = exchange.buy(alice(), DEFAULT_BASE_PRICE).await.unwrap();

        assert_eq!(receipt.units, UNIT);
        assert_eq!(exchange.balance_of(&alice()).await, UNIT);
        assert_eq!(exchange.cumulative_volume().await, UNIT);
        assert_eq!(exchange.reserve_pool().await, DEFAULT_BASE_PRICE);
        assert_eq!(
            exchange.current_price_per_token().await.unwrap(),
            DEFAULT_BASE_PRICE + 1_000_000_000
        );
        assert_eq!(exchange.metrics().snapshot().buys, 1);
    }

    #[tokio::test]
    async fn test_transfer_from_without_approval() {
        let exchange = create_exchange();
        exchange.buy(alice(), DEFAULT_BASE_PRICE).await.unwrap();

        let result = exchange.transfer_from(bob(), alice(), carol(), 1).await;

        assert!(matches!(
            result,
            Err(ExchangeError::AllowanceExceeded { allowed: 0, need: 1, .. })
        ));
        assert_eq!(exchange.metrics().snapshot().rejections, 1);
    }

    #[tokio::test]
    async fn test_approve_then_transfer_from() {
        let exchange = create_exchange();
        exchange.buy(alice(), DEFAULT_BASE_PRICE).await.unwrap();

        assert!(exchange.approve(alice(), bob(), UNIT / 2).await.unwrap());
        // Approve overwrites.
        assert!(exchange.approve(alice(), bob(), UNIT / 4).await.unwrap());
        assert!(exchange
            .transfer_from(bob(), alice(), carol(), UNIT / 4)
            .await
            .unwrap());

        assert_eq!(exchange.allowance(&alice(), &bob()).await, 0);
        assert_eq!(exchange.balance_of(&carol()).await, UNIT / 4);
        assert_eq!(exchange.balance_of(&alice()).await, UNIT - UNIT / 4);
        assert!(exchange.verify_integrity().await);

        let snapshot = exchange.metrics().snapshot();
        assert_eq!(snapshot.approvals, 2);
        assert_eq!(snapshot.transfers, 1);
    }

    #[tokio::test]
    async fn test_ledger_notifications_published_on_commit_only() {
        let exchange = create_exchange();
        exchange.buy(alice(), DEFAULT_BASE_PRICE).await.unwrap();

        exchange.transfer(alice(), bob(), 5).await.unwrap();
        assert!(exchange.transfer(alice(), Address::NULL, 5).await.is_err());
        assert!(exchange.transfer(bob(), alice(), 6).await.is_err());

        let published = exchange.with_host(|h| h.published.clone()).await;
        assert_eq!(published.len(), 3);
        assert_eq!(
            published[2],
            Notification::Transfer {
                from: alice(),
                to: bob(),
                amount: 5,
            }
        );
    }

    #[tokio::test]
    async fn test_seed_mint_disabled_by_default() {
        let exchange = create_exchange();

        assert_eq!(
            exchange.seed_mint(alice()).await,
            Err(ExchangeError::SeedMintDisabled)
        );
        assert_eq!(exchange.total_supply().await, 0);
        assert_eq!(
            exchange.metrics().snapshot().rejections_by_code.get("SEED_MINT_DISABLED"),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn test_seed_mint_is_unbacked() {
        let exchange = create_test_mode_exchange();

        let minted = exchange.seed_mint(alice()).await.unwrap();

        assert_eq!(minted, 1000 * UNIT);
        assert_eq!(exchange.balance_of(&alice()).await, 1000 * UNIT);
        assert_eq!(exchange.cumulative_volume().await, 0);
        assert_eq!(exchange.reserve_pool().await, 0);

        // Nothing backs the minted units.
        assert!(matches!(
            exchange.sell_all(alice()).await,
            Err(ExchangeError::ReserveInsufficient { pool: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_seed_mint_drains_pool() {
        let exchange = create_test_mode_exchange();
        exchange.buy(bob(), 2 * UNIT).await.unwrap();
        let pool = exchange.reserve_pool().await;

        exchange.seed_mint(alice()).await.unwrap();
        let receipt = exchange.sell_all(alice()).await.unwrap();

        // Alice paid nothing yet walks away with half the pool.
        assert!(receipt.reserve > pool / 2);
        assert_eq!(exchange.reserve_pool().await, pool - receipt.reserve);
        assert!(matches!(
            exchange.sell_all(bob()).await,
            Err(ExchangeError::ReserveInsufficient { .. })
        ));
    }

    #[tokio::test]
    async fn test_rolled_back_sale() {
        let exchange = create_exchange();
        exchange.buy(alice(), DEFAULT_BASE_PRICE).await.unwrap();
        exchange.deposit(bob(), UNIT).await.unwrap();
        let before = exchange.snapshot().await.unwrap();

        exchange.with_host(|h| h.reject_payments("refused")).await;
        let result = exchange.sell_all(alice()).await;

        assert!(matches!(result, Err(ExchangeError::TransferFailed(_))));
        assert_eq!(exchange.snapshot().await.unwrap(), before);

        let metrics = exchange.metrics().snapshot();
        assert_eq!(metrics.sales_rolled_back, 1);
        assert_eq!(metrics.sells, 0);
    }

    #[tokio::test]
    async fn test_quotes_match_trade() {
        let exchange = create_exchange();
        exchange.buy(alice(), 3 * DEFAULT_BASE_PRICE).await.unwrap();

        let quoted = exchange.quote_tokens_for_wei(DEFAULT_BASE_PRICE).await.unwrap();
        let receipt = exchange.buy(bob(), DEFAULT_BASE_PRICE).await.unwrap();

        assert_eq!(quoted, receipt.units);
    }

    #[tokio::test]
    async fn test_concurrent_buys_preserve_invariants() {
        let exchange = Arc::new(
            Exchange::new(ExchangeConfig::default(), WalletHost::new()).unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..16u64 {
            let exchange = exchange.clone();
            handles.push(tokio::spawn(async move {
                let trader = Address::from_label(&format!("trader-{}", i));
                exchange.buy(trader, DEFAULT_BASE_PRICE * (i as Amount + 1)).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let snapshot = exchange.snapshot().await.unwrap();
        assert_eq!(snapshot.holders, 16);
        assert_eq!(snapshot.reserve_pool, DEFAULT_BASE_PRICE * 136);
        assert_eq!(snapshot.total_supply, snapshot.cumulative_volume);
        assert!(exchange.verify_integrity().await);

        let log = exchange.with_host(|h| h.notifications().len()).await;
        assert_eq!(log, 32);
    }
}
