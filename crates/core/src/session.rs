use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;

use crate::auth::AuthProvider;
use crate::errors::CoreError;
use crate::models::analytics::PortfolioSummary;
use crate::models::fund::Fund;
use crate::models::holding::Holding;
use crate::models::intent::TradePlan;
use crate::models::ledger::{Ledger, TradeReceipt};
use crate::models::portfolio::Portfolio;
use crate::models::user::Identity;
use crate::services::analytics_service::AnalyticsService;
use crate::services::ledger_service::LedgerService;

/// One signed-in user's working state.
///
/// Created by `FundTracker::open_session` once the auth provider reports an
/// identity; dropped (or `sign_out`) when the user leaves. Owns the
/// in-memory ledger exclusively.
///
/// Only one mutating operation runs at a time: a buy, sell or deposit
/// issued while another is still talking to the record store is rejected
/// with `OperationInProgress` instead of being queued.
pub struct Session {
    identity: Identity,
    auth: Arc<dyn AuthProvider>,
    ledger_service: LedgerService,
    analytics_service: AnalyticsService,
    initial_balance: f64,
    ledger: Mutex<Ledger>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.identity.user_id)
            .field("busy", &self.ledger.try_lock().is_err())
            .finish()
    }
}

impl Session {
    pub(crate) async fn open(
        identity: Identity,
        auth: Arc<dyn AuthProvider>,
        ledger_service: LedgerService,
        initial_balance: f64,
    ) -> Result<Self, CoreError> {
        let ledger = ledger_service.load_ledger(&identity, initial_balance).await?;
        info!(
            "Session opened for user {} ({} holdings)",
            identity.user_id,
            ledger.portfolio().len()
        );
        Ok(Self {
            identity,
            auth,
            ledger_service,
            analytics_service: AnalyticsService::new(),
            initial_balance,
            ledger: Mutex::new(ledger),
        })
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Uninvested cash. Waits for an in-flight operation to finish.
    pub async fn wallet_balance(&self) -> f64 {
        self.ledger.lock().await.balance()
    }

    /// Snapshot of all holdings.
    pub async fn portfolio(&self) -> Portfolio {
        self.ledger.lock().await.portfolio().clone()
    }

    pub async fn holding(&self, fund_id: &str) -> Option<Holding> {
        self.ledger.lock().await.portfolio().get(fund_id).cloned()
    }

    /// Snapshot of wallet and holdings together.
    pub async fn ledger(&self) -> Ledger {
        self.ledger.lock().await.clone()
    }

    /// Portfolio statistics against a catalog snapshot.
    pub async fn summary(&self, funds: &[Fund]) -> PortfolioSummary {
        let ledger = self.ledger.lock().await;
        self.analytics_service.summarize(&ledger, funds)
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Buy `units` of `fund` at its current NAV.
    pub async fn buy(&self, fund: &Fund, units: f64) -> Result<TradeReceipt, CoreError> {
        self.run(|ledger| ledger.plan_buy(fund, units)).await
    }

    /// Sell `units` of `fund` at its current NAV.
    pub async fn sell(&self, fund: &Fund, units: f64) -> Result<TradeReceipt, CoreError> {
        self.run(|ledger| ledger.plan_sell(fund, units)).await
    }

    /// Add cash to the wallet. Returns the new balance.
    pub async fn deposit(&self, amount: f64) -> Result<f64, CoreError> {
        let receipt = self.run(|ledger| ledger.plan_deposit(amount)).await?;
        Ok(receipt.wallet_balance)
    }

    /// Settle journaled leftovers and reload wallet and holdings from the
    /// record store.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let mut ledger = self.ledger.try_lock().map_err(|_| CoreError::OperationInProgress)?;
        self.ensure_signed_in().await?;
        *ledger = self
            .ledger_service
            .load_ledger(&self.identity, self.initial_balance)
            .await?;
        Ok(())
    }

    /// Sign out of the auth provider and discard in-memory state.
    /// The record store keeps the durable copy.
    pub async fn sign_out(self) -> Result<(), CoreError> {
        self.auth.sign_out().await?;
        info!("Session closed for user {}", self.identity.user_id);
        Ok(())
    }

    // ── Internal ────────────────────────────────────────────────────

    async fn run<F>(&self, plan: F) -> Result<TradeReceipt, CoreError>
    where
        F: FnOnce(&Ledger) -> Result<TradePlan, CoreError>,
    {
        let mut ledger = self.ledger.try_lock().map_err(|_| CoreError::OperationInProgress)?;
        self.ensure_signed_in().await?;

        // A previous operation could not be settled; the store is the truth.
        if self.ledger_service.has_pending(&self.identity)? {
            warn!("Unsettled operations for user {}, reloading", self.identity.user_id);
            *ledger = self
                .ledger_service
                .load_ledger(&self.identity, self.initial_balance)
                .await?;
        }

        let plan = plan(&ledger)?;
        self.ledger_service.execute(&self.identity, &plan).await?;
        ledger.commit(&plan);

        info!(
            "{} completed for user {}: amount {:.2}, wallet {:.2}",
            plan.kind, self.identity.user_id, plan.amount, plan.wallet_after
        );
        Ok(TradeReceipt::from(&plan))
    }

    async fn ensure_signed_in(&self) -> Result<(), CoreError> {
        match self.auth.current_user().await {
            Some(current) if current.user_id == self.identity.user_id => Ok(()),
            _ => Err(CoreError::Unauthenticated),
        }
    }
}
