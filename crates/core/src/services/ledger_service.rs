use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::errors::CoreError;
use crate::models::intent::{IntentStage, TradeIntent, TradePlan};
use crate::models::ledger::Ledger;
use crate::models::portfolio::Portfolio;
use crate::models::user::Identity;
use crate::storage::intent_log::IntentLog;
use crate::storage::record_store::RecordStore;

/// Mirrors ledger operations to the record store.
///
/// The store offers no multi-row transactions, so a buy or sell is run as a
/// saga: journal the intent, write the wallet, write the holding, drop the
/// intent. A failed holding write is compensated by restoring the wallet.
/// If the compensation fails too, the intent stays journaled and is rolled
/// back by `recover` before the user's next operation or session.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn RecordStore>,
    intents: Arc<dyn IntentLog>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn RecordStore>, intents: Arc<dyn IntentLog>) -> Self {
        Self { store, intents }
    }

    /// Recover leftovers, then read the user's wallet and holdings.
    /// A user without a wallet row gets one holding `initial_balance`.
    pub async fn load_ledger(
        &self,
        user: &Identity,
        initial_balance: f64,
    ) -> Result<Ledger, CoreError> {
        self.recover(user).await?;

        let balance = match self.store.fetch_wallet(user).await? {
            Some(balance) => balance,
            None => {
                info!("Creating wallet for user {}", user.user_id);
                self.store.create_wallet(user, initial_balance).await?;
                initial_balance
            }
        };
        if balance < 0.0 {
            warn!("Stored wallet of user {} is negative ({balance}); showing 0", user.user_id);
        }

        let holdings = self.store.fetch_holdings(user).await?;
        Ok(Ledger::new(balance, Portfolio::from_holdings(holdings)))
    }

    /// Whether the user has journaled operations awaiting recovery.
    pub fn has_pending(&self, user: &Identity) -> Result<bool, CoreError> {
        Ok(!self.intents.pending_for(&user.user_id)?.is_empty())
    }

    /// Settle every journaled intent of the user. Returns how many were
    /// handled.
    ///
    /// An intent whose writes all landed is simply dropped. Anything else
    /// is rolled back to its "before" values; those writes are absolute, so
    /// repeating them is harmless.
    pub async fn recover(&self, user: &Identity) -> Result<usize, CoreError> {
        let pending = self.intents.pending_for(&user.user_id)?;
        for intent in &pending {
            if intent.is_complete() {
                debug!("Intent {} already applied, clearing", intent.id);
            } else {
                warn!(
                    "Rolling back interrupted {} (intent {}, stage {:?})",
                    intent.plan.kind, intent.id, intent.stage
                );
                self.restore(user, &intent.plan).await?;
            }
            self.intents.remove(intent.id)?;
        }
        if !pending.is_empty() {
            info!("Recovered {} intent(s) for user {}", pending.len(), user.user_id);
        }
        Ok(pending.len())
    }

    /// Write a resolved plan to the store.
    ///
    /// On `Ok` every row holds its "after" value and the caller may commit
    /// the plan to memory. On `Err` the caller must leave memory untouched.
    pub async fn execute(&self, user: &Identity, plan: &TradePlan) -> Result<(), CoreError> {
        if !plan.touches_holding() {
            // Single write: nothing to compensate.
            return self.store.set_wallet_balance(user, plan.wallet_after).await;
        }

        let intent = TradeIntent::new(user.user_id.clone(), plan.clone());
        self.intents.record(&intent)?;

        if let Err(e) = self.store.set_wallet_balance(user, plan.wallet_after).await {
            // The write may still have landed (e.g. a timeout after commit).
            // Restoring the old value is a no-op otherwise.
            if let Err(undo) = self.store.set_wallet_balance(user, plan.wallet_before).await {
                warn!("Could not confirm wallet for intent {}: {undo}", intent.id);
                return Err(e);
            }
            self.intents.remove(intent.id)?;
            return Err(e);
        }
        self.advance(&intent, IntentStage::WalletWritten);

        if let Err(e) = self.write_holding(user, plan).await {
            warn!("Holding write failed for intent {}: {e}; compensating", intent.id);
            return match self.restore(user, plan).await {
                Ok(()) => {
                    self.intents.remove(intent.id)?;
                    Err(e)
                }
                Err(undo) => {
                    error!(
                        "Compensation failed for intent {}, left journaled: {undo}",
                        intent.id
                    );
                    Err(CoreError::CompensationFailed {
                        intent_id: intent.id.to_string(),
                        message: format!("{e}; rollback: {undo}"),
                    })
                }
            };
        }

        let staged = self.intents.update_stage(intent.id, IntentStage::HoldingWritten);
        match (staged, self.intents.remove(intent.id)) {
            (Err(stage_err), Err(remove_err)) => {
                // Recovery would read the journaled intent as unfinished and
                // undo it, so the operation must not be reported as applied.
                error!(
                    "Intent {} can be neither completed nor cleared: {stage_err}",
                    intent.id
                );
                match self.restore(user, plan).await {
                    Ok(()) => Err(remove_err),
                    Err(undo) => Err(CoreError::CompensationFailed {
                        intent_id: intent.id.to_string(),
                        message: format!("{remove_err}; rollback: {undo}"),
                    }),
                }
            }
            (Ok(()), Err(e)) => {
                warn!("Completed intent {} left journaled: {e}", intent.id);
                Ok(())
            }
            (_, Ok(())) => Ok(()),
        }
    }

    fn advance(&self, intent: &TradeIntent, stage: IntentStage) {
        if let Err(e) = self.intents.update_stage(intent.id, stage) {
            warn!("Could not journal stage {stage:?} of intent {}: {e}", intent.id);
        }
    }

    /// Forward holding write: insert, update, or delete the row.
    async fn write_holding(&self, user: &Identity, plan: &TradePlan) -> Result<(), CoreError> {
        match (&plan.holding_before, &plan.holding_after) {
            (None, Some(after)) => self.store.insert_holding(user, after).await,
            (Some(_), Some(after)) => self.store.update_holding(user, after).await,
            (Some(before), None) => self.store.delete_holding(user, &before.fund_id).await,
            (None, None) => Ok(()),
        }
    }

    /// Put the wallet and holding rows back to their "before" values.
    async fn restore(&self, user: &Identity, plan: &TradePlan) -> Result<(), CoreError> {
        self.store.set_wallet_balance(user, plan.wallet_before).await?;
        if !plan.touches_holding() {
            return Ok(());
        }
        match (&plan.holding_before, plan.fund_id.as_deref()) {
            (Some(before), _) => self.store.upsert_holding(user, before).await,
            (None, Some(fund_id)) => self.store.delete_holding(user, fund_id).await,
            (None, None) => Ok(()),
        }
    }
}
