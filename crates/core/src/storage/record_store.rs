use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::holding::Holding;
use crate::models::user::Identity;

/// Durable per-user storage for wallets and holdings.
///
/// One wallet row and any number of holding rows per user. Every call is an
/// independent write that may fail on its own; there is no multi-row
/// transaction. All writes carry absolute values so they can be replayed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Current wallet balance, or `None` if the user has no wallet row yet.
    async fn fetch_wallet(&self, user: &Identity) -> Result<Option<f64>, CoreError>;

    async fn create_wallet(&self, user: &Identity, balance: f64) -> Result<(), CoreError>;

    /// Overwrite the balance of an existing wallet row.
    async fn set_wallet_balance(&self, user: &Identity, balance: f64) -> Result<(), CoreError>;

    async fn fetch_holdings(&self, user: &Identity) -> Result<Vec<Holding>, CoreError>;

    /// Insert a new holding row. Fails if one already exists for the fund.
    async fn insert_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError>;

    /// Overwrite an existing holding row. Fails if none exists.
    async fn update_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError>;

    /// Insert or overwrite a holding row.
    async fn upsert_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError>;

    /// Delete a holding row. Deleting a missing row is not an error.
    async fn delete_holding(&self, user: &Identity, fund_id: &str) -> Result<(), CoreError>;
}

/// In-process record store. Used when no hosted store is configured,
/// and as the backing store in tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    wallets: Mutex<HashMap<String, f64>>,
    holdings: Mutex<HashMap<(String, String), Holding>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored wallet balance of a user.
    #[must_use]
    pub fn wallet_of(&self, user_id: &str) -> Option<f64> {
        let wallets = self.wallets.lock().unwrap_or_else(|e| e.into_inner());
        wallets.get(user_id).copied()
    }

    /// Stored holdings of a user, sorted by fund id.
    #[must_use]
    pub fn holdings_of(&self, user_id: &str) -> Vec<Holding> {
        let holdings = self.holdings.lock().unwrap_or_else(|e| e.into_inner());
        let mut rows: Vec<Holding> = holdings
            .iter()
            .filter(|((owner, _), _)| owner == user_id)
            .map(|(_, h)| h.clone())
            .collect();
        rows.sort_by(|a, b| a.fund_id.cmp(&b.fund_id));
        rows
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch_wallet(&self, user: &Identity) -> Result<Option<f64>, CoreError> {
        Ok(self.wallet_of(&user.user_id))
    }

    async fn create_wallet(&self, user: &Identity, balance: f64) -> Result<(), CoreError> {
        let mut wallets = self.wallets.lock().unwrap_or_else(|e| e.into_inner());
        if wallets.contains_key(&user.user_id) {
            return Err(CoreError::store(
                "create_wallet",
                format!("wallet already exists for user {}", user.user_id),
            ));
        }
        wallets.insert(user.user_id.clone(), balance);
        Ok(())
    }

    async fn set_wallet_balance(&self, user: &Identity, balance: f64) -> Result<(), CoreError> {
        let mut wallets = self.wallets.lock().unwrap_or_else(|e| e.into_inner());
        match wallets.get_mut(&user.user_id) {
            Some(stored) => {
                *stored = balance;
                Ok(())
            }
            None => Err(CoreError::store(
                "set_wallet_balance",
                format!("no wallet for user {}", user.user_id),
            )),
        }
    }

    async fn fetch_holdings(&self, user: &Identity) -> Result<Vec<Holding>, CoreError> {
        Ok(self.holdings_of(&user.user_id))
    }

    async fn insert_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError> {
        let mut holdings = self.holdings.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user.user_id.clone(), holding.fund_id.clone());
        if holdings.contains_key(&key) {
            return Err(CoreError::store(
                "insert_holding",
                format!("holding {} already exists", holding.fund_id),
            ));
        }
        holdings.insert(key, holding.clone());
        Ok(())
    }

    async fn update_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError> {
        let mut holdings = self.holdings.lock().unwrap_or_else(|e| e.into_inner());
        let key = (user.user_id.clone(), holding.fund_id.clone());
        match holdings.get_mut(&key) {
            Some(stored) => {
                *stored = holding.clone();
                Ok(())
            }
            None => Err(CoreError::store(
                "update_holding",
                format!("no holding {} to update", holding.fund_id),
            )),
        }
    }

    async fn upsert_holding(&self, user: &Identity, holding: &Holding) -> Result<(), CoreError> {
        let mut holdings = self.holdings.lock().unwrap_or_else(|e| e.into_inner());
        holdings.insert(
            (user.user_id.clone(), holding.fund_id.clone()),
            holding.clone(),
        );
        Ok(())
    }

    async fn delete_holding(&self, user: &Identity, fund_id: &str) -> Result<(), CoreError> {
        let mut holdings = self.holdings.lock().unwrap_or_else(|e| e.into_inner());
        holdings.remove(&(user.user_id.clone(), fund_id.to_string()));
        Ok(())
    }
}
