use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// Runtime configuration for a `FundTracker`.
///
/// Everything has a default, so a partial JSON document is enough:
/// `{"fund_ids": ["119551"], "initial_balance": 10000}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scheme codes that make up the catalog, in display order.
    /// Empty means "the first `catalog_size` schemes the provider lists".
    pub fund_ids: Vec<String>,

    /// Number of schemes taken from the provider listing when `fund_ids`
    /// is empty.
    pub catalog_size: usize,

    /// Base URL of the fund price API (mfapi.in compatible).
    pub provider_base_url: String,

    /// HTTP timeout for provider and record-store calls.
    pub request_timeout_secs: u64,

    /// Maximum number of most recent NAV points returned for a chart.
    pub history_limit: usize,

    /// Balance of a wallet row created on a user's first session.
    pub initial_balance: f64,

    /// Hosted record store. `None` keeps wallets and holdings in memory.
    pub record_store: Option<RecordStoreSettings>,

    /// File backing the intent log. `None` keeps the log in memory.
    pub intent_log_path: Option<PathBuf>,
}

/// Connection details for the REST record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordStoreSettings {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,

    /// Public (anon) API key sent with every request
    pub api_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fund_ids: Vec::new(),
            catalog_size: 20,
            provider_base_url: "https://api.mfapi.in".to_string(),
            request_timeout_secs: 30,
            history_limit: 365,
            initial_balance: 0.0,
            record_store: None,
            intent_log_path: None,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document and validate them.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("Failed to parse settings: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read and validate a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Failed to read settings file {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.fund_ids.iter().any(|id| id.trim().is_empty()) {
            return Err(CoreError::Config("fund_ids must not contain empty ids".into()));
        }
        if self.fund_ids.is_empty() && self.catalog_size == 0 {
            return Err(CoreError::Config(
                "catalog_size must be at least 1 when no fund_ids are configured".into(),
            ));
        }
        if self.provider_base_url.trim().is_empty() {
            return Err(CoreError::Config("provider_base_url must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config("request_timeout_secs must be at least 1".into()));
        }
        if self.history_limit == 0 {
            return Err(CoreError::Config("history_limit must be at least 1".into()));
        }
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err(CoreError::Config(format!(
                "initial_balance must be a non-negative number, got {}",
                self.initial_balance
            )));
        }
        if let Some(store) = &self.record_store {
            if store.url.trim().is_empty() || store.api_key.trim().is_empty() {
                return Err(CoreError::Config(
                    "record_store requires both url and api_key".into(),
                ));
            }
        }
        Ok(())
    }
}
