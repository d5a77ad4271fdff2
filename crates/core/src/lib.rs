pub mod auth;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod session;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use log::info;

use auth::AuthProvider;
use errors::CoreError;
use models::{
    fund::{Fund, NavPoint},
    settings::Settings,
};
use providers::registry::ProviderRegistry;
use services::{
    catalog_service::{self, CatalogService},
    history_service::HistoryService,
    ledger_service::LedgerService,
};
use session::Session;
use storage::{
    intent_log::{FileIntentLog, IntentLog, MemoryIntentLog},
    record_store::{MemoryRecordStore, RecordStore},
    rest_store::RestRecordStore,
};

/// Main entry point for the Fund Tracker core library.
///
/// Holds the services shared by every user: the fund catalog, NAV history,
/// and the ledger service mirroring wallets to the record store. Per-user
/// state lives in a `Session` obtained from `open_session`.
#[must_use]
pub struct FundTracker {
    settings: Settings,
    registry: Arc<ProviderRegistry>,
    catalog_service: CatalogService,
    history_service: HistoryService,
    ledger_service: LedgerService,
    auth: Arc<dyn AuthProvider>,
}

impl std::fmt::Debug for FundTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundTracker")
            .field("settings", &self.settings)
            .field("providers", &self.registry.provider_names())
            .finish()
    }
}

impl FundTracker {
    /// Build a tracker from settings.
    ///
    /// Uses the REST record store when `record_store` is configured and an
    /// in-memory store otherwise; likewise a file-backed intent log when
    /// `intent_log_path` is set.
    pub fn new(settings: Settings, auth: Arc<dyn AuthProvider>) -> Result<Self, CoreError> {
        settings.validate()?;
        let timeout = Duration::from_secs(settings.request_timeout_secs);

        let registry = ProviderRegistry::new_with_defaults(&settings);

        let store: Arc<dyn RecordStore> = match &settings.record_store {
            Some(remote) => Arc::new(RestRecordStore::new(remote, timeout)),
            None => Arc::new(MemoryRecordStore::new()),
        };

        let intents: Arc<dyn IntentLog> = match &settings.intent_log_path {
            Some(path) => Arc::new(FileIntentLog::open(path.clone())?),
            None => Arc::new(MemoryIntentLog::new()),
        };

        Self::with_components(settings, registry, store, intents, auth)
    }

    /// Build a tracker from explicit parts. Used by embedders and tests that
    /// bring their own provider, record store, or intent log.
    pub fn with_components(
        settings: Settings,
        registry: ProviderRegistry,
        store: Arc<dyn RecordStore>,
        intents: Arc<dyn IntentLog>,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        Ok(Self::build(settings, registry, store, intents, auth))
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Catalog ─────────────────────────────────────────────────────

    /// Load the configured fund catalog.
    pub async fn load_catalog(&self) -> Result<Vec<Fund>, CoreError> {
        self.catalog_service
            .load_catalog(&self.settings.fund_ids, self.settings.catalog_size)
            .await
    }

    /// Load a single fund, whether or not it is part of the catalog.
    pub async fn load_fund(&self, fund_id: &str) -> Result<Fund, CoreError> {
        self.catalog_service.load_fund(fund_id).await
    }

    /// Filter a loaded catalog by fund name (case-insensitive).
    #[must_use]
    pub fn search_funds<'a>(&self, funds: &'a [Fund], term: &str) -> Vec<&'a Fund> {
        catalog_service::search_funds(funds, term)
    }

    // ── History ─────────────────────────────────────────────────────

    /// Recent NAV history of a fund, oldest first.
    pub async fn fund_history(&self, fund_id: &str) -> Result<Vec<NavPoint>, CoreError> {
        self.history_service.fund_history(fund_id).await
    }

    // ── Sessions ────────────────────────────────────────────────────

    /// Open a session for whoever the auth provider reports as signed in.
    ///
    /// Settles operations journaled by an earlier session, then loads the
    /// wallet (creating it with `initial_balance` on first use) and the
    /// holdings from the record store.
    pub async fn open_session(&self) -> Result<Session, CoreError> {
        let identity = self
            .auth
            .current_user()
            .await
            .ok_or(CoreError::Unauthenticated)?;
        Session::open(
            identity,
            Arc::clone(&self.auth),
            self.ledger_service.clone(),
            self.settings.initial_balance,
        )
        .await
    }

    // ── Provider Availability ───────────────────────────────────────

    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(
        settings: Settings,
        registry: ProviderRegistry,
        store: Arc<dyn RecordStore>,
        intents: Arc<dyn IntentLog>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let registry = Arc::new(registry);
        let catalog_service = CatalogService::new(Arc::clone(&registry));
        let history_service = HistoryService::new(Arc::clone(&registry), settings.history_limit);
        let ledger_service = LedgerService::new(store, intents);

        info!(
            "Fund tracker ready ({} provider(s), {} configured fund(s))",
            registry.provider_names().len(),
            settings.fund_ids.len()
        );

        Self {
            settings,
            registry,
            catalog_service,
            history_service,
            ledger_service,
            auth,
        }
    }
}
