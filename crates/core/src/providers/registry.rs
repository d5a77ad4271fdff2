use std::time::Duration;

use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::fund::{SchemeData, SchemeListing};
use crate::models::settings::Settings;

use super::mfapi::MfApiProvider;
use super::traits::FundDataProvider;

/// Ordered list of fund data providers.
///
/// Requests go to the first provider; if it fails the next one is tried.
/// New providers can be registered without touching the services.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn FundDataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with the default providers configured from settings.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MfApiProvider::new(
            settings.provider_base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )));
        registry
    }

    /// Register a provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn FundDataProvider>) {
        self.providers.push(provider);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of the registered providers, in priority order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Fetch a scheme, falling back through providers in registration order.
    pub async fn fetch_scheme(&self, fund_id: &str) -> Result<SchemeData, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.fetch_scheme(fund_id).await {
                Ok(scheme) => {
                    debug!(
                        "Fetched scheme {fund_id} from {} ({} NAV points)",
                        provider.name(),
                        scheme.history.len()
                    );
                    return Ok(scheme);
                }
                Err(e) => {
                    warn!("Provider {} failed for scheme {fund_id}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    /// List schemes from the first provider that answers.
    pub async fn list_schemes(&self) -> Result<Vec<SchemeListing>, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.list_schemes().await {
                Ok(listing) => return Ok(listing),
                Err(e) => {
                    warn!("Provider {} failed to list schemes: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
