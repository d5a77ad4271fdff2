use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::fund::{SchemeData, SchemeListing};

/// Trait abstraction for fund NAV data sources.
///
/// The catalog and history services only talk to this trait, so a provider
/// that changes its API is replaced in one place.
#[async_trait]
pub trait FundDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// List the schemes this provider knows about, in its own order.
    async fn list_schemes(&self) -> Result<Vec<SchemeListing>, CoreError>;

    /// Fetch metadata and full NAV history of one scheme.
    async fn fetch_scheme(&self, fund_id: &str) -> Result<SchemeData, CoreError>;
}
