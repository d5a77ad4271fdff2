use std::sync::Arc;

use crate::errors::CoreError;
use crate::models::fund::NavPoint;
use crate::providers::registry::ProviderRegistry;

/// Fetches NAV history for charts.
pub struct HistoryService {
    registry: Arc<ProviderRegistry>,
    limit: usize,
}

impl HistoryService {
    /// `limit` caps the number of most recent points returned.
    pub fn new(registry: Arc<ProviderRegistry>, limit: usize) -> Self {
        Self { registry, limit }
    }

    /// NAV history of one fund, oldest → newest, at most `limit` points.
    pub async fn fund_history(&self, fund_id: &str) -> Result<Vec<NavPoint>, CoreError> {
        let scheme = self.registry.fetch_scheme(fund_id).await?;
        let points = recent_oldest_first(scheme.history, self.limit);
        if points.is_empty() {
            return Err(CoreError::PriceNotAvailable(fund_id.to_string()));
        }
        Ok(points)
    }
}

/// Keep the `limit` most recent points and return them in chart order.
///
/// Providers usually send newest first, but the order is re-derived from
/// the dates rather than assumed.
#[must_use]
pub fn recent_oldest_first(mut history: Vec<NavPoint>, limit: usize) -> Vec<NavPoint> {
    history.sort_by(|a, b| b.date.cmp(&a.date));
    history.truncate(limit);
    history.reverse();
    history
}
