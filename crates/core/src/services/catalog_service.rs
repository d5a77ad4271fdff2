use std::sync::Arc;

use futures::future::join_all;
use log::{info, warn};

use crate::errors::CoreError;
use crate::models::fund::{Fund, NavPoint, SchemeData, DEFAULT_RISK_LEVEL};
use crate::providers::registry::ProviderRegistry;

/// Trading days in one year of NAV history.
pub const TRADING_DAYS_1Y: usize = 252;

/// Trading days in three years of NAV history.
pub const TRADING_DAYS_3Y: usize = 756;

/// Loads the fund catalog and normalizes provider data into `Fund`s.
pub struct CatalogService {
    registry: Arc<ProviderRegistry>,
}

impl CatalogService {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Load the catalog for the given scheme codes, in that order.
    ///
    /// With an empty `fund_ids` the first `discover_limit` schemes of the
    /// provider listing are used instead. A fund that fails to load is
    /// logged and left out; only when every fund fails is the whole load
    /// reported as `CatalogUnavailable`.
    pub async fn load_catalog(
        &self,
        fund_ids: &[String],
        discover_limit: usize,
    ) -> Result<Vec<Fund>, CoreError> {
        let ids: Vec<String> = if fund_ids.is_empty() {
            self.registry
                .list_schemes()
                .await
                .map_err(|e| CoreError::CatalogUnavailable(e.to_string()))?
                .into_iter()
                .take(discover_limit)
                .map(|s| s.id)
                .collect()
        } else {
            fund_ids.to_vec()
        };

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let results = join_all(ids.iter().map(|id| self.load_fund(id))).await;

        let mut funds = Vec::with_capacity(ids.len());
        let mut last_error = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(fund) => funds.push(fund),
                Err(e) => {
                    warn!("Dropping fund {id} from catalog: {e}");
                    last_error = Some(e);
                }
            }
        }

        if funds.is_empty() {
            let reason = last_error
                .map_or_else(|| "no funds loaded".to_string(), |e| e.to_string());
            return Err(CoreError::CatalogUnavailable(reason));
        }

        info!("Loaded {} of {} funds", funds.len(), ids.len());
        Ok(funds)
    }

    /// Load and normalize a single fund.
    pub async fn load_fund(&self, fund_id: &str) -> Result<Fund, CoreError> {
        let scheme = self.registry.fetch_scheme(fund_id).await?;
        normalize_fund(scheme)
    }
}

/// Turn raw scheme data into a catalog `Fund`.
///
/// Latest NAV is the most recent point by date, whatever order the provider
/// used. Trailing returns compare it with the NAV one (three) years of
/// trading days earlier.
pub fn normalize_fund(scheme: SchemeData) -> Result<Fund, CoreError> {
    let mut history = scheme.history;
    history.sort_by(|a, b| b.date.cmp(&a.date));

    let latest = history
        .first()
        .ok_or_else(|| CoreError::PriceNotAvailable(scheme.id.clone()))?;

    Ok(Fund {
        id: scheme.id,
        name: scheme.name,
        nav: latest.nav,
        nav_date: Some(latest.date),
        return_1y: trailing_return(&history, TRADING_DAYS_1Y, true),
        return_3y: trailing_return(&history, TRADING_DAYS_3Y, false),
        category: scheme.category.unwrap_or_else(|| "N/A".to_string()),
        fund_house: scheme.fund_house.unwrap_or_else(|| "N/A".to_string()),
        risk_level: DEFAULT_RISK_LEVEL.to_string(),
    })
}

/// Percentage change from the NAV `offset` points back to the latest NAV.
///
/// `history` must be newest first. With `allow_shorter`, a history shorter
/// than `offset` uses its oldest point; otherwise it yields `None`.
pub fn trailing_return(history: &[NavPoint], offset: usize, allow_shorter: bool) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let idx = if offset < history.len() {
        offset
    } else if allow_shorter {
        history.len() - 1
    } else {
        return None;
    };

    let latest = history[0].nav;
    let past = history[idx].nav;
    if past <= 0.0 {
        return None;
    }
    Some((latest - past) / past * 100.0)
}

/// Funds whose name contains `term`, case-insensitively. Empty term matches all.
#[must_use]
pub fn search_funds<'a>(funds: &'a [Fund], term: &str) -> Vec<&'a Fund> {
    let needle = term.trim().to_lowercase();
    funds
        .iter()
        .filter(|f| f.name.to_lowercase().contains(&needle))
        .collect()
}
