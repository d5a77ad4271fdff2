use std::collections::{HashMap, HashSet};

use crate::models::analytics::{HoldingSummary, PortfolioSummary};
use crate::models::fund::Fund;
use crate::models::ledger::Ledger;

/// Computes portfolio statistics: value, cost basis, returns, allocation.
///
/// Pure function of the ledger and a catalog snapshot. Valuation uses each
/// fund's current NAV; cost basis uses the holding's purchase NAV.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Summarize the ledger against the given catalog snapshot.
    ///
    /// A holding whose fund is missing from `funds` is valued at its
    /// purchase NAV and marked `priced: false`.
    pub fn summarize(&self, ledger: &Ledger, funds: &[Fund]) -> PortfolioSummary {
        let catalog: HashMap<&str, &Fund> = funds.iter().map(|f| (f.id.as_str(), f)).collect();

        let mut holdings = Vec::with_capacity(ledger.portfolio().len());
        let mut categories = HashSet::new();
        let mut total_value = 0.0;
        let mut total_invested = 0.0;
        let mut expected_return = 0.0;

        for holding in ledger.portfolio().sorted() {
            let fund = catalog.get(holding.fund_id.as_str()).copied();
            let current_nav = fund.map_or(holding.purchase_nav, |f| f.nav);
            let return_1y = fund.and_then(|f| f.return_1y);

            let current_value = holding.value_at(current_nav);
            let invested = holding.invested();
            let gain = current_value - invested;
            let expected = invested * return_1y.unwrap_or(0.0) / 100.0;

            total_value += current_value;
            total_invested += invested;
            expected_return += expected;
            if let Some(f) = fund {
                categories.insert(f.category.as_str());
            }

            holdings.push(HoldingSummary {
                fund_id: holding.fund_id.clone(),
                fund_name: fund.map_or_else(|| holding.fund_id.clone(), |f| f.name.clone()),
                units: holding.units,
                purchase_nav: holding.purchase_nav,
                current_nav,
                priced: fund.is_some(),
                current_value,
                invested,
                gain,
                gain_pct: percent_of(gain, invested),
                return_1y,
                expected_return: expected,
                allocation_pct: 0.0, // filled below
            });
        }

        for h in &mut holdings {
            h.allocation_pct = percent_of(h.current_value, total_value);
        }

        let total_return = total_value - total_invested;

        PortfolioSummary {
            wallet_balance: ledger.balance(),
            fund_count: holdings.len(),
            total_value,
            total_invested,
            total_return,
            total_return_pct: percent_of(total_return, total_invested),
            expected_return,
            expected_return_pct: percent_of(expected_return, total_invested),
            category_count: categories.len(),
            holdings,
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

/// `part / whole × 100`, or 0 when `whole` is 0.
fn percent_of(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}
