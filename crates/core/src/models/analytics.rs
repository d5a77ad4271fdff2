use serde::{Deserialize, Serialize};

/// Aggregated statistics over the whole portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Uninvested cash in the wallet
    pub wallet_balance: f64,

    /// Number of funds held
    pub fund_count: usize,

    /// Σ units × current NAV
    pub total_value: f64,

    /// Σ units × purchase NAV (cost basis)
    pub total_invested: f64,

    /// total_value − total_invested
    pub total_return: f64,

    /// (total_return / total_invested) × 100, or 0 with nothing invested
    pub total_return_pct: f64,

    /// Σ invested × (trailing 1y return / 100); an estimate, not a forecast
    pub expected_return: f64,

    /// (expected_return / total_invested) × 100, or 0 with nothing invested
    pub expected_return_pct: f64,

    /// Distinct fund categories among the holdings
    pub category_count: usize,

    /// Per-fund breakdown, sorted by fund id
    pub holdings: Vec<HoldingSummary>,
}

/// Statistics for a single holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingSummary {
    pub fund_id: String,

    /// Fund name from the catalog, or the id if the fund is not listed
    pub fund_name: String,

    pub units: f64,

    pub purchase_nav: f64,

    /// NAV used for valuation
    pub current_nav: f64,

    /// `false` when the fund is missing from the catalog snapshot and the
    /// holding was valued at its purchase NAV
    pub priced: bool,

    pub current_value: f64,

    pub invested: f64,

    pub gain: f64,

    pub gain_pct: f64,

    /// Trailing 1y return used for the estimate, if the fund reports one
    pub return_1y: Option<f64>,

    pub expected_return: f64,

    /// current_value / total_value × 100
    pub allocation_pct: f64,
}
