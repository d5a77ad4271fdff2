use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single NAV data point (date → net asset value per unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

/// Snapshot of a mutual fund as reported by the catalog provider.
///
/// Never mutated by the ledger. A fresh snapshot is obtained by reloading
/// the catalog; holdings refer to funds by `id` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    /// Provider scheme code (e.g. "119551")
    pub id: String,

    /// Display name
    pub name: String,

    /// Latest NAV per unit
    pub nav: f64,

    /// Date of the latest NAV
    pub nav_date: Option<NaiveDate>,

    /// Trailing one-year return in percent, if enough history exists
    pub return_1y: Option<f64>,

    /// Trailing three-year return in percent, if enough history exists
    pub return_3y: Option<f64>,

    /// Scheme category label (informational)
    pub category: String,

    /// Fund house / AMC name (informational)
    pub fund_house: String,

    /// Risk label (informational)
    pub risk_level: String,
}

impl Fund {
    /// Build a fund with only the fields the ledger cares about.
    pub fn new(id: impl Into<String>, name: impl Into<String>, nav: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nav,
            nav_date: None,
            return_1y: None,
            return_3y: None,
            category: "N/A".to_string(),
            fund_house: "N/A".to_string(),
            risk_level: DEFAULT_RISK_LEVEL.to_string(),
        }
    }

    pub fn with_return_1y(mut self, pct: f64) -> Self {
        self.return_1y = Some(pct);
        self
    }

    /// One-year trailing return formatted as `"12.34%"`, or `"N/A"`.
    #[must_use]
    pub fn return_1y_label(&self) -> String {
        format_return(self.return_1y)
    }

    /// Three-year trailing return formatted as `"12.34%"`, or `"N/A"`.
    #[must_use]
    pub fn return_3y_label(&self) -> String {
        format_return(self.return_3y)
    }
}

/// Raw scheme data as returned by a provider, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeData {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub fund_house: Option<String>,
    /// NAV history in the provider's native order (newest first for mfapi)
    pub history: Vec<NavPoint>,
}

/// One entry of a provider's scheme listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeListing {
    pub id: String,
    pub name: String,
}

/// Risk label used when the provider reports none.
pub const DEFAULT_RISK_LEVEL: &str = "Moderate";

fn format_return(pct: Option<f64>) -> String {
    match pct {
        Some(v) => format!("{v:.2}%"),
        None => "N/A".to_string(),
    }
}
