use serde::{Deserialize, Serialize};

/// Remaining units at or below this are treated as zero and the holding is
/// removed. Guards against `6.0 - 5.999999999999` style residue.
pub const UNIT_EPSILON: f64 = 1e-9;

/// A user's position in a single fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Catalog identifier of the fund
    pub fund_id: String,

    /// Units currently held (always > 0 while the holding exists)
    pub units: f64,

    /// Acquisition NAV used as the cost basis per unit.
    /// Repeat purchases blend it as a quantity-weighted average.
    pub purchase_nav: f64,
}

impl Holding {
    pub fn new(fund_id: impl Into<String>, units: f64, purchase_nav: f64) -> Self {
        Self {
            fund_id: fund_id.into(),
            units,
            purchase_nav,
        }
    }

    /// Cost basis: units × acquisition NAV.
    #[must_use]
    pub fn invested(&self) -> f64 {
        self.units * self.purchase_nav
    }

    /// Market value at the given NAV.
    #[must_use]
    pub fn value_at(&self, nav: f64) -> f64 {
        self.units * nav
    }

    /// Holding after buying `units` more at `nav`.
    /// The basis becomes the quantity-weighted average of old and new lots.
    #[must_use]
    pub fn after_purchase(&self, units: f64, nav: f64) -> Holding {
        let total_units = self.units + units;
        let purchase_nav = (self.invested() + units * nav) / total_units;
        Holding {
            fund_id: self.fund_id.clone(),
            units: total_units,
            purchase_nav,
        }
    }

    /// Holding after selling `units`, or `None` when nothing remains.
    /// The basis per unit is unchanged by a sale.
    #[must_use]
    pub fn after_sale(&self, units: f64) -> Option<Holding> {
        let remaining = self.units - units;
        if remaining <= UNIT_EPSILON {
            None
        } else {
            Some(Holding {
                fund_id: self.fund_id.clone(),
                units: remaining,
                purchase_nav: self.purchase_nav,
            })
        }
    }
}
