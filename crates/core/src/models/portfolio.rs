use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::holding::{Holding, UNIT_EPSILON};

/// Fund id → holding. Every key present has `units > 0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    holdings: HashMap<String, Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from store rows, dropping any with non-positive units.
    pub fn from_holdings(holdings: impl IntoIterator<Item = Holding>) -> Self {
        let mut portfolio = Self::new();
        for holding in holdings {
            portfolio.put(holding);
        }
        portfolio
    }

    #[must_use]
    pub fn get(&self, fund_id: &str) -> Option<&Holding> {
        self.holdings.get(fund_id)
    }

    /// Units held of a fund (0 when absent).
    #[must_use]
    pub fn units_of(&self, fund_id: &str) -> f64 {
        self.holdings.get(fund_id).map_or(0.0, |h| h.units)
    }

    #[must_use]
    pub fn contains(&self, fund_id: &str) -> bool {
        self.holdings.contains_key(fund_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    /// Holdings sorted by fund id, for deterministic display.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Holding> {
        let mut holdings: Vec<&Holding> = self.holdings.values().collect();
        holdings.sort_by(|a, b| a.fund_id.cmp(&b.fund_id));
        holdings
    }

    /// Insert or replace a holding. A holding with no units removes the key.
    pub(crate) fn put(&mut self, holding: Holding) {
        if holding.units > UNIT_EPSILON {
            self.holdings.insert(holding.fund_id.clone(), holding);
        } else {
            self.holdings.remove(&holding.fund_id);
        }
    }

    pub(crate) fn remove(&mut self, fund_id: &str) -> Option<Holding> {
        self.holdings.remove(fund_id)
    }
}
