use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::fund::Fund;
use super::holding::{Holding, UNIT_EPSILON};
use super::intent::{TradeKind, TradePlan};
use super::portfolio::Portfolio;

/// In-memory mirror of one user's wallet and holdings.
///
/// Pure state: no I/O. Operations are split in two halves. `plan_*` checks
/// the rules and resolves the full before/after state without mutating
/// anything; `commit` applies a plan once the record store has accepted
/// every write. Invariants after each commit: balance ≥ 0 and every
/// holding has units > 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    balance: f64,
    portfolio: Portfolio,
}

impl Ledger {
    pub fn new(balance: f64, portfolio: Portfolio) -> Self {
        Self {
            balance: balance.max(0.0),
            portfolio,
        }
    }

    /// Uninvested cash.
    #[must_use]
    pub fn balance(&self) -> f64 {
        self.balance
    }

    #[must_use]
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Resolve a purchase of `units` of `fund` at its current NAV.
    pub fn plan_buy(&self, fund: &Fund, units: f64) -> Result<TradePlan, CoreError> {
        validate_units(units)?;
        validate_nav(fund)?;

        let cost = units * fund.nav;
        if cost > self.balance {
            return Err(CoreError::InsufficientFunds {
                required: cost,
                available: self.balance,
            });
        }

        let holding_before = self.portfolio.get(&fund.id).cloned();
        let holding_after = match &holding_before {
            Some(existing) => existing.after_purchase(units, fund.nav),
            None => Holding::new(fund.id.clone(), units, fund.nav),
        };

        Ok(TradePlan {
            kind: TradeKind::Buy,
            fund_id: Some(fund.id.clone()),
            units,
            nav: fund.nav,
            amount: cost,
            wallet_before: self.balance,
            wallet_after: self.balance - cost,
            holding_before,
            holding_after: Some(holding_after),
        })
    }

    /// Resolve a sale of `units` of `fund` at its current NAV.
    pub fn plan_sell(&self, fund: &Fund, units: f64) -> Result<TradePlan, CoreError> {
        validate_units(units)?;
        validate_nav(fund)?;

        let held = self.portfolio.units_of(&fund.id);
        let holding_before = match self.portfolio.get(&fund.id) {
            Some(h) if h.units + UNIT_EPSILON >= units => h.clone(),
            _ => {
                return Err(CoreError::InsufficientUnits {
                    fund_id: fund.id.clone(),
                    requested: units,
                    available: held,
                })
            }
        };

        // Float residue may leave the holding a hair below what the user asks for.
        let units = units.min(holding_before.units);
        let proceeds = units * fund.nav;
        let holding_after = holding_before.after_sale(units);

        Ok(TradePlan {
            kind: TradeKind::Sell,
            fund_id: Some(fund.id.clone()),
            units,
            nav: fund.nav,
            amount: proceeds,
            wallet_before: self.balance,
            wallet_after: self.balance + proceeds,
            holding_before: Some(holding_before),
            holding_after,
        })
    }

    /// Resolve a cash deposit.
    pub fn plan_deposit(&self, amount: f64) -> Result<TradePlan, CoreError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CoreError::Validation(format!(
                "Deposit amount must be a number greater than 0, got {amount}"
            )));
        }

        Ok(TradePlan {
            kind: TradeKind::Deposit,
            fund_id: None,
            units: 0.0,
            nav: 0.0,
            amount,
            wallet_before: self.balance,
            wallet_after: self.balance + amount,
            holding_before: None,
            holding_after: None,
        })
    }

    /// Apply a plan whose external writes have all succeeded.
    pub fn commit(&mut self, plan: &TradePlan) {
        self.balance = plan.wallet_after.max(0.0);

        if !plan.touches_holding() {
            return;
        }
        match (&plan.holding_after, &plan.fund_id) {
            (Some(after), _) => self.portfolio.put(after.clone()),
            (None, Some(fund_id)) => {
                self.portfolio.remove(fund_id);
            }
            (None, None) => {}
        }
    }
}

/// Outcome of a completed buy, sell or deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub kind: TradeKind,
    pub fund_id: Option<String>,
    pub units: f64,
    pub nav: f64,
    /// Cash moved by the operation
    pub amount: f64,
    /// Wallet balance after the operation
    pub wallet_balance: f64,
    /// Holding after the operation; `None` when sold out or for deposits
    pub holding: Option<Holding>,
}

impl From<&TradePlan> for TradeReceipt {
    fn from(plan: &TradePlan) -> Self {
        Self {
            kind: plan.kind,
            fund_id: plan.fund_id.clone(),
            units: plan.units,
            nav: plan.nav,
            amount: plan.amount,
            wallet_balance: plan.wallet_after,
            holding: plan.holding_after.clone(),
        }
    }
}

fn validate_units(units: f64) -> Result<(), CoreError> {
    if !units.is_finite() || units <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Units must be a number greater than 0, got {units}"
        )));
    }
    Ok(())
}

fn validate_nav(fund: &Fund) -> Result<(), CoreError> {
    if !fund.nav.is_finite() || fund.nav <= 0.0 {
        return Err(CoreError::Validation(format!(
            "Fund {} has no usable NAV ({})",
            fund.id, fund.nav
        )));
    }
    Ok(())
}
