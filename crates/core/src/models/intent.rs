use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::holding::Holding;

/// Kind of wallet-affecting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    Buy,
    Sell,
    Deposit,
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "Buy"),
            TradeKind::Sell => write!(f, "Sell"),
            TradeKind::Deposit => write!(f, "Deposit"),
        }
    }
}

/// Fully resolved before/after state of one operation.
///
/// Every external write is an absolute value taken from here, so replaying
/// either the forward writes or the compensating writes is idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub kind: TradeKind,

    /// Fund traded; `None` for deposits
    pub fund_id: Option<String>,

    /// Units bought or sold (0 for deposits)
    pub units: f64,

    /// NAV the trade executed at (0 for deposits)
    pub nav: f64,

    /// Cash moved: cost of a buy, proceeds of a sale, or the deposit
    pub amount: f64,

    pub wallet_before: f64,
    pub wallet_after: f64,

    /// Holding as stored before the operation (`None` if absent)
    pub holding_before: Option<Holding>,

    /// Holding as it must be stored afterwards (`None` = delete the row)
    pub holding_after: Option<Holding>,
}

impl TradePlan {
    /// Whether the operation touches a holding row at all.
    #[must_use]
    pub fn touches_holding(&self) -> bool {
        self.kind != TradeKind::Deposit
    }
}

/// How far a journaled operation got before the process stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntentStage {
    /// Journaled, nothing written yet (or outcome of the wallet write unknown)
    Started,
    /// Wallet row holds `wallet_after`
    WalletWritten,
    /// Wallet and holding rows both hold their "after" values
    HoldingWritten,
}

/// Journal entry for an in-flight operation against the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub id: Uuid,
    pub user_id: String,
    pub plan: TradePlan,
    pub stage: IntentStage,
    pub created_at: DateTime<Utc>,
}

impl TradeIntent {
    pub fn new(user_id: impl Into<String>, plan: TradePlan) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            plan,
            stage: IntentStage::Started,
            created_at: Utc::now(),
        }
    }

    /// Both writes landed; recovery only needs to drop the entry.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        match self.stage {
            IntentStage::HoldingWritten => true,
            IntentStage::WalletWritten => !self.plan.touches_holding(),
            IntentStage::Started => false,
        }
    }
}
