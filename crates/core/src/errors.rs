use thiserror::Error;

/// Unified error type for the entire fund-tracker-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Validation ──────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Ledger rules ────────────────────────────────────────────────
    #[error("Insufficient balance: required {required:.2}, available {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("Not enough units of {fund_id} to sell: requested {requested}, available {available}")]
    InsufficientUnits {
        fund_id: String,
        requested: f64,
        available: f64,
    },

    // ── Session ─────────────────────────────────────────────────────
    #[error("Not signed in: please sign in to continue")]
    Unauthenticated,

    #[error("Another wallet operation is still in progress")]
    OperationInProgress,

    // ── Record store ────────────────────────────────────────────────
    #[error("Record store error during {operation}: {message}")]
    Store { operation: String, message: String },

    #[error("Rollback of intent {intent_id} failed, wallet may be out of sync: {message}")]
    CompensationFailed { intent_id: String, message: String },

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No fund data provider registered")]
    NoProvider,

    #[error("Fund catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Fund not found: {0}")]
    FundNotFound(String),

    #[error("NAV data not available for fund {0}")]
    PriceNotAvailable(String),

    // ── Intent log file ─────────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported file version: {0}")]
    UnsupportedVersion(u16),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

impl CoreError {
    /// Shorthand for a failed record-store call.
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether the caller can reasonably offer a "Retry" for this error.
    /// Rule violations and validation problems are not retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_)
                | CoreError::Api { .. }
                | CoreError::CatalogUnavailable(_)
                | CoreError::Store { .. }
                | CoreError::OperationInProgress
        )
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(e: bincode::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors embed the full URL; the record store puts user ids
        // and filters in the query string, so strip it.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
