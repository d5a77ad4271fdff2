use serde::{Deserialize, Serialize};

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id (row owner in the record store)
    pub user_id: String,

    /// Bearer token forwarded to the record store, if the provider issues one
    pub access_token: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }
}
