use async_trait::async_trait;
use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::user::Identity;

/// Source of the signed-in identity.
///
/// The tracker never authenticates users itself; it only asks who is signed
/// in and forwards sign-out.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current identity, or `None` when nobody is signed in.
    async fn current_user(&self) -> Option<Identity>;

    async fn sign_out(&self) -> Result<(), CoreError>;
}

/// Auth provider holding the identity in process memory.
/// Suitable for embedding applications that authenticate elsewhere.
#[derive(Debug, Default)]
pub struct LocalAuthProvider {
    current: Mutex<Option<Identity>>,
}

impl LocalAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider with `identity` already signed in.
    pub fn signed_in(identity: Identity) -> Self {
        Self {
            current: Mutex::new(Some(identity)),
        }
    }

    pub fn sign_in(&self, identity: Identity) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = Some(identity);
    }
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn current_user(&self) -> Option<Identity> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn sign_out(&self) -> Result<(), CoreError> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = None;
        Ok(())
    }
}
