//! Authenticated session
//!
//! A [`Session`] is created once per process with [`Session::start`], passed
//! by reference to whatever needs the signed-in user, and ended with
//! [`Session::shutdown`].

use crate::error::{Result, SdkError};
use pioneer_store::{AuthProvider, Credential, User};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{info, warn};

pub struct Session {
    auth: Arc<dyn AuthProvider>,
    user: watch::Receiver<Option<User>>,
    credential: Mutex<Option<Credential>>,
}

impl Session {
    /// Attach to the provider's session stream
    pub fn start(auth: Arc<dyn AuthProvider>) -> Self {
        let user = auth.session_changes();
        info!(signed_in = user.borrow().is_some(), "Session started");
        Self {
            auth,
            user,
            credential: Mutex::new(None),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    /// The signed-in user, or `Unauthenticated`
    pub fn require_user(&self) -> Result<User> {
        self.current_user().ok_or(SdkError::Unauthenticated)
    }

    /// Token of the most recent sign-in, for store requests
    pub fn id_token(&self) -> Option<String> {
        self.lock_credential().as_ref().map(|c| c.id_token.clone())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        match self.auth.sign_in(email, password).await {
            Ok(credential) => {
                let user = credential.user.clone();
                *self.lock_credential() = Some(credential);
                Ok(user)
            }
            Err(e) => {
                warn!(code = %e.code, "Sign-in failed");
                Err(e.into())
            }
        }
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await?;
        *self.lock_credential() = None;
        Ok(())
    }

    /// Receiver that changes on every sign-in and sign-out
    pub fn changes(&self) -> watch::Receiver<Option<User>> {
        self.user.clone()
    }

    /// Detach from the provider. The provider's own session is left as is.
    pub fn shutdown(self) {
        info!("Session ended");
    }

    fn lock_credential(&self) -> std::sync::MutexGuard<'_, Option<Credential>> {
        self.credential.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
