//! In-process identity provider

use super::{AuthError, AuthErrorKind, AuthProvider, Credential, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info};

/// Consecutive failures after which an account is throttled
const MAX_FAILED_ATTEMPTS: u32 = 5;

#[derive(Debug)]
struct Account {
    uid: String,
    password: String,
    disabled: bool,
    failed_attempts: u32,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    forced_failure: Option<AuthErrorKind>,
}

/// [`AuthProvider`] backed by a fixed set of accounts.
///
/// Behaves like the hosted provider for the failures the login form cares
/// about: unknown email, wrong password, malformed email, disabled account
/// and throttling after repeated failures.
#[derive(Clone)]
pub struct MemoryAuth {
    inner: Arc<Mutex<Inner>>,
    session: Arc<watch::Sender<Option<User>>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            session: Arc::new(session),
        }
    }

    /// Builder form of [`MemoryAuth::add_account`]
    pub fn with_account(self, email: &str, password: &str) -> Self {
        self.add_account(email, password);
        self
    }

    /// Register an account; returns its uid
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let mut inner = self.lock();
        let uid = format!("uid-{}", inner.accounts.len() + 1);
        inner.accounts.insert(
            email.to_lowercase(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
                disabled: false,
                failed_attempts: 0,
            },
        );
        uid
    }

    pub fn disable(&self, email: &str) {
        if let Some(account) = self.lock().accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Make every sign-in fail with `kind` until cleared with `None`
    pub fn force_failure(&self, kind: Option<AuthErrorKind>) {
        self.lock().forced_failure = kind;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let mut inner = self.lock();
        if let Some(kind) = inner.forced_failure {
            return Err(AuthError::new(kind, "forced failure"));
        }
        if !looks_like_email(email) {
            return Err(AuthError::new(
                AuthErrorKind::InvalidEmail,
                format!("{:?} is not an email address", email),
            ));
        }

        let account = inner
            .accounts
            .get_mut(&email.to_lowercase())
            .ok_or_else(|| AuthError::new(AuthErrorKind::UserNotFound, "no such account"))?;

        if account.disabled {
            return Err(AuthError::new(AuthErrorKind::UserDisabled, "account disabled"));
        }
        if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
            return Err(AuthError::new(
                AuthErrorKind::TooManyRequests,
                "account temporarily locked",
            ));
        }
        if account.password != password {
            account.failed_attempts += 1;
            return Err(AuthError::new(AuthErrorKind::WrongPassword, "password mismatch"));
        }

        account.failed_attempts = 0;
        Ok(User {
            uid: account.uid.clone(),
            email: Some(email.to_string()),
        })
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AuthError> {
        let user = match self.check(email, password) {
            Ok(user) => user,
            Err(e) => {
                debug!(email, code = %e.code, "Sign-in rejected");
                return Err(e);
            }
        };

        info!(uid = %user.uid, "Signed in");
        self.session.send_replace(Some(user.clone()));

        Ok(Credential {
            id_token: format!("memory-token-{}", user.uid),
            user,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.session.send_replace(None).is_some() {
            info!("Signed out");
        }
        Ok(())
    }

    fn session_changes(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_publishes_session() {
        let auth = MemoryAuth::new().with_account("admin@example.com", "secret");
        let session = auth.session_changes();
        assert!(session.borrow().is_none());

        let credential = auth.sign_in("admin@example.com", "secret").await.unwrap();
        assert_eq!(credential.user.email.as_deref(), Some("admin@example.com"));
        assert_eq!(session.borrow().as_ref(), Some(&credential.user));

        auth.sign_out().await.unwrap();
        assert!(session.borrow().is_none());
    }

    #[tokio::test]
    async fn test_failure_kinds() {
        let auth = MemoryAuth::new().with_account("admin@example.com", "secret");

        let err = auth.sign_in("nobody@example.com", "x").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::UserNotFound);

        let err = auth.sign_in("not-an-email", "x").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::InvalidEmail);

        let err = auth.sign_in("admin@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::WrongPassword);

        auth.disable("admin@example.com");
        let err = auth.sign_in("admin@example.com", "secret").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::UserDisabled);
        assert!(auth.session_changes().borrow().is_none());
    }

    #[tokio::test]
    async fn test_throttles_after_repeated_failures() {
        let auth = MemoryAuth::new().with_account("admin@example.com", "secret");
        for _ in 0..MAX_FAILED_ATTEMPTS {
            auth.sign_in("admin@example.com", "wrong").await.unwrap_err();
        }
        let err = auth.sign_in("admin@example.com", "secret").await.unwrap_err();
        assert_eq!(err.kind, AuthErrorKind::TooManyRequests);
    }
}
