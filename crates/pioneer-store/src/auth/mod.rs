//! Password authentication
//!
//! [`AuthProvider`] is the seam the portal's session layer talks to. Two
//! implementations are provided: [`MemoryAuth`] for tests and local runs, and
//! [`PasswordAuth`] against the identity-toolkit REST API.

mod memory;
mod password;

pub use memory::MemoryAuth;
pub use password::PasswordAuth;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// A signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct Credential {
    pub user: User,
    /// Token attached to store requests. It is not refreshed; once it
    /// expires the store refuses reads and the synchronizers fail.
    pub id_token: String,
}

/// Why a sign-in failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    UserNotFound,
    WrongPassword,
    InvalidEmail,
    UserDisabled,
    TooManyRequests,
    Network,
    InvalidCredential,
    ApiKeyExpired,
    Other,
}

impl AuthErrorKind {
    /// Classify a provider error code.
    ///
    /// Accepts both `auth/...` style codes and the upper-case codes returned
    /// by the REST API (which may carry a ` : detail` suffix).
    pub fn from_code(code: &str) -> Self {
        let head = code.split(" : ").next().unwrap_or(code).trim();
        match head {
            "auth/user-not-found" | "EMAIL_NOT_FOUND" => Self::UserNotFound,
            "auth/wrong-password" | "INVALID_PASSWORD" => Self::WrongPassword,
            "auth/invalid-email" | "INVALID_EMAIL" => Self::InvalidEmail,
            "auth/user-disabled" | "USER_DISABLED" => Self::UserDisabled,
            "auth/too-many-requests" | "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "auth/network-request-failed" => Self::Network,
            "auth/invalid-credential" | "INVALID_LOGIN_CREDENTIALS" => Self::InvalidCredential,
            "auth/api-key-expired" | "API_KEY_INVALID" => Self::ApiKeyExpired,
            other if other.starts_with("API key expired") || other.starts_with("API key not valid") => {
                Self::ApiKeyExpired
            }
            _ => Self::Other,
        }
    }

    /// Canonical `auth/...` code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "auth/user-not-found",
            Self::WrongPassword => "auth/wrong-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::UserDisabled => "auth/user-disabled",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::Network => "auth/network-request-failed",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::ApiKeyExpired => "auth/api-key-expired",
            Self::Other => "auth/internal-error",
        }
    }
}

/// Sign-in failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {detail}")]
pub struct AuthError {
    pub kind: AuthErrorKind,
    /// Code as reported by the provider
    pub code: String,
    pub detail: String,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_string(),
            detail: detail.into(),
        }
    }

    /// Build from a provider code, classifying it
    pub fn from_code(code: impl Into<String>, detail: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            kind: AuthErrorKind::from_code(&code),
            code,
            detail: detail.into(),
        }
    }

    /// Message shown on the login form
    pub fn user_message(&self) -> String {
        let reason = match self.kind {
            AuthErrorKind::UserNotFound => "No account found with this email address.".to_string(),
            AuthErrorKind::WrongPassword => "Incorrect password.".to_string(),
            AuthErrorKind::InvalidEmail => "Invalid email address format.".to_string(),
            AuthErrorKind::UserDisabled => "This account has been disabled.".to_string(),
            AuthErrorKind::TooManyRequests => {
                "Too many failed attempts. Please try again later.".to_string()
            }
            AuthErrorKind::Network => "Network error. Please check your connection.".to_string(),
            AuthErrorKind::InvalidCredential => "Invalid credentials provided.".to_string(),
            AuthErrorKind::ApiKeyExpired => {
                "API key expired. Configuration has been updated - please try again.".to_string()
            }
            AuthErrorKind::Other => format!("Error: {} - {}", self.code, self.detail),
        };
        format!("Login failed. {}", reason)
    }
}

/// Identity provider for the portal's administrators
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AuthError>;

    /// End the current session
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Current user, updated on every sign-in and sign-out
    fn session_changes(&self) -> watch::Receiver<Option<User>>;
}
