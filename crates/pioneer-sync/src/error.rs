//! Error types for the portal core

use pioneer_store::{AuthError, StoreError, SubscriptionFault};
use std::fmt;
use thiserror::Error;

/// Result type for portal operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// Portal error types
#[derive(Error, Debug)]
pub enum SdkError {
    /// A synchronizer failed
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Input rejected before reaching the store
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Sign-in failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The store refused or failed a write
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation requires a signed-in user
    #[error("Not signed in")]
    Unauthenticated,
}

impl SdkError {
    /// Message suitable for showing to the operator
    pub fn user_message(&self) -> String {
        match self {
            SdkError::Validation(e) => e.user_message(),
            SdkError::Auth(e) => e.user_message(),
            SdkError::Store(e) if e.is_permission_denied() => {
                "Permission denied. Your account cannot change this data.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Why a synchronizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncErrorKind {
    PermissionDenied,
    Disconnected,
    Timeout,
    Malformed,
}

impl SyncErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncErrorKind::PermissionDenied => "permission-denied",
            SyncErrorKind::Disconnected => "disconnected",
            SyncErrorKind::Timeout => "timeout",
            SyncErrorKind::Malformed => "malformed",
        }
    }
}

impl fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SubscriptionFault> for SyncErrorKind {
    fn from(fault: SubscriptionFault) -> Self {
        match fault {
            SubscriptionFault::PermissionDenied => SyncErrorKind::PermissionDenied,
            SubscriptionFault::Disconnected => SyncErrorKind::Disconnected,
            SubscriptionFault::Malformed => SyncErrorKind::Malformed,
        }
    }
}

/// Terminal failure of a synchronizer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Sync {kind} at {path}: {detail}")]
pub struct SyncError {
    pub kind: SyncErrorKind,
    pub path: String,
    pub detail: String,
}

impl SyncError {
    pub fn new(kind: SyncErrorKind, path: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.to_string(),
            detail: detail.into(),
        }
    }
}

/// Form field a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Page,
    Status,
    Title,
    Description,
    Icon,
    Capacity,
    ServerStatus,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Page => "page",
            Field::Status => "status",
            Field::Title => "title",
            Field::Description => "description",
            Field::Icon => "icon",
            Field::Capacity => "capacity",
            Field::ServerStatus => "server status",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Field::Id => "Id",
            Field::Name => "Name",
            Field::Page => "Business page",
            Field::Status => "Status",
            Field::Title => "Title",
            Field::Description => "Description",
            Field::Icon => "Icon",
            Field::Capacity => "Capacity",
            Field::ServerStatus => "Server status",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a field was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Blank after trimming
    Empty,
    /// Not one of the allowed values
    NotInEnum { allowed: &'static [&'static str] },
    NotAnInteger,
    Negative,
    /// Capacity below the number of active pioneers
    BelowActiveCount { active: u64 },
    /// Pioneer list not loaded, so the active count is unknown
    CountUnavailable,
    /// Cannot be used as a single store key
    InvalidKey,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Empty => f.write_str("empty"),
            Reason::NotInEnum { allowed } => write!(f, "not one of {}", allowed.join(", ")),
            Reason::NotAnInteger => f.write_str("not an integer"),
            Reason::Negative => f.write_str("negative"),
            Reason::BelowActiveCount { active } => {
                write!(f, "below active pioneer count {}", active)
            }
            Reason::CountUnavailable => f.write_str("active pioneer count unavailable"),
            Reason::InvalidKey => f.write_str("invalid key"),
        }
    }
}

/// Input rejected before any store call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: Field,
    pub reason: Reason,
}

impl ValidationError {
    pub fn new(field: Field, reason: Reason) -> Self {
        Self { field, reason }
    }

    pub fn empty(field: Field) -> Self {
        Self::new(field, Reason::Empty)
    }

    pub fn not_in_enum(field: Field, allowed: &'static [&'static str]) -> Self {
        Self::new(field, Reason::NotInEnum { allowed })
    }

    pub fn user_message(&self) -> String {
        let label = self.field.label();
        match &self.reason {
            Reason::Empty => format!("{} is required.", label),
            Reason::NotInEnum { allowed } => {
                format!("{} must be one of: {}.", label, allowed.join(", "))
            }
            Reason::NotAnInteger => "Invalid capacity. Enter a whole number.".to_string(),
            Reason::Negative => "Invalid capacity. It cannot be negative.".to_string(),
            Reason::BelowActiveCount { active } => format!(
                "Invalid capacity. It cannot be lower than the {} active pioneers.",
                active
            ),
            Reason::CountUnavailable => {
                "Invalid capacity. Pioneer data is still loading.".to_string()
            }
            Reason::InvalidKey => format!("{} is not a valid key.", label),
        }
    }
}
