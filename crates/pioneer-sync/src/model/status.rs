use super::Document;
use crate::error::{Field, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public capacity counters under `liveStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LiveStatus {
    /// Active (non-frozen) pioneers; derived
    pub total_pioneers: u64,
    pub total_capacity: u64,
}

impl Default for LiveStatus {
    fn default() -> Self {
        Self {
            total_pioneers: 0,
            total_capacity: 100,
        }
    }
}

impl LiveStatus {
    /// Remaining spots; zero when over capacity
    pub fn available(&self) -> u64 {
        self.total_capacity.saturating_sub(self.total_pioneers)
    }
}

impl Document for LiveStatus {}

/// Service health shown on the public site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServerState {
    #[default]
    Operational,
    Maintenance,
    Outage,
}

impl ServerState {
    pub const ALL: [ServerState; 3] = [Self::Operational, Self::Maintenance, Self::Outage];

    pub const NAMES: &'static [&'static str] = &["Operational", "Maintenance", "Outage"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "Operational",
            Self::Maintenance => "Maintenance",
            Self::Outage => "Outage",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Operational => "Operational",
            Self::Maintenance => "Maintenance",
            Self::Outage => "Major Outage",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::not_in_enum(Field::ServerStatus, Self::NAMES))
    }
}

/// `siteContent/serverStatus`, always written whole
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: ServerState,
    #[serde(default)]
    pub message: String,
}

impl Document for ServerStatus {}

/// Server status editor buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatusInput {
    pub status: String,
    pub message: String,
}

impl ServerStatusInput {
    pub fn new(status: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
        }
    }
}

impl Default for ServerStatusInput {
    fn default() -> Self {
        Self::from(&ServerStatus::default())
    }
}

impl From<&ServerStatus> for ServerStatusInput {
    fn from(document: &ServerStatus) -> Self {
        Self::new(document.status.as_str(), document.message.clone())
    }
}

impl super::FormInput for ServerStatusInput {
    type Fields = ServerStatus;

    /// The message may be empty
    fn validate(&self) -> Result<ServerStatus, ValidationError> {
        Ok(ServerStatus {
            status: self.status.parse()?,
            message: self.message.trim().to_string(),
        })
    }
}
