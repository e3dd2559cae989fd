use super::{required, DisplayOrder, Entity, FormInput};
use crate::error::{Field, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Directory tier of a pioneer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PioneerStatus {
    Pioneer,
    Partner,
    Frozen,
}

impl PioneerStatus {
    pub const ALL: [PioneerStatus; 3] = [Self::Pioneer, Self::Partner, Self::Frozen];

    /// Wire spellings, in form order
    pub const NAMES: &'static [&'static str] = &["PIONEER", "PARTNER", "FROZEN"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pioneer => "PIONEER",
            Self::Partner => "PARTNER",
            Self::Frozen => "FROZEN",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pioneer => "Pioneer (Free)",
            Self::Partner => "Partner (Paid)",
            Self::Frozen => "Frozen",
        }
    }

    /// Frozen pioneers do not count towards the live total
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Frozen)
    }
}

impl fmt::Display for PioneerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PioneerStatus {
    type Err = ValidationError;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::not_in_enum(Field::Status, Self::NAMES))
    }
}

/// Stored fields of a pioneer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PioneerFields {
    pub name: String,
    pub page: String,
    pub status: PioneerStatus,
}

/// A directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pioneer {
    pub id: String,
    pub name: String,
    pub page: String,
    pub status: PioneerStatus,
}

impl Entity for Pioneer {
    type Fields = PioneerFields;
    type Input = PioneerInput;

    const ORDER: DisplayOrder = DisplayOrder::Reversed;

    fn from_fields(id: String, fields: PioneerFields) -> Self {
        Self {
            id,
            name: fields.name,
            page: fields.page,
            status: fields.status,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> [&str; 2] {
        [&self.name, &self.page]
    }

    fn to_input(&self) -> PioneerInput {
        PioneerInput {
            name: self.name.clone(),
            page: self.page.clone(),
            status: self.status.as_str().to_string(),
        }
    }
}

/// Pioneer form buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PioneerInput {
    pub name: String,
    pub page: String,
    pub status: String,
}

impl PioneerInput {
    pub fn new(name: impl Into<String>, page: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            page: page.into(),
            status: status.into(),
        }
    }
}

impl Default for PioneerInput {
    fn default() -> Self {
        Self::new("", "", PioneerStatus::Pioneer.as_str())
    }
}

impl FormInput for PioneerInput {
    type Fields = PioneerFields;

    fn validate(&self) -> Result<PioneerFields, ValidationError> {
        Ok(PioneerFields {
            name: required(Field::Name, &self.name)?,
            page: required(Field::Page, &self.page)?,
            status: self.status.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Reason;
    use serde_json::json;

    #[test]
    fn test_wire_spelling() {
        let fields: PioneerFields =
            serde_json::from_value(json!({"name": "Ann", "page": "ann.page", "status": "PARTNER"}))
                .unwrap();
        assert_eq!(fields.status, PioneerStatus::Partner);
        assert_eq!(serde_json::to_value(PioneerStatus::Frozen).unwrap(), json!("FROZEN"));

        let lower = serde_json::from_value::<PioneerFields>(
            json!({"name": "Ann", "page": "ann.page", "status": "frozen"}),
        );
        assert!(lower.is_err());
    }

    #[test]
    fn test_validate_trims() {
        let fields = PioneerInput::new("  Ann ", "ann.page\n", "pioneer").validate().unwrap();
        assert_eq!(fields.name, "Ann");
        assert_eq!(fields.page, "ann.page");
        assert_eq!(fields.status, PioneerStatus::Pioneer);
    }

    #[test]
    fn test_validate_rejects() {
        let err = PioneerInput::new("   ", "p", "PIONEER").validate().unwrap_err();
        assert_eq!(err.field, Field::Name);
        assert_eq!(err.reason, Reason::Empty);

        let err = PioneerInput::new("Ann", "p", "GOLD").validate().unwrap_err();
        assert_eq!(err.field, Field::Status);
        assert!(matches!(err.reason, Reason::NotInEnum { .. }));
    }

    #[test]
    fn test_defaults_and_prefill() {
        assert_eq!(PioneerInput::default().status, "PIONEER");

        let pioneer = Pioneer {
            id: "p1".into(),
            name: "Ann".into(),
            page: "ann.page".into(),
            status: PioneerStatus::Frozen,
        };
        assert_eq!(pioneer.to_input(), PioneerInput::new("Ann", "ann.page", "FROZEN"));
        assert!(!pioneer.status.is_active());
    }
}
