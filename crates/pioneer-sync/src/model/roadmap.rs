use super::{required, DisplayOrder, Entity, FormInput};
use crate::error::{Field, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Icon shown next to a roadmap item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadmapIcon {
    Engine,
    Media,
    Dashboard,
    Rocket,
    Security,
}

impl RoadmapIcon {
    pub const ALL: [RoadmapIcon; 5] = [
        Self::Engine,
        Self::Media,
        Self::Dashboard,
        Self::Rocket,
        Self::Security,
    ];

    pub const NAMES: &'static [&'static str] = &["engine", "media", "dashboard", "rocket", "security"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Media => "media",
            Self::Dashboard => "dashboard",
            Self::Rocket => "rocket",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for RoadmapIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoadmapIcon {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|icon| icon.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::not_in_enum(Field::Icon, Self::NAMES))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapFields {
    pub title: String,
    pub description: String,
    pub icon: RoadmapIcon,
}

/// A public roadmap entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoadmapItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub icon: RoadmapIcon,
}

impl Entity for RoadmapItem {
    type Fields = RoadmapFields;
    type Input = RoadmapInput;

    const ORDER: DisplayOrder = DisplayOrder::Iteration;

    fn from_fields(id: String, fields: RoadmapFields) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            icon: fields.icon,
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn search_text(&self) -> [&str; 2] {
        [&self.title, &self.description]
    }

    fn to_input(&self) -> RoadmapInput {
        RoadmapInput {
            title: self.title.clone(),
            description: self.description.clone(),
            icon: self.icon.as_str().to_string(),
        }
    }
}

/// Roadmap form buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadmapInput {
    pub title: String,
    pub description: String,
    pub icon: String,
}

impl RoadmapInput {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            icon: icon.into(),
        }
    }
}

impl Default for RoadmapInput {
    fn default() -> Self {
        Self::new("", "", RoadmapIcon::Engine.as_str())
    }
}

impl FormInput for RoadmapInput {
    type Fields = RoadmapFields;

    fn validate(&self) -> Result<RoadmapFields, ValidationError> {
        Ok(RoadmapFields {
            title: required(Field::Title, &self.title)?,
            description: required(Field::Description, &self.description)?,
            icon: self.icon.parse()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let fields = RoadmapInput::new(" Launch ", "Go live", "rocket").validate().unwrap();
        assert_eq!(fields.title, "Launch");
        assert_eq!(fields.icon, RoadmapIcon::Rocket);

        let err = RoadmapInput::new("Launch", "", "rocket").validate().unwrap_err();
        assert_eq!(err.field, Field::Description);

        let err = RoadmapInput::new("Launch", "Go", "spaceship").validate().unwrap_err();
        assert_eq!(err.field, Field::Icon);
    }

    #[test]
    fn test_default_icon() {
        assert_eq!(RoadmapInput::default().icon, "engine");
        assert_eq!(
            serde_json::to_value(RoadmapIcon::Security).unwrap(),
            serde_json::json!("security")
        );
    }
}
