use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("display name cannot be empty")]
    EmptyDisplayName,
}

/// Non-empty, trimmed display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// # Errors
    ///
    /// Returns `ProfileError::EmptyDisplayName` for empty or whitespace-only input.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ProfileError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::EmptyDisplayName);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

/// Per-user profile; the display name is the only required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: DisplayName,
}

impl Profile {
    #[must_use]
    pub fn new(display_name: DisplayName) -> Self {
        Self { display_name }
    }

    /// # Errors
    ///
    /// Returns `ProfileError` if the name is blank.
    pub fn from_name(name: impl Into<String>) -> Result<Self, ProfileError> {
        Ok(Self::new(DisplayName::parse(name)?))
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }
}
