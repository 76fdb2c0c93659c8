use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FieldIdError {
    #[error("field identifier is empty")]
    Empty,
}

/// Stable `name` attribute of a target form input.
///
/// Collaborators sometimes key their payloads by the full selector
/// (`input[name='CardNumber']`); [`FieldId::parse`] accepts both spellings
/// and keeps only the bare name.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(try_from = "String", into = "String"))]
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldId(String);

impl FieldId {
    pub fn parse(raw: &str) -> Result<Self, FieldIdError> {
        let trimmed = raw.trim();
        let bare = strip_name_selector(trimmed).unwrap_or(trimmed).trim();
        if bare.is_empty() {
            return Err(FieldIdError::Empty);
        }
        Ok(Self(bare.to_string()))
    }

    /// Identifier for a name known at compile time, such as a built-in
    /// task list entry. The name is taken as given.
    pub fn from_static(name: &'static str) -> Self {
        debug_assert!(!name.trim().is_empty(), "static field id must not be empty");
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn strip_name_selector(raw: &str) -> Option<&str> {
    let inner = raw.strip_prefix("input[name=")?.strip_suffix(']')?;
    for quote in ['\'', '"'] {
        if let Some(name) = inner
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(name);
        }
    }
    Some(inner)
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for FieldId {
    type Error = FieldIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FieldId::parse(&value)
    }
}

impl From<FieldId> for String {
    fn from(value: FieldId) -> Self {
        value.0
    }
}

impl std::str::FromStr for FieldId {
    type Err = FieldIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldId::parse(s)
    }
}

/// Correlation id for one fill pass; only used for log correlation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct PassId(pub String);

impl PassId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_pass_through() {
        let id = FieldId::parse("CardNumber").unwrap();
        assert_eq!(id.as_str(), "CardNumber");
    }

    #[test]
    fn selector_spellings_are_normalized() {
        for raw in [
            "input[name='VidMpV008']",
            "input[name=\"VidMpV008\"]",
            "input[name=VidMpV008]",
            "  input[name='VidMpV008']  ",
        ] {
            assert_eq!(FieldId::parse(raw).unwrap().as_str(), "VidMpV008", "{raw}");
        }
    }

    #[test]
    fn dotted_identifiers_are_kept() {
        assert_eq!(
            FieldId::parse("field.lastName").unwrap().to_string(),
            "field.lastName"
        );
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        assert_eq!(FieldId::parse("   "), Err(FieldIdError::Empty));
        assert_eq!(FieldId::parse("input[name='']"), Err(FieldIdError::Empty));
    }
}
