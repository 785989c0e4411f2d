#![forbid(unsafe_code)]

/// A validated tree name. Immutable after creation; uniqueness is not
/// required (distinct trees may share a display name).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TreeName(String);

impl TreeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, TreeNameError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TreeNameError::Empty);
        }
        if trimmed.len() > 128 {
            return Err(TreeNameError::TooLong);
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(TreeNameError::ContainsControl);
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeNameError {
    Empty,
    TooLong,
    ContainsControl,
}

impl TreeNameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "tree name must not be empty",
            Self::TooLong => "tree name must be at most 128 bytes",
            Self::ContainsControl => "tree name contains control characters",
        }
    }
}
