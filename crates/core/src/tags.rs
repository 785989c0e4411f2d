#![forbid(unsafe_code)]

/// A validated tag name. Tag names are globally unique in the store; the
/// uniqueness check lives there, this type only guards the shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagName(String);

impl TagName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, TagNameError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TagNameError::Empty);
        }
        if trimmed.len() > 128 {
            return Err(TagNameError::TooLong);
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(TagNameError::ContainsControl);
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagNameError {
    Empty,
    TooLong,
    ContainsControl,
}

impl TagNameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "tag name must not be empty",
            Self::TooLong => "tag name must be at most 128 bytes",
            Self::ContainsControl => "tag name contains control characters",
        }
    }
}
