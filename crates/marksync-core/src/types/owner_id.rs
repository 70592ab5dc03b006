//! Owner id type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationError};

/// The identifier of the authenticated identity owning a record.
///
/// Assigned by the session provider; the core only ever reads it to
/// scope record visibility and stamp ownership at creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create an owner id from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or contains whitespace
    /// or path separators.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();

        if s.is_empty() {
            return Err(ValidationError::OwnerId {
                value: s.to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if s.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ValidationError::OwnerId {
                value: s.to_string(),
                reason: "must not contain whitespace or '/'".to_string(),
            }
            .into());
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OwnerId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_owner_id() {
        let id = OwnerId::new("3f0b7e52-9d6a-4c1e-8b2f-1a2b3c4d5e6f").unwrap();
        assert_eq!(id.as_str(), "3f0b7e52-9d6a-4c1e-8b2f-1a2b3c4d5e6f");
    }

    #[test]
    fn rejects_empty() {
        assert!(OwnerId::new("").is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(OwnerId::new("user one").is_err());
    }
}
