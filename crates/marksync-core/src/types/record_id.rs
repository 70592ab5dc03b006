//! Record id type.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ValidationError};

/// An opaque record identifier assigned by the record store.
///
/// Ids are store-assigned and immutable. The local collection is kept in
/// descending id order, so `RecordId` carries the one ordering rule the
/// whole system agrees on: ids made only of decimal digits compare by
/// numeric magnitude, everything else compares lexicographically.
///
/// # Example
///
/// ```
/// use marksync_core::RecordId;
///
/// let a = RecordId::new("9").unwrap();
/// let b = RecordId::new("10").unwrap();
/// assert!(b > a);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a record id from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is empty or contains whitespace
    /// or path separators.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();

        if s.is_empty() {
            return Err(ValidationError::RecordId {
                value: s.to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if s.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(ValidationError::RecordId {
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

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        let a = self.0.as_str();
        let b = other.0.as_str();

        let both_numeric =
            a.bytes().all(|c| c.is_ascii_digit()) && b.bytes().all(|c| c.is_ascii_digit());

        if both_numeric {
            // Shorter digit strings are smaller numbers; leading zeros
            // do not occur in store-assigned ids.
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        } else {
            a.cmp(b)
        }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
