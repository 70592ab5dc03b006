//! Bookmark record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, ValidationError};
use crate::types::{OwnerId, RecordId};

/// A bookmark record as held by the record store.
///
/// `id` and `created_at` are assigned by the store on creation; no field
/// is ever mutated afterwards (there is no edit operation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkRecord {
    /// Store-assigned unique identifier.
    pub id: RecordId,

    /// Display title, set at creation.
    pub title: String,

    /// The bookmarked URL.
    pub target: Url,

    /// The identity that created the record.
    pub owner: OwnerId,

    /// Store-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// The caller-supplied fields of a bookmark, validated at construction.
///
/// A draft that exists is a draft the store will not reject for input
/// reasons; constraint checks beyond format stay store-side.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkDraft {
    title: String,
    target: Url,
}

impl BookmarkDraft {
    /// Validate a title and target into a draft.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the title is empty, the target
    /// is empty, or the target is not a parseable absolute URL. Nothing
    /// is sent anywhere on failure.
    pub fn new(title: impl AsRef<str>, target: impl AsRef<str>) -> Result<Self, Error> {
        let title = title.as_ref();
        let target = target.as_ref();

        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        if target.trim().is_empty() {
            return Err(ValidationError::EmptyTarget.into());
        }

        let target = Url::parse(target).map_err(|e| ValidationError::TargetUrl {
            value: target.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            title: title.to_string(),
            target,
        })
    }

    /// Returns the title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the target URL.
    pub fn target(&self) -> &Url {
        &self.target
    }
}
