//! Record store trait.

use async_trait::async_trait;

use crate::record::{BookmarkDraft, BookmarkRecord};
use crate::types::{OwnerId, RecordId};
use crate::Result;

use super::BoxedChangeFeed;

/// A remote store holding one collection of bookmark records.
///
/// Ownership scoping is enforced by the store, not by callers: a list is
/// whatever subset the given owner may see, and the store is free to
/// refuse writes that fail its checks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the full set of records visible to `owner`, ordered
    /// descending by id.
    async fn list_records(&self, owner: &OwnerId) -> Result<Vec<BookmarkRecord>>;

    /// Create a record from a validated draft, stamped with `owner`.
    ///
    /// Returns the record as the store assigned it, id and timestamp
    /// included.
    async fn create_record(&self, owner: &OwnerId, draft: &BookmarkDraft)
        -> Result<BookmarkRecord>;

    /// Delete a record by id. Deleting an absent id is a no-op.
    async fn delete_record(&self, id: &RecordId) -> Result<()>;

    /// Subscribe to change notices for the collection.
    fn changes(&self) -> Result<BoxedChangeFeed>;
}
