//! marksync-core - Core types, traits and the view-state synchronizer.

pub mod error;
pub mod identity;
pub mod record;
pub mod stub;
pub mod sync;
pub mod traits;
pub mod types;

pub use error::Error;
pub use identity::SessionIdentity;
pub use record::{BookmarkDraft, BookmarkRecord};
pub use sync::{SyncDriver, SyncOptions, SyncPhase, SyncSnapshot, Synchronizer};
pub use traits::{
    BoxedChangeFeed, ChangeFeed, ChangeNotice, IdentityStream, RecordStore, SessionProvider,
};
pub use types::{OwnerId, RecordId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
