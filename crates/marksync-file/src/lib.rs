//! marksync-file - Filesystem-backed record store and sessions.
//!
//! One directory holds everything: bookmark records as JSON files, an
//! append-only change log tailed into the change feed, and the account
//! and session files behind the session provider. Two processes sharing
//! a root see each other's mutations, which is what makes `marksync
//! watch` in one terminal react to an `add` in another.

mod changes;
mod session;
mod store;

pub use changes::FileChanges;
pub use session::FileSessions;
pub use store::FileStore;
