//! Capability traits for the external collaborators.
//!
//! The synchronizer is constructor-injected with these capabilities; a
//! factory (the CLI, an embedding application, a test) decides which
//! implementation it gets. There is no global client.

mod changes;
mod session;
mod store;

pub use changes::{BoxedChangeFeed, ChangeFeed, ChangeNotice};
pub use session::{IdentityStream, SessionProvider};
pub use store::RecordStore;
