//! marksync-rest - Record store over a hosted REST API.
//!
//! Speaks the PostgREST-flavored surface hosted database services
//! expose: one `bookmarks` table, owner scoping via query filters, and
//! `Prefer: return=representation` to get store-assigned fields back on
//! insert. The hosted realtime socket is not part of this crate; the
//! change feed polls instead.

mod client;
mod store;

pub use store::RestStore;
