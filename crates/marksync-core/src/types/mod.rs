//! Core identifier types.
//!
//! These types enforce format invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod owner_id;
mod record_id;

pub use owner_id::OwnerId;
pub use record_id::RecordId;
