//! Session identity.

use serde::{Deserialize, Serialize};

use crate::types::OwnerId;

/// The current authenticated identity.
///
/// Absence of an identity ("signed out") is a valid state and is
/// represented as `Option::<SessionIdentity>::None` at the seams, never
/// as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    id: OwnerId,
    display_name: Option<String>,
}

impl SessionIdentity {
    /// Create a new identity.
    pub fn new(id: OwnerId, display_name: Option<String>) -> Self {
        Self { id, display_name }
    }

    /// Returns the owner id used to scope record visibility.
    pub fn id(&self) -> &OwnerId {
        &self.id
    }

    /// Returns the display name, if the provider supplied one.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}
