//! Session provider trait.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::identity::SessionIdentity;
use crate::Result;

/// Stream of identity transitions, one item per sign-in or sign-out.
///
/// `None` means "now signed out".
pub type IdentityStream = Pin<Box<dyn Stream<Item = Option<SessionIdentity>> + Send>>;

/// The external authentication service.
///
/// Sign-in and sign-out are fire-and-forget intents; the reconciliation
/// core never calls them. It consumes `current_identity` once at startup
/// and `identity_events` for everything after.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolve the current identity, or `None` when signed out.
    async fn current_identity(&self) -> Result<Option<SessionIdentity>>;

    /// Sign in as `identifier`.
    async fn sign_in(&self, identifier: &str) -> Result<SessionIdentity>;

    /// Sign out the current identity.
    async fn sign_out(&self) -> Result<()>;

    /// Subscribe to identity transitions.
    fn identity_events(&self) -> Result<IdentityStream>;
}
