//! Stub capabilities for contexts with no configured backend.
//!
//! A factory hands these out when the real store or session provider is
//! not available (unconfigured environment, headless build, tests that
//! only exercise gating). Every store operation fails loudly instead of
//! pretending to work.

use async_trait::async_trait;
use futures_util::stream;

use crate::error::{SessionError, StoreReadError, StoreWriteError};
use crate::identity::SessionIdentity;
use crate::record::{BookmarkDraft, BookmarkRecord};
use crate::traits::{BoxedChangeFeed, IdentityStream, RecordStore, SessionProvider};
use crate::types::{OwnerId, RecordId};
use crate::Result;

/// A record store that is not configured.
///
/// Reads and writes fail with an explicit "not configured" error; the
/// change feed is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubStore;

impl StubStore {
    fn message() -> String {
        "record store not configured".to_string()
    }
}

#[async_trait]
impl RecordStore for StubStore {
    async fn list_records(&self, _owner: &OwnerId) -> Result<Vec<BookmarkRecord>> {
        Err(StoreReadError::Unavailable {
            message: Self::message(),
        }
        .into())
    }

    async fn create_record(
        &self,
        _owner: &OwnerId,
        _draft: &BookmarkDraft,
    ) -> Result<BookmarkRecord> {
        Err(StoreWriteError::Unavailable {
            message: Self::message(),
        }
        .into())
    }

    async fn delete_record(&self, _id: &RecordId) -> Result<()> {
        Err(StoreWriteError::Unavailable {
            message: Self::message(),
        }
        .into())
    }

    fn changes(&self) -> Result<BoxedChangeFeed> {
        Ok(Box::pin(stream::empty()))
    }
}

/// A session provider with a fixed identity state.
///
/// Used when authentication happens somewhere the process cannot reach
/// (a hosted OAuth flow) and the identity arrives via configuration.
/// Sign-in and sign-out are rejected as externally managed; the event
/// stream ends immediately because the identity never changes.
#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    identity: Option<SessionIdentity>,
}

impl StaticSessions {
    /// A provider that always reports `identity`.
    pub fn new(identity: SessionIdentity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    /// A provider that always reports "signed out".
    pub fn signed_out() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSessions {
    async fn current_identity(&self) -> Result<Option<SessionIdentity>> {
        Ok(self.identity.clone())
    }

    async fn sign_in(&self, _identifier: &str) -> Result<SessionIdentity> {
        Err(SessionError::Unsupported {
            message: "sign-in is managed by the external auth provider".to_string(),
        }
        .into())
    }

    async fn sign_out(&self) -> Result<()> {
        Err(SessionError::Unsupported {
            message: "sign-out is managed by the external auth provider".to_string(),
        }
        .into())
    }

    fn identity_events(&self) -> Result<IdentityStream> {
        Ok(Box::pin(stream::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn stub_store_fails_loudly() {
        let store = StubStore;
        let owner = OwnerId::new("o1").unwrap();
        let err = store.list_records(&owner).await.unwrap_err();
        assert!(matches!(err, Error::StoreRead(_)));
    }

    #[tokio::test]
    async fn static_sessions_report_fixed_identity() {
        let identity = SessionIdentity::new(OwnerId::new("o1").unwrap(), None);
        let sessions = StaticSessions::new(identity.clone());
        assert_eq!(sessions.current_identity().await.unwrap(), Some(identity));
        assert!(sessions.sign_in("anyone").await.is_err());
    }
}
