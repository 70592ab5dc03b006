//! The view-state synchronizer.
//!
//! Owns the in-memory list of bookmark records and reconciles it against
//! the record store on four triggers: initial load, identity change,
//! change notice, and local mutation. The one optimistic path is delete,
//! which rolls back via a reconcile when the store refuses.

mod driver;

pub use driver::SyncDriver;

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Error;
use crate::identity::SessionIdentity;
use crate::record::{BookmarkDraft, BookmarkRecord};
use crate::traits::RecordStore;
use crate::types::RecordId;
use crate::Result;

/// Synchronization policy knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Clear the local records when the identity goes away.
    ///
    /// Off by default: losing the identity leaves the list as-is and the
    /// presentation layer decides what a signed-out screen shows.
    pub clear_on_sign_out: bool,
}

/// High-level synchronizer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No identity; reconciles are no-ops.
    Unauthenticated,
    /// A reconcile is in flight.
    Reconciling,
    /// The last reconcile applied cleanly.
    Synced,
    /// The last reconcile failed; prior records are retained.
    Error,
}

/// An atomic read of the synchronizer's presentable state.
#[derive(Debug, Clone)]
pub struct SyncSnapshot {
    /// The current identity, if any.
    pub identity: Option<SessionIdentity>,
    /// The local record list, descending by id.
    pub records: Vec<BookmarkRecord>,
    /// The high-level phase.
    pub phase: SyncPhase,
    /// Monotonic revision, bumped on every visible state change.
    pub revision: u64,
}

struct SyncState {
    identity: Option<SessionIdentity>,
    records: Vec<BookmarkRecord>,
    phase: SyncPhase,
    /// Sequence number handed to the next reconcile at dispatch time.
    next_seq: u64,
    /// Highest sequence number whose completion has been applied.
    applied_seq: u64,
    revision: u64,
}

/// The view-state synchronizer.
///
/// Methods take `&self`; state lives behind a lock that is never held
/// across an await, so overlapping calls are allowed. Overlapping
/// reconciles are resolved by dispatch order: each carries a sequence
/// number and only the highest-numbered completion seen so far applies,
/// so a stale response can never overwrite a fresher one.
pub struct Synchronizer<S: RecordStore + ?Sized> {
    store: Arc<S>,
    options: SyncOptions,
    state: Mutex<SyncState>,
    updates: watch::Sender<u64>,
}

impl<S: RecordStore + ?Sized> Synchronizer<S> {
    /// Create a synchronizer over a record store capability.
    pub fn new(store: Arc<S>, options: SyncOptions) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            store,
            options,
            state: Mutex::new(SyncState {
                identity: None,
                records: Vec::new(),
                phase: SyncPhase::Unauthenticated,
                next_seq: 0,
                applied_seq: 0,
                revision: 0,
            }),
            updates,
        }
    }

    /// Returns the current record list, descending by id.
    pub fn records(&self) -> Vec<BookmarkRecord> {
        self.state.lock().unwrap().records.clone()
    }

    /// Returns the current identity, if any.
    pub fn identity(&self) -> Option<SessionIdentity> {
        self.state.lock().unwrap().identity.clone()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SyncPhase {
        self.state.lock().unwrap().phase
    }

    /// Returns identity, records, phase and revision in one consistent
    /// read.
    pub fn snapshot(&self) -> SyncSnapshot {
        let state = self.state.lock().unwrap();
        SyncSnapshot {
            identity: state.identity.clone(),
            records: state.records.clone(),
            phase: state.phase,
            revision: state.revision,
        }
    }

    /// Subscribe to re-render notifications.
    ///
    /// The value is the state revision; the presentation layer should
    /// re-read a snapshot whenever it changes.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    fn bump(&self) {
        let revision = {
            let mut state = self.state.lock().unwrap();
            state.revision += 1;
            state.revision
        };
        let _ = self.updates.send(revision);
    }

    /// Replace the local records with a fresh read from the store.
    ///
    /// A no-op when signed out. On read failure the records are left
    /// unchanged, the phase flips to [`SyncPhase::Error`], and the error
    /// is returned; there is no retry.
    pub async fn reconcile(&self) -> Result<()> {
        let (owner, seq) = {
            let mut state = self.state.lock().unwrap();
            let Some(identity) = state.identity.as_ref() else {
                debug!("no identity, skipping reconcile");
                return Ok(());
            };
            let owner = identity.id().clone();
            state.next_seq += 1;
            state.phase = SyncPhase::Reconciling;
            (owner, state.next_seq)
        };
        self.bump();

        debug!(%owner, seq, "reconciling");
        let fetched = self.store.list_records(&owner).await;

        {
            let mut state = self.state.lock().unwrap();

            if seq < state.applied_seq {
                debug!(seq, applied = state.applied_seq, "discarding stale reconcile");
                return Ok(());
            }

            if state.identity.as_ref().map(SessionIdentity::id) != Some(&owner) {
                debug!(%owner, "identity changed mid-reconcile, discarding");
                return Ok(());
            }

            state.applied_seq = seq;
            match fetched {
                Ok(records) => {
                    debug!(count = records.len(), "reconcile applied");
                    state.records = records;
                    state.phase = SyncPhase::Synced;
                }
                Err(err) => {
                    warn!(error = %err, "reconcile failed, keeping prior records");
                    state.phase = SyncPhase::Error;
                    drop(state);
                    self.bump();
                    return Err(err);
                }
            }
        }
        self.bump();
        Ok(())
    }

    /// Handle an identity transition.
    ///
    /// The sole entry point for identity changes: call it once with the
    /// initially resolved identity and once per event from the session
    /// provider. A present identity triggers a reconcile; a missing one
    /// clears the records only when [`SyncOptions::clear_on_sign_out`]
    /// is set.
    pub async fn on_identity_changed(&self, identity: Option<SessionIdentity>) -> Result<()> {
        let signed_in = identity.is_some();
        {
            let mut state = self.state.lock().unwrap();
            debug!(
                owner = identity.as_ref().map(|i| i.id().as_str()),
                "identity changed"
            );
            state.identity = identity;
            if !signed_in {
                state.phase = SyncPhase::Unauthenticated;
                if self.options.clear_on_sign_out {
                    state.records.clear();
                }
            }
        }
        self.bump();

        if signed_in {
            self.reconcile().await
        } else {
            Ok(())
        }
    }

    /// Handle a payload-free change notice by reconciling.
    pub async fn on_change_notice(&self) -> Result<()> {
        debug!("change notice");
        self.reconcile().await
    }

    /// Create a bookmark at the store, then reconcile.
    ///
    /// Validation runs before the identity check and both run before any
    /// store call. The record is never inserted locally ahead of the
    /// store's confirmation; the reconcile picks up the assigned id and
    /// timestamp.
    pub async fn add_bookmark(&self, title: &str, target: &str) -> Result<BookmarkRecord> {
        let draft = BookmarkDraft::new(title, target)?;

        let owner = {
            let state = self.state.lock().unwrap();
            state
                .identity
                .as_ref()
                .map(|i| i.id().clone())
                .ok_or(Error::Unauthenticated)?
        };

        let created = self.store.create_record(&owner, &draft).await?;
        debug!(id = %created.id, "bookmark created");

        self.reconcile().await?;
        Ok(created)
    }

    /// Delete a bookmark, optimistically.
    ///
    /// The record disappears from the local list immediately. If the
    /// store refuses the delete, a rollback reconcile restores the
    /// store's truth and the original error is returned.
    pub async fn delete_bookmark(&self, id: &RecordId) -> Result<()> {
        let removed = {
            let mut state = self.state.lock().unwrap();
            let before = state.records.len();
            state.records.retain(|r| &r.id != id);
            state.records.len() != before
        };
        if removed {
            self.bump();
        }

        match self.store.delete_record(id).await {
            Ok(()) => {
                debug!(%id, "bookmark deleted");
                Ok(())
            }
            Err(err) => {
                warn!(%id, error = %err, "delete failed, rolling back");
                if let Err(rollback_err) = self.reconcile().await {
                    warn!(error = %rollback_err, "rollback reconcile failed");
                }
                Err(err)
            }
        }
    }
}

impl<S: RecordStore + ?Sized> std::fmt::Debug for Synchronizer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("Synchronizer")
            .field("identity", &state.identity)
            .field("records", &state.records.len())
            .field("phase", &state.phase)
            .finish()
    }
}
