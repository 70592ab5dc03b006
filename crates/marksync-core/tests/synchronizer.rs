//! Behavioral tests for the view-state synchronizer.
//!
//! These run against in-memory fake stores with injectable failures and
//! call counters, so every property is observable without a real
//! backend: idempotent reconcile, non-optimistic add, optimistic delete
//! with rollback, input/identity gating, sign-out policy, and the
//! latest-dispatch-wins resolution of overlapping reconciles.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::stream;
use tokio::sync::oneshot;
use url::Url;

use marksync_core::error::{Error, StoreReadError, StoreWriteError, ValidationError};
use marksync_core::{
    BookmarkDraft, BookmarkRecord, BoxedChangeFeed, OwnerId, RecordId, RecordStore,
    SessionIdentity, SyncOptions, SyncPhase, Synchronizer,
};

// ============================================================================
// Helpers
// ============================================================================

fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

fn identity(owner_id: &str) -> SessionIdentity {
    SessionIdentity::new(owner(owner_id), Some(owner_id.to_string()))
}

fn record(id: &str, owner_id: &str, title: &str) -> BookmarkRecord {
    BookmarkRecord {
        id: RecordId::new(id).unwrap(),
        title: title.to_string(),
        target: Url::parse(&format!("https://x.test/{id}")).unwrap(),
        owner: owner(owner_id),
        created_at: Utc::now(),
    }
}

fn ids(records: &[BookmarkRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

// ============================================================================
// Fake store: immediate responses, injectable failures, call counters
// ============================================================================

#[derive(Default)]
struct FakeStore {
    records: Mutex<Vec<BookmarkRecord>>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
    fail_creates: AtomicBool,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FakeStore {
    fn with_next_id(next_id: u64) -> Self {
        let store = Self::default();
        store.next_id.store(next_id, Ordering::SeqCst);
        store
    }

    fn seed(&self, records: Vec<BookmarkRecord>) {
        *self.records.lock().unwrap() = records;
    }

    fn store_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.create_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn list_records(&self, owner: &OwnerId) -> marksync_core::Result<Vec<BookmarkRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreReadError::Unavailable {
                message: "injected read failure".to_string(),
            }
            .into());
        }

        let mut visible: Vec<BookmarkRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(visible)
    }

    async fn create_record(
        &self,
        owner: &OwnerId,
        draft: &BookmarkDraft,
    ) -> marksync_core::Result<BookmarkRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(StoreWriteError::Constraint {
                message: "injected create failure".to_string(),
            }
            .into());
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = BookmarkRecord {
            id: RecordId::new(id.to_string()).unwrap(),
            title: draft.title().to_string(),
            target: draft.target().clone(),
            owner: owner.clone(),
            created_at: Utc::now(),
        };
        self.records.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn delete_record(&self, id: &RecordId) -> marksync_core::Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreWriteError::Unavailable {
                message: "injected delete failure".to_string(),
            }
            .into());
        }

        self.records.lock().unwrap().retain(|r| &r.id != id);
        Ok(())
    }

    fn changes(&self) -> marksync_core::Result<BoxedChangeFeed> {
        Ok(Box::pin(stream::empty()))
    }
}

// ============================================================================
// Gated store: every list/delete call parks until the test releases it
// ============================================================================

#[derive(Default)]
struct GatedStore {
    pending_lists: Mutex<Vec<oneshot::Sender<marksync_core::Result<Vec<BookmarkRecord>>>>>,
    pending_deletes: Mutex<Vec<oneshot::Sender<marksync_core::Result<()>>>>,
}

impl GatedStore {
    fn pending_list_count(&self) -> usize {
        self.pending_lists.lock().unwrap().len()
    }

    fn pending_delete_count(&self) -> usize {
        self.pending_deletes.lock().unwrap().len()
    }

    /// Release the list call at `index` (in dispatch order).
    fn release_list(&self, index: usize, result: marksync_core::Result<Vec<BookmarkRecord>>) {
        let tx = self.pending_lists.lock().unwrap().remove(index);
        tx.send(result).unwrap();
    }

    fn release_delete(&self, index: usize, result: marksync_core::Result<()>) {
        let tx = self.pending_deletes.lock().unwrap().remove(index);
        tx.send(result).unwrap();
    }
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn list_records(&self, _owner: &OwnerId) -> marksync_core::Result<Vec<BookmarkRecord>> {
        let (tx, rx) = oneshot::channel();
        self.pending_lists.lock().unwrap().push(tx);
        rx.await.expect("test dropped a pending list call")
    }

    async fn create_record(
        &self,
        _owner: &OwnerId,
        _draft: &BookmarkDraft,
    ) -> marksync_core::Result<BookmarkRecord> {
        unimplemented!("gated store does not serve creates")
    }

    async fn delete_record(&self, _id: &RecordId) -> marksync_core::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.pending_deletes.lock().unwrap().push(tx);
        rx.await.expect("test dropped a pending delete call")
    }

    fn changes(&self) -> marksync_core::Result<BoxedChangeFeed> {
        Ok(Box::pin(stream::empty()))
    }
}

/// Yield until `predicate` holds.
async fn wait_for(mut predicate: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if predicate() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Reconcile
// ============================================================================

#[tokio::test]
async fn reconcile_without_identity_is_a_noop() {
    let store = Arc::new(FakeStore::default());
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.reconcile().await.unwrap();

    assert_eq!(store.store_calls(), 0);
    assert_eq!(sync.phase(), SyncPhase::Unauthenticated);
}

#[tokio::test]
async fn reconcile_with_empty_store_yields_empty_records() {
    let store = Arc::new(FakeStore::default());
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();

    assert!(sync.records().is_empty());
    assert_eq!(sync.phase(), SyncPhase::Synced);
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("2", "alice", "two"), record("1", "alice", "one")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    let first = sync.records();
    sync.reconcile().await.unwrap();
    let second = sync.records();

    assert_eq!(first, second);
    assert_eq!(ids(&first), vec!["2", "1"]);
}

#[tokio::test]
async fn reconcile_scopes_to_the_current_owner() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("1", "alice", "mine"), record("2", "bob", "theirs")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();

    assert_eq!(ids(&sync.records()), vec!["1"]);
}

#[tokio::test]
async fn failed_reconcile_keeps_prior_records() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("1", "alice", "one")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    assert_eq!(ids(&sync.records()), vec!["1"]);

    store.fail_reads.store(true, Ordering::SeqCst);
    let err = sync.reconcile().await.unwrap_err();

    assert!(matches!(err, Error::StoreRead(_)));
    assert_eq!(ids(&sync.records()), vec!["1"]);
    assert_eq!(sync.phase(), SyncPhase::Error);
}

#[tokio::test]
async fn change_notice_triggers_reconcile() {
    let store = Arc::new(FakeStore::default());
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    store.seed(vec![record("5", "alice", "new")]);

    sync.on_change_notice().await.unwrap();

    assert_eq!(ids(&sync.records()), vec!["5"]);
}

// ============================================================================
// Add
// ============================================================================

#[tokio::test]
async fn add_picks_up_store_assigned_fields() {
    let store = Arc::new(FakeStore::with_next_id(7));
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    let created = sync.add_bookmark("Docs", "https://x.test").await.unwrap();

    assert_eq!(created.id.as_str(), "7");

    let records = sync.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.as_str(), "7");
    assert_eq!(records[0].created_at, created.created_at);
    assert_eq!(records[0].owner.as_str(), "alice");
}

#[tokio::test]
async fn add_without_identity_issues_no_store_calls() {
    let store = Arc::new(FakeStore::default());
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    let err = sync.add_bookmark("Docs", "https://x.test").await.unwrap_err();

    assert!(matches!(err, Error::Unauthenticated));
    assert_eq!(store.store_calls(), 0);
}

#[tokio::test]
async fn add_with_empty_fields_issues_no_store_calls() {
    let store = Arc::new(FakeStore::default());
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());
    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    let calls_after_login = store.store_calls();

    let err = sync.add_bookmark("", "https://x.test").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::EmptyTitle)
    ));

    let err = sync.add_bookmark("t", "").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::EmptyTarget)
    ));

    assert_eq!(store.store_calls(), calls_after_login);
}

#[tokio::test]
async fn failed_add_leaves_records_unchanged() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("1", "alice", "one")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());
    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();

    store.fail_creates.store(true, Ordering::SeqCst);
    let err = sync.add_bookmark("Docs", "https://x.test").await.unwrap_err();

    assert!(matches!(err, Error::StoreWrite(_)));
    assert_eq!(ids(&sync.records()), vec!["1"]);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_removes_locally_and_at_the_store() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("2", "alice", "two"), record("1", "alice", "one")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());
    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();

    sync.delete_bookmark(&RecordId::new("2").unwrap()).await.unwrap();

    assert_eq!(ids(&sync.records()), vec!["1"]);
    assert_eq!(store.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_delete_restores_the_record_with_original_fields() {
    let store = Arc::new(FakeStore::default());
    let kept = record("2", "alice", "two");
    store.seed(vec![
        record("3", "alice", "three"),
        kept.clone(),
        record("1", "alice", "one"),
    ]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());
    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    assert_eq!(ids(&sync.records()), vec!["3", "2", "1"]);

    store.fail_deletes.store(true, Ordering::SeqCst);
    let err = sync.delete_bookmark(&kept.id).await.unwrap_err();

    assert!(matches!(err, Error::StoreWrite(_)));
    let records = sync.records();
    assert_eq!(ids(&records), vec!["3", "2", "1"]);
    let restored = records.iter().find(|r| r.id == kept.id).unwrap();
    assert_eq!(restored, &kept);
}

#[tokio::test]
async fn delete_is_optimistic_before_the_store_answers() {
    let store = Arc::new(GatedStore::default());
    let sync = Arc::new(Synchronizer::new(Arc::clone(&store), SyncOptions::default()));

    // Sign in; the triggered reconcile parks on the gate until released.
    let login = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.on_identity_changed(Some(identity("alice"))).await })
    };
    wait_for(|| store.pending_list_count() == 1).await;
    store.release_list(
        0,
        Ok(vec![
            record("3", "alice", "three"),
            record("2", "alice", "two"),
            record("1", "alice", "one"),
        ]),
    );
    login.await.unwrap().unwrap();
    assert_eq!(ids(&sync.records()), vec!["3", "2", "1"]);

    let deletion = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.delete_bookmark(&RecordId::new("2").unwrap()).await })
    };
    wait_for(|| store.pending_delete_count() == 1).await;

    // The optimistic removal is visible while the store call is in flight.
    assert_eq!(ids(&sync.records()), vec!["3", "1"]);

    store.release_delete(
        0,
        Err(StoreWriteError::Denied {
            message: "row-level policy".to_string(),
        }
        .into()),
    );

    // The failure triggers the rollback reconcile.
    wait_for(|| store.pending_list_count() == 1).await;
    store.release_list(
        0,
        Ok(vec![
            record("3", "alice", "three"),
            record("2", "alice", "two"),
            record("1", "alice", "one"),
        ]),
    );

    let err = deletion.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::StoreWrite(_)));
    assert_eq!(ids(&sync.records()), vec!["3", "2", "1"]);
}

// ============================================================================
// Overlapping reconciles
// ============================================================================

#[tokio::test]
async fn later_dispatched_reconcile_wins_when_completions_invert() {
    let store = Arc::new(GatedStore::default());
    let sync = Arc::new(Synchronizer::new(Arc::clone(&store), SyncOptions::default()));

    let login = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.on_identity_changed(Some(identity("alice"))).await })
    };
    wait_for(|| store.pending_list_count() == 1).await;
    store.release_list(0, Ok(vec![]));
    login.await.unwrap().unwrap();

    let first = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.reconcile().await })
    };
    wait_for(|| store.pending_list_count() == 1).await;

    let second = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.reconcile().await })
    };
    wait_for(|| store.pending_list_count() == 2).await;

    // The second-dispatched call completes first, with the fresher view.
    store.release_list(
        1,
        Ok(vec![record("2", "alice", "two"), record("1", "alice", "one")]),
    );
    second.await.unwrap().unwrap();
    assert_eq!(ids(&sync.records()), vec!["2", "1"]);

    // The stale completion arrives afterwards and is discarded.
    store.release_list(0, Ok(vec![record("1", "alice", "one")]));
    first.await.unwrap().unwrap();

    assert_eq!(ids(&sync.records()), vec!["2", "1"]);
    assert_eq!(sync.phase(), SyncPhase::Synced);
}

#[tokio::test]
async fn stale_completion_is_discarded_even_on_failure() {
    let store = Arc::new(GatedStore::default());
    let sync = Arc::new(Synchronizer::new(Arc::clone(&store), SyncOptions::default()));

    let login = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.on_identity_changed(Some(identity("alice"))).await })
    };
    wait_for(|| store.pending_list_count() == 1).await;
    store.release_list(0, Ok(vec![]));
    login.await.unwrap().unwrap();

    let first = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.reconcile().await })
    };
    wait_for(|| store.pending_list_count() == 1).await;
    let second = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.reconcile().await })
    };
    wait_for(|| store.pending_list_count() == 2).await;

    store.release_list(1, Ok(vec![record("1", "alice", "one")]));
    second.await.unwrap().unwrap();

    // A stale failure must not flip the phase or disturb the records.
    store.release_list(
        0,
        Err(StoreReadError::Unavailable {
            message: "late failure".to_string(),
        }
        .into()),
    );
    first.await.unwrap().unwrap();

    assert_eq!(ids(&sync.records()), vec!["1"]);
    assert_eq!(sync.phase(), SyncPhase::Synced);
}

// ============================================================================
// Sign-out policy
// ============================================================================

#[tokio::test]
async fn sign_out_retains_records_by_default() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("1", "alice", "one")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    sync.on_identity_changed(None).await.unwrap();

    assert_eq!(ids(&sync.records()), vec!["1"]);
    assert_eq!(sync.phase(), SyncPhase::Unauthenticated);

    // Reconciles are no-ops until a new identity arrives.
    let calls = store.store_calls();
    sync.on_change_notice().await.unwrap();
    assert_eq!(store.store_calls(), calls);
}

#[tokio::test]
async fn sign_out_clears_records_when_configured() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("1", "alice", "one")]);
    let options = SyncOptions {
        clear_on_sign_out: true,
    };
    let sync = Synchronizer::new(Arc::clone(&store), options);

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    assert_eq!(sync.records().len(), 1);

    sync.on_identity_changed(None).await.unwrap();
    assert!(sync.records().is_empty());
}

#[tokio::test]
async fn identity_switch_drops_the_old_owners_view() {
    let store = Arc::new(FakeStore::default());
    store.seed(vec![record("1", "alice", "mine"), record("2", "bob", "theirs")]);
    let sync = Synchronizer::new(Arc::clone(&store), SyncOptions::default());

    sync.on_identity_changed(Some(identity("alice"))).await.unwrap();
    assert_eq!(ids(&sync.records()), vec!["1"]);

    sync.on_identity_changed(Some(identity("bob"))).await.unwrap();
    assert_eq!(ids(&sync.records()), vec!["2"]);
}
