//! Tests for the file-backed store and sessions against a temp root.

use std::time::Duration;

use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::time::timeout;

use marksync_core::{BookmarkDraft, OwnerId, RecordStore, SessionProvider};
use marksync_file::{FileSessions, FileStore};

fn owner(id: &str) -> OwnerId {
    OwnerId::new(id).unwrap()
}

fn draft(title: &str, target: &str) -> BookmarkDraft {
    BookmarkDraft::new(title, target).unwrap()
}

#[tokio::test]
async fn create_then_list_roundtrips() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path());
    let alice = owner("alice");

    let created = store
        .create_record(&alice, &draft("Docs", "https://x.test/docs"))
        .await
        .unwrap();

    let records = store.list_records(&alice).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0], created);
    assert_eq!(records[0].title, "Docs");
    assert_eq!(records[0].target.as_str(), "https://x.test/docs");
}

#[tokio::test]
async fn ids_ascend_and_listing_is_descending() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path());
    let alice = owner("alice");

    for i in 0..11 {
        store
            .create_record(&alice, &draft(&format!("b{i}"), "https://x.test/"))
            .await
            .unwrap();
    }

    let records = store.list_records(&alice).await.unwrap();
    assert_eq!(records.len(), 11);

    // Ids were allocated 1..=11; descending order is numeric, so "11"
    // comes before "2".
    assert_eq!(records[0].id.as_str(), "11");
    assert_eq!(records[10].id.as_str(), "1");
    for pair in records.windows(2) {
        assert!(pair[0].id > pair[1].id);
    }
}

#[tokio::test]
async fn listing_scopes_by_owner() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path());

    store
        .create_record(&owner("alice"), &draft("mine", "https://x.test/"))
        .await
        .unwrap();
    store
        .create_record(&owner("bob"), &draft("theirs", "https://x.test/"))
        .await
        .unwrap();

    let records = store.list_records(&owner("alice")).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "mine");
}

#[tokio::test]
async fn delete_removes_and_absent_delete_is_a_noop() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path());
    let alice = owner("alice");

    let created = store
        .create_record(&alice, &draft("Docs", "https://x.test/"))
        .await
        .unwrap();

    store.delete_record(&created.id).await.unwrap();
    assert!(store.list_records(&alice).await.unwrap().is_empty());

    // Deleting again is harmless.
    store.delete_record(&created.id).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn change_feed_notices_creates_and_deletes() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::new(temp.path());
    let alice = owner("alice");

    let mut feed = store.changes().unwrap();

    let created = store
        .create_record(&alice, &draft("Docs", "https://x.test/"))
        .await
        .unwrap();

    let notice = timeout(Duration::from_secs(5), feed.next()).await.unwrap();
    assert!(notice.unwrap().is_ok());

    store.delete_record(&created.id).await.unwrap();

    let notice = timeout(Duration::from_secs(5), feed.next()).await.unwrap();
    assert!(notice.unwrap().is_ok());
}

#[tokio::test]
async fn sign_in_creates_account_and_session() {
    let temp = TempDir::new().unwrap();
    let sessions = FileSessions::new(temp.path());

    assert_eq!(sessions.current_identity().await.unwrap(), None);

    let identity = sessions.sign_in("alice").await.unwrap();
    assert_eq!(identity.display_name(), Some("alice"));

    let current = sessions.current_identity().await.unwrap().unwrap();
    assert_eq!(current, identity);

    // Signing in again with the same name reuses the account.
    let again = sessions.sign_in("alice").await.unwrap();
    assert_eq!(again.id(), identity.id());
}

#[tokio::test]
async fn sign_out_clears_the_session() {
    let temp = TempDir::new().unwrap();
    let sessions = FileSessions::new(temp.path());

    sessions.sign_in("alice").await.unwrap();
    sessions.sign_out().await.unwrap();

    assert_eq!(sessions.current_identity().await.unwrap(), None);

    // A second sign-out is a no-op.
    sessions.sign_out().await.unwrap();
}

#[tokio::test]
async fn empty_sign_in_identifier_is_rejected() {
    let temp = TempDir::new().unwrap();
    let sessions = FileSessions::new(temp.path());

    assert!(sessions.sign_in("  ").await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn identity_events_report_transitions() {
    let temp = TempDir::new().unwrap();
    let sessions = FileSessions::new(temp.path());

    let mut events = sessions.identity_events().unwrap();

    let identity = sessions.sign_in("alice").await.unwrap();
    let event = timeout(Duration::from_secs(5), events.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, Some(identity));

    sessions.sign_out().await.unwrap();
    let event = timeout(Duration::from_secs(5), events.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, None);
}
