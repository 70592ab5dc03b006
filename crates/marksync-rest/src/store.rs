//! REST-backed record store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use marksync_core::error::{Error, StoreReadError, StoreWriteError};
use marksync_core::{
    BookmarkDraft, BookmarkRecord, BoxedChangeFeed, ChangeNotice, OwnerId, RecordId, RecordStore,
    Result,
};

use crate::client::RestClient;

const BOOKMARKS_PATH: &str = "rest/v1/bookmarks";

/// A bookmark row as the hosted table serves it.
#[derive(Debug, Deserialize)]
struct WireBookmark {
    /// Bigint serial on the hosted side; tolerate strings too.
    id: serde_json::Value,
    title: String,
    url: Url,
    user_id: String,
    created_at: DateTime<Utc>,
}

impl WireBookmark {
    fn into_record(self) -> Result<BookmarkRecord> {
        let id = match &self.id {
            serde_json::Value::Number(n) => RecordId::new(n.to_string()),
            serde_json::Value::String(s) => RecordId::new(s),
            other => Err(Error::StoreRead(StoreReadError::Corrupt {
                message: format!("unexpected id value: {}", other),
            })),
        }?;

        Ok(BookmarkRecord {
            id,
            title: self.title,
            target: self.url,
            owner: OwnerId::new(&self.user_id)?,
            created_at: self.created_at,
        })
    }
}

/// Insert body for a new bookmark row.
#[derive(Debug, Serialize)]
struct InsertBookmark<'a> {
    title: &'a str,
    url: &'a str,
    user_id: &'a str,
}

/// Record store over the hosted REST API.
///
/// The base URL is the service root; table access goes through
/// `rest/v1/bookmarks` with owner scoping in query filters. Without the
/// hosted realtime socket, `changes()` emits a notice on a fixed
/// interval so remote mutations stay eventually visible.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: RestClient,
    poll_interval: Duration,
}

impl RestStore {
    /// Create a store for the given service root and API key.
    pub fn new(base: Url, api_key: impl Into<String>) -> Self {
        Self {
            client: RestClient::new(base, api_key),
            poll_interval: Duration::from_secs(15),
        }
    }

    /// Use a user access token instead of the API key as the bearer.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.client.set_bearer(token);
        self
    }

    /// Override the change-feed polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl RecordStore for RestStore {
    #[instrument(skip(self), fields(%owner))]
    async fn list_records(&self, owner: &OwnerId) -> Result<Vec<BookmarkRecord>> {
        let query = [
            ("select", "*".to_string()),
            ("user_id", format!("eq.{}", owner)),
            ("order", "id.desc".to_string()),
        ];

        let rows: Vec<WireBookmark> = self.client.get_json(BOOKMARKS_PATH, &query).await?;
        debug!(count = rows.len(), "listed records");

        rows.into_iter().map(WireBookmark::into_record).collect()
    }

    #[instrument(skip(self, draft), fields(%owner))]
    async fn create_record(
        &self,
        owner: &OwnerId,
        draft: &BookmarkDraft,
    ) -> Result<BookmarkRecord> {
        let body = [InsertBookmark {
            title: draft.title(),
            url: draft.target().as_str(),
            user_id: owner.as_str(),
        }];

        let rows: Vec<WireBookmark> = self.client.post_json(BOOKMARKS_PATH, &body).await?;

        let row = rows.into_iter().next().ok_or_else(|| {
            Error::StoreWrite(StoreWriteError::Unavailable {
                message: "store returned no representation".to_string(),
            })
        })?;

        let record = row.into_record()?;
        debug!(id = %record.id, "created record");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete_record(&self, id: &RecordId) -> Result<()> {
        let query = [("id", format!("eq.{}", id))];
        self.client.delete(BOOKMARKS_PATH, &query).await?;
        debug!(%id, "deleted record");
        Ok(())
    }

    fn changes(&self) -> Result<BoxedChangeFeed> {
        let period = self.poll_interval;

        let stream = async_stream::stream! {
            let mut interval = tokio::time::interval(period);
            // The first tick fires immediately; skip it so subscribing
            // does not trigger a redundant reconcile.
            interval.tick().await;
            loop {
                interval.tick().await;
                yield Ok(ChangeNotice);
            }
        };

        Ok(Box::pin(stream))
    }
}
