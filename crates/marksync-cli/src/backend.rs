//! Capability wiring.
//!
//! Builds the record store and session provider pair the command layer
//! runs against. The file backend is the default; setting a store URL
//! switches to the hosted REST backend, whose identity arrives via
//! environment instead of a local session file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use marksync_core::stub::StaticSessions;
use marksync_core::{OwnerId, RecordStore, SessionIdentity, SessionProvider};
use marksync_file::{FileSessions, FileStore};
use marksync_rest::RestStore;

use crate::cli::Globals;

pub struct Backend {
    pub store: Arc<dyn RecordStore>,
    pub sessions: Arc<dyn SessionProvider>,
}

/// Build the backend the globals select.
pub fn connect(globals: &Globals) -> Result<Backend> {
    match store_url(globals)? {
        Some(url) => rest_backend(globals, url),
        None => file_backend(globals),
    }
}

fn file_backend(globals: &Globals) -> Result<Backend> {
    let root = data_root(globals)?;
    debug!(root = %root.display(), "using file backend");

    Ok(Backend {
        store: Arc::new(FileStore::new(&root)),
        sessions: Arc::new(FileSessions::new(&root)),
    })
}

fn rest_backend(globals: &Globals, url: url::Url) -> Result<Backend> {
    let api_key = globals
        .api_key
        .clone()
        .or_else(|| std::env::var("MARKSYNC_API_KEY").ok())
        .context("--api-key (or MARKSYNC_API_KEY) is required with a store URL")?;

    debug!(%url, "using REST backend");
    let mut store = RestStore::new(url, api_key);
    if let Ok(token) = std::env::var("MARKSYNC_ACCESS_TOKEN") {
        store = store.with_bearer(token);
    }

    // Sign-in happens at the hosted auth service, so the identity is
    // injected rather than negotiated here.
    let sessions = match std::env::var("MARKSYNC_OWNER_ID") {
        Ok(owner) => {
            let owner = OwnerId::new(&owner).context("Invalid MARKSYNC_OWNER_ID")?;
            StaticSessions::new(SessionIdentity::new(owner, None))
        }
        Err(_) => StaticSessions::signed_out(),
    };

    Ok(Backend {
        store: Arc::new(store),
        sessions: Arc::new(sessions),
    })
}

fn store_url(globals: &Globals) -> Result<Option<url::Url>> {
    if let Some(url) = &globals.store_url {
        return Ok(Some(url.clone()));
    }
    match std::env::var("MARKSYNC_STORE_URL") {
        Ok(raw) => {
            let url = raw.parse().context("Invalid MARKSYNC_STORE_URL")?;
            Ok(Some(url))
        }
        Err(_) => Ok(None),
    }
}

fn data_root(globals: &Globals) -> Result<PathBuf> {
    if let Some(root) = &globals.root {
        return Ok(root.clone());
    }
    if let Ok(root) = std::env::var("MARKSYNC_ROOT") {
        return Ok(PathBuf::from(root));
    }
    let dirs = ProjectDirs::from("", "", "marksync")
        .context("Could not determine a data directory; pass --root")?;
    Ok(dirs.data_dir().to_path_buf())
}
