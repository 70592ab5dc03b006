//! File-backed session provider.
//!
//! Accounts are JSON files; the signed-in identity is a single
//! `session.json` whose presence means "signed in". Identity events
//! come from watching that file, so a sign-out in one process shows up
//! in every other process sharing the root.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use notify::{RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use marksync_core::error::{Error, SessionError};
use marksync_core::{IdentityStream, OwnerId, Result, SessionIdentity, SessionProvider};

fn session_io(err: std::io::Error) -> Error {
    Error::Session(SessionError::Unavailable {
        message: format!("IO error: {}", err),
    })
}

/// Account metadata stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    /// The owner id of the account.
    id: String,
    /// The display name used to sign in.
    name: String,
    /// When the account was created.
    created_at: String,
}

/// The current session, stored while signed in.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    owner_id: String,
}

/// File-backed session provider.
#[derive(Debug, Clone)]
pub struct FileSessions {
    root: PathBuf,
}

impl FileSessions {
    /// Create a session provider rooted at the given directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn auth_dir(&self) -> PathBuf {
        self.root.join("auth")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.auth_dir().join("accounts")
    }

    fn account_path(&self, owner_id: &str) -> PathBuf {
        self.accounts_dir().join(format!("{}.json", owner_id))
    }

    fn session_path(&self) -> PathBuf {
        self.auth_dir().join("session.json")
    }

    fn load_account(&self, owner_id: &str) -> Result<Option<StoredAccount>> {
        let path = self.account_path(owner_id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(session_io)?;
        let account: StoredAccount = serde_json::from_str(&content).map_err(|e| {
            Error::Session(SessionError::Unavailable {
                message: e.to_string(),
            })
        })?;

        Ok(Some(account))
    }

    fn find_account_by_name(&self, name: &str) -> Result<Option<StoredAccount>> {
        let dir = self.accounts_dir();

        if !dir.exists() {
            return Ok(None);
        }

        for entry in fs::read_dir(&dir).map_err(session_io)? {
            let entry = entry.map_err(session_io)?;
            if let Ok(content) = fs::read_to_string(entry.path())
                && let Ok(account) = serde_json::from_str::<StoredAccount>(&content)
                && account.name == name
            {
                return Ok(Some(account));
            }
        }

        Ok(None)
    }

    fn identity_for(account: StoredAccount) -> Result<SessionIdentity> {
        let owner = OwnerId::new(&account.id)?;
        Ok(SessionIdentity::new(owner, Some(account.name)))
    }
}

#[async_trait]
impl SessionProvider for FileSessions {
    async fn current_identity(&self) -> Result<Option<SessionIdentity>> {
        match read_identity(&self.root) {
            Some(identity) => Ok(Some(identity)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn sign_in(&self, identifier: &str) -> Result<SessionIdentity> {
        if identifier.trim().is_empty() {
            return Err(SessionError::Rejected {
                message: "identifier must not be empty".to_string(),
            }
            .into());
        }

        let account = match self.find_account_by_name(identifier)? {
            Some(account) => account,
            None => {
                let account = StoredAccount {
                    id: Uuid::new_v4().to_string(),
                    name: identifier.to_string(),
                    created_at: Utc::now().to_rfc3339(),
                };

                let path = self.account_path(&account.id);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(session_io)?;
                }
                let content = serde_json::to_string_pretty(&account).map_err(|e| {
                    Error::Session(SessionError::Unavailable {
                        message: e.to_string(),
                    })
                })?;
                fs::write(&path, content).map_err(session_io)?;

                debug!(owner = %account.id, name = %account.name, "created account");
                account
            }
        };

        let session = StoredSession {
            owner_id: account.id.clone(),
        };
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(session_io)?;
        }
        let content = serde_json::to_string_pretty(&session).map_err(|e| {
            Error::Session(SessionError::Unavailable {
                message: e.to_string(),
            })
        })?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(session_io)?;
        fs::rename(&temp_path, &path).map_err(session_io)?;

        debug!(owner = %account.id, "signed in");

        Self::identity_for(account)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        let path = self.session_path();

        if path.exists() {
            fs::remove_file(&path).map_err(session_io)?;
            debug!("signed out");
        }

        Ok(())
    }

    fn identity_events(&self) -> Result<IdentityStream> {
        let auth_dir = self.auth_dir();
        let root = self.root.clone();

        fs::create_dir_all(&auth_dir).map_err(session_io)?;

        let (tx, mut rx) = mpsc::channel::<Option<SessionIdentity>>(16);

        // Only transitions after subscription are emitted.
        let last_owner = Arc::new(Mutex::new(current_owner_id(&root)));

        let watcher_root = root.clone();
        let watcher_last = Arc::clone(&last_owner);
        let watcher_tx = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if res.is_ok()
                && let Some(identity) = transition(&watcher_root, &watcher_last)
            {
                let _ = watcher_tx.blocking_send(identity);
            }
        })
        .map_err(|e| {
            Error::Session(SessionError::Unavailable {
                message: format!("failed to create file watcher: {}", e),
            })
        })?;

        watcher
            .watch(&auth_dir, RecursiveMode::NonRecursive)
            .map_err(|e| {
                Error::Session(SessionError::Unavailable {
                    message: format!("failed to watch directory: {}", e),
                })
            })?;

        tokio::spawn(async move {
            let _watcher = watcher;
            let mut interval = tokio::time::interval(Duration::from_millis(500));

            loop {
                interval.tick().await;
                if let Some(identity) = transition(&root, &last_owner)
                    && tx.send(identity).await.is_err()
                {
                    return;
                }
            }
        });

        let stream = async_stream::stream! {
            while let Some(identity) = rx.recv().await {
                yield identity;
            }
        };

        Ok(Box::pin(stream))
    }
}

fn current_owner_id(root: &Path) -> Option<String> {
    let path = root.join("auth").join("session.json");
    let content = fs::read_to_string(path).ok()?;
    let session: StoredSession = serde_json::from_str(&content).ok()?;
    Some(session.owner_id)
}

/// Read the full identity for the current session, if any.
fn read_identity(root: &Path) -> Option<SessionIdentity> {
    let owner_id = current_owner_id(root)?;

    let account_path = root
        .join("auth")
        .join("accounts")
        .join(format!("{}.json", owner_id));
    let account: Option<StoredAccount> = fs::read_to_string(account_path)
        .ok()
        .and_then(|c| serde_json::from_str(&c).ok());

    let (owner, name) = match account {
        Some(account) => (OwnerId::new(&account.id).ok()?, Some(account.name)),
        None => {
            warn!(%owner_id, "session references an unknown account");
            (OwnerId::new(&owner_id).ok()?, None)
        }
    };

    Some(SessionIdentity::new(owner, name))
}

/// Detect an identity transition against the last observed owner.
///
/// Returns `Some(new identity or None)` when the owner changed, `None`
/// when nothing happened.
fn transition(
    root: &Path,
    last_owner: &Arc<Mutex<Option<String>>>,
) -> Option<Option<SessionIdentity>> {
    let current = current_owner_id(root);

    let mut last = last_owner.lock().unwrap();
    if *last == current {
        return None;
    }
    *last = current;
    drop(last);

    Some(read_identity(root))
}
