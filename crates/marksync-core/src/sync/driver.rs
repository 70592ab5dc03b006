//! Subscription driver for a synchronizer instance.

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::traits::{BoxedChangeFeed, IdentityStream, RecordStore};

use super::Synchronizer;

/// Owns the two subscription tasks feeding a [`Synchronizer`].
///
/// One task forwards identity transitions, the other forwards change
/// notices. [`SyncDriver::shutdown`] releases both exactly once and may
/// be called again safely; dropping the driver aborts anything still
/// running, so no callback can outlive the owning context and mutate a
/// torn-down synchronizer.
pub struct SyncDriver {
    stop: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncDriver {
    /// Spawn the subscription tasks for `sync`.
    pub fn spawn<S>(
        sync: Arc<Synchronizer<S>>,
        mut identities: IdentityStream,
        mut changes: BoxedChangeFeed,
    ) -> Self
    where
        S: RecordStore + ?Sized + 'static,
    {
        let (stop, _) = watch::channel(false);

        let identity_task = {
            let sync = Arc::clone(&sync);
            let mut stop_rx = stop.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop_rx.changed() => break,
                        item = identities.next() => match item {
                            Some(identity) => {
                                if let Err(err) = sync.on_identity_changed(identity).await {
                                    warn!(error = %err, "identity-driven reconcile failed");
                                }
                            }
                            None => {
                                debug!("identity stream ended");
                                break;
                            }
                        },
                    }
                }
            })
        };

        let change_task = {
            let sync = Arc::clone(&sync);
            let mut stop_rx = stop.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = stop_rx.changed() => break,
                        item = changes.next() => match item {
                            Some(Ok(_notice)) => {
                                if let Err(err) = sync.on_change_notice().await {
                                    warn!(error = %err, "notice-driven reconcile failed");
                                }
                            }
                            Some(Err(err)) => {
                                warn!(error = %err, "change feed error");
                            }
                            None => {
                                debug!("change feed ended");
                                break;
                            }
                        },
                    }
                }
            })
        };

        Self {
            stop,
            tasks: Mutex::new(vec![identity_task, change_task]),
        }
    }

    /// Stop both subscription tasks and wait for them to finish.
    ///
    /// Idempotent: a second call finds nothing left to stop.
    pub async fn shutdown(&self) {
        let _ = self.stop.send(true);
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
    }
}

impl Drop for SyncDriver {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
    }
}
