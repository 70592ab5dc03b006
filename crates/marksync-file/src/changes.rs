//! Change feed for the file-backed store.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::Stream;
use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;

use marksync_core::error::{Error, StoreReadError};
use marksync_core::{ChangeNotice, Result};

use crate::store::{ChangeLogEvent, FileStore};

fn feed_error(message: String) -> Error {
    Error::StoreRead(StoreReadError::Unavailable { message })
}

/// Change feed tailing the store's append-only change log.
///
/// A filesystem watcher reacts to log appends; a 500 ms poll backstops
/// platforms where the watcher misses events. Each complete new log
/// line becomes one payload-free notice.
pub struct FileChanges {
    inner: Pin<Box<dyn Stream<Item = Result<ChangeNotice>> + Send>>,
}

impl FileChanges {
    pub(crate) fn from_store(store: FileStore) -> Result<Self> {
        let store_dir = store.store_dir();
        let log_path = store.change_log_path();

        std::fs::create_dir_all(&store_dir)
            .map_err(|e| feed_error(format!("failed to create store directory: {}", e)))?;

        let (tx, mut rx) = mpsc::channel::<Result<ChangeNotice>>(100);

        // Start tailing at the current end: subscribers want changes
        // from now on, not history.
        let initial_pos = std::fs::metadata(&log_path).map(|m| m.len()).unwrap_or(0);
        let position = Arc::new(Mutex::new(initial_pos));

        let watcher_position = Arc::clone(&position);
        let watcher_log_path = log_path.clone();
        let watcher_tx = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if !matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                ) {
                    return;
                }

                let is_log = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|n| n == "changes.jsonl"));

                if !is_log {
                    return;
                }

                for _ in 0..count_new_events(&watcher_log_path, &watcher_position) {
                    // Watcher callbacks run on the notify thread, so the
                    // blocking send is safe here.
                    let _ = watcher_tx.blocking_send(Ok(ChangeNotice));
                }
            }
        })
        .map_err(|e| feed_error(format!("failed to create file watcher: {}", e)))?;

        watcher
            .watch(&store_dir, RecursiveMode::NonRecursive)
            .map_err(|e| feed_error(format!("failed to watch directory: {}", e)))?;

        let poll_log_path = log_path.clone();
        tokio::spawn(async move {
            let _watcher = watcher;
            let mut interval = tokio::time::interval(Duration::from_millis(500));

            loop {
                interval.tick().await;
                for _ in 0..count_new_events(&poll_log_path, &position) {
                    if tx.send(Ok(ChangeNotice)).await.is_err() {
                        return;
                    }
                }
            }
        });

        let stream = async_stream::stream! {
            while let Some(notice) = rx.recv().await {
                yield notice;
            }
        };

        Ok(Self {
            inner: Box::pin(stream),
        })
    }
}

impl Stream for FileChanges {
    type Item = Result<ChangeNotice>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Count complete new change-log lines past the tracked position.
///
/// The position only advances past the last newline: a trailing
/// fragment is a write still in progress, and must stay unconsumed so
/// the next pass sees the completed line.
fn count_new_events(log_path: &Path, position: &Arc<Mutex<u64>>) -> usize {
    let mut count = 0;

    if let Ok(mut file) = File::open(log_path) {
        let mut pos = position.lock().unwrap();
        if file.seek(SeekFrom::Start(*pos)).is_ok() {
            let mut buf = String::new();
            if file.read_to_string(&mut buf).is_ok() {
                let consumed = buf.rfind('\n').map_or(0, |i| i + 1);
                for line in buf[..consumed].lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    if serde_json::from_str::<ChangeLogEvent>(line).is_ok() {
                        count += 1;
                    }
                }
                *pos += consumed as u64;
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChangeLogOp;
    use std::io::Write;

    fn event_line() -> String {
        serde_json::to_string(&ChangeLogEvent {
            time: "2026-08-27T00:00:00Z".to_string(),
            op: ChangeLogOp::Create,
        })
        .unwrap()
    }

    #[test]
    fn counts_complete_lines_from_the_tracked_position() {
        let temp = tempfile::tempdir().unwrap();
        let log = temp.path().join("changes.jsonl");
        let position = Arc::new(Mutex::new(0));

        let mut file = File::create(&log).unwrap();
        writeln!(file, "{}", event_line()).unwrap();
        writeln!(file, "{}", event_line()).unwrap();

        assert_eq!(count_new_events(&log, &position), 2);
        // Nothing new on a second pass.
        assert_eq!(count_new_events(&log, &position), 0);
    }

    #[test]
    fn torn_trailing_line_is_counted_once_completed() {
        let temp = tempfile::tempdir().unwrap();
        let log = temp.path().join("changes.jsonl");
        let position = Arc::new(Mutex::new(0));

        let line = event_line();
        let (head, tail) = line.split_at(line.len() / 2);

        let mut file = File::create(&log).unwrap();
        writeln!(file, "{}", event_line()).unwrap();
        write!(file, "{}", head).unwrap();

        // The unterminated fragment stays unconsumed.
        assert_eq!(count_new_events(&log, &position), 1);

        write!(file, "{}", tail).unwrap();
        writeln!(file).unwrap();

        assert_eq!(count_new_events(&log, &position), 1);
    }
}
