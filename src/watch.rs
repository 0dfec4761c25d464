//! Watch a directory and upload whatever gets created in it.
//!
//! The watch is non-recursive: only direct children of the root raise
//! events. A created directory is uploaded as a whole tree.

use crate::error::{UploadError, UploadResult};
use crate::upload::{UploadStats, Uploader};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinSet;

/// What the event source delivers
pub type EventResult = notify::Result<Event>;

pub struct WatchBridge {
    uploader: Uploader,
    root: PathBuf,
}

impl WatchBridge {
    pub fn new(uploader: Uploader, root: impl Into<PathBuf>) -> Self {
        Self {
            uploader,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subscribe to creation events under the root and feed them to the
    /// uploader until the event source shuts down or an upload fails.
    pub async fn watch(&self) -> UploadResult<UploadStats> {
        let watch_err = |source: notify::Error| UploadError::Watch {
            path: self.root.clone(),
            source,
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: EventResult| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(watch_err)?;
        watcher
            .watch(&self.root, RecursiveMode::NonRecursive)
            .map_err(watch_err)?;

        // The watcher owns the sender; keep it alive for the whole loop
        let stats = self.run(rx).await;
        drop(watcher);
        stats
    }

    /// Drive uploads from an event stream.
    ///
    /// Event-source errors are logged and skipped. Returns once the channel
    /// is closed and every upload it started has finished, or with the first
    /// upload error (remaining uploads are aborted).
    pub async fn run(&self, mut events: UnboundedReceiver<EventResult>) -> UploadResult<UploadStats> {
        let mut uploads: JoinSet<UploadResult<UploadStats>> = JoinSet::new();
        let mut stats = UploadStats::default();

        loop {
            tokio::select! {
                next = events.recv() => match next {
                    Some(Ok(event)) => self.dispatch(event, &mut uploads),
                    Some(Err(err)) => {
                        let path = err.paths.first().cloned().unwrap_or_else(|| self.root.clone());
                        self.uploader.logger().error("watch", &path, &err.to_string());
                    }
                    None => break,
                },
                Some(done) = uploads.join_next(), if !uploads.is_empty() => {
                    stats.merge(done??);
                }
            }
        }

        while let Some(done) = uploads.join_next().await {
            stats.merge(done??);
        }
        Ok(stats)
    }

    fn dispatch(&self, event: Event, uploads: &mut JoinSet<UploadResult<UploadStats>>) {
        if !matches!(event.kind, EventKind::Create(_)) {
            return;
        }
        for path in event.paths {
            self.uploader.logger().watch_event(&path);
            let uploader = self.uploader.clone();
            uploads.spawn(async move { uploader.upload(&path).await });
        }
    }
}
