//! Upload dispatcher and tree walker
//!
//! `Uploader::upload` decides between a single file and a directory. A
//! directory is walked one level at a time: files are sent inline in name
//! order, subdirectories are spawned as their own tasks right away so sibling
//! subtrees transfer in parallel. While a level sends a file it keeps polling
//! its subtrees, so the first error from any depth ends the whole walk at
//! once. Returning drops the level's `JoinSet`, which aborts every subtree
//! still running, and nested levels abort theirs in turn.

use crate::config::UploadConfig;
use crate::error::{UploadError, UploadResult};
use crate::fs_enum::{list_dir_async, Listed, TransferTarget};
use crate::logger::Logger;
use crate::net_async::client::{send_file, SentFile};
use crate::protocol_core::FrameCodec;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

type WalkFuture = Pin<Box<dyn Future<Output = UploadResult<UploadStats>> + Send + 'static>>;
type Subtrees = JoinSet<UploadResult<UploadStats>>;

/// Statistics for upload operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadStats {
    pub files_sent: u64,
    pub bytes_sent: u64,
    pub empty_dirs: u64,
    pub skipped: u64,
}

impl UploadStats {
    pub fn add_file(&mut self, bytes: u64) {
        self.files_sent += 1;
        self.bytes_sent += bytes;
    }

    pub fn merge(&mut self, other: UploadStats) {
        self.files_sent += other.files_sent;
        self.bytes_sent += other.bytes_sent;
        self.empty_dirs += other.empty_dirs;
        self.skipped += other.skipped;
    }
}

#[derive(Clone)]
pub struct Uploader {
    config: Arc<UploadConfig>,
    codec: Arc<dyn FrameCodec>,
    limiter: Option<Arc<Semaphore>>,
    logger: Arc<dyn Logger>,
}

impl Uploader {
    pub fn new(config: UploadConfig, logger: Arc<dyn Logger>) -> Self {
        let codec = config.frame_format.codec();
        let limiter = match config.max_connections {
            0 => None,
            n => Some(Arc::new(Semaphore::new(n))),
        };
        Self {
            config: Arc::new(config),
            codec,
            limiter,
            logger,
        }
    }

    /// Replace the codec picked from `frame_format`
    pub fn with_codec(mut self, codec: Arc<dyn FrameCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Send `path`: a regular file directly, a directory through the walker.
    pub async fn upload(&self, path: &Path) -> UploadResult<UploadStats> {
        let stat_err = |source: io::Error| UploadError::Stat {
            path: path.to_path_buf(),
            source,
        };
        let meta = tokio::fs::metadata(path).await.map_err(stat_err)?;
        self.logger.start(path, &self.config.server);

        if meta.is_dir() {
            return self.walk(path.to_path_buf(), PathBuf::new()).await;
        }

        let target = TransferTarget::for_file(path).ok_or_else(|| {
            stat_err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;
        let sent = self.transfer(&target).await?;
        let mut stats = UploadStats::default();
        stats.add_file(sent.bytes);
        Ok(stats)
    }

    /// Walk `root/prefix`, sending every file under it.
    ///
    /// Boxed so the walker can spawn itself for subdirectories.
    pub fn walk(&self, root: PathBuf, prefix: PathBuf) -> WalkFuture {
        let this = self.clone();
        Box::pin(async move { this.walk_level(root, prefix).await })
    }

    async fn walk_level(&self, root: PathBuf, prefix: PathBuf) -> UploadResult<UploadStats> {
        let dir = if prefix.as_os_str().is_empty() {
            root.clone()
        } else {
            root.join(&prefix)
        };
        let entries = list_dir_async(dir.clone()).await?;

        let mut stats = UploadStats::default();
        if entries.is_empty() {
            self.logger.no_files(&dir);
            stats.empty_dirs += 1;
            return Ok(stats);
        }

        // Any early return drops `subtrees`, which aborts them
        let mut subtrees = Subtrees::new();
        for entry in entries {
            let relative = prefix.join(entry.name());
            match entry {
                Listed::Dir(_) => {
                    subtrees.spawn(self.walk(root.clone(), relative));
                }
                Listed::File(_) => {
                    let target = TransferTarget::new(root.clone(), relative);
                    let sent = self.transfer_alongside(&target, &mut subtrees, &mut stats).await?;
                    stats.add_file(sent.bytes);
                }
                Listed::Skipped { reason, .. } => {
                    self.logger.skipped(&root.join(&relative), reason);
                    stats.skipped += 1;
                }
            }
        }

        while let Some(done) = subtrees.join_next().await {
            stats.merge(done??);
        }
        Ok(stats)
    }

    /// Send one file while collecting subtrees that finish meanwhile.
    /// A failed subtree wins over the transfer in flight.
    async fn transfer_alongside(
        &self,
        target: &TransferTarget,
        subtrees: &mut Subtrees,
        stats: &mut UploadStats,
    ) -> UploadResult<SentFile> {
        let send = self.transfer(target);
        tokio::pin!(send);
        loop {
            tokio::select! {
                biased;
                Some(done) = subtrees.join_next(), if !subtrees.is_empty() => {
                    stats.merge(done??);
                }
                sent = &mut send => return sent,
            }
        }
    }

    async fn transfer(&self, target: &TransferTarget) -> UploadResult<SentFile> {
        // The semaphore is never closed, so acquire cannot fail
        let _permit = match &self.limiter {
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };
        let sent = send_file(
            target,
            &self.config.server,
            self.codec.as_ref(),
            self.config.name_mode,
        )
        .await?;
        self.logger.file_sent(&sent.path, &sent.name, sent.bytes);
        Ok(sent)
    }
}
