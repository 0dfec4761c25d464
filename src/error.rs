//! Error values for the upload engine
//!
//! Nothing below `main` exits the process; every failure comes back as an
//! [`UploadError`] and the binary decides what to do with it.

use crate::protocol_core::ProtocolError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("stat {}: {source}", .path.display())]
    Stat { path: PathBuf, source: io::Error },

    #[error("read dir {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("dial {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("open {}: {source}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    /// Writing the header, copying the body or closing the stream. `source`
    /// may come from reading the local file as well as from the socket.
    #[error("copy {} to {addr}: {source}", .path.display())]
    Write {
        path: PathBuf,
        addr: String,
        source: io::Error,
    },

    #[error("frame for {}: {source}", .path.display())]
    Protocol {
        path: PathBuf,
        source: ProtocolError,
    },

    #[error("watch {}: {source}", .path.display())]
    Watch {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("upload task: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Flat category of an [`UploadError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Stat,
    ReadDir,
    Connect,
    Open,
    Write,
    Protocol,
    Watch,
    Task,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Stat { .. } => ErrorKind::Stat,
            UploadError::ReadDir { .. } => ErrorKind::ReadDir,
            UploadError::Connect { .. } => ErrorKind::Connect,
            UploadError::Open { .. } => ErrorKind::Open,
            UploadError::Write { .. } => ErrorKind::Write,
            UploadError::Protocol { .. } => ErrorKind::Protocol,
            UploadError::Watch { .. } => ErrorKind::Watch,
            UploadError::Task(_) => ErrorKind::Task,
        }
    }
}

pub type UploadResult<T> = std::result::Result<T, UploadError>;
