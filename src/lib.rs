//! Sendtree library
//!
//! Push a file or a directory tree to a TCP receiver, one connection per
//! file, and optionally keep pushing whatever appears in a watched directory.

pub mod cli;
pub mod config;
pub mod error;
pub mod fs_enum;
pub mod logger;
pub mod net_async;
pub mod protocol;
pub mod protocol_core;
pub mod upload;
pub mod watch;

pub use config::UploadConfig;
pub use error::{ErrorKind, UploadError};
pub use upload::{UploadStats, Uploader};
pub use watch::WatchBridge;
