//! Upload settings and the optional TOML config file

use crate::protocol::DEFAULT_SERVER;
use crate::protocol_core::{FrameCodec, LengthPrefixed, StreamDelimited};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which name a file is announced under.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum NameMode {
    /// Final path segment only; files in subdirectories lose their prefix
    #[default]
    BaseName,
    /// Path relative to the walked root, `/`-separated
    RelativePath,
}

/// How the file body is delimited on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FrameFormat {
    /// Body runs until the connection closes
    #[default]
    Stream,
    /// u64 body length follows the name
    LengthPrefixed,
}

impl FrameFormat {
    pub fn codec(self) -> Arc<dyn FrameCodec> {
        match self {
            FrameFormat::Stream => Arc::new(StreamDelimited),
            FrameFormat::LengthPrefixed => Arc::new(LengthPrefixed),
        }
    }
}

/// Settings for one upload or watch session.
#[derive(Clone, Debug)]
pub struct UploadConfig {
    /// Receiver address (host:port)
    pub server: String,
    /// Cap on simultaneous file connections (0 = unbounded)
    pub max_connections: usize,
    pub frame_format: FrameFormat,
    pub name_mode: NameMode,
    pub verbose: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            max_connections: 0,
            frame_format: FrameFormat::default(),
            name_mode: NameMode::default(),
            verbose: false,
        }
    }
}

/// On-disk config; every key is optional.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub server: Option<String>,
    pub max_connections: Option<usize>,
    pub frame_format: Option<FrameFormat>,
    pub name_mode: Option<NameMode>,
    pub verbose: Option<bool>,
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: FileConfig =
            toml::from_str(&data).with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg)
    }

    /// Layer file values over the built-in defaults
    pub fn into_upload_config(self) -> UploadConfig {
        let defaults = UploadConfig::default();
        UploadConfig {
            server: self.server.unwrap_or(defaults.server),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            frame_format: self.frame_format.unwrap_or(defaults.frame_format),
            name_mode: self.name_mode.unwrap_or(defaults.name_mode),
            verbose: self.verbose.unwrap_or(defaults.verbose),
        }
    }
}
