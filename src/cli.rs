//! Command-line surface for the sendtree client

use crate::config::{FileConfig, FrameFormat, NameMode, UploadConfig};
use anyhow::Result;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Clone, Debug, Parser)]
#[command(
    author,
    version,
    about = "Send a file or a directory tree to a TCP receiver, one connection per file"
)]
pub struct ClientOpts {
    /// Server address to send to. Ex: localhost:4040
    #[arg(long)]
    pub server: Option<String>,

    /// File or folder to upload. Ex: /tmp/filename.pdf OR /tmp
    #[arg(long)]
    pub path: PathBuf,

    /// Keep monitoring the path folder for new entries. Ex: true
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub monitor: bool,

    /// Max simultaneous file connections (0 = unbounded)
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Body delimiting on the wire
    #[arg(long, value_enum)]
    pub frame_format: Option<FrameFormat>,

    /// Name sent for files found in subdirectories
    #[arg(long, value_enum)]
    pub name_mode: Option<NameMode>,

    /// Write JSONL log entries to file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// TOML file with defaults for the options above
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Show per-file details, skipped entries and watch events
    #[arg(short, long)]
    pub verbose: bool,
}

impl ClientOpts {
    /// Merge flags over the config file over the defaults. Returns the
    /// upload settings and the log file to open, if any.
    pub fn resolve(&self) -> Result<(UploadConfig, Option<PathBuf>)> {
        let file = match &self.config {
            Some(p) => FileConfig::load(p)?,
            None => FileConfig::default(),
        };
        let log_file = self.log_file.clone().or_else(|| file.log_file.clone());
        let mut cfg = file.into_upload_config();

        if let Some(server) = &self.server {
            cfg.server = server.clone();
        }
        if let Some(n) = self.max_connections {
            cfg.max_connections = n;
        }
        if let Some(f) = self.frame_format {
            cfg.frame_format = f;
        }
        if let Some(m) = self.name_mode {
            cfg.name_mode = m;
        }
        cfg.verbose |= self.verbose;

        Ok((cfg, log_file))
    }
}
