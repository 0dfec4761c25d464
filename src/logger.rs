use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub trait Logger: Send + Sync {
    fn start(&self, _path: &Path, _server: &str) {}
    fn file_sent(&self, _path: &Path, _name: &str, _bytes: u64) {}
    fn no_files(&self, _dir: &Path) {}
    fn skipped(&self, _path: &Path, _reason: &str) {}
    fn watch_event(&self, _path: &Path) {}
    fn error(&self, _context: &str, _path: &Path, _msg: &str) {}
    fn done(&self, _files: u64, _bytes: u64, _seconds: f64) {}
}

pub struct NoopLogger;
impl Logger for NoopLogger {}

/// Human-readable progress on stdout.
pub struct ConsoleLogger {
    verbose: bool,
}

impl ConsoleLogger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Logger for ConsoleLogger {
    fn start(&self, path: &Path, server: &str) {
        if self.verbose {
            println!("[client] uploading {} to {}", path.display(), server);
        }
    }
    fn file_sent(&self, path: &Path, name: &str, bytes: u64) {
        if self.verbose {
            println!("{} -> {} ({} bytes)", path.display(), name, bytes);
        } else {
            println!("{}", path.display());
        }
    }
    fn no_files(&self, dir: &Path) {
        println!("[client] No files in {}", dir.display());
    }
    fn skipped(&self, path: &Path, reason: &str) {
        if self.verbose {
            println!("[client] skipping {} ({})", path.display(), reason);
        }
    }
    fn watch_event(&self, path: &Path) {
        if self.verbose {
            println!("[client] created {}", path.display());
        }
    }
    fn error(&self, context: &str, path: &Path, msg: &str) {
        eprintln!("error: {} {}: {}", context, path.display(), msg);
    }
    fn done(&self, files: u64, bytes: u64, seconds: f64) {
        if self.verbose {
            println!("[client] sent {files} files ({bytes} bytes) in {seconds:.3}s");
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LogEvent<'a> {
    Start { path: &'a Path, server: &'a str },
    FileSent { path: &'a Path, name: &'a str, bytes: u64 },
    NoFiles { dir: &'a Path },
    Skipped { path: &'a Path, reason: &'a str },
    WatchEvent { path: &'a Path },
    Error { context: &'a str, path: &'a Path, msg: &'a str },
    Done { files: u64, bytes: u64, seconds: f64 },
}

#[derive(Serialize, Debug)]
struct LogEntry<'a> {
    timestamp: String,
    session_id: &'a str,
    #[serde(flatten)]
    event: LogEvent<'a>,
}

/// Appends one JSON object per line to a log file.
pub struct JsonlLogger {
    file: Mutex<File>,
    session_id: String,
}

impl JsonlLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let f = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(f),
            session_id: Uuid::new_v4().to_string(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn write(&self, event: LogEvent<'_>) {
        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            session_id: &self.session_id,
            event,
        };
        if let Ok(line) = serde_json::to_string(&entry) {
            if let Ok(mut f) = self.file.lock() {
                let _ = writeln!(f, "{}", line);
            }
        }
    }
}

impl Logger for JsonlLogger {
    fn start(&self, path: &Path, server: &str) {
        self.write(LogEvent::Start { path, server });
    }
    fn file_sent(&self, path: &Path, name: &str, bytes: u64) {
        self.write(LogEvent::FileSent { path, name, bytes });
    }
    fn no_files(&self, dir: &Path) {
        self.write(LogEvent::NoFiles { dir });
    }
    fn skipped(&self, path: &Path, reason: &str) {
        self.write(LogEvent::Skipped { path, reason });
    }
    fn watch_event(&self, path: &Path) {
        self.write(LogEvent::WatchEvent { path });
    }
    fn error(&self, context: &str, path: &Path, msg: &str) {
        self.write(LogEvent::Error { context, path, msg });
    }
    fn done(&self, files: u64, bytes: u64, seconds: f64) {
        self.write(LogEvent::Done { files, bytes, seconds });
    }
}

/// Forwards every hook to each inner logger in order.
pub struct FanoutLogger {
    sinks: Vec<Arc<dyn Logger>>,
}

impl FanoutLogger {
    pub fn new(sinks: Vec<Arc<dyn Logger>>) -> Self {
        Self { sinks }
    }
}

impl Logger for FanoutLogger {
    fn start(&self, path: &Path, server: &str) {
        self.sinks.iter().for_each(|s| s.start(path, server));
    }
    fn file_sent(&self, path: &Path, name: &str, bytes: u64) {
        self.sinks.iter().for_each(|s| s.file_sent(path, name, bytes));
    }
    fn no_files(&self, dir: &Path) {
        self.sinks.iter().for_each(|s| s.no_files(dir));
    }
    fn skipped(&self, path: &Path, reason: &str) {
        self.sinks.iter().for_each(|s| s.skipped(path, reason));
    }
    fn watch_event(&self, path: &Path) {
        self.sinks.iter().for_each(|s| s.watch_event(path));
    }
    fn error(&self, context: &str, path: &Path, msg: &str) {
        self.sinks.iter().for_each(|s| s.error(context, path, msg));
    }
    fn done(&self, files: u64, bytes: u64, seconds: f64) {
        self.sinks.iter().for_each(|s| s.done(files, bytes, seconds));
    }
}
