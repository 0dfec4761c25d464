#![allow(dead_code)]

use anyhow::Result;
use sendtree::logger::Logger;
use sendtree::protocol::NAME_LEN_BYTES;
use sendtree::protocol_core::{decode_name_len, read_body_len, read_frame_name};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// One connection as the receiver saw it
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub name: String,
    pub body: Vec<u8>,
    pub raw: Vec<u8>,
}

/// How the receiver treats incoming connections
#[derive(Debug, Clone, Default)]
pub struct ReceiverOpts {
    pub length_prefixed: bool,
    /// Read the header of this frame, then stop reading until `release`
    pub hold: Option<String>,
    /// Accept connections but read nothing until `release`
    pub stall: bool,
}

/// Minimal receiver: one frame per connection, body until close
pub struct Receiver {
    pub addr: String,
    frames: Arc<Mutex<Vec<ReceivedFrame>>>,
    headers: Arc<Mutex<Vec<String>>>,
    connections: Arc<AtomicUsize>,
    gate: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Receiver {
    pub async fn start(length_prefixed: bool) -> Result<Self> {
        Self::start_with(ReceiverOpts {
            length_prefixed,
            ..ReceiverOpts::default()
        })
        .await
    }

    pub async fn start_with(opts: ReceiverOpts) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let headers = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let (gate, gate_rx) = watch::channel(false);

        let frames_c = frames.clone();
        let headers_c = headers.clone();
        let conns_c = connections.clone();
        let task = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                conns_c.fetch_add(1, Ordering::SeqCst);
                let frames = frames_c.clone();
                let headers = headers_c.clone();
                let opts = opts.clone();
                let mut gate = gate_rx.clone();
                tokio::spawn(async move {
                    if opts.stall && gate.wait_for(|open| *open).await.is_err() {
                        return;
                    }
                    let mut len_buf = [0u8; NAME_LEN_BYTES];
                    if stream.read_exact(&mut len_buf).await.is_err() {
                        return;
                    }
                    let mut name_buf = vec![0u8; decode_name_len(len_buf)];
                    if stream.read_exact(&mut name_buf).await.is_err() {
                        return;
                    }
                    let name = String::from_utf8_lossy(&name_buf).into_owned();
                    headers.lock().unwrap().push(name.clone());
                    if opts.hold.as_deref() == Some(name.as_str())
                        && gate.wait_for(|open| *open).await.is_err()
                    {
                        return;
                    }

                    let mut rest = Vec::new();
                    if stream.read_to_end(&mut rest).await.is_err() {
                        return;
                    }
                    let mut raw = len_buf.to_vec();
                    raw.extend_from_slice(&name_buf);
                    raw.extend_from_slice(&rest);

                    let mut rd = &raw[..];
                    let Ok(name) = read_frame_name(&mut rd).await else {
                        return;
                    };
                    if opts.length_prefixed {
                        let Ok(len) = read_body_len(&mut rd).await else {
                            return;
                        };
                        assert_eq!(len as usize, rd.len(), "declared body length");
                    }
                    let body = rd.to_vec();
                    frames.lock().unwrap().push(ReceivedFrame { name, body, raw });
                });
            }
        });

        Ok(Self {
            addr,
            frames,
            headers,
            connections,
            gate,
            task,
        })
    }

    /// Let held and stalled connections carry on
    pub fn release(&self) {
        let _ = self.gate.send(true);
    }

    /// Names whose header has arrived, complete or not
    pub fn headers(&self) -> Vec<String> {
        self.headers.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<ReceivedFrame> {
        self.frames.lock().unwrap().clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` frames have been fully received
    pub async fn wait_for(&self, n: usize) -> Vec<ReceivedFrame> {
        for _ in 0..250u32 {
            if self.frames.lock().unwrap().len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.frames()
    }

    /// Wait until a header for `name` has arrived
    pub async fn wait_for_header(&self, name: &str) -> bool {
        for _ in 0..250u32 {
            if self.headers.lock().unwrap().iter().any(|h| h == name) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An address nothing listens on
pub fn closed_addr() -> String {
    let sock = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = sock.local_addr().unwrap().to_string();
    drop(sock);
    addr
}

pub fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut f = std::fs::File::create(path)?;
    f.write_all(data)?;
    Ok(())
}

/// Logger that remembers what it was told
#[derive(Default)]
pub struct RecordingLogger {
    pub lines: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    fn push(&self, s: String) {
        self.lines.lock().unwrap().push(s);
    }
}

impl Logger for RecordingLogger {
    fn file_sent(&self, _path: &Path, name: &str, bytes: u64) {
        self.push(format!("sent {} {}", name, bytes));
    }
    fn no_files(&self, dir: &Path) {
        self.push(format!("no files {}", dir.display()));
    }
    fn skipped(&self, path: &Path, reason: &str) {
        self.push(format!("skipped {} {}", path.display(), reason));
    }
    fn watch_event(&self, path: &Path) {
        self.push(format!("created {}", path.display()));
    }
    fn error(&self, context: &str, _path: &Path, msg: &str) {
        self.push(format!("error {} {}", context, msg));
    }
}
