//! sendtree - push a file or directory tree to a TCP receiver
//!
//! Any failure during the initial upload or a watch session is fatal: the
//! message goes to stderr and the process exits with status 1.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use sendtree::cli::ClientOpts;
use sendtree::logger::{ConsoleLogger, FanoutLogger, JsonlLogger, Logger};
use sendtree::{UploadError, Uploader, WatchBridge};

fn main() {
    // Ctrl-C is the normal way to end a watch session
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nInterrupted by user. Exiting (Ctrl-C)...");
        // 128 + SIGINT
        std::process::exit(130);
    }) {
        eprintln!("warning: could not install Ctrl-C handler: {}", e);
    }

    let opts = ClientOpts::parse();
    if let Err(err) = run(opts) {
        eprintln!("Fatal error: {:#}", err);
        std::process::exit(1);
    }
}

/// Console output plus, when requested, the JSONL file sink on its own so
/// fatal errors can be recorded without echoing them twice on stderr.
fn build_logger(verbose: bool, log_file: Option<&Path>) -> (Arc<dyn Logger>, Option<Arc<dyn Logger>>) {
    let console: Arc<dyn Logger> = Arc::new(ConsoleLogger::new(verbose));
    let Some(p) = log_file else {
        return (console, None);
    };
    match JsonlLogger::new(p) {
        Ok(l) => {
            let file: Arc<dyn Logger> = Arc::new(l);
            let both: Arc<dyn Logger> = Arc::new(FanoutLogger::new(vec![console, file.clone()]));
            (both, Some(file))
        }
        Err(e) => {
            eprintln!("warning: log file {} disabled: {}", p.display(), e);
            (console, None)
        }
    }
}

fn run(opts: ClientOpts) -> Result<()> {
    let (config, log_file) = opts.resolve()?;
    let (logger, file_log) = build_logger(config.verbose, log_file.as_deref());
    let record_fatal = |context: &str, path: &Path, err: &UploadError| {
        if let Some(f) = &file_log {
            f.error(context, path, &err.to_string());
        }
    };
    let uploader = Uploader::new(config, logger.clone());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    rt.block_on(async {
        let start = Instant::now();
        let stats = uploader.upload(&opts.path).await.map_err(|e| {
            record_fatal("upload", &opts.path, &e);
            e
        })?;
        logger.done(
            stats.files_sent,
            stats.bytes_sent,
            start.elapsed().as_secs_f64(),
        );

        if opts.monitor {
            let bridge = WatchBridge::new(uploader.clone(), opts.path.clone());
            let watched = bridge.watch().await.map_err(|e| {
                record_fatal("watch", bridge.root(), &e);
                e
            })?;
            logger.done(
                watched.files_sent,
                watched.bytes_sent,
                start.elapsed().as_secs_f64(),
            );
        }
        Ok::<_, anyhow::Error>(())
    })
}
