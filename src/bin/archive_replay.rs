use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use chat_archiver::{Archiver, ArchiverConfig, Update};

/// Archives newline-delimited JSON updates captured from the chat platform
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// File with one JSON update per line; reads stdin when omitted
    #[clap(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Overrides DATA_DIR
    #[clap(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = ArchiverConfig::from_env()?;
    if let Some(data_dir) = args.data_dir {
        config.logs_dir = data_dir.join("logs");
        config.data_dir = data_dir;
    }

    let archiver = Arc::new(Archiver::initialize(config).await?);

    let (sender, receiver) = mpsc::channel::<Update>(500);
    let (shutdown_sender, shutdown_receiver) = mpsc::channel::<()>(1);
    let processor = tokio::spawn(archiver.run(receiver, shutdown_receiver));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_sender.send(()).await;
        }
    });

    let reader: Box<dyn tokio::io::AsyncRead + Unpin + Send> = match &args.input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file: {:?}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut lines = BufReader::new(reader).lines();
    let mut line_number = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Update>(&line) {
            Ok(update) => {
                if sender.send(update).await.is_err() {
                    tracing::info!(
                        target: "chat_archiver::archive_replay",
                        "Update processor stopped, no further input is read"
                    );
                    break;
                }
            }
            Err(e) => tracing::warn!(
                target: "chat_archiver::archive_replay",
                "Skipping line {}: not a valid update: {}",
                line_number,
                e
            ),
        }
    }
    drop(sender);

    let summary = processor.await?;
    tracing::info!(
        target: "chat_archiver::archive_replay",
        "Replay finished: {} stored, {} skipped, {} failed, {} panicked",
        summary.stored,
        summary.skipped,
        summary.failed,
        summary.panicked
    );
    Ok(())
}
