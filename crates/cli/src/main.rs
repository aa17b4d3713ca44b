//! Airlift push client binary.

mod api_client;

use anyhow::{Context, Result, bail};
use api_client::{ApiClient, InitParams};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Default chunk size: 4 MiB.
const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Airlift - push videos to an Airlift server
#[derive(Parser, Debug)]
#[command(name = "airlift")]
#[command(version, about, long_about = None)]
struct Args {
    /// Server base URL
    #[arg(short, long, env = "AIRLIFT_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a video file
    Push {
        /// File to upload
        file: PathBuf,
        /// Station id the video belongs to
        #[arg(long)]
        station_id: String,
        /// Video title (defaults to the file name)
        #[arg(long)]
        title: Option<String>,
        /// Content classification (music, news, sports, entertainment, education)
        #[arg(long, default_value = "other")]
        content_type: String,
        /// Upload priority (1-5)
        #[arg(long)]
        priority: Option<u32>,
        /// Chunk size in bytes
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },
    /// Cancel an in-flight upload session
    Cancel {
        /// Upload session id
        upload_id: String,
    },
}

/// Number of chunks needed to carry `size` bytes.
fn chunk_count(size: u64, chunk_size: u64) -> u64 {
    size.div_ceil(chunk_size)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let client = ApiClient::new(&args.server)?;

    match args.command {
        Command::Push {
            file,
            station_id,
            title,
            content_type,
            priority,
            chunk_size,
        } => push(&client, file, station_id, title, content_type, priority, chunk_size).await,
        Command::Cancel { upload_id } => {
            client.cancel(&upload_id).await?;
            println!("cancelled {upload_id}");
            Ok(())
        }
    }
}

async fn push(
    client: &ApiClient,
    file: PathBuf,
    station_id: String,
    title: Option<String>,
    content_type: String,
    priority: Option<u32>,
    chunk_size: u64,
) -> Result<()> {
    if chunk_size == 0 {
        bail!("chunk size must be positive");
    }

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("file has no usable name")?
        .to_string();
    let metadata = tokio::fs::metadata(&file)
        .await
        .with_context(|| format!("cannot stat {}", file.display()))?;
    let filesize = metadata.len();
    if filesize == 0 {
        bail!("refusing to upload an empty file");
    }

    let total = u32::try_from(chunk_count(filesize, chunk_size))
        .context("file needs more chunks than the protocol supports")?;

    let upload_id = client
        .init(&InitParams {
            station_id,
            filename: filename.clone(),
            filesize,
            title: title.unwrap_or_else(|| filename.clone()),
            content_type,
            priority,
        })
        .await?;
    tracing::info!(upload_id = %upload_id, chunks = total, "upload session created");

    // Stream the file one chunk at a time; on any failure, tell the
    // server to drop the staged session before bailing.
    let result = send_chunks(client, &file, &upload_id, total, chunk_size).await;
    if let Err(e) = result {
        tracing::warn!(upload_id = %upload_id, "upload failed, cancelling session");
        if let Err(cancel_err) = client.cancel(&upload_id).await {
            tracing::warn!(error = %cancel_err, "cancel after failure also failed");
        }
        return Err(e);
    }

    let receipt = client.finalize(&upload_id).await?;
    println!(
        "uploaded {} as {} (video {}), {} coins deducted, balance {}",
        filename, receipt.filename, receipt.video_id, receipt.coins_deducted, receipt.new_balance
    );
    Ok(())
}

async fn send_chunks(
    client: &ApiClient,
    file: &PathBuf,
    upload_id: &str,
    total: u32,
    chunk_size: u64,
) -> Result<()> {
    let mut reader = tokio::fs::File::open(file)
        .await
        .with_context(|| format!("cannot open {}", file.display()))?;

    for index in 0..total {
        let mut buffer = vec![0u8; chunk_size as usize];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = reader.read(&mut buffer[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buffer.truncate(filled);
        if buffer.is_empty() {
            bail!("file shrank while uploading (chunk {index} empty)");
        }

        let progress = client
            .upload_chunk(upload_id, index, total, buffer)
            .await
            .with_context(|| format!("chunk {index} failed"))?;
        tracing::info!(
            chunk = progress.chunk_index,
            received = progress.chunks_received,
            total = progress.total_chunks,
            "chunk uploaded"
        );
    }

    Ok(())
}
