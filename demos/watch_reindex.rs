//! Follow a reindex job from the terminal.
//!
//! Run with:
//! ```bash
//! export JOBSTREAM_BASE_URL="http://localhost:9621"
//! RUST_LOG=jobstream=debug cargo run --example watch_reindex -- inputs/legal
//! ```
//! Press Ctrl-C to cancel the stream.

use jobstream::client::ProgressClient;
use jobstream::jobs::ReindexParams;
use jobstream::model::ProgressEvent;
use jobstream::options::TransportOptions;
use jobstream::StreamState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut options = TransportOptions::new().with_connect_timeout(Duration::from_secs(10));
    if let Ok(base_url) = std::env::var("JOBSTREAM_BASE_URL") {
        options = options.with_base_url(base_url);
    }

    let mut params = ReindexParams::default();
    if let Some(directory) = std::env::args().nth(1) {
        params = params.with_directory(directory);
    }

    let client = ProgressClient::new(options)?;
    let token = CancellationToken::new();

    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut handle = client.reindex(&params, token).await?;

    while let Some(event) = handle.next_event().await {
        match event? {
            ProgressEvent::Reindex(progress) => {
                println!(
                    "[{:>5.1}%] {:?} {}/{} {}",
                    progress.progress_percent,
                    progress.phase,
                    progress.processed_files,
                    progress.total_files,
                    progress.message
                );
                for error in &progress.errors {
                    println!("    {:?} {}: {}", error.severity, error.file, error.message);
                }
            }
            other => println!("{:?}", other),
        }
    }

    match handle.state() {
        StreamState::Cancelled => println!("Cancelled."),
        _ if handle.saw_terminal_tick() => println!("Job finished."),
        _ => println!("Stream closed before the job reported completion."),
    }

    Ok(())
}
