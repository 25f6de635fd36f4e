use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shareit_core::{FileSharer, ShareConfig, ShareEvent, download_to};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shareit", about = "Offer a file for one-time download over TCP")]
struct Cli {
    /// Give up waiting for a client after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Offer a file and serve it to the first client that connects
    Send {
        path: PathBuf,
        /// Interface to listen on
        #[arg(long)]
        bind: Option<String>,
    },
    /// Download an offered file
    Receive {
        host: String,
        code: u16,
        /// Directory to save into (defaults to the configured download path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = ShareConfig::load();
    if let Some(secs) = cli.timeout {
        config.accept_timeout_secs = Some(secs);
    }

    match cli.command {
        Command::Send { path, bind } => {
            if let Some(host) = bind {
                config.bind_host = host;
            }
            send(config, path).await
        }
        Command::Receive { host, code, out } => {
            let dir = out.unwrap_or_else(|| config.download_path.clone());
            let saved = download_to((host.as_str(), code), &dir)
                .await
                .with_context(|| format!("Download from {}:{} failed", host, code))?;
            println!("Saved to {}", saved.display());
            Ok(())
        }
    }
}

async fn send(config: ShareConfig, path: PathBuf) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<ShareEvent>(64);
    let sharer = FileSharer::with_events(config, event_tx);

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ShareEvent::Error(msg) => error!("{}", msg),
                ShareEvent::TransferCompleted {
                    file_name,
                    bytes_sent,
                    ..
                } => info!("Finished sending '{}' ({} bytes)", file_name, bytes_sent),
                _ => {}
            }
        }
    });

    let code = sharer.offer(&path).await.context("Could not offer file")?;
    println!("Share code: {}", code);

    // Ctrl-C stops waiting for a client
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let handle = sharer
        .serve_until(code, cancel)
        .await
        .context("Serving failed")?;
    info!("Sending to {}", handle.peer());
    let report = handle.join().await.context("Transfer failed")?;
    println!(
        "Sent '{}' ({} bytes) to {}",
        report.file_name,
        report.bytes_sent,
        report
            .peer
            .map(|p| p.to_string())
            .unwrap_or_else(|| "client".to_string())
    );
    Ok(())
}
