use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, error, info};

use super::constants::BUFFER_SIZE;
use super::protocol::write_header;
use super::utils::display_name;
use crate::error::{Result, ShareError};
use crate::{EventSink, ShareEvent};

/// Outcome of one finished send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub file_name: String,
    pub bytes_sent: u64,
    pub peer: Option<SocketAddr>,
}

/// Send the file at `file_path` to an accepted client, then close the connection.
///
/// Every failure is logged and reported to `events` before being returned;
/// the connection is closed on all paths.
pub async fn send_file(
    stream: TcpStream,
    file_path: PathBuf,
    events: EventSink,
) -> Result<TransferReport> {
    let opened = match File::open(&file_path).await {
        Ok(file) => display_name(&file_path).map(|name| (file, name)),
        Err(source) => Err(ShareError::FileOpen {
            path: file_path.clone(),
            source,
        }),
    };

    match opened {
        Ok((file, file_name)) => {
            send_from_reader(stream, file, &file_name, &file_path, events).await
        }
        Err(e) => {
            close(stream).await;
            report_failure(&events, &e);
            Err(e)
        }
    }
}

/// Frame `reader` under `file_name` onto `stream`.
///
/// `reader` is dropped before this returns, whatever the outcome.
pub async fn send_from_reader<R>(
    stream: TcpStream,
    reader: R,
    file_name: &str,
    source: &Path,
    events: EventSink,
) -> Result<TransferReport>
where
    R: AsyncRead + Unpin,
{
    let peer = stream.peer_addr().ok();
    info!(
        "Sending filename: {} (from: {})",
        file_name,
        source.display()
    );
    events.emit(ShareEvent::Sending {
        file_name: file_name.to_string(),
        source: source.to_path_buf(),
    });

    let mut out = BufWriter::with_capacity(BUFFER_SIZE, stream);
    let result = write_framed(&mut out, reader, file_name).await;

    // Push out whatever was buffered and close, even after a failure
    if let Err(e) = out.shutdown().await {
        debug!("Error closing client connection: {}", e);
    }
    drop(out);

    match result {
        Ok(bytes_sent) => {
            info!(
                "File '{}' sent to {} ({} bytes)",
                file_name,
                describe_peer(peer),
                bytes_sent
            );
            events.emit(ShareEvent::TransferCompleted {
                file_name: file_name.to_string(),
                bytes_sent,
                peer,
            });
            Ok(TransferReport {
                file_name: file_name.to_string(),
                bytes_sent,
                peer,
            })
        }
        Err(e) => {
            report_failure(&events, &e);
            Err(e)
        }
    }
}

/// Header then raw content in `BUFFER_SIZE` chunks. Returns content bytes written.
async fn write_framed<R, W>(writer: &mut W, mut reader: R, file_name: &str) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_header(writer, file_name).await?;

    let mut buffer = [0u8; BUFFER_SIZE];
    let mut sent: u64 = 0;
    loop {
        let n = reader.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        writer.write_all(&buffer[..n]).await?;
        sent += n as u64;
    }
    writer.flush().await?;
    Ok(sent)
}

async fn close(mut stream: TcpStream) {
    if let Err(e) = stream.shutdown().await {
        debug!("Error closing client connection: {}", e);
    }
}

fn report_failure(events: &EventSink, e: &ShareError) {
    error!("Error sending file to client: {}", e);
    events.emit(ShareEvent::Error(format!("Error sending file to client: {}", e)));
}

fn describe_peer(peer: Option<SocketAddr>) -> String {
    peer.map(|p| p.to_string())
        .unwrap_or_else(|| "unknown peer".to_string())
}
