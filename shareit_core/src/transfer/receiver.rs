use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::info;

use super::constants::BUFFER_SIZE;
use super::protocol::read_header;
use super::utils::sanitize_file_name;
use crate::error::Result;

/// A file pulled from an offer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFile {
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Connect to an offer and read the whole file into memory.
pub async fn fetch<A: ToSocketAddrs>(addr: A) -> Result<ReceivedFile> {
    let stream = TcpStream::connect(addr).await?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, stream);

    let header = read_header(&mut reader).await?;
    let mut content = Vec::new();
    reader.read_to_end(&mut content).await?;

    info!(
        "Received '{}' ({} bytes)",
        header.file_name,
        content.len()
    );
    Ok(ReceivedFile {
        file_name: header.file_name,
        content,
    })
}

/// Stream an offer straight into `download_dir`, returning the saved path.
///
/// The advertised name is sanitized before use, so a peer can't write
/// outside `download_dir`.
pub async fn download_to<A: ToSocketAddrs>(addr: A, download_dir: &Path) -> Result<PathBuf> {
    let stream = TcpStream::connect(addr).await?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, stream);
    let header = read_header(&mut reader).await?;

    tokio::fs::create_dir_all(download_dir).await?;
    let save_path = download_dir.join(sanitize_file_name(&header.file_name));

    let mut file = File::create(&save_path).await?;
    let received = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;

    info!(
        "Saved '{}' to {} ({} bytes)",
        header.file_name,
        save_path.display(),
        received
    );
    Ok(save_path)
}
