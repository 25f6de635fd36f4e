use anyhow::Result;
use shareit_core::transfer::protocol::read_header;
use shareit_core::transfer::send_from_reader;
use shareit_core::{EventSink, ShareError, ShareEvent};
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Yields `remaining` bytes, then fails every read. Flags its own drop.
struct FailingReader {
    remaining: usize,
    dropped: Arc<AtomicBool>,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.remaining == 0 {
            return Poll::Ready(Err(io::Error::other("disk went away")));
        }
        let n = self.remaining.min(buf.remaining());
        buf.put_slice(&vec![0x5A; n]);
        self.remaining -= n;
        Poll::Ready(Ok(()))
    }
}

impl Drop for FailingReader {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

async fn connected_pair() -> Result<(TcpStream, TcpStream)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let client = TcpStream::connect(listener.local_addr()?).await?;
    let (server, _) = listener.accept().await?;
    Ok((server, client))
}

#[tokio::test]
async fn test_read_failure_closes_connection_and_releases_reader() -> Result<()> {
    let (server, mut client) = connected_pair().await?;
    let dropped = Arc::new(AtomicBool::new(false));
    let reader = FailingReader {
        remaining: 5000,
        dropped: dropped.clone(),
    };

    let (event_tx, mut event_rx) = mpsc::channel(8);
    let send = tokio::spawn(send_from_reader(
        server,
        reader,
        "broken.bin",
        Path::new("/staging/broken.bin"),
        EventSink::new(event_tx),
    ));

    // The peer sees the header, whatever got through, then EOF
    let header = read_header(&mut client).await?;
    assert_eq!(header.file_name, "broken.bin");
    let mut content = Vec::new();
    timeout(Duration::from_secs(5), client.read_to_end(&mut content)).await??;
    assert_eq!(content.len(), 5000);

    let err = send.await?.unwrap_err();
    assert!(matches!(err, ShareError::Transfer(ref e) if e.to_string() == "disk went away"));
    assert!(dropped.load(Ordering::SeqCst));

    let mut saw_error = false;
    while let Ok(event) = event_rx.try_recv() {
        assert!(!matches!(event, ShareEvent::TransferCompleted { .. }));
        saw_error |= matches!(event, ShareEvent::Error(_));
    }
    assert!(saw_error);
    Ok(())
}

#[tokio::test]
async fn test_peer_hangup_is_confined_to_session() -> Result<()> {
    let (server, client) = connected_pair().await?;
    drop(client);

    let dropped = Arc::new(AtomicBool::new(false));
    // Endless-looking source: the write side is what fails here
    let reader = FailingReader {
        remaining: 64 * 1024 * 1024,
        dropped: dropped.clone(),
    };

    let result = timeout(
        Duration::from_secs(10),
        send_from_reader(server, reader, "big.bin", Path::new("big.bin"), EventSink::none()),
    )
    .await?;

    assert!(matches!(result, Err(ShareError::Transfer(_))));
    assert!(dropped.load(Ordering::SeqCst));
    Ok(())
}
