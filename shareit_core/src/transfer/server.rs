use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::sender::{TransferReport, send_file};
use crate::error::{Result, ShareError};
use crate::{EventSink, ShareEvent};

/// Listening socket for a single offer.
///
/// Accepts one client and is consumed by doing so; dropping it stops listening.
pub struct OfferListener {
    code: u16,
    file_path: PathBuf,
    listener: TcpListener,
    accept_timeout: Option<Duration>,
    events: EventSink,
}

impl OfferListener {
    /// Bind `host:code`. Failures are reported, not retried.
    pub async fn bind(
        host: &str,
        code: u16,
        file_path: PathBuf,
        accept_timeout: Option<Duration>,
        events: EventSink,
    ) -> Result<Self> {
        let listener = match TcpListener::bind((host, code)).await {
            Ok(listener) => listener,
            Err(source) => {
                let e = ShareError::Bind { port: code, source };
                error!("Error starting file server on port {}: {}", code, e);
                events.emit(ShareEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("Serving file '{}' on port {}", file_name, code);
        events.emit(ShareEvent::Serving { code, file_name });

        Ok(Self {
            code,
            file_path,
            listener,
            accept_timeout,
            events,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the one client, bounded by the configured accept timeout if any,
    /// and start sending to it.
    pub async fn accept(self) -> Result<SendHandle> {
        let code = self.code;
        let accepted = match self.accept_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.listener.accept()).await {
                Ok(res) => res,
                Err(_) => {
                    let e = ShareError::AcceptTimeout(code);
                    error!("{}", e);
                    self.events.emit(ShareEvent::Error(e.to_string()));
                    return Err(e);
                }
            },
            None => self.listener.accept().await,
        };

        match accepted {
            Ok((stream, peer)) => {
                info!("Client connected: {}", peer);
                self.events.emit(ShareEvent::ClientConnected { code, peer });
                // The listener closes when this returns; no second client is taken
                let handle = tokio::spawn(send_file(stream, self.file_path, self.events));
                Ok(SendHandle { peer, handle })
            }
            Err(source) => {
                let e = ShareError::Accept { port: code, source };
                error!("Error starting file server on port {}: {}", code, e);
                self.events.emit(ShareEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Like [`accept`](Self::accept), but gives up as soon as `cancel` fires.
    pub async fn accept_until(self, cancel: CancellationToken) -> Result<SendHandle> {
        let code = self.code;
        let events = self.events.clone();
        tokio::select! {
            res = self.accept() => res,
            _ = cancel.cancelled() => {
                info!("Stopped serving on port {}", code);
                let e = ShareError::Cancelled(code);
                events.emit(ShareEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }
}

/// A send in flight to the accepted client
pub struct SendHandle {
    peer: SocketAddr,
    handle: JoinHandle<Result<TransferReport>>,
}

impl SendHandle {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the send to end and return its outcome.
    pub async fn join(self) -> Result<TransferReport> {
        self.handle
            .await
            .map_err(|e| ShareError::TaskJoin(e.to_string()))?
    }
}
