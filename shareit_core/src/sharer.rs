use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::allocator::CodeAllocator;
use crate::config::ShareConfig;
use crate::error::{Result, ShareError};
use crate::transfer::{OfferListener, SendHandle};
use crate::{EventSink, ShareEvent};

/// Offers files and serves each one to a single client.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct FileSharer {
    allocator: Arc<CodeAllocator>,
    config: ShareConfig,
    events: EventSink,
}

impl FileSharer {
    pub fn new(config: ShareConfig) -> Self {
        Self {
            allocator: Arc::new(CodeAllocator::new(&config)),
            config,
            events: EventSink::none(),
        }
    }

    /// Same as [`new`](Self::new), reporting lifecycle events on `event_tx`.
    pub fn with_events(config: ShareConfig, event_tx: mpsc::Sender<ShareEvent>) -> Self {
        Self {
            events: EventSink::new(event_tx),
            ..Self::new(config)
        }
    }

    /// Register a file and return its code (also the port it will be served on).
    pub async fn offer(&self, file_path: impl Into<PathBuf>) -> Result<u16> {
        self.allocator.offer(file_path).await.inspect_err(|e| {
            self.events.emit(ShareEvent::Error(e.to_string()));
        })
    }

    /// Bind the listener for `code` without accepting yet.
    ///
    /// An unknown code is reported and nothing is bound.
    pub async fn listen(&self, code: u16) -> Result<OfferListener> {
        let Some(file_path) = self.allocator.lookup(code).await else {
            let e = ShareError::UnknownCode(code);
            error!("No file associated with port: {}", code);
            self.events.emit(ShareEvent::Error(e.to_string()));
            return Err(e);
        };

        OfferListener::bind(
            &self.config.bind_host,
            code,
            file_path,
            self.config.accept_timeout(),
            self.events.clone(),
        )
        .await
    }

    /// Listen on `code`, accept one client and start sending to it.
    ///
    /// Returns once the client is accepted; the send continues on the
    /// returned handle.
    pub async fn serve(&self, code: u16) -> Result<SendHandle> {
        self.listen(code).await?.accept().await
    }

    /// [`serve`](Self::serve) that stops waiting for a client when `cancel` fires.
    pub async fn serve_until(&self, code: u16, cancel: CancellationToken) -> Result<SendHandle> {
        self.listen(code).await?.accept_until(cancel).await
    }
}
