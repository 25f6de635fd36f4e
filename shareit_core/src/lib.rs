//! One-shot file offering over plain TCP.
//!
//! A file is registered with [`FileSharer::offer`], which hands back a code.
//! The code is also the TCP port: [`FileSharer::serve`] listens on it, accepts
//! exactly one client and streams the file's name and bytes to it.

use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub mod allocator;
pub mod config;
pub mod error;
pub mod sharer;
pub mod transfer;

pub use allocator::CodeAllocator;
pub use config::ShareConfig;
pub use error::{Result, ShareError};
pub use sharer::FileSharer;
pub use transfer::{
    OfferListener, ReceivedFile, SendHandle, TransferReport, download_to, fetch,
};

//Report from Core to the host application
#[derive(Debug, Clone, PartialEq)]
pub enum ShareEvent {
    /// Listening for the single client of an offer
    Serving {
        code: u16,
        file_name: String,
    },
    ClientConnected {
        code: u16,
        peer: SocketAddr,
    },
    /// Filename resolved, header about to go out
    Sending {
        file_name: String,
        source: PathBuf,
    },
    TransferCompleted {
        file_name: String,
        bytes_sent: u64,
        peer: Option<SocketAddr>,
    },
    Error(String),
}

/// Optional channel for [`ShareEvent`]s.
///
/// Events are dropped rather than stalling a transfer when the host is not
/// keeping up.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::Sender<ShareEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ShareEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ShareEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                tracing::debug!("Event channel full, dropping {:?}", event);
            }
        }
    }
}
