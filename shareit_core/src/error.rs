use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the offer/serve/send lifecycle.
///
/// None of these are fatal to the process: each is confined to the call or
/// session that owns the failing resource.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("No file associated with code {0}")]
    UnknownCode(u16),

    #[error("Every code in {start}..={end} is already offered")]
    CodesExhausted { start: u16, end: u16 },

    #[error("Cannot listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Failed to accept a client on port {port}: {source}")]
    Accept {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("No client connected to port {0} before the accept timeout")]
    AcceptTimeout(u16),

    #[error("Serving on port {0} was cancelled")]
    Cancelled(u16),

    #[error("Cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Transfer failed: {0}")]
    Transfer(#[from] io::Error),

    #[error("Filename too long for the wire ({0} encoded bytes, max 65535)")]
    FilenameTooLong(usize),

    #[error("Path has no usable file name: {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Sender task failed: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, ShareError>;
