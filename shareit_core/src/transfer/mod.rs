//! Plain TCP transfer of offered files.
//!
//! This module provides:
//! - The wire framing (legacy length, prefixed filename, raw content)
//! - A one-client listener per offer
//! - The per-connection sender
//! - A receiver for the other end

pub mod constants;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod utils;

// Re-export public API
pub use constants::BUFFER_SIZE;
pub use receiver::{ReceivedFile, download_to, fetch};
pub use sender::{TransferReport, send_file, send_from_reader};
pub use server::{OfferListener, SendHandle};
