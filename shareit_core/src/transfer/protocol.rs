//! Wire framing for a served file.
//!
//! ```text
//! +----------------+----------------+------------------+-----------------+
//! | legacy len i32 | name len u16   | name (mod. UTF-8)| content ... EOF |
//! +----------------+----------------+------------------+-----------------+
//! ```
//!
//! All integers are big-endian. The legacy length carries the UTF-8 byte
//! length of the name and is redundant with the u16 prefix; both are kept so
//! existing receivers keep working.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use super::constants::MAX_ENCODED_NAME_LEN;
use crate::error::{Result, ShareError};

/// Filename block read back from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub legacy_len: i32,
    pub file_name: String,
}

/// Encode `s` the way Java's `DataOutput::writeUTF` does, minus the prefix.
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;

    let continuation = |idx: usize| -> Result<u16> {
        match bytes.get(idx) {
            Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
            _ => Err(ShareError::Protocol(format!(
                "malformed filename encoding at byte {}",
                idx
            ))),
        }
    };

    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            units.push(((b & 0x1F) as u16) << 6 | continuation(i + 1)?);
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            units.push(
                ((b & 0x0F) as u16) << 12 | continuation(i + 1)? << 6 | continuation(i + 2)?,
            );
            i += 3;
        } else {
            return Err(ShareError::Protocol(format!(
                "malformed filename encoding at byte {}",
                i
            )));
        }
    }

    String::from_utf16(&units)
        .map_err(|e| ShareError::Protocol(format!("invalid filename: {}", e)))
}

/// Write the legacy length and the prefixed filename.
pub async fn write_header<W>(writer: &mut W, file_name: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let encoded = encode_modified_utf8(file_name);
    if encoded.len() > MAX_ENCODED_NAME_LEN {
        return Err(ShareError::FilenameTooLong(encoded.len()));
    }

    writer.write_i32(file_name.len() as i32).await?;
    writer.write_u16(encoded.len() as u16).await?;
    writer.write_all(&encoded).await?;
    Ok(())
}

/// Read the header written by [`write_header`]. Content follows until EOF.
pub async fn read_header<R>(reader: &mut R) -> Result<FileHeader>
where
    R: AsyncRead + Unpin,
{
    let legacy_len = reader.read_i32().await?;
    let name_len = reader.read_u16().await? as usize;

    let mut buf = vec![0u8; name_len];
    reader.read_exact(&mut buf).await?;
    let file_name = decode_modified_utf8(&buf)?;

    if legacy_len < 0 || legacy_len as usize != file_name.len() {
        warn!(
            "Legacy length {} disagrees with filename '{}' ({} bytes)",
            legacy_len,
            file_name,
            file_name.len()
        );
    }

    Ok(FileHeader {
        legacy_len,
        file_name,
    })
}
