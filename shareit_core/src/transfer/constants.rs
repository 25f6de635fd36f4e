/// Chunk size for streaming file content (4KB)
pub const BUFFER_SIZE: usize = 4096;

/// Staging prefix is a canonical UUID (36 chars) followed by '_'
pub const UUID_LEN: usize = 36;
pub const STAGING_PREFIX_LEN: usize = UUID_LEN + 1;

/// Largest filename the 2-byte length prefix can carry
pub const MAX_ENCODED_NAME_LEN: usize = u16::MAX as usize;

/// Maximum length of a filename written to disk by the receiver
pub const MAX_FILENAME_LENGTH: usize = 255;
