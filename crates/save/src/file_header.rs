// ---------------------------------------------------------------------------
// file_header – Snapshot header with magic bytes, version, and checksum
// ---------------------------------------------------------------------------
//
// Header format (20 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "MCTY"
//   [4..8]   Format version (u32)
//   [8..12]  Flags (u32: bit 0 = lz4 compressed)
//   [12..16] Uncompressed payload size (u32)
//   [16..20] xxHash32 checksum of bytes [4..16] followed by the payload
//
// On save: encode snapshot -> compress -> prepend header
// On load: check magic -> validate checksum -> strip header -> decompress

use xxhash_rust::xxh32::Xxh32;

use crate::save_error::SaveError;

/// Magic bytes identifying a city snapshot.
pub const MAGIC: [u8; 4] = *b"MCTY";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 20;

/// Current header format version.
pub const HEADER_FORMAT_VERSION: u32 = 1;

/// Payload is lz4 block-compressed.
pub const FLAG_COMPRESSED: u32 = 1;

/// Seed for xxHash32 checksum.
const XXHASH_SEED: u32 = 0;

/// Parsed file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub format_version: u32,
    pub flags: u32,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FileHeader {
    /// Header for `payload`, which expands to `uncompressed_size` bytes.
    pub fn new(payload: &[u8], flags: u32, uncompressed_size: usize) -> Self {
        let mut header = Self {
            format_version: HEADER_FORMAT_VERSION,
            flags,
            uncompressed_size: uncompressed_size as u32,
            checksum: 0,
        };
        header.checksum = header.checksum_of(payload);
        header
    }

    /// Checksum over the version, flags and size fields and the payload, so
    /// a damaged size field is caught like a damaged payload.
    fn checksum_of(&self, payload: &[u8]) -> u32 {
        let mut hasher = Xxh32::new(XXHASH_SEED);
        hasher.update(&self.format_version.to_le_bytes());
        hasher.update(&self.flags.to_le_bytes());
        hasher.update(&self.uncompressed_size.to_le_bytes());
        hasher.update(payload);
        hasher.digest()
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Wrap a payload with a file header.
///
/// Returns bytes: [header (20 bytes)] ++ [payload].
pub fn wrap_with_header(payload: &[u8], flags: u32, uncompressed_size: usize) -> Vec<u8> {
    let header = FileHeader::new(payload, flags, uncompressed_size);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());

    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&header.format_version.to_le_bytes());
    out.extend_from_slice(&header.flags.to_le_bytes());
    out.extend_from_slice(&header.uncompressed_size.to_le_bytes());
    out.extend_from_slice(&header.checksum.to_le_bytes());

    out.extend_from_slice(payload);
    out
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parse and validate the file header, returning it with the payload.
///
/// # Errors
///
/// Returns an error if:
/// - The magic bytes are missing or the file is shorter than a header
/// - The header format version is from a newer build
/// - The checksum does not match (data corruption)
pub fn unwrap_header(bytes: &[u8]) -> Result<(FileHeader, &[u8]), SaveError> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Err(SaveError::Corrupt(
            "missing MCTY magic bytes, not a city snapshot".to_string(),
        ));
    }
    if bytes.len() < HEADER_SIZE {
        return Err(SaveError::Corrupt(format!(
            "snapshot is too short ({} bytes, need at least {} for header)",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let header = FileHeader {
        format_version: le_u32(bytes, 4),
        flags: le_u32(bytes, 8),
        uncompressed_size: le_u32(bytes, 12),
        checksum: le_u32(bytes, 16),
    };

    if header.format_version > HEADER_FORMAT_VERSION {
        return Err(SaveError::VersionMismatch {
            expected_max: HEADER_FORMAT_VERSION,
            found: header.format_version,
        });
    }

    let payload = &bytes[HEADER_SIZE..];
    let computed = header.checksum_of(payload);
    if computed != header.checksum {
        return Err(SaveError::Corrupt(format!(
            "checksum mismatch (expected {:#010X}, got {:#010X})",
            header.checksum, computed,
        )));
    }

    Ok((header, payload))
}
