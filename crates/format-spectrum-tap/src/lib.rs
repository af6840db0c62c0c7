//! TAP file format parser.
//!
//! TAP is the simplest Spectrum tape format: sequential blocks of data,
//! each preceded by a 2-byte little-endian length word. Each block
//! contains a flag byte, data bytes, and a checksum byte (XOR of flag +
//! data).
//!
//! A typical program consists of two blocks:
//!   1. Header block (flag $00, 17 bytes of metadata)
//!   2. Data block (flag $FF, the actual program/data)
//!
//! Parsing validates structure only — the length words must be
//! consistent and every block at least two bytes. A wrong checksum is
//! *not* a parse error: the fast-load trap delivers each block verbatim
//! and reports a bad checksum through the guest's own carry-flag
//! convention, exactly as real hardware would, so the raw bytes
//! (including the checksum) are preserved on every block.

/// A single block from a TAP file, kept as its raw bytes:
/// `[flag, payload…, checksum]`. Always at least two bytes long.
#[derive(Debug, Clone)]
pub struct TapeBlock {
    raw: Vec<u8>,
}

impl TapeBlock {
    /// Flag byte: $00-$7F = header, $80-$FF = data (conventionally $FF).
    #[must_use]
    pub fn flag(&self) -> u8 {
        self.raw[0]
    }

    /// Data bytes between the flag and the checksum.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.raw[1..self.raw.len() - 1]
    }

    /// The recorded checksum byte (last byte of the block).
    #[must_use]
    pub fn checksum_byte(&self) -> u8 {
        self.raw[self.raw.len() - 1]
    }

    /// Whether the recorded checksum matches XOR(flag, payload).
    #[must_use]
    pub fn checksum_ok(&self) -> bool {
        let mut expected = 0u8;
        for &byte in &self.raw[..self.raw.len() - 1] {
            expected ^= byte;
        }
        expected == self.checksum_byte()
    }

    /// The whole block as stored on tape, flag and checksum included.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.raw
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Always false — a block is never shorter than flag + checksum.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// A parsed TAP file containing sequential blocks.
#[derive(Debug, Clone)]
pub struct TapeImage {
    /// The blocks in the TAP file, in order.
    pub blocks: Vec<TapeBlock>,
}

impl TapeImage {
    /// Parse a TAP file from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is structurally malformed (truncated
    /// block, impossible length word).
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        let mut blocks = Vec::new();
        let mut offset = 0;

        while offset < data.len() {
            // Need at least 2 bytes for the block length
            if offset + 2 > data.len() {
                return Err(format!(
                    "Truncated TAP file: expected 2-byte length at offset {offset}"
                ));
            }

            let block_len = u16::from(data[offset]) | (u16::from(data[offset + 1]) << 8);
            offset += 2;

            let block_len = block_len as usize;
            if block_len < 2 {
                return Err(format!(
                    "TAP block at offset {} has length {block_len}, minimum is 2 (flag + checksum)",
                    offset - 2
                ));
            }

            if offset + block_len > data.len() {
                return Err(format!(
                    "Truncated TAP block at offset {}: need {block_len} bytes, only {} remain",
                    offset - 2,
                    data.len() - offset
                ));
            }

            blocks.push(TapeBlock {
                raw: data[offset..offset + block_len].to_vec(),
            });

            offset += block_len;
        }

        Ok(Self { blocks })
    }

    /// Cheap structural check without building the block list.
    #[must_use]
    pub fn is_valid(data: &[u8]) -> bool {
        let mut offset = 0;
        while offset < data.len() {
            if offset + 2 > data.len() {
                return false;
            }
            let block_len =
                usize::from(data[offset]) | (usize::from(data[offset + 1]) << 8);
            offset += 2;
            if block_len < 2 || offset + block_len > data.len() {
                return false;
            }
            offset += block_len;
        }
        true
    }
}
