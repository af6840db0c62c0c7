//! Packed frame-buffer layout produced by the execution engine.
//!
//! The engine does not emit RGB pixels. Each frame is a compact byte
//! stream the presentation side expands:
//!
//! - 24 top border lines: 160 bytes each, one border-colour byte per two
//!   output pixels;
//! - 192 main lines: 16 left-border bytes, then 32 cells of
//!   (bitmap byte, attribute byte) covering 8 pixels each, then 16
//!   right-border bytes;
//! - 24 bottom border lines: 160 bytes each.
//!
//! Attribute bytes follow the ULA convention: bits 0-2 ink, bits 3-5
//! paper, bit 6 BRIGHT, bit 7 FLASH.

/// Output width in pixels after expansion.
pub const SCREEN_WIDTH: usize = 320;

/// Output height in pixels after expansion.
pub const SCREEN_HEIGHT: usize = 240;

pub const TOP_BORDER_LINES: usize = 24;
pub const BOTTOM_BORDER_LINES: usize = 24;
pub const MAIN_LINES: usize = 192;

/// Border bytes per full-border line (each byte spans two pixels).
pub const BORDER_BYTES_PER_LINE: usize = 160;

/// Border bytes on each side of a main line.
pub const SIDE_BORDER_BYTES: usize = 16;

/// (bitmap, attribute) cells per main line.
pub const MAIN_CELLS_PER_LINE: usize = 32;

/// Total size of one packed frame in bytes (26,112).
pub const FRAME_BUFFER_SIZE: usize = (TOP_BORDER_LINES + BOTTOM_BORDER_LINES)
    * BORDER_BYTES_PER_LINE
    + MAIN_LINES * (2 * SIDE_BORDER_BYTES + 2 * MAIN_CELLS_PER_LINE);

/// Allocate one zeroed frame buffer.
#[must_use]
pub fn new_frame_buffer() -> Vec<u8> {
    vec![0; FRAME_BUFFER_SIZE]
}
