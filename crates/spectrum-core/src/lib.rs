//! Core types shared between the Spectrum execution engine and its host.
//!
//! The execution engine itself is an opaque, pre-built component: it knows
//! how to advance the machine by one video frame and exposes a flat memory
//! and register surface. This crate defines that surface as the
//! [`FrameEngine`] trait plus the data types that cross it — register
//! pairs, status codes, the packed frame-buffer layout, the tape pulse
//! queue, and full-machine snapshot records. Any conforming implementation
//! (a real Z80 core or a scripted test double) can sit behind the trait.

mod audio;
mod engine;
mod frame;
pub mod memory;
mod model;
mod pulse;
mod registers;
mod snapshot;

pub use audio::AudioFramePair;
pub use engine::{EngineStatus, FrameEngine};
pub use frame::{
    BORDER_BYTES_PER_LINE, BOTTOM_BORDER_LINES, FRAME_BUFFER_SIZE, MAIN_CELLS_PER_LINE,
    MAIN_LINES, SCREEN_HEIGHT, SCREEN_WIDTH, SIDE_BORDER_BYTES, TOP_BORDER_LINES,
    new_frame_buffer,
};
pub use model::MachineModel;
pub use pulse::{PULSE_BACKLOG_TSTATES, PULSE_BUFFER_CAPACITY, PulseBuffer};
pub use registers::{FLAG_CARRY, REGISTER_PAIR_COUNT, RegisterFile};
pub use snapshot::{Snapshot, apply_snapshot};
