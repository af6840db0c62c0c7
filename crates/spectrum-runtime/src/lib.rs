//! Real-time Spectrum execution pipeline.
//!
//! Coordinates a background execution engine with a foreground
//! renderer/audio sink:
//!
//! - the **worker** thread owns the engine and the tape deck, produces
//!   one frame per request, and services the ROM tape-load trap;
//! - the **host session** ([`Emulator`]) owns the triple-buffer pools,
//!   the wall-clock [`FramePacer`], and the command/event channels;
//! - buffers cross the thread boundary by moving inside messages, so
//!   neither side can touch a buffer the other holds.
//!
//! The engine itself is any [`spectrum_core::FrameEngine`]
//! implementation; the pipeline never looks inside it beyond that trait.

mod buffer_pool;
mod emulator;
mod messages;
mod pacer;
mod tape;
mod trap;
mod worker;

pub use buffer_pool::{BufferPool, POOL_SLOTS};
pub use emulator::{
    AudioParams, AudioSink, Emulator, EmulatorConfig, HostEvent, NullAudioSink,
};
pub use messages::{Command, Event, MediaKind};
pub use pacer::{DEFAULT_MAX_CATCH_UP, FRAME_INTERVAL, FramePacer};
pub use tape::{PulseFill, TapeDeck, timing};
pub use trap::{LD_BYTES_ENTRY, LD_BYTES_EXIT, handle_tape_trap};
pub use worker::spawn_worker;
