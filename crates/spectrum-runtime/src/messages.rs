//! Cross-context message protocol.
//!
//! The host and the worker thread communicate only through these tagged
//! variants. Frame and audio buffers travel *inside* the messages — a
//! buffer sent with `RunFrame` belongs to the worker until it comes back
//! in `FrameCompleted` (or `FrameFaulted`), so no memory is ever touched
//! from both contexts at once.

use format_spectrum_tap::TapeImage;
use spectrum_core::{AudioFramePair, MachineModel, Snapshot};

/// What kind of file a `FileOpened` event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Snapshot,
    Tape,
}

/// Host → worker.
#[derive(Debug)]
pub enum Command {
    /// Produce one frame into the supplied buffers.
    RunFrame {
        frame: Vec<u8>,
        audio: Option<AudioFramePair>,
    },
    KeyDown { row: u8, mask: u8 },
    KeyUp { row: u8, mask: u8 },
    SetMachineModel(MachineModel),
    Reset,
    NonMaskableInterrupt,
    /// Copy data into flat machine memory (ROM images).
    LoadMemoryPage {
        page: u8,
        offset: usize,
        data: Vec<u8>,
    },
    /// Restore a full machine state.
    LoadSnapshot { id: u32, snapshot: Box<Snapshot> },
    /// Put a tape in the deck (stops any playback).
    InsertTape { id: u32, image: TapeImage },
    PlayTape,
    StopTape,
    SetTapeTraps(bool),
    /// Exit the worker loop; the engine is dropped with it.
    Shutdown,
}

/// Worker → host.
#[derive(Debug)]
pub enum Event {
    /// The frame (and audio, when enabled) is ready; buffer ownership
    /// returns to the host.
    FrameCompleted {
        frame: Vec<u8>,
        audio: Option<AudioFramePair>,
    },
    /// The engine faulted while producing this frame. The buffers come
    /// back unpublished; no further frames run until a reset.
    FrameFaulted {
        frame: Vec<u8>,
        audio: Option<AudioFramePair>,
        message: String,
    },
    FileOpened { id: u32, media: MediaKind },
    TapeStarted,
    TapeStopped,
}
