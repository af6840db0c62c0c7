//! The execution-engine capability trait.

use crate::model::MachineModel;
use crate::pulse::PulseBuffer;
use crate::registers::RegisterFile;

/// Result of asking the engine to run (the rest of) one video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// The frame ran to completion; the frame and audio buffers are valid.
    FrameComplete,
    /// The engine decoded an opcode it does not implement. Fatal: the
    /// frame loop must stop until an explicit reset.
    UnrecognizedOpcode,
    /// Guest code reached the ROM tape-load entry point with traps
    /// enabled. The host services the trap and resumes the frame.
    TapeTrapHit,
    /// Any other engine-defined stop code. Treated as fatal.
    Unexpected(u32),
}

impl EngineStatus {
    /// Decode the engine's numeric status convention (0 = frame done,
    /// 1 = bad opcode, 2 = tape trap).
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::FrameComplete,
            1 => Self::UnrecognizedOpcode,
            2 => Self::TapeTrapHit,
            other => Self::Unexpected(other),
        }
    }

    /// Whether this status permanently halts the frame loop.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::UnrecognizedOpcode | Self::Unexpected(_))
    }
}

/// Capability surface of the opaque frame-stepping execution engine.
///
/// The engine advances the whole machine — CPU, ULA video, beeper — by
/// one frame per [`advance_frame`](Self::advance_frame) call and stops
/// early only to request host intervention. Everything the pipeline needs
/// from it goes through this trait, so a scripted double can stand in for
/// the real core in tests.
pub trait FrameEngine {
    /// Run one frame from the current machine state.
    fn advance_frame(&mut self) -> EngineStatus;

    /// Continue the current frame after a trap was serviced.
    fn resume_frame(&mut self) -> EngineStatus;

    /// The engine's register-pair array.
    fn registers(&self) -> &RegisterFile;
    fn registers_mut(&mut self) -> &mut RegisterFile;

    fn pc(&self) -> u16;
    fn set_pc(&mut self, pc: u16);

    /// Read a byte through the guest's paged 64K address space.
    fn peek(&self, addr: u16) -> u8;

    /// Write a byte through the guest's paged 64K address space.
    fn poke(&mut self, addr: u16, value: u8);

    /// Copy data into the flat machine memory (see [`crate::memory`] for
    /// the page layout). Used for ROM images and snapshot banks.
    fn load_memory_page(&mut self, page: u8, offset: usize, data: &[u8]);

    /// Port write, as seen from the guest (border colour, 128K paging).
    fn write_port(&mut self, port: u16, value: u8);

    fn set_machine_model(&mut self, model: MachineModel);
    fn reset(&mut self);
    fn non_maskable_interrupt(&mut self);

    // Snapshot restoration: state the register array doesn't cover.
    fn set_iff1(&mut self, value: bool);
    fn set_iff2(&mut self, value: bool);
    fn set_interrupt_mode(&mut self, mode: u8);
    fn set_halted(&mut self, halted: bool);
    fn set_tstates(&mut self, tstates: u32);

    /// Press keys in a keyboard half-row (`mask` bits 0-4).
    fn key_down(&mut self, row: u8, mask: u8);
    fn key_up(&mut self, row: u8, mask: u8);

    /// Enable or disable the ROM tape-load trap.
    fn set_tape_traps(&mut self, enabled: bool);

    /// The engine-owned tape pulse queue (real-time playback path).
    fn pulse_buffer_mut(&mut self) -> &mut PulseBuffer;

    /// The packed frame buffer for the last completed frame
    /// (exactly [`crate::FRAME_BUFFER_SIZE`] bytes).
    fn frame_buffer(&self) -> &[u8];

    /// Number of audio samples the engine should produce per frame;
    /// zero disables audio generation.
    fn set_audio_samples_per_frame(&mut self, samples: usize);

    /// Audio for the last completed frame, one slice per channel.
    fn audio_left(&self) -> &[f32];
    fn audio_right(&self) -> &[f32];
}
