//! Virtual tape deck.
//!
//! Holds the loaded TAP image and a monotonic block cursor shared by the
//! two loading paths:
//!
//! - **Trap loading**: the trap handler peeks at the block under the
//!   cursor and advances only once the whole attempt has resolved, so the
//!   cursor never stops mid-block.
//! - **Real-time playback**: a per-block pulse generator synthesises the
//!   edge waveform a real tape would produce, block by block, and the
//!   cursor advances as each block's pulses run dry.
//!
//! The cursor never rewinds; running off the end is the defined
//! "no more blocks" condition, not an error.

use format_spectrum_tap::{TapeBlock, TapeImage};
use spectrum_core::{PULSE_BACKLOG_TSTATES, PulseBuffer};

/// Standard pulse lengths in T-states (from the Spectrum ROM).
pub mod timing {
    /// Pilot pulse length.
    pub const PILOT_PULSE: u32 = 2168;

    /// Number of pilot pulses for a header block (flag < $80).
    pub const PILOT_HEADER_PULSES: u32 = 8063;

    /// Number of pilot pulses for a data block.
    pub const PILOT_DATA_PULSES: u32 = 3223;

    /// First sync pulse.
    pub const SYNC1_PULSE: u32 = 667;

    /// Second sync pulse.
    pub const SYNC2_PULSE: u32 = 735;

    /// Zero-bit pulse (two per bit).
    pub const ZERO_PULSE: u32 = 855;

    /// One-bit pulse (two per bit).
    pub const ONE_PULSE: u32 = 1710;

    /// Pause after each block (1 second at 3.5 MHz).
    pub const BLOCK_PAUSE: u32 = 3_500_000;
}

/// Result of one pulse-buffer top-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseFill {
    /// Timing units queued by this call.
    pub tstates_queued: u32,
    /// The tape ran out of data; playback should stop.
    pub exhausted: bool,
}

/// Where the generator is within the current block's waveform.
#[derive(Debug, Clone, Copy)]
enum PulsePhase {
    Pilot { remaining: u32 },
    Sync1,
    Sync2,
    Data { byte: usize, bit: u8, second_half: bool },
    Pause,
    Done,
}

/// Lazy per-block pulse sequence. Restarts from the pilot tone for every
/// block; finite (ends after the trailing pause).
#[derive(Debug)]
struct PulseGenerator {
    phase: PulsePhase,
}

impl PulseGenerator {
    fn for_block(block: &TapeBlock) -> Self {
        // Header blocks carry a longer pilot so the ROM loader can settle.
        let remaining = if block.flag() < 0x80 {
            timing::PILOT_HEADER_PULSES
        } else {
            timing::PILOT_DATA_PULSES
        };
        Self {
            phase: PulsePhase::Pilot { remaining },
        }
    }

    /// Next edge duration, or `None` once the block (and its pause) is
    /// fully emitted.
    fn next_pulse(&mut self, block: &TapeBlock) -> Option<u32> {
        match self.phase {
            PulsePhase::Pilot { remaining } => {
                self.phase = if remaining > 1 {
                    PulsePhase::Pilot {
                        remaining: remaining - 1,
                    }
                } else {
                    PulsePhase::Sync1
                };
                Some(timing::PILOT_PULSE)
            }
            PulsePhase::Sync1 => {
                self.phase = PulsePhase::Sync2;
                Some(timing::SYNC1_PULSE)
            }
            PulsePhase::Sync2 => {
                self.phase = PulsePhase::Data {
                    byte: 0,
                    bit: 7,
                    second_half: false,
                };
                Some(timing::SYNC2_PULSE)
            }
            PulsePhase::Data {
                byte,
                bit,
                second_half,
            } => {
                let bytes = block.bytes();
                let is_one = (bytes[byte] >> bit) & 1 != 0;
                let duration = if is_one {
                    timing::ONE_PULSE
                } else {
                    timing::ZERO_PULSE
                };

                // Two pulses per bit, MSB first, then the next byte.
                self.phase = if !second_half {
                    PulsePhase::Data {
                        byte,
                        bit,
                        second_half: true,
                    }
                } else if bit > 0 {
                    PulsePhase::Data {
                        byte,
                        bit: bit - 1,
                        second_half: false,
                    }
                } else if byte + 1 < bytes.len() {
                    PulsePhase::Data {
                        byte: byte + 1,
                        bit: 7,
                        second_half: false,
                    }
                } else {
                    PulsePhase::Pause
                };
                Some(duration)
            }
            PulsePhase::Pause => {
                self.phase = PulsePhase::Done;
                Some(timing::BLOCK_PAUSE)
            }
            PulsePhase::Done => None,
        }
    }
}

/// The deck: loaded image plus the block cursor.
#[derive(Debug, Default)]
pub struct TapeDeck {
    image: Option<TapeImage>,
    cursor: usize,
    generator: Option<PulseGenerator>,
}

impl TapeDeck {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tape, rewinding the cursor to the first block.
    pub fn insert(&mut self, image: TapeImage) {
        self.image = Some(image);
        self.cursor = 0;
        self.generator = None;
    }

    /// Remove the tape.
    pub fn eject(&mut self) {
        self.image = None;
        self.cursor = 0;
        self.generator = None;
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// The block under the cursor, without advancing. `None` once the
    /// tape is exhausted (or no tape is inserted).
    #[must_use]
    pub fn peek_block(&self) -> Option<&TapeBlock> {
        self.image.as_ref()?.blocks.get(self.cursor)
    }

    /// Move the cursor past the current block. Called only after a load
    /// attempt has fully resolved, so the cursor never rests mid-block.
    pub fn advance_block(&mut self) {
        self.cursor += 1;
        self.generator = None;
    }

    /// Blocks remaining at or after the cursor.
    #[must_use]
    pub fn blocks_remaining(&self) -> usize {
        self.image
            .as_ref()
            .map_or(0, |image| image.blocks.len().saturating_sub(self.cursor))
    }

    /// Top the pulse queue up to its backlog target, synthesising pulses
    /// for consecutive blocks as needed. Reports the timing units queued
    /// and whether the tape ran out.
    pub fn fill_pulses(&mut self, pulses: &mut PulseBuffer) -> PulseFill {
        let mut queued = 0u32;

        loop {
            if pulses.queued_tstates() >= PULSE_BACKLOG_TSTATES || pulses.is_full() {
                return PulseFill {
                    tstates_queued: queued,
                    exhausted: false,
                };
            }

            let Some(image) = self.image.as_ref() else {
                return PulseFill {
                    tstates_queued: queued,
                    exhausted: true,
                };
            };
            let Some(block) = image.blocks.get(self.cursor) else {
                return PulseFill {
                    tstates_queued: queued,
                    exhausted: true,
                };
            };

            let generator = self
                .generator
                .get_or_insert_with(|| PulseGenerator::for_block(block));

            match generator.next_pulse(block) {
                Some(duration) => {
                    pulses.push(duration);
                    queued += duration;
                }
                None => self.advance_block(),
            }
        }
    }
}
