//! Instant tape loading via the ROM LD-BYTES trap.
//!
//! The 48K ROM loads every tape block through `LD-BYTES` at $0556. With
//! traps enabled the engine stops when guest code reaches that entry
//! point; this handler performs the whole transfer in one step and
//! resumes the guest at the routine's exit, reproducing the routine's
//! exact observable contract — register side effects, running XOR
//! checksum, carry-flag outcome — minus the per-pulse timing.
//!
//! Register conventions on entry to LD-BYTES:
//!   A′ (high byte of AF′) = expected flag byte ($00 header, $FF data)
//!   bit 0 of F′           = LOAD (set) vs VERIFY (clear)
//!   IX                    = destination address
//!   DE                    = requested byte count
//!
//! The outcome is written to the carry bit of AF (set = success), and PC
//! is forced to the trap exit so the rest of the real routine never runs.
//! Callers of LD-BYTES cannot tell a trapped load from an infinitely
//! fast tape.

use format_spectrum_tap::TapeBlock;
use spectrum_core::FrameEngine;

use crate::tape::TapeDeck;

/// ROM entry point of the LD-BYTES routine.
pub const LD_BYTES_ENTRY: u16 = 0x0556;

/// Address at which the guest resumes after a trapped load.
pub const LD_BYTES_EXIT: u16 = 0x05E2;

/// Service a tape-load trap.
///
/// Reads the request from the engine's registers, transfers (or
/// verifies) the block under the deck cursor, writes the carry-flag
/// outcome, and redirects PC to the routine's exit. The cursor advances
/// exactly once per resolved attempt; an exhausted (or missing) tape
/// fails the load without moving it.
pub fn handle_tape_trap(engine: &mut dyn FrameEngine, deck: &mut TapeDeck) {
    let regs = engine.registers();
    let af_alt = regs.af_alt();
    let expected_flag = (af_alt >> 8) as u8;
    let load_requested = af_alt & 0x0001 != 0; // LOAD rather than VERIFY
    let dest_addr = regs.ix();
    let requested = usize::from(regs.de());

    let success = match deck.peek_block() {
        None => {
            // End of tape: fail the request, touch nothing else, and
            // leave the cursor where it is.
            engine.registers_mut().set_carry(false);
            engine.set_pc(LD_BYTES_EXIT);
            return;
        }
        Some(block) => load_block(engine, block, expected_flag, load_requested, dest_addr, requested),
    };

    engine.registers_mut().set_carry(success);
    engine.set_pc(LD_BYTES_EXIT);
    // The attempt is fully resolved either way; never leave the cursor
    // mid-block.
    deck.advance_block();
}

/// Run one load/verify attempt against a block. Returns the carry-flag
/// outcome.
fn load_block(
    engine: &mut dyn FrameEngine,
    block: &TapeBlock,
    expected_flag: u8,
    load_requested: bool,
    dest_addr: u16,
    requested: usize,
) -> bool {
    let bytes = block.bytes();
    let actual_flag = bytes[0];

    if actual_flag != expected_flag {
        return false;
    }

    if !load_requested {
        // VERIFY: report success without comparing memory contents.
        return true;
    }

    // Copy payload bytes into guest memory, accumulating the running
    // checksum exactly as the ROM does: seeded with the flag byte, XORed
    // with every data byte. Bytes land in memory before the final
    // verdict — a bad checksum is only discovered at the end, with the
    // data already written.
    let mut addr = dest_addr;
    let mut offset = 1usize;
    let mut checksum = actual_flag;
    let mut loaded = 0usize;
    while loaded < requested {
        if offset >= bytes.len() {
            // Ran out of tape data mid-request.
            return false;
        }
        let byte = bytes[offset];
        offset += 1;
        loaded += 1;
        engine.poke(addr, byte);
        addr = addr.wrapping_add(1);
        checksum ^= byte;
    }

    // The block's own checksum byte must still be unread…
    if offset >= bytes.len() {
        return false;
    }
    // …and must match the running checksum.
    bytes[offset] == checksum
}
