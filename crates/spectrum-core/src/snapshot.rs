//! Full-machine snapshot records.
//!
//! Snapshot files are parsed by the format crates into this neutral
//! record; [`apply_snapshot`] then restores the whole machine through the
//! engine trait in one shot. The record carries everything the formats
//! agree on: model, RAM banks, register pairs, interrupt state, border
//! colour, the 128K paging latch, and the elapsed-cycle counter.

use crate::engine::FrameEngine;
use crate::memory::ram_bank_page;
use crate::model::MachineModel;
use crate::registers::RegisterFile;

/// Parsed snapshot, ready to apply to an engine.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub model: MachineModel,
    /// 16 KiB RAM banks as (bank number, contents).
    pub memory_banks: Vec<(u8, Vec<u8>)>,
    pub registers: RegisterFile,
    pub pc: u16,
    pub iff1: bool,
    pub iff2: bool,
    pub interrupt_mode: u8,
    pub halted: bool,
    /// Border colour (0-7).
    pub border_colour: u8,
    /// Port $7FFD latch for 128K machines; `None` on a 48K snapshot.
    pub paging_flags: Option<u8>,
    /// Elapsed T-states into the current frame.
    pub tstates: u32,
}

/// Restore a snapshot into the engine.
///
/// Order matters: the model select resets the memory map before the
/// banks load, and the paging latch is written through the port (not the
/// flat pages) so the engine's mapping state stays consistent.
pub fn apply_snapshot(engine: &mut dyn FrameEngine, snapshot: &Snapshot) {
    engine.set_machine_model(snapshot.model);

    for (bank, data) in &snapshot.memory_banks {
        engine.load_memory_page(ram_bank_page(*bank), 0, data);
    }

    *engine.registers_mut() = snapshot.registers;
    engine.set_pc(snapshot.pc);
    engine.set_iff1(snapshot.iff1);
    engine.set_iff2(snapshot.iff2);
    engine.set_interrupt_mode(snapshot.interrupt_mode);
    engine.set_halted(snapshot.halted);

    engine.write_port(0x00FE, snapshot.border_colour);
    if let Some(flags) = snapshot.paging_flags {
        engine.write_port(0x7FFD, flags);
    }

    engine.set_tstates(snapshot.tstates);
}
