//! Scripted engine double shared by the integration tests.
//!
//! `TestEngine` implements the full `FrameEngine` surface with canned
//! frame-advance statuses. It mirrors registers, PC, and counters into a
//! shared handle at every engine-call boundary, so a test can still
//! observe the machine after the engine has moved into the worker
//! thread. Guest memory lives in the handle outright.

#![allow(dead_code)] // each test binary uses a different subset

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use spectrum_core::{
    EngineStatus, FRAME_BUFFER_SIZE, FrameEngine, MachineModel, PulseBuffer, RegisterFile,
};

/// State a test can inspect (and pre-load) from outside the worker.
#[derive(Debug)]
pub struct EngineState {
    pub regs: RegisterFile,
    pub pc: u16,
    /// Guest 64K address space (as seen through peek/poke).
    pub memory: Vec<u8>,
    /// (page, offset, len) of every flat-memory load.
    pub page_loads: Vec<(u8, usize, usize)>,
    pub model: Option<MachineModel>,
    pub tape_traps: bool,
    pub iff1: bool,
    pub iff2: bool,
    pub interrupt_mode: u8,
    pub halted: bool,
    pub tstates: u32,
    pub keys_down: Vec<(u8, u8)>,
    pub advances: u32,
    pub resumes: u32,
    pub resets: u32,
    pub nmis: u32,
    /// Pulse backlog observed at the start of each frame advance.
    pub pulse_backlogs: Vec<u32>,
}

/// Handle to the shared state.
pub type EngineHandle = Arc<Mutex<EngineState>>;

pub struct TestEngine {
    shared: EngineHandle,
    regs: RegisterFile,
    pc: u16,
    /// Canned results for advance/resume calls; empty = frame completes.
    script: VecDeque<EngineStatus>,
    pulses: PulseBuffer,
    frame: Vec<u8>,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl TestEngine {
    pub fn new(script: Vec<EngineStatus>) -> (Self, EngineHandle) {
        let shared = Arc::new(Mutex::new(EngineState {
            regs: RegisterFile::new(),
            pc: 0,
            memory: vec![0; 0x1_0000],
            page_loads: Vec::new(),
            model: None,
            tape_traps: false,
            iff1: false,
            iff2: false,
            interrupt_mode: 0,
            halted: false,
            tstates: 0,
            keys_down: Vec::new(),
            advances: 0,
            resumes: 0,
            resets: 0,
            nmis: 0,
            pulse_backlogs: Vec::new(),
        }));
        let engine = Self {
            shared: Arc::clone(&shared),
            regs: RegisterFile::new(),
            pc: 0,
            script: script.into(),
            pulses: PulseBuffer::new(),
            frame: vec![0; FRAME_BUFFER_SIZE],
            left: Vec::new(),
            right: Vec::new(),
        };
        (engine, shared)
    }

    /// Seed the engine-side registers (the worker owns them afterwards).
    pub fn seed_registers(&mut self, regs: RegisterFile) {
        self.regs = regs;
        self.lock().regs = regs;
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.shared.lock().expect("engine state poisoned")
    }

    /// Push registers and PC out to the shared mirror.
    fn sync(&self) {
        let mut state = self.lock();
        state.regs = self.regs;
        state.pc = self.pc;
    }

    fn next_status(&mut self) -> EngineStatus {
        self.script.pop_front().unwrap_or(EngineStatus::FrameComplete)
    }
}

impl FrameEngine for TestEngine {
    fn advance_frame(&mut self) -> EngineStatus {
        {
            let mut state = self.lock();
            state.advances += 1;
            let backlog = self.pulses.queued_tstates();
            state.pulse_backlogs.push(backlog);
        }
        // The engine "consumes" the whole queued tape signal each frame.
        self.pulses.clear();
        // Stamp the frame with the advance count so tests can tell
        // frames apart after they cross the channel.
        let count = self.lock().advances as u8;
        self.frame.fill(0);
        self.frame[0] = count;
        let amplitude = f32::from(count) / 256.0;
        self.left.fill(amplitude);
        self.right.fill(-amplitude);
        let status = self.next_status();
        self.sync();
        status
    }

    fn resume_frame(&mut self) -> EngineStatus {
        self.lock().resumes += 1;
        let status = self.next_status();
        self.sync();
        status
    }

    fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    fn pc(&self) -> u16 {
        self.pc
    }

    fn set_pc(&mut self, pc: u16) {
        self.pc = pc;
        self.sync();
    }

    fn peek(&self, addr: u16) -> u8 {
        self.lock().memory[usize::from(addr)]
    }

    fn poke(&mut self, addr: u16, value: u8) {
        self.lock().memory[usize::from(addr)] = value;
    }

    fn load_memory_page(&mut self, page: u8, offset: usize, data: &[u8]) {
        self.lock().page_loads.push((page, offset, data.len()));
    }

    fn write_port(&mut self, _port: u16, _value: u8) {}

    fn set_machine_model(&mut self, model: MachineModel) {
        self.lock().model = Some(model);
    }

    fn reset(&mut self) {
        self.regs = RegisterFile::new();
        self.pc = 0;
        let mut state = self.lock();
        state.resets += 1;
        state.regs = self.regs;
        state.pc = 0;
    }

    fn non_maskable_interrupt(&mut self) {
        self.lock().nmis += 1;
    }

    fn set_iff1(&mut self, value: bool) {
        self.lock().iff1 = value;
    }

    fn set_iff2(&mut self, value: bool) {
        self.lock().iff2 = value;
    }

    fn set_interrupt_mode(&mut self, mode: u8) {
        self.lock().interrupt_mode = mode;
    }

    fn set_halted(&mut self, halted: bool) {
        self.lock().halted = halted;
    }

    fn set_tstates(&mut self, tstates: u32) {
        self.lock().tstates = tstates;
    }

    fn key_down(&mut self, row: u8, mask: u8) {
        self.lock().keys_down.push((row, mask));
    }

    fn key_up(&mut self, _row: u8, _mask: u8) {}

    fn set_tape_traps(&mut self, enabled: bool) {
        self.lock().tape_traps = enabled;
    }

    fn pulse_buffer_mut(&mut self) -> &mut PulseBuffer {
        &mut self.pulses
    }

    fn frame_buffer(&self) -> &[u8] {
        &self.frame
    }

    fn set_audio_samples_per_frame(&mut self, samples: usize) {
        self.left.resize(samples, 0.0);
        self.right.resize(samples, 0.0);
    }

    fn audio_left(&self) -> &[f32] {
        &self.left
    }

    fn audio_right(&self) -> &[f32] {
        &self.right
    }
}

/// Build a TAP image from (flag, payload) pairs, with valid checksums.
pub fn make_tape(blocks: &[(u8, &[u8])]) -> format_spectrum_tap::TapeImage {
    let mut raw = Vec::new();
    for &(flag, data) in blocks {
        let mut checksum = flag;
        for &b in data {
            checksum ^= b;
        }
        let len = (data.len() + 2) as u16;
        raw.push(len as u8);
        raw.push((len >> 8) as u8);
        raw.push(flag);
        raw.extend_from_slice(data);
        raw.push(checksum);
    }
    format_spectrum_tap::TapeImage::parse(&raw).expect("test TAP should be valid")
}

/// Build a TAP image from raw block bytes (flag + payload + checksum),
/// allowing deliberately wrong checksums.
pub fn make_tape_raw(blocks: &[&[u8]]) -> format_spectrum_tap::TapeImage {
    let mut raw = Vec::new();
    for block in blocks {
        let len = block.len() as u16;
        raw.push(len as u8);
        raw.push((len >> 8) as u8);
        raw.extend_from_slice(block);
    }
    format_spectrum_tap::TapeImage::parse(&raw).expect("test TAP should be valid")
}

/// Collect a sink's samples for assertions.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub frames: usize,
}

impl spectrum_runtime::AudioSink for CollectingSink {
    fn push_frame(&mut self, left: &[f32], right: &[f32]) {
        self.left.extend_from_slice(left);
        self.right.extend_from_slice(right);
        self.frames += 1;
    }
}
