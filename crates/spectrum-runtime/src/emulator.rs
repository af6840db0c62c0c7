//! Host-side emulator session.
//!
//! One `Emulator` owns everything the consumer context needs: the
//! command/event channels to the worker thread, the frame and audio
//! buffer pools, the pacer, and the running flag. The presentation layer
//! drives it with two calls per tick:
//!
//! - [`pump`](Emulator::pump): drain worker events (returning buffers to
//!   the pools, feeding the audio sink) and start frames as the pacer
//!   dictates — never blocking;
//! - [`take_frame`](Emulator::take_frame) /
//!   [`release_frame`](Emulator::release_frame): borrow the newest
//!   completed frame for display.
//!
//! The session is created on a host "render" command and torn down by
//! [`shutdown`](Emulator::shutdown), which stops pacing, stops the
//! worker at the next frame boundary, and joins the thread.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, Sender, TryRecvError, unbounded};
use format_spectrum_tap::TapeImage;
use spectrum_core::{AudioFramePair, FrameEngine, MachineModel, Snapshot, new_frame_buffer};

use crate::buffer_pool::BufferPool;
use crate::messages::{Command, Event, MediaKind};
use crate::pacer::{DEFAULT_MAX_CATCH_UP, FRAME_INTERVAL, FramePacer};
use crate::worker::spawn_worker;

/// Destination for completed audio frames.
pub trait AudioSink {
    fn push_frame(&mut self, left: &[f32], right: &[f32]);
}

/// Sink for sessions without audio output.
#[derive(Debug, Default)]
pub struct NullAudioSink;

impl AudioSink for NullAudioSink {
    fn push_frame(&mut self, _left: &[f32], _right: &[f32]) {}
}

/// Notifications surfaced to the embedding host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    FileOpened { id: u32, media: MediaKind },
    TapeStarted,
    TapeStopped,
    /// A command could not be delivered; the session is degraded.
    Warning(String),
    /// The engine hit a fatal status. No frames run until `reset`.
    Faulted(String),
}

/// Audio configuration for a session.
#[derive(Debug, Clone, Copy)]
pub struct AudioParams {
    pub sample_rate: u32,
}

impl AudioParams {
    /// Samples per 50 Hz frame at this rate.
    #[must_use]
    pub fn samples_per_frame(self) -> usize {
        (self.sample_rate / 50) as usize
    }
}

/// Session configuration.
#[derive(Debug, Clone, Copy)]
pub struct EmulatorConfig {
    pub frame_interval: Duration,
    /// Cap on consecutive catch-up frames (see `FramePacer`).
    pub max_catch_up: u32,
    pub tape_traps_enabled: bool,
    /// `None` disables audio production entirely.
    pub audio: Option<AudioParams>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            frame_interval: FRAME_INTERVAL,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
            tape_traps_enabled: true,
            audio: None,
        }
    }
}

/// Host-side handle to a running emulation pipeline.
pub struct Emulator {
    commands: Sender<Command>,
    events: Receiver<Event>,
    worker: Option<JoinHandle<()>>,
    frames: BufferPool<Vec<u8>>,
    audio_pairs: Option<BufferPool<AudioFramePair>>,
    samples_per_frame: usize,
    pacer: FramePacer,
    running: bool,
    executing_frame: bool,
    fault: Option<String>,
    fault_reported: bool,
    tape_playing: bool,
    next_file_id: u32,
}

impl Emulator {
    /// Build a session around an engine and spawn its worker thread.
    #[must_use]
    pub fn new(engine: Box<dyn FrameEngine + Send>, config: &EmulatorConfig) -> Self {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let worker = spawn_worker(engine, command_rx, event_tx);

        let samples_per_frame = config.audio.map_or(0, AudioParams::samples_per_frame);
        let audio_pairs = config
            .audio
            .map(|_| BufferPool::new(|| AudioFramePair::new(samples_per_frame)));

        let mut emulator = Self {
            commands: command_tx,
            events: event_rx,
            worker: Some(worker),
            frames: BufferPool::new(new_frame_buffer),
            audio_pairs,
            samples_per_frame,
            pacer: FramePacer::new(config.frame_interval, config.max_catch_up, Instant::now()),
            running: false,
            executing_frame: false,
            fault: None,
            fault_reported: false,
            tape_playing: false,
            next_file_id: 0,
        };
        emulator.send(Command::SetTapeTraps(config.tape_traps_enabled));
        emulator
    }

    /// Begin producing frames. Paused time is not owed: pacing restarts
    /// from `now`.
    pub fn start(&mut self, now: Instant) {
        if !self.running {
            self.running = true;
            self.pacer.restart(now);
        }
    }

    /// Stop requesting frames. The frame in flight (if any) still
    /// completes and is presented.
    pub fn pause(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn tape_is_playing(&self) -> bool {
        self.tape_playing
    }

    /// Frames lost to supersession so far (presentation fell behind).
    #[must_use]
    pub fn superseded_frames(&self) -> u64 {
        self.frames.superseded_count()
    }

    /// Reset the machine. This also clears a fault, re-enabling the
    /// frame loop.
    pub fn reset(&mut self) {
        self.fault = None;
        self.fault_reported = false;
        self.send(Command::Reset);
    }

    pub fn non_maskable_interrupt(&mut self) {
        self.send(Command::NonMaskableInterrupt);
    }

    pub fn set_machine_model(&mut self, model: MachineModel) {
        self.send(Command::SetMachineModel(model));
    }

    pub fn key_down(&mut self, row: u8, mask: u8) {
        self.send(Command::KeyDown { row, mask });
    }

    pub fn key_up(&mut self, row: u8, mask: u8) {
        self.send(Command::KeyUp { row, mask });
    }

    /// Copy a ROM image (or any data) into flat machine memory.
    pub fn load_memory_page(&mut self, page: u8, offset: usize, data: Vec<u8>) {
        self.send(Command::LoadMemoryPage { page, offset, data });
    }

    /// Restore a snapshot. The returned id ties the eventual
    /// [`HostEvent::FileOpened`] back to this call. Clears a fault, like
    /// `reset` — a snapshot reinitialises the whole machine.
    pub fn load_snapshot(&mut self, snapshot: Snapshot) -> u32 {
        let id = self.next_file_id();
        self.fault = None;
        self.fault_reported = false;
        self.send(Command::LoadSnapshot {
            id,
            snapshot: Box::new(snapshot),
        });
        id
    }

    /// Put a tape image in the deck.
    pub fn open_tape(&mut self, image: TapeImage) -> u32 {
        let id = self.next_file_id();
        self.send(Command::InsertTape { id, image });
        id
    }

    pub fn play_tape(&mut self) {
        self.send(Command::PlayTape);
    }

    pub fn stop_tape(&mut self) {
        self.send(Command::StopTape);
    }

    /// Enable or disable trap-based instant loading.
    pub fn set_tape_traps(&mut self, enabled: bool) {
        self.send(Command::SetTapeTraps(enabled));
    }

    /// Change the per-frame audio sample count for subsequent frames.
    pub fn set_samples_per_frame(&mut self, samples_per_frame: usize) {
        self.samples_per_frame = samples_per_frame;
    }

    /// Drain worker events and start frames as due. Non-blocking: call
    /// once per presentation tick.
    pub fn pump(&mut self, now: Instant, audio: &mut dyn AudioSink) -> Vec<HostEvent> {
        let mut out = Vec::new();

        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(event, now, audio, &mut out),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.fault.is_none() {
                        self.fault = Some("emulation thread exited".into());
                    }
                    self.running = false;
                    break;
                }
            }
        }

        // Scheduled frame starts (the catch-up path lives in
        // `handle_event`, straight off a completion).
        if self.running
            && !self.executing_frame
            && self.fault.is_none()
            && self.pacer.frame_due(now)
        {
            self.pacer.frame_started();
            self.start_frame();
        }

        if let Some(message) = &self.fault {
            if !self.fault_reported {
                self.fault_reported = true;
                out.push(HostEvent::Faulted(message.clone()));
            }
        }

        out
    }

    /// Whether a completed frame is waiting to be shown.
    #[must_use]
    pub fn frame_ready(&self) -> bool {
        self.frames.has_ready()
    }

    /// The newest completed frame, if one is waiting. Returns `None` when
    /// nothing new arrived since the last call — the presenter just shows
    /// its previous frame again.
    pub fn take_frame(&mut self) -> Option<Vec<u8>> {
        self.frames.take_ready()
    }

    /// Give a shown frame back to the pool.
    pub fn release_frame(&mut self, frame: Vec<u8>) {
        self.frames.release(frame);
    }

    /// Run exactly one frame, blocking until it completes. For headless
    /// batch use (capture, tests); bypasses the pacer entirely. Any
    /// non-frame events that arrive meanwhile are returned.
    pub fn run_frame_blocking(
        &mut self,
        audio: &mut dyn AudioSink,
    ) -> Result<Vec<HostEvent>, String> {
        if let Some(message) = &self.fault {
            return Err(message.clone());
        }
        if self.executing_frame {
            return Err("a paced frame is already in flight".into());
        }
        let mut out = Vec::new();
        self.start_frame();
        while self.executing_frame {
            let event = self
                .events
                .recv()
                .map_err(|_| "emulation thread exited".to_string())?;
            self.handle_blocking_event(event, audio, &mut out);
        }
        match &self.fault {
            Some(message) => Err(message.clone()),
            None => Ok(out),
        }
    }

    /// Tear the session down: stop pacing, stop the worker, join it.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.running = false;
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn next_file_id(&mut self) -> u32 {
        let id = self.next_file_id;
        self.next_file_id += 1;
        id
    }

    fn send(&mut self, command: Command) {
        if self.commands.send(command).is_err() && self.fault.is_none() {
            self.fault = Some("emulation thread exited".into());
            self.running = false;
        }
    }

    /// Check buffers out of the pools and hand them to the worker.
    fn start_frame(&mut self) {
        let frame = self.frames.acquire();
        let audio = self.audio_pairs.as_mut().map(|pool| {
            let mut pair = pool.acquire();
            if pair.len() != self.samples_per_frame {
                pair.resize(self.samples_per_frame);
            }
            pair
        });
        self.executing_frame = true;
        self.send(Command::RunFrame { frame, audio });
    }

    fn handle_event(
        &mut self,
        event: Event,
        now: Instant,
        audio: &mut dyn AudioSink,
        out: &mut Vec<HostEvent>,
    ) {
        match event {
            Event::FrameCompleted { frame, audio: pair } => {
                self.executing_frame = false;
                self.return_audio(pair, audio);
                self.frames.publish(frame);
                // Late completion: run the next frame back-to-back rather
                // than waiting for the next tick.
                if self.running && self.fault.is_none() && self.pacer.frame_completed(now) {
                    self.start_frame();
                }
            }
            Event::FrameFaulted {
                frame,
                audio: pair,
                message,
            } => {
                self.executing_frame = false;
                self.frames.recycle(frame);
                if let (Some(pool), Some(pair)) = (self.audio_pairs.as_mut(), pair) {
                    pool.recycle(pair);
                }
                if self.fault.is_none() {
                    self.fault = Some(message);
                }
                self.running = false;
            }
            Event::FileOpened { id, media } => {
                out.push(HostEvent::FileOpened { id, media });
            }
            Event::TapeStarted => {
                self.tape_playing = true;
                out.push(HostEvent::TapeStarted);
            }
            Event::TapeStopped => {
                self.tape_playing = false;
                out.push(HostEvent::TapeStopped);
            }
        }
    }

    /// Event handling for the blocking path: no pacing, no catch-up.
    fn handle_blocking_event(
        &mut self,
        event: Event,
        audio: &mut dyn AudioSink,
        out: &mut Vec<HostEvent>,
    ) {
        match event {
            Event::FrameCompleted { frame, audio: pair } => {
                self.executing_frame = false;
                self.return_audio(pair, audio);
                self.frames.publish(frame);
            }
            Event::FrameFaulted {
                frame,
                audio: pair,
                message,
            } => {
                self.executing_frame = false;
                self.frames.recycle(frame);
                if let (Some(pool), Some(pair)) = (self.audio_pairs.as_mut(), pair) {
                    pool.recycle(pair);
                }
                self.fault = Some(message);
                self.fault_reported = true;
            }
            Event::FileOpened { id, media } => {
                out.push(HostEvent::FileOpened { id, media });
            }
            Event::TapeStarted => {
                self.tape_playing = true;
                out.push(HostEvent::TapeStarted);
            }
            Event::TapeStopped => {
                self.tape_playing = false;
                out.push(HostEvent::TapeStopped);
            }
        }
    }

    fn return_audio(&mut self, pair: Option<AudioFramePair>, sink: &mut dyn AudioSink) {
        if let (Some(pool), Some(pair)) = (self.audio_pairs.as_mut(), pair) {
            sink.push_frame(&pair.left, &pair.right);
            pool.recycle(pair);
        }
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
