//! The emulation worker.
//!
//! Runs on its own thread with exclusive ownership of the execution
//! engine and the tape deck, servicing one command at a time. The frame
//! loop proper lives in [`Worker::run_frame`]: advance the engine,
//! service tape traps mid-frame, and hand the filled buffers back.
//!
//! A fatal engine status poisons the worker: the failure is reported
//! once (with the buffers returned unpublished) and every later
//! `RunFrame` bounces until a reset or snapshot restore reinitialises
//! the machine. Tape-trap failures are *not* faults — they stay inside
//! the guest's carry-flag protocol and the host never hears about them.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{Receiver, Sender};
use spectrum_core::{EngineStatus, FrameEngine, apply_snapshot};

use crate::messages::{Command, Event, MediaKind};
use crate::tape::TapeDeck;
use crate::trap::handle_tape_trap;

/// Spawn the worker thread.
///
/// The engine moves into the thread and is dropped when the worker exits
/// (via [`Command::Shutdown`] or the command channel closing).
pub fn spawn_worker(
    engine: Box<dyn FrameEngine + Send>,
    commands: Receiver<Command>,
    events: Sender<Event>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name("emulation".into())
        .spawn(move || {
            Worker {
                engine,
                deck: TapeDeck::new(),
                tape_playing: false,
                fault: None,
                events,
            }
            .run(&commands);
        })
        .expect("failed to spawn emulation thread")
}

struct Worker {
    engine: Box<dyn FrameEngine + Send>,
    deck: TapeDeck,
    tape_playing: bool,
    /// Set once a fatal engine status is seen; cleared by reset.
    fault: Option<String>,
    events: Sender<Event>,
}

impl Worker {
    fn run(mut self, commands: &Receiver<Command>) {
        while let Ok(command) = commands.recv() {
            if !self.handle(command) {
                break;
            }
        }
    }

    /// Send an event; a closed channel means the host is gone and the
    /// worker should wind down.
    fn emit(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }

    /// Returns `false` when the worker should exit.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::RunFrame { frame, audio } => self.run_frame(frame, audio),
            Command::KeyDown { row, mask } => {
                self.engine.key_down(row, mask);
                true
            }
            Command::KeyUp { row, mask } => {
                self.engine.key_up(row, mask);
                true
            }
            Command::SetMachineModel(model) => {
                self.engine.set_machine_model(model);
                true
            }
            Command::Reset => {
                self.engine.reset();
                self.fault = None;
                true
            }
            Command::NonMaskableInterrupt => {
                self.engine.non_maskable_interrupt();
                true
            }
            Command::LoadMemoryPage { page, offset, data } => {
                self.engine.load_memory_page(page, offset, &data);
                true
            }
            Command::LoadSnapshot { id, snapshot } => {
                apply_snapshot(self.engine.as_mut(), &snapshot);
                // A snapshot reinitialises engine and registers wholesale,
                // which is what fault recovery requires.
                self.fault = None;
                self.emit(Event::FileOpened {
                    id,
                    media: MediaKind::Snapshot,
                })
            }
            Command::InsertTape { id, image } => {
                self.deck.insert(image);
                self.tape_playing = false;
                self.emit(Event::FileOpened {
                    id,
                    media: MediaKind::Tape,
                })
            }
            Command::PlayTape => {
                if self.deck.is_loaded() && !self.tape_playing {
                    self.tape_playing = true;
                    return self.emit(Event::TapeStarted);
                }
                true
            }
            Command::StopTape => {
                if self.tape_playing {
                    self.tape_playing = false;
                    return self.emit(Event::TapeStopped);
                }
                true
            }
            Command::SetTapeTraps(enabled) => {
                self.engine.set_tape_traps(enabled);
                true
            }
            Command::Shutdown => false,
        }
    }

    fn run_frame(
        &mut self,
        mut frame: Vec<u8>,
        mut audio: Option<spectrum_core::AudioFramePair>,
    ) -> bool {
        if let Some(message) = &self.fault {
            // Poisoned: bounce the buffers straight back.
            let message = message.clone();
            return self.emit(Event::FrameFaulted {
                frame,
                audio,
                message,
            });
        }

        // Keep the tape signal ahead of the engine when playing in real
        // time (traps disabled). End of tape stops playback.
        if self.tape_playing {
            let fill = self.deck.fill_pulses(self.engine.pulse_buffer_mut());
            if fill.exhausted {
                self.tape_playing = false;
                if !self.emit(Event::TapeStopped) {
                    return false;
                }
            }
        }

        let samples = audio.as_ref().map_or(0, spectrum_core::AudioFramePair::len);
        self.engine.set_audio_samples_per_frame(samples);

        // The frame loop: run until the engine completes the frame,
        // servicing tape traps in between. Any fatal status poisons the
        // worker permanently (until reset).
        let mut status = self.engine.advance_frame();
        loop {
            match status {
                EngineStatus::FrameComplete => break,
                EngineStatus::TapeTrapHit => {
                    handle_tape_trap(self.engine.as_mut(), &mut self.deck);
                    status = self.engine.resume_frame();
                }
                EngineStatus::UnrecognizedOpcode => {
                    return self.fault_frame(frame, audio, "unrecognised opcode".into());
                }
                EngineStatus::Unexpected(code) => {
                    return self.fault_frame(
                        frame,
                        audio,
                        format!("engine returned unexpected status {code}"),
                    );
                }
            }
        }

        frame.copy_from_slice(self.engine.frame_buffer());
        if let Some(pair) = audio.as_mut() {
            pair.left.copy_from_slice(self.engine.audio_left());
            pair.right.copy_from_slice(self.engine.audio_right());
        }

        self.emit(Event::FrameCompleted { frame, audio })
    }

    fn fault_frame(
        &mut self,
        frame: Vec<u8>,
        audio: Option<spectrum_core::AudioFramePair>,
        message: String,
    ) -> bool {
        self.fault = Some(message.clone());
        self.emit(Event::FrameFaulted {
            frame,
            audio,
            message,
        })
    }
}
