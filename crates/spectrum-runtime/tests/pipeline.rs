//! Full-pipeline tests: host session, channels, worker thread, and the
//! scripted engine double, all wired together for real.

mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{CollectingSink, EngineHandle, TestEngine, make_tape};
use spectrum_core::{EngineStatus, MachineModel, RegisterFile, Snapshot};
use spectrum_runtime::{
    AudioParams, Emulator, EmulatorConfig, HostEvent, MediaKind, NullAudioSink,
};

fn default_emulator(script: Vec<EngineStatus>) -> (Emulator, EngineHandle) {
    let (engine, handle) = TestEngine::new(script);
    let emulator = Emulator::new(Box::new(engine), &EmulatorConfig::default());
    (emulator, handle)
}

/// Pump with a fixed logical `now` until a frame is ready, with a real
/// wall-clock timeout so a broken pipeline fails instead of hanging.
fn wait_for_frame(emulator: &mut Emulator, now: Instant) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let _ = emulator.pump(now, &mut NullAudioSink);
        if let Some(frame) = emulator.take_frame() {
            return frame;
        }
        assert!(Instant::now() < deadline, "timed out waiting for a frame");
        thread::sleep(Duration::from_millis(1));
    }
}

fn advances(handle: &EngineHandle) -> u32 {
    handle.lock().expect("state").advances
}

#[test]
fn paced_frame_flows_through_the_pipeline() {
    let (mut emulator, handle) = default_emulator(vec![]);
    let t0 = Instant::now();

    emulator.start(t0);
    let _ = emulator.pump(t0, &mut NullAudioSink);

    let frame = wait_for_frame(&mut emulator, t0);
    assert_eq!(advances(&handle), 1, "pump at start time launches one frame");
    assert_eq!(frame[0], 1, "frame carries the engine's stamp");
    emulator.release_frame(frame);

    // Same tick again: nothing new is due, nothing new is produced.
    let _ = emulator.pump(t0, &mut NullAudioSink);
    assert!(emulator.take_frame().is_none());
    assert_eq!(advances(&handle), 1);

    emulator.shutdown();
}

#[test]
fn unconsumed_frames_are_superseded() {
    let (mut emulator, _handle) = default_emulator(vec![]);
    let t0 = Instant::now();
    emulator.start(t0);

    // Start frame 1 and wait for it to be published — without taking it.
    let _ = emulator.pump(t0, &mut NullAudioSink);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !emulator.frame_ready() {
        let _ = emulator.pump(t0, &mut NullAudioSink);
        assert!(Instant::now() < deadline, "frame 1 never published");
        thread::sleep(Duration::from_millis(1));
    }

    // One interval later frame 2 starts; when it completes it must
    // replace the never-shown frame 1.
    let t1 = t0 + Duration::from_millis(20);
    let _ = emulator.pump(t1, &mut NullAudioSink);
    let deadline = Instant::now() + Duration::from_secs(5);
    while emulator.superseded_frames() == 0 {
        let _ = emulator.pump(t1, &mut NullAudioSink);
        assert!(Instant::now() < deadline, "frame 2 never superseded frame 1");
        thread::sleep(Duration::from_millis(1));
    }

    // Only the newest frame is ever shown.
    let frame = emulator.take_frame().expect("superseding frame is ready");
    assert_eq!(frame[0], 2);
    assert_eq!(emulator.superseded_frames(), 1);
    emulator.release_frame(frame);
    emulator.shutdown();
}

#[test]
fn late_completion_triggers_exactly_two_advances() {
    let (mut emulator, handle) = default_emulator(vec![]);
    let t0 = Instant::now();
    emulator.start(t0);

    // Scheduled frame at t0…
    let _ = emulator.pump(t0, &mut NullAudioSink);
    let deadline = Instant::now() + Duration::from_secs(5);
    while advances(&handle) < 1 {
        assert!(Instant::now() < deadline, "first frame never ran");
        thread::sleep(Duration::from_millis(1));
    }

    // …but the consumer only ticks again 50 ms (2.5 intervals) later.
    // The completion triggers one back-to-back catch-up frame, after
    // which pacing is steady again: two advances total, not three.
    let late = t0 + Duration::from_millis(50);
    let deadline = Instant::now() + Duration::from_secs(5);
    while advances(&handle) < 2 {
        let _ = emulator.pump(late, &mut NullAudioSink);
        assert!(Instant::now() < deadline, "catch-up frame never ran");
        thread::sleep(Duration::from_millis(1));
    }

    // Drain the catch-up frame's completion; no further frames may start
    // at this logical time.
    for _ in 0..50 {
        let _ = emulator.pump(late + Duration::from_millis(1), &mut NullAudioSink);
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(advances(&handle), 2);
    emulator.shutdown();
}

#[test]
fn blocking_frames_carry_audio() {
    let (engine, _handle) = TestEngine::new(vec![]);
    let config = EmulatorConfig {
        audio: Some(AudioParams { sample_rate: 44_100 }),
        ..EmulatorConfig::default()
    };
    let mut emulator = Emulator::new(Box::new(engine), &config);

    let mut sink = CollectingSink::default();
    emulator
        .run_frame_blocking(&mut sink)
        .expect("frame should complete");

    assert_eq!(sink.frames, 1);
    assert_eq!(sink.left.len(), 882); // 44,100 / 50
    assert_eq!(sink.right.len(), 882);
    // The stamp amplitude from the scripted engine survived the trip.
    assert!((sink.left[0] - 1.0 / 256.0).abs() < f32::EPSILON);
    assert!((sink.right[0] + 1.0 / 256.0).abs() < f32::EPSILON);

    let frame = emulator.take_frame().expect("frame published");
    emulator.release_frame(frame);
    emulator.shutdown();
}

#[test]
fn trap_hit_mid_frame_loads_tape_data() {
    // The engine reports a tape trap, then completes the frame on
    // resume. The worker must service the trap in between, leaving the
    // loaded bytes visible in guest memory.
    let (mut engine, handle) = TestEngine::new(vec![
        EngineStatus::TapeTrapHit,
        EngineStatus::FrameComplete,
    ]);
    let mut regs = RegisterFile::new();
    regs.set_af_alt(0xFF01); // expect $FF, LOAD
    regs.set_ix(0x9000);
    regs.set_de(4);
    engine.seed_registers(regs);

    let mut emulator = Emulator::new(Box::new(engine), &EmulatorConfig::default());
    let id = emulator.open_tape(make_tape(&[(0xFF, &[0xDE, 0xAD, 0xBE, 0xEF])]));

    let events = emulator
        .run_frame_blocking(&mut NullAudioSink)
        .expect("frame should complete");
    assert!(events.contains(&HostEvent::FileOpened {
        id,
        media: MediaKind::Tape
    }));

    let state = handle.lock().expect("state");
    assert_eq!(&state.memory[0x9000..0x9004], &[0xDE, 0xAD, 0xBE, 0xEF]);
    assert!(state.regs.carry());
    assert_eq!(state.resumes, 1, "the frame resumed after the trap");
    drop(state);

    emulator.shutdown();
}

#[test]
fn fatal_status_poisons_until_reset() {
    let (mut emulator, handle) = default_emulator(vec![EngineStatus::UnrecognizedOpcode]);

    let err = emulator
        .run_frame_blocking(&mut NullAudioSink)
        .expect_err("fatal status must fail the frame");
    assert!(err.contains("unrecognised opcode"));

    // Still poisoned: no engine call happens for the bounced frame.
    let before = advances(&handle);
    assert!(emulator.run_frame_blocking(&mut NullAudioSink).is_err());
    assert_eq!(advances(&handle), before);

    // An explicit reset reinitialises engine and registers and re-arms
    // the frame loop.
    emulator.reset();
    emulator
        .run_frame_blocking(&mut NullAudioSink)
        .expect("reset clears the fault");
    assert_eq!(handle.lock().expect("state").resets, 1);

    emulator.shutdown();
}

#[test]
fn snapshot_restores_machine_state() {
    let (mut emulator, handle) = default_emulator(vec![]);

    let mut registers = RegisterFile::new();
    registers.set_af(0x55AA);
    registers.set_sp(0x8000);
    let snapshot = Snapshot {
        model: MachineModel::Spectrum128,
        memory_banks: vec![(5, vec![0x11; 0x4000]), (2, vec![0x22; 0x4000])],
        registers,
        pc: 0x1234,
        iff1: true,
        iff2: true,
        interrupt_mode: 1,
        halted: false,
        border_colour: 4,
        paging_flags: Some(0x07),
        tstates: 999,
    };
    let id = emulator.load_snapshot(snapshot);

    // Run a frame so the snapshot command is known to be processed.
    let events = emulator
        .run_frame_blocking(&mut NullAudioSink)
        .expect("frame after snapshot");
    assert!(events.contains(&HostEvent::FileOpened {
        id,
        media: MediaKind::Snapshot
    }));

    let state = handle.lock().expect("state");
    assert_eq!(state.model, Some(MachineModel::Spectrum128));
    assert_eq!(state.interrupt_mode, 1);
    assert_eq!(state.tstates, 999);
    // Banks 5 and 2 land at flat pages 20 and 8.
    assert_eq!(state.page_loads, vec![(20, 0, 0x4000), (8, 0, 0x4000)]);
    drop(state);

    emulator.shutdown();
}

#[test]
fn tape_playback_runs_to_exhaustion() {
    let (engine, handle) = TestEngine::new(vec![]);
    let config = EmulatorConfig {
        tape_traps_enabled: false,
        ..EmulatorConfig::default()
    };
    let mut emulator = Emulator::new(Box::new(engine), &config);

    emulator.open_tape(make_tape(&[(0xFF, &[0x42])]));
    emulator.play_tape();

    let mut saw_started = false;
    let mut saw_stopped = false;
    for _ in 0..2000 {
        let events = emulator
            .run_frame_blocking(&mut NullAudioSink)
            .expect("playback frame");
        for event in events {
            match event {
                HostEvent::TapeStarted => saw_started = true,
                HostEvent::TapeStopped => saw_stopped = true,
                _ => {}
            }
        }
        if saw_stopped {
            break;
        }
    }

    assert!(saw_started, "playback start must be announced");
    assert!(saw_stopped, "end of tape must stop playback");
    assert!(!emulator.tape_is_playing());

    // The engine saw a topped-up pulse backlog while the tape played.
    let state = handle.lock().expect("state");
    assert!(
        state
            .pulse_backlogs
            .iter()
            .any(|&t| t >= spectrum_core::PULSE_BACKLOG_TSTATES),
        "pulse queue was never filled to its backlog target"
    );
    drop(state);

    emulator.shutdown();
}

#[test]
fn host_commands_reach_the_engine() {
    let (mut emulator, handle) = default_emulator(vec![]);

    emulator.key_down(3, 0x01);
    emulator.non_maskable_interrupt();
    emulator.set_machine_model(MachineModel::Pentagon128);
    emulator.load_memory_page(40, 0, vec![0; 0x4000]);

    // One frame flushes the queue.
    emulator
        .run_frame_blocking(&mut NullAudioSink)
        .expect("frame");

    let state = handle.lock().expect("state");
    assert_eq!(state.keys_down, vec![(3, 0x01)]);
    assert_eq!(state.nmis, 1);
    assert_eq!(state.model, Some(MachineModel::Pentagon128));
    assert_eq!(state.page_loads, vec![(40, 0, 0x4000)]);
    drop(state);

    emulator.shutdown();
}

#[test]
fn pause_stops_frame_production() {
    let (mut emulator, handle) = default_emulator(vec![]);
    let t0 = Instant::now();

    emulator.start(t0);
    let _ = emulator.pump(t0, &mut NullAudioSink);
    let frame = wait_for_frame(&mut emulator, t0);
    emulator.release_frame(frame);

    emulator.pause();
    assert!(!emulator.is_running());

    // Ticks long past the deadline must not start frames while paused.
    let later = t0 + Duration::from_millis(200);
    for _ in 0..10 {
        let _ = emulator.pump(later, &mut NullAudioSink);
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(advances(&handle), 1);

    // Resume forgives the paused time: one frame, not ten.
    emulator.start(later);
    let _ = emulator.pump(later, &mut NullAudioSink);
    let frame = wait_for_frame(&mut emulator, later);
    emulator.release_frame(frame);
    assert_eq!(advances(&handle), 2);

    emulator.shutdown();
}
