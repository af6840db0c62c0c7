//! Windowed runner.
//!
//! Presents the pipeline in a winit window with a pixels framebuffer:
//! `about_to_wait` pumps the session (events, pacing, audio), the newest
//! frame is decoded into the pixel buffer, and `RedrawRequested` puts it
//! on screen. F1 cycles palettes, Escape exits.

use std::time::Instant;

use pixels::{Pixels, SurfaceTexture};
use spectrum_core::{FrameEngine, SCREEN_HEIGHT, SCREEN_WIDTH};
use spectrum_runtime::{Emulator, EmulatorConfig, HostEvent, NullAudioSink};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::audio::AudioOutput;
use crate::keyboard_map::map_keycode;
use crate::render::{FrameRenderer, PALETTE_COUNT};

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Window title.
    pub title: String,
    /// Integer scale factor for sharp pixels.
    pub scale: u32,
    /// Initial palette selection (0 = original, 1 = RGB, 2 = YUV).
    pub palette: usize,
    /// Pipeline configuration (pacing, traps, audio).
    pub emulator: EmulatorConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            title: "ZX Spectrum".to_string(),
            scale: 3,
            palette: 0,
            emulator: EmulatorConfig::default(),
        }
    }
}

/// Run an engine in a window until the user closes it.
///
/// The session shuts down (worker joined, engine dropped) before this
/// returns.
pub fn run(engine: Box<dyn FrameEngine + Send>, config: RunnerConfig) -> Result<(), String> {
    let event_loop =
        EventLoop::new().map_err(|e| format!("failed to create event loop: {e}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(engine, config);
    event_loop
        .run_app(&mut app)
        .map_err(|e| format!("event loop error: {e}"))
}

struct App {
    emulator: Emulator,
    renderer: FrameRenderer,
    config: RunnerConfig,
    audio: Option<AudioOutput>,
    window: Option<&'static Window>,
    pixels: Option<Pixels<'static>>,
}

impl App {
    fn new(engine: Box<dyn FrameEngine + Send>, config: RunnerConfig) -> Self {
        let emulator = Emulator::new(engine, &config.emulator);
        let mut renderer = FrameRenderer::new();
        renderer.set_palette(config.palette);
        Self {
            emulator,
            renderer,
            config,
            audio: None,
            window: None,
            pixels: None,
        }
    }

    fn report(event: &HostEvent) {
        match event {
            HostEvent::FileOpened { id, media } => {
                eprintln!("Opened file #{id} ({media:?})");
            }
            HostEvent::TapeStarted => eprintln!("Tape playing"),
            HostEvent::TapeStopped => eprintln!("Tape stopped"),
            HostEvent::Warning(message) => eprintln!("Warning: {message}"),
            HostEvent::Faulted(message) => {
                eprintln!("Emulation fault: {message} (reset to continue)");
            }
        }
    }

    fn handle_key(&mut self, keycode: KeyCode, pressed: bool) {
        for &(row, mask) in map_keycode(keycode) {
            if pressed {
                self.emulator.key_down(row, mask);
            } else {
                self.emulator.key_up(row, mask);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already created
        }

        let window_size = winit::dpi::LogicalSize::new(
            SCREEN_WIDTH as u32 * self.config.scale,
            SCREEN_HEIGHT as u32 * self.config.scale,
        );
        let attrs = WindowAttributes::default()
            .with_title(&self.config.title)
            .with_inner_size(window_size)
            .with_resizable(false);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => {
                // Leak the window to get a 'static reference. This is
                // intentional: it lives for the entire application
                // lifetime and the OS reclaims it on process exit.
                let window: &'static Window = Box::leak(Box::new(window));
                window
            }
            Err(e) => {
                eprintln!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let inner = window.inner_size();
        let surface = SurfaceTexture::new(inner.width, inner.height, window);
        match Pixels::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, surface) {
            Ok(pixels) => self.pixels = Some(pixels),
            Err(e) => {
                eprintln!("Failed to create pixels: {e}");
                event_loop.exit();
                return;
            }
        }
        self.window = Some(window);

        if let Some(params) = self.config.emulator.audio {
            self.audio = AudioOutput::new(params.sample_rate, params.samples_per_frame());
            if self.audio.is_none() {
                Self::report(&HostEvent::Warning(
                    "no audio output device; sound disabled".into(),
                ));
            }
        }

        self.emulator.start(Instant::now());
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.repeat {
                    return;
                }
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let pressed = event.state == ElementState::Pressed;
                    if keycode == KeyCode::Escape && pressed {
                        event_loop.exit();
                        return;
                    }
                    if keycode == KeyCode::F1 && pressed {
                        let next = (self.renderer.palette() + 1) % PALETTE_COUNT;
                        self.renderer.set_palette(next);
                        return;
                    }
                    self.handle_key(keycode, pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(pixels) = self.pixels.as_ref() {
                    if let Err(e) = pixels.render() {
                        eprintln!("Render error: {e}");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            return;
        }

        let now = Instant::now();
        let events = match self.audio.as_mut() {
            Some(audio) => self.emulator.pump(now, audio),
            None => self.emulator.pump(now, &mut NullAudioSink),
        };
        for event in &events {
            Self::report(event);
        }

        // Show the newest completed frame; when none arrived this tick
        // the previous pixel buffer is simply shown again.
        if let Some(frame) = self.emulator.take_frame() {
            if let Some(pixels) = self.pixels.as_mut() {
                self.renderer.draw(&frame, pixels.frame_mut());
            }
            self.emulator.release_frame(frame);
        }

        if let Some(window) = self.window {
            window.request_redraw();
        }
    }
}
