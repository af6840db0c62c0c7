//! Headless capture: PNG screenshots and WAV audio dumps.
//!
//! Runs the pipeline flat-out (no pacing) for a fixed number of frames,
//! decoding each completed frame and collecting the audio, then writes
//! the last frame as a PNG and the audio as a stereo WAV.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use spectrum_core::{FrameEngine, SCREEN_HEIGHT, SCREEN_WIDTH};
use spectrum_runtime::{AudioSink, Emulator, EmulatorConfig};

use crate::render::FrameRenderer;

/// What to capture.
#[derive(Debug, Clone, Default)]
pub struct CaptureOptions {
    /// Number of frames to run.
    pub frames: u32,
    /// Write the final frame here as a PNG.
    pub screenshot: Option<PathBuf>,
    /// Write the collected audio here as a stereo WAV.
    pub audio: Option<PathBuf>,
}

/// Sink that keeps every sample for the WAV dump.
#[derive(Debug, Default)]
struct CollectingSink {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl AudioSink for CollectingSink {
    fn push_frame(&mut self, left: &[f32], right: &[f32]) {
        self.left.extend_from_slice(left);
        self.right.extend_from_slice(right);
    }
}

/// Run `options.frames` frames headless and write the requested
/// artefacts. The session is shut down before returning.
pub fn run_capture(
    engine: Box<dyn FrameEngine + Send>,
    config: &EmulatorConfig,
    options: &CaptureOptions,
) -> Result<(), Box<dyn Error>> {
    let mut emulator = Emulator::new(engine, config);
    let mut sink = CollectingSink::default();
    let mut renderer = FrameRenderer::new();
    let mut rgba = vec![0u8; SCREEN_WIDTH * SCREEN_HEIGHT * 4];

    for _ in 0..options.frames {
        emulator.run_frame_blocking(&mut sink)?;
        if let Some(frame) = emulator.take_frame() {
            renderer.draw(&frame, &mut rgba);
            emulator.release_frame(frame);
        }
    }
    emulator.shutdown();

    if let Some(ref path) = options.screenshot {
        save_screenshot(&rgba, path)?;
        eprintln!("Screenshot saved to {}", path.display());
    }

    if let Some(ref path) = options.audio {
        let sample_rate = config.audio.map_or(44_100, |params| params.sample_rate);
        save_audio(&sink.left, &sink.right, sample_rate, path)?;
        eprintln!("Audio saved to {}", path.display());
    }

    Ok(())
}

/// Save an RGBA screen image as a PNG file.
pub fn save_screenshot(rgba: &[u8], path: &Path) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(path)?;
    let w = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    Ok(())
}

/// Save stereo samples as a WAV file (16-bit PCM).
///
/// Input samples are f32 in the range -1.0 to +1.0.
pub fn save_audio(
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for (&l, &r) in left.iter().zip(right) {
        for sample in [l, r] {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * f32::from(i16::MAX)) as i16)?;
        }
    }
    writer.finalize()?;
    Ok(())
}
