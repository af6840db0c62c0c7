//! Native presentation layer for the Spectrum pipeline.
//!
//! The consumer side of the execution pipeline: a winit window with a
//! pixels framebuffer, a cpal audio sink, host-key → keyboard-matrix
//! mapping, and a headless capture mode for screenshots and audio dumps.
//! Binaries live with concrete engine implementations; this crate takes
//! any boxed [`spectrum_core::FrameEngine`].

mod audio;
pub mod capture;
pub mod keyboard_map;
mod render;
mod runner;

pub use audio::AudioOutput;
pub use render::{FrameRenderer, PALETTE_COUNT};
pub use runner::{RunnerConfig, run};
