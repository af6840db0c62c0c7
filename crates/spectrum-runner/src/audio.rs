//! Audio output.
//!
//! A cpal output stream fed through a single-producer ring buffer. The
//! pump thread pushes one stereo frame of samples per completed emulation
//! frame; the audio callback drains the ring at the device's pace and
//! falls back to silence on underrun.
//!
//! Pushing never blocks: emulation pace comes from the wall-clock pacer,
//! not audio back-pressure, so when the ring is full the excess samples
//! are simply dropped rather than stalling presentation.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::{
    HeapRb,
    traits::{Consumer, Producer, Split},
};
use spectrum_runtime::AudioSink;

/// Audio output handler managing the cpal stream and ring buffer.
pub struct AudioOutput {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
}

impl AudioOutput {
    /// Create a stereo output stream.
    ///
    /// Returns `None` if no audio device is available — the caller
    /// degrades to silent operation.
    #[must_use]
    pub fn new(sample_rate: u32, samples_per_frame: usize) -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;

        let config = StreamConfig {
            channels: 2,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let rest_level = 0.0;

        // Ring sized for ~8 stereo frames of audio, pre-filled with 4
        // frames of silence so startup does not underrun.
        let ring = HeapRb::<f32>::new(samples_per_frame * 2 * 8);
        let (mut producer, mut consumer) = ring.split();
        for _ in 0..samples_per_frame * 2 * 4 {
            let _ = producer.try_push(rest_level);
        }

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        // Silence on underrun to avoid clicks.
                        *sample = consumer.try_pop().unwrap_or(rest_level);
                    }
                },
                |err| eprintln!("Audio stream error: {err}"),
                None,
            )
            .ok()?;

        stream.play().ok()?;

        Some(Self {
            _stream: stream,
            producer,
        })
    }
}

impl AudioSink for AudioOutput {
    fn push_frame(&mut self, left: &[f32], right: &[f32]) {
        for (&l, &r) in left.iter().zip(right) {
            // Interleave; if the ring is full the frame is late anyway,
            // so the samples are dropped rather than blocking the pump.
            if self.producer.try_push(l).is_err() {
                return;
            }
            let _ = self.producer.try_push(r);
        }
    }
}
