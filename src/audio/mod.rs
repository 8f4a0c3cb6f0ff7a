use std::sync::Arc;
use std::sync::atomic::AtomicU8;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use tracing::{error, info};

use crate::audio_api::AudioCommand;

mod engine;
mod frame;
mod psg;
mod sample_buffer;
mod voice;

pub use frame::StereoFrame;
pub use sample_buffer::{SampleBank, BANK_RATE};

use engine::Engine;

/// Keeps the output stream alive and hands out the chip-write queue.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    level: Arc<AtomicU8>,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn sender(&self) -> Sender<AudioCommand> {
        self.tx.clone()
    }

    /// The PCM level meter, as the driver would publish it.
    pub fn level(&self) -> Arc<AtomicU8> {
        self.level.clone()
    }
}

pub fn start_audio(bank: SampleBank, kit_bank: u16) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(4096);
    let level = Arc::new(AtomicU8::new(0));

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let supported = device.default_output_config().context("no default output config")?;

    match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            let config: cpal::StreamConfig = supported.into();
            let engine = Engine::new(config.sample_rate as f32, bank, kit_bank, level.clone());
            let output_stream = build_output_stream_f32(&device, &config, rx, engine)?;
            output_stream.play().context("failed to play output stream")?;
            info!(rate = config.sample_rate, channels = config.channels, "audio started");

            Ok(AudioHandle {
                tx,
                level,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
) -> anyhow::Result<cpal::Stream> {
    let channels = usize::from(config.channels.max(1));
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            scratch.resize(n_frames, StereoFrame::default());
            engine.render_block(&mut scratch);

            for (out, frame) in data.chunks_exact_mut(channels).zip(&scratch) {
                match out {
                    [mono] => *mono = (frame.left + frame.right) * 0.5,
                    [left, right, rest @ ..] => {
                        *left = frame.left;
                        *right = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        |err| error!("audio output stream error: {err}"),
        None,
    )?;

    Ok(stream)
}
