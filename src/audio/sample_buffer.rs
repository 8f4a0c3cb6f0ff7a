use std::path::Path;

use anyhow::Context;

use crate::pipeline::kit::BANK_LEN;

/// Rate kits are stored at; speed 20 plays them back at about this rate.
pub const BANK_RATE: u32 = 9_675;

/// One bank of unsigned 8-bit mono PCM, as the co-processor reads it.
#[derive(Clone, Debug, Default)]
pub struct SampleBank {
    pub data: Vec<u8>,
}

impl SampleBank {
    pub fn from_f32(samples: &[f32]) -> Self {
        let data = samples
            .iter()
            .take(BANK_LEN)
            .map(|s| (s.clamp(-1.0, 1.0) * 127.0 + 128.0).round() as u8)
            .collect();
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Load a WAV: mixed down to mono, resampled to [`BANK_RATE`], cut to one bank.
    pub fn load_wav(path: &Path) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let channels = usize::from(spec.channels.max(1));
        let mono: Vec<f32> = samples
            .chunks_exact(channels)
            .map(|c| c.iter().sum::<f32>() / channels as f32)
            .collect();

        let mono = resample_linear(&mono, spec.sample_rate, BANK_RATE);
        Ok(Self::from_f32(&mono))
    }
}

fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = f64::from(target_rate) / f64::from(source_rate);
    // no point producing more than fits in a bank
    let out_len = ((samples.len() as f64 * ratio).ceil() as usize).min(BANK_LEN);
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= samples.len() - 1 {
            out.push(samples[samples.len() - 1]);
        } else {
            out.push(samples[idx] * (1.0 - frac) + samples[idx + 1] * frac);
        }
    }
    out
}
