use std::path::Path;

use tracing::info;

use crate::audio::{SampleBank, BANK_RATE};
use crate::pipeline::kit::{KitLayout, BANK_LEN};

// Load the kit WAV, or build a drum kit when none is configured
pub fn load_kit(path: Option<&Path>, layout: KitLayout) -> anyhow::Result<SampleBank> {
    match path {
        Some(path) => {
            let bank = SampleBank::load_wav(path)?;
            info!(path = %path.display(), bytes = bank.len(), "kit loaded");
            Ok(bank)
        }
        None => {
            info!(?layout, "no kit configured, using the built-in one");
            Ok(synth_kit(layout))
        }
    }
}

#[derive(Clone, Copy)]
enum Drum {
    Kick,
    Snare,
    Hat,
    OpenHat,
    Tom(f32),
    Clap,
    Rim,
}

// tiny deterministic noise source, same kit every boot
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (self.0 >> 8) as f32 / (1u32 << 23) as f32 - 1.0
    }
}

fn render(drum: Drum, len: usize, noise: &mut Lcg) -> Vec<f32> {
    let rate = BANK_RATE as f32;
    let mut phase = 0.0f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / rate;
            match drum {
                Drum::Kick => {
                    let freq = 50.0 + 120.0 * (-t * 30.0).exp();
                    phase += std::f32::consts::TAU * freq / rate;
                    phase.sin() * (-t * 6.0).exp()
                }
                Drum::Snare => {
                    phase += std::f32::consts::TAU * 180.0 / rate;
                    (0.4 * phase.sin() + 0.6 * noise.next()) * (-t * 14.0).exp()
                }
                Drum::Hat => noise.next() * (-t * 60.0).exp() * 0.6,
                Drum::OpenHat => noise.next() * (-t * 9.0).exp() * 0.5,
                Drum::Tom(freq) => {
                    phase += std::f32::consts::TAU * freq * (1.0 + 0.5 * (-t * 20.0).exp()) / rate;
                    phase.sin() * (-t * 8.0).exp()
                }
                Drum::Clap => {
                    let bursts = if t < 0.03 { ((t * 300.0) as u32 % 2) as f32 } else { 1.0 };
                    noise.next() * bursts * (-t * 18.0).exp()
                }
                Drum::Rim => {
                    phase += std::f32::consts::TAU * 1700.0 / rate;
                    phase.sin().signum() * (-t * 80.0).exp() * 0.7
                }
            }
        })
        .collect()
}

/// A kit that fills the layout's slots: a one-bar beat for the split layout, one drum per
/// slice for the multi layout.
pub fn synth_kit(layout: KitLayout) -> SampleBank {
    let mut noise = Lcg(0x1234_5678);
    match layout {
        KitLayout::Split => {
            let beat = BANK_RATE as usize / 4; // eighth notes at 120 bpm
            let pattern = [Drum::Kick, Drum::Hat, Drum::Snare, Drum::Hat, Drum::Kick, Drum::Kick, Drum::Snare, Drum::OpenHat];
            let mut out = Vec::with_capacity(beat * pattern.len());
            for drum in pattern {
                out.extend(render(drum, beat, &mut noise));
            }
            SampleBank::from_f32(&out)
        }
        KitLayout::Multi => {
            let drums = [
                Drum::Kick,
                Drum::Snare,
                Drum::Hat,
                Drum::Rim,
                Drum::Clap,
                Drum::Tom(120.0),
                Drum::Tom(90.0),
                Drum::Tom(70.0),
                Drum::OpenHat,
            ];
            let mut out = vec![0.0f32; BANK_LEN];
            for (gate, drum) in (1u8..).zip(drums) {
                if let Some((start, len)) = layout.region(gate, BANK_LEN) {
                    let start = usize::from(start);
                    let len = usize::from(len);
                    out[start..start + len].copy_from_slice(&render(drum, len, &mut noise));
                }
            }
            SampleBank::from_f32(&out)
        }
    }
}
