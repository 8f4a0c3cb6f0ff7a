//! SN76489 model driven by the bytes the sequencer writes to the PSG port.
//!
//! Three square channels and a noise channel. Counters run at clock / 16 and are stepped
//! a fractional number of times per output sample.

const CLOCK: f64 = 3_579_545.0;
const COUNTER_RATE: f64 = CLOCK / 16.0;

/// Attenuation in 2 dB steps, 15 is off.
const VOLUME_TABLE: [f32; 16] = [
    1.0, 0.794, 0.631, 0.501, 0.398, 0.316, 0.251, 0.200,
    0.158, 0.126, 0.100, 0.079, 0.063, 0.050, 0.040, 0.0,
];

const NOISE_SEED: u16 = 0x8000;

pub struct PsgSynth {
    tone_period: [u16; 3],
    tone_counter: [u16; 3],
    tone_output: [bool; 3],
    noise_mode: u8,
    noise_shift: u16,
    noise_counter: u16,
    volume: [u8; 4],
    latched_channel: usize,
    latched_volume: bool,
    ticks_per_sample: f64,
    tick_acc: f64,
}

impl PsgSynth {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            tone_period: [0; 3],
            tone_counter: [0; 3],
            tone_output: [false; 3],
            noise_mode: 0,
            noise_shift: NOISE_SEED,
            noise_counter: 0,
            volume: [0x0F; 4],
            latched_channel: 0,
            latched_volume: false,
            ticks_per_sample: COUNTER_RATE / f64::from(sample_rate.max(1.0)),
            tick_acc: 0.0,
        }
    }

    pub fn write(&mut self, byte: u8) {
        if byte & 0x80 != 0 {
            self.latched_channel = usize::from((byte >> 5) & 3);
            self.latched_volume = byte & 0x10 != 0;
            let ch = self.latched_channel;
            if self.latched_volume {
                self.volume[ch] = byte & 0x0F;
            } else if ch < 3 {
                self.tone_period[ch] = (self.tone_period[ch] & 0x3F0) | u16::from(byte & 0x0F);
            } else {
                self.noise_mode = byte & 0x07;
                self.noise_shift = NOISE_SEED;
            }
        } else {
            let ch = self.latched_channel;
            if self.latched_volume {
                self.volume[ch] = byte & 0x0F;
            } else if ch < 3 {
                self.tone_period[ch] = (self.tone_period[ch] & 0x00F) | (u16::from(byte & 0x3F) << 4);
            }
        }
    }

    pub fn tone_period(&self, channel: usize) -> u16 {
        self.tone_period[channel]
    }

    pub fn volume(&self, channel: usize) -> u8 {
        self.volume[channel]
    }

    fn clock(&mut self) {
        for i in 0..3 {
            if self.tone_counter[i] > 0 {
                self.tone_counter[i] -= 1;
            } else {
                self.tone_counter[i] = self.tone_period[i];
                self.tone_output[i] = !self.tone_output[i];
            }
        }

        let noise_period = match self.noise_mode & 3 {
            0 => 0x10,
            1 => 0x20,
            2 => 0x40,
            _ => self.tone_period[2],
        };
        if self.noise_counter > 0 {
            self.noise_counter -= 1;
        } else {
            self.noise_counter = noise_period;
            let feedback = if self.noise_mode & 0x04 != 0 {
                (self.noise_shift & 1) ^ ((self.noise_shift >> 3) & 1)
            } else {
                self.noise_shift & 1
            };
            self.noise_shift = (self.noise_shift >> 1) | (feedback << 15);
        }
    }

    /// Next output sample, roughly -0.5..0.5.
    pub fn next_sample(&mut self) -> f32 {
        self.tick_acc += self.ticks_per_sample;
        while self.tick_acc >= 1.0 {
            self.tick_acc -= 1.0;
            self.clock();
        }

        let mut out = 0.0f32;
        for i in 0..3 {
            // periods 0 and 1 are a flat line on the real chip
            if self.tone_period[i] > 1 {
                let level = VOLUME_TABLE[usize::from(self.volume[i])];
                out += if self.tone_output[i] { level } else { -level };
            }
        }
        let noise = VOLUME_TABLE[usize::from(self.volume[3])];
        out += if self.noise_shift & 1 != 0 { noise } else { -noise };
        out / 8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_then_data_sets_the_period() {
        let mut psg = PsgSynth::new(44100.0);
        psg.write(0x83);
        psg.write(0x35);
        assert_eq!(psg.tone_period(0), 851);
        psg.write(0x95);
        assert_eq!(psg.volume(0), 5);
    }

    #[test]
    fn silent_until_a_volume_is_set() {
        let mut psg = PsgSynth::new(44100.0);
        psg.write(0x8E);
        psg.write(0x0F);
        assert!((0..512).all(|_| psg.next_sample() == 0.0));

        psg.write(0x90);
        let peak = (0..2048).map(|_| psg.next_sample().abs()).fold(0.0f32, f32::max);
        assert!(peak > 0.1);
    }

    #[test]
    fn square_wave_has_the_right_pitch() {
        // divider 254 is about 440 Hz
        let mut psg = PsgSynth::new(44100.0);
        psg.write(0x8E);
        psg.write(0x0F);
        psg.write(0x90);
        let samples: Vec<f32> = (0..44100).map(|_| psg.next_sample()).collect();
        let rising = samples.windows(2).filter(|w| w[0] < 0.0 && w[1] > 0.0).count();
        assert!((430..=450).contains(&rising), "{rising} cycles");
    }
}
