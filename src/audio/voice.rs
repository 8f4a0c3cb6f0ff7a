use super::frame::StereoFrame;
use crate::devices::pcm::{ACCENT, PLAY, PLAYBACK_SPEED, SAMPLE_LENGTH, SAMPLE_START, STOP};

// Co-processor clock and the cost of one pass of the driver's output loop:
// a fixed part plus 13 cycles per unit of delay.
const Z80_CLOCK: f32 = 3_579_545.0;
const LOOP_CYCLES: f32 = 110.0;
const DELAY_CYCLES: f32 = 13.0;

const MAILBOX_LEN: usize = 0x0106;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

// unsigned 8-bit to -1..1
#[inline]
fn to_f32(s: u8) -> f32 {
    (f32::from(s) - 128.0) / 128.0
}

/// Driver playback rate in samples per second for a speed byte.
pub fn playback_rate(speed: u8) -> f32 {
    Z80_CLOCK / (LOOP_CYCLES + f32::from(speed.max(1)) * DELAY_CYCLES)
}

/// The co-processor's PCM driver: watches its mailbox and plays slices of the bank.
#[derive(Clone, Debug)]
pub struct PcmVoice {
    mailbox: [u8; MAILBOX_LEN],
    output_rate: f32,
    pos: f32,
    step: f32,
    start: usize,
    length: usize,
    gain: f32,
    active: bool,
    level: u8,
}

impl PcmVoice {
    pub fn new(output_rate: f32) -> Self {
        Self {
            mailbox: [0; MAILBOX_LEN],
            output_rate: output_rate.max(1.0),
            pos: 0.0,
            step: 0.0,
            start: 0,
            length: 0,
            gain: 1.0,
            active: false,
            level: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Meter value: distance of the last sample from the centre line, 0..255.
    pub fn level(&self) -> u8 {
        self.level
    }

    fn mailbox_u16(&self, addr: u16) -> usize {
        let at = usize::from(addr);
        usize::from(u16::from_le_bytes([self.mailbox[at], self.mailbox[at + 1]]))
    }

    pub fn handle_write(&mut self, addr: u16, value: u8) {
        if let Some(cell) = self.mailbox.get_mut(usize::from(addr)) {
            *cell = value;
        }
        match addr {
            PLAY if value != 0 => self.trigger(),
            STOP if value == 1 => {
                self.active = false;
                self.level = 0;
            }
            _ => {}
        }
    }

    fn trigger(&mut self) {
        self.start = self.mailbox_u16(SAMPLE_START);
        self.length = self.mailbox_u16(SAMPLE_LENGTH);
        self.step = playback_rate(self.mailbox[usize::from(PLAYBACK_SPEED)]) / self.output_rate;
        self.gain = if self.mailbox[usize::from(ACCENT)] == 0 { 0.5 } else { 1.0 };
        self.pos = 0.0;
        self.active = self.length > 0;
    }

    pub fn render_into(&mut self, bank: &[u8], out: &mut [StereoFrame]) {
        if !self.active {
            return;
        }
        let available = bank.len().saturating_sub(self.start);
        let length = self.length.min(available);
        if length == 0 {
            self.active = false;
            return;
        }

        for frame in out.iter_mut() {
            let i = self.pos as usize;
            if i >= length {
                self.active = false;
                self.level = 0;
                break;
            }
            let frac = self.pos - i as f32;
            let s0 = bank[self.start + i];
            let s1 = if i + 1 < length { bank[self.start + i + 1] } else { s0 };
            let sample = lerp(to_f32(s0), to_f32(s1), frac) * self.gain;

            frame.left += sample;
            frame.right += sample;
            self.level = (sample.abs() * 255.0).min(255.0) as u8;
            self.pos += self.step;
        }
    }
}
