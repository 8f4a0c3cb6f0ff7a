//! Square-wave tone generator. Lives on the main bus, so no arbitration.

use crate::hw::PsgPort;

pub const ENVELOPE_SILENT: u8 = 15;
pub const ENVELOPE_LOUDEST: u8 = 0;

pub const NOISE_PERIODIC: u8 = 0;
pub const NOISE_WHITE: u8 = 1;
pub const NOISE_CLOCK2: u8 = 0;
pub const NOISE_CLOCK4: u8 = 1;
pub const NOISE_CLOCK8: u8 = 2;
pub const NOISE_TONE3: u8 = 3;

const NTSC_CLOCK: u32 = 3_579_545;
const DIVIDER_MASK: u16 = 0x3FF;

pub struct Psg<P: PsgPort> {
    port: P,
}

impl<P: PsgPort> Psg<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Zero every tone and silence all four channels.
    pub fn reset(&mut self) {
        for channel in 0..4u8 {
            self.port.write(0x80 | (channel << 5));
            self.port.write(0x00);
            self.set_envelope(channel, ENVELOPE_SILENT);
        }
    }

    pub fn write(&mut self, byte: u8) {
        self.port.write(byte);
    }

    /// Latch byte with the low 4 bits, then the data byte with the upper 6. Order matters.
    pub fn set_tone(&mut self, channel: u8, divider: u16) {
        let divider = divider & DIVIDER_MASK;
        self.port.write(0x80 | ((channel & 3) << 5) | (divider & 0x0F) as u8);
        self.port.write(((divider >> 4) & 0x3F) as u8);
    }

    /// Attenuation: 0 is loudest, 15 is off.
    pub fn set_envelope(&mut self, channel: u8, level: u8) {
        self.port.write(0x90 | ((channel & 3) << 5) | (level & 0x0F));
    }

    pub fn set_noise(&mut self, kind: u8, frequency_class: u8) {
        self.port.write(0xE0 | ((kind & 1) << 2) | (frequency_class & 3));
    }

    /// Tone from a frequency in Hz; 0 Hz writes a zero divider.
    pub fn set_frequency(&mut self, channel: u8, hz: u16) {
        let divider = if hz == 0 { 0 } else { (NTSC_CLOCK / (u32::from(hz) * 32)).min(u32::from(DIVIDER_MASK)) as u16 };
        self.set_tone(channel, divider);
    }
}
