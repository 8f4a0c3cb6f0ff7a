//! FM synthesizer (YM2612) register interface.
//!
//! The chip sits in the co-processor's address space, so an [`Fm`] borrows a granted
//! bus. Every port write is preceded by a busy poll and followed by a short settle; a
//! batch ends with [`Fm::latch`] so the co-processor's DAC stream keeps landing in the DAC.

use crate::error::{Result, SeqError};
use crate::hw::{spin_until, BusHold, Coprocessor};
use crate::pipeline::project::{FmLevelShape, Instrument, FM_CHANNELS, FM_OPERATORS};

pub const YM_BASE: u16 = 0x4000;
const STATUS_BUSY: u8 = 0x80;

// settle loops after the address and the data write
const ADDRESS_SETTLE: u32 = 1;
const DATA_SETTLE: u32 = 5;

pub const REG_LFO: u8 = 0x22;
pub const REG_TIMERS: u8 = 0x27;
pub const REG_KEY: u8 = 0x28;
pub const REG_DAC_DATA: u8 = 0x2A;
pub const REG_DAC_ENABLE: u8 = 0x2B;
pub const REG_DT_MUL: u8 = 0x30;
pub const REG_TOTAL_LEVEL: u8 = 0x40;
pub const REG_RS_AR: u8 = 0x50;
pub const REG_AM_D1R: u8 = 0x60;
pub const REG_D2R: u8 = 0x70;
pub const REG_D1L_RR: u8 = 0x80;
pub const REG_SSG_EG: u8 = 0x90;
pub const REG_FNUM_LO: u8 = 0xA0;
pub const REG_BLOCK_FNUM_HI: u8 = 0xA4;
pub const REG_FB_ALG: u8 = 0xB0;
pub const REG_PAN_AMS_FMS: u8 = 0xB4;

/// The last channel carries the DAC and is left alone.
pub const DAC_CHANNEL: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Part {
    A,
    B,
}

impl Part {
    fn port_offset(self) -> u16 {
        match self {
            Part::A => 0,
            Part::B => 2,
        }
    }
}

/// Total level register for each (channel, operator). Operators are in logical order
/// OP1..OP4, which the chip keeps at slot offsets 0, 8, 4, C.
pub const OPERATOR_LEVEL_REGISTERS: [[(Part, u8); FM_OPERATORS]; FM_CHANNELS] = [
    [(Part::A, 0x40), (Part::A, 0x48), (Part::A, 0x44), (Part::A, 0x4C)],
    [(Part::A, 0x41), (Part::A, 0x49), (Part::A, 0x45), (Part::A, 0x4D)],
    [(Part::A, 0x42), (Part::A, 0x4A), (Part::A, 0x46), (Part::A, 0x4E)],
    [(Part::B, 0x40), (Part::B, 0x48), (Part::B, 0x44), (Part::B, 0x4C)],
    [(Part::B, 0x41), (Part::B, 0x49), (Part::B, 0x45), (Part::B, 0x4D)],
    [(Part::B, 0x42), (Part::B, 0x4A), (Part::B, 0x46), (Part::B, 0x4E)],
];

// part and register of a per-operator parameter, using the level table's slot layout
fn slot(channel: u8, operator: u8, base: u8) -> (Part, u8) {
    let (part, level_reg) = OPERATOR_LEVEL_REGISTERS[usize::from(channel) % FM_CHANNELS][usize::from(operator) % FM_OPERATORS];
    (part, base | (level_reg & 0x0F))
}

// part and register of a per-channel parameter
fn channel_reg(channel: u8, base: u8) -> (Part, u8) {
    let channel = channel % FM_CHANNELS as u8;
    let part = if channel < 3 { Part::A } else { Part::B };
    (part, base + channel % 3)
}

// channel code for the key on/off register
fn key_code(channel: u8) -> u8 {
    let channel = channel % FM_CHANNELS as u8;
    if channel < 3 { channel } else { channel + 1 }
}

fn settle(loops: u32) {
    for _ in 0..loops {
        std::hint::spin_loop();
    }
}

pub struct Fm<'h, 'a, C: Coprocessor> {
    hold: &'h mut BusHold<'a, C>,
}

impl<'h, 'a, C: Coprocessor> Fm<'h, 'a, C> {
    pub fn new(hold: &'h mut BusHold<'a, C>) -> Self {
        Self { hold }
    }

    fn wait_ready(&mut self) -> Result<()> {
        let polls = self.hold.fm_busy_polls();
        let hold = &mut *self.hold;
        match spin_until(polls, || hold.read(YM_BASE) & STATUS_BUSY == 0) {
            Some(_) => Ok(()),
            None => Err(SeqError::FmBusy { polls }),
        }
    }

    fn write_port(&mut self, port: u16, value: u8, settle_loops: u32) -> Result<()> {
        self.wait_ready()?;
        self.hold.write(YM_BASE + port, value);
        settle(settle_loops);
        Ok(())
    }

    /// Address, then data, on one part.
    pub fn write_reg(&mut self, part: Part, reg: u8, value: u8) -> Result<()> {
        let base = part.port_offset();
        self.write_port(base, reg, ADDRESS_SETTLE)?;
        self.write_port(base + 1, value, DATA_SETTLE)
    }

    /// Leave the DAC data register selected for the co-processor's sample stream.
    pub fn latch(&mut self) -> Result<()> {
        self.write_port(Part::A.port_offset(), REG_DAC_DATA, ADDRESS_SETTLE)
    }

    pub fn set_lfo(&mut self, enable: bool, speed: u8) -> Result<()> {
        self.write_reg(Part::A, REG_LFO, (u8::from(enable) << 3) | (speed & 0x07))
    }

    pub fn set_detune_mult(&mut self, channel: u8, detune: u8, multiplier: u8) -> Result<()> {
        self.for_each_operator(channel, REG_DT_MUL, ((detune & 0x07) << 4) | (multiplier & 0x0F))
    }

    pub fn set_operator_level(&mut self, channel: u8, operator: u8, level: u8) -> Result<()> {
        let (part, reg) = OPERATOR_LEVEL_REGISTERS[usize::from(channel) % FM_CHANNELS][usize::from(operator) % FM_OPERATORS];
        self.write_reg(part, reg, level & 0x7F)
    }

    pub fn set_attack(&mut self, channel: u8, attack: u8) -> Result<()> {
        self.for_each_operator(channel, REG_RS_AR, attack & 0x1F)
    }

    pub fn set_release_sustain(&mut self, channel: u8, release: u8, sustain: u8) -> Result<()> {
        self.for_each_operator(channel, REG_D1L_RR, ((sustain & 0x0F) << 4) | (release & 0x0F))
    }

    pub fn set_decay_am(&mut self, channel: u8, decay: u8, am: bool) -> Result<()> {
        self.for_each_operator(channel, REG_AM_D1R, (u8::from(am) << 7) | (decay & 0x1F))
    }

    pub fn set_feedback_algo(&mut self, channel: u8, feedback: u8, algorithm: u8) -> Result<()> {
        let (part, reg) = channel_reg(channel, REG_FB_ALG);
        self.write_reg(part, reg, ((feedback & 0x07) << 3) | (algorithm & 0x07))
    }

    pub fn set_pan_ams_fms(&mut self, channel: u8, pan: u8, ams: u8, fms: u8) -> Result<()> {
        let (part, reg) = channel_reg(channel, REG_PAN_AMS_FMS);
        self.write_reg(part, reg, ((pan & 0x03) << 6) | ((ams & 0x03) << 4) | (fms & 0x07))
    }

    /// Block and fnum high first: the chip only takes the pair when the low byte lands.
    pub fn set_pitch(&mut self, channel: u8, block: u8, fnum: u16) -> Result<()> {
        let (part, hi) = channel_reg(channel, REG_BLOCK_FNUM_HI);
        let (_, lo) = channel_reg(channel, REG_FNUM_LO);
        self.write_reg(part, hi, ((block & 0x07) << 3) | ((fnum >> 8) & 0x07) as u8)?;
        self.write_reg(part, lo, (fnum & 0xFF) as u8)
    }

    pub fn note_on(&mut self, channel: u8) -> Result<()> {
        self.write_reg(Part::A, REG_KEY, 0xF0 | key_code(channel))
    }

    pub fn note_off(&mut self, channel: u8) -> Result<()> {
        self.write_reg(Part::A, REG_KEY, key_code(channel))
    }

    fn for_each_operator(&mut self, channel: u8, base: u8, value: u8) -> Result<()> {
        for operator in 0..FM_OPERATORS as u8 {
            let (part, reg) = slot(channel, operator, base);
            self.write_reg(part, reg, value)?;
        }
        Ok(())
    }

    /// Silence every FM channel but the DAC one and put the chip in a known state.
    pub fn reset(&mut self) -> Result<()> {
        self.set_lfo(false, 0)?;
        self.write_reg(Part::A, REG_TIMERS, 0x00)?;
        for channel in (0..FM_CHANNELS as u8).filter(|c| *c != DAC_CHANNEL) {
            for operator in 0..FM_OPERATORS as u8 {
                for (base, value) in [
                    (REG_DT_MUL, 0x00),
                    (REG_TOTAL_LEVEL, 0x7F),
                    (REG_RS_AR, 0x00),
                    (REG_AM_D1R, 0x00),
                    (REG_D2R, 0x00),
                    (REG_D1L_RR, 0xFF),
                    (REG_SSG_EG, 0x00),
                ] {
                    let (part, reg) = slot(channel, operator, base);
                    self.write_reg(part, reg, value)?;
                }
            }
            self.set_pitch(channel, 0, 0)?;
            self.set_feedback_algo(channel, 0, 0)?;
            self.set_pan_ams_fms(channel, 3, 0, 0)?;
            self.note_off(channel)?;
        }
        self.latch()
    }

    /// Upload a whole voice. With the carrier shape only channel 0's levels exist; the
    /// others get channel 0's.
    pub fn apply_instrument(&mut self, instrument: &Instrument, shape: FmLevelShape) -> Result<()> {
        self.set_lfo(instrument.lfo_enable, instrument.lfo_speed)?;
        for channel in (0..FM_CHANNELS as u8).filter(|c| *c != DAC_CHANNEL) {
            self.set_detune_mult(channel, instrument.detune, instrument.multiplier)?;
            let levels = match shape {
                FmLevelShape::Carrier => instrument.levels[0],
                FmLevelShape::Full => instrument.levels[usize::from(channel)],
            };
            for (operator, level) in levels.iter().enumerate() {
                self.set_operator_level(channel, operator as u8, *level)?;
            }
            self.set_attack(channel, instrument.attack)?;
            self.set_decay_am(channel, instrument.decay, instrument.am)?;
            self.set_release_sustain(channel, instrument.release, instrument.sustain)?;
            self.set_feedback_algo(channel, instrument.feedback, instrument.algorithm)?;
            self.set_pan_ams_fms(channel, instrument.pan, instrument.ams, instrument.fms)?;
        }
        self.latch()
    }
}
