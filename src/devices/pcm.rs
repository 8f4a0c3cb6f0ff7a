//! PCM voice: the co-processor driver's command mailbox.
//!
//! Every call takes the bus, makes its writes and gives the bus back.

use crate::error::Result;
use crate::hw::{Bus, Coprocessor};

// mailbox addresses in co-processor RAM
pub const PLAYBACK_SPEED: u16 = 0x00FD; // lower is faster
pub const ACCENT: u16 = 0x00FE; // 0 = half level, 1 = full
pub const PLAY: u16 = 0x00FF; // non-zero starts playback
pub const STOP: u16 = 0x0100; // 1 stops playback
pub const SAMPLE_LENGTH: u16 = 0x0101; // 16-bit little endian
pub const SAMPLE_START: u16 = 0x0103; // 16-bit little endian
pub const OUTPUT_LEVEL: u16 = 0x0105; // read only, last sample out

/// Where the co-processor's 32 KiB window onto the cartridge is selected.
pub const BANK_REGISTER: u16 = 0x6000;
pub const BANK_BITS: u32 = 9;
pub const BANK_SHIFT: u32 = 15;

pub fn play<C: Coprocessor>(bus: &mut Bus<C>) -> Result<()> {
    let mut hold = bus.hold()?;
    hold.write(PLAY, 1);
    Ok(())
}

/// Stop playback. The play flag is cleared too: a play left set leaks into the next step.
pub fn stop<C: Coprocessor>(bus: &mut Bus<C>) -> Result<()> {
    let mut hold = bus.hold()?;
    hold.write(STOP, 1);
    hold.write(PLAY, 0);
    Ok(())
}

pub fn set_sample_region<C: Coprocessor>(bus: &mut Bus<C>, start: u16, length: u16) -> Result<()> {
    let mut hold = bus.hold()?;
    let [lo, hi] = start.to_le_bytes();
    hold.write(SAMPLE_START, lo);
    hold.write(SAMPLE_START + 1, hi);
    let [lo, hi] = length.to_le_bytes();
    hold.write(SAMPLE_LENGTH, lo);
    hold.write(SAMPLE_LENGTH + 1, hi);
    Ok(())
}

pub fn set_accent<C: Coprocessor>(bus: &mut Bus<C>, accent: bool) -> Result<()> {
    let mut hold = bus.hold()?;
    hold.write(ACCENT, u8::from(accent));
    Ok(())
}

/// Speed 0 would stall the driver's delay loop, so it goes out as 1.
pub fn set_playback_speed<C: Coprocessor>(bus: &mut Bus<C>, speed: u8) -> Result<()> {
    let mut hold = bus.hold()?;
    hold.write(PLAYBACK_SPEED, speed.max(1));
    Ok(())
}

/// Point the co-processor's bank window at the 32 KiB block holding `address`.
pub fn select_bank<C: Coprocessor>(bus: &mut Bus<C>, address: u32) -> Result<()> {
    let bank = address >> BANK_SHIFT;
    let mut hold = bus.hold()?;
    for bit in 0..BANK_BITS {
        hold.write(BANK_REGISTER, ((bank >> bit) & 1) as u8);
    }
    Ok(())
}

/// The level meter the driver publishes.
pub fn output_level<C: Coprocessor>(bus: &mut Bus<C>) -> Result<u8> {
    let mut hold = bus.hold()?;
    Ok(hold.read(OUTPUT_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::sim::SimZ80;

    fn bus() -> Bus<SimZ80> {
        Bus::new(SimZ80::new(), 8, 8)
    }

    #[test]
    fn stop_sets_stop_and_clears_play() {
        let mut bus = bus();
        play(&mut bus).unwrap();
        assert_eq!(bus.chip().ram(PLAY), 1);
        stop(&mut bus).unwrap();
        assert_eq!(bus.chip().ram(STOP), 1);
        assert_eq!(bus.chip().ram(PLAY), 0);
    }

    #[test]
    fn region_is_little_endian() {
        let mut bus = bus();
        set_sample_region(&mut bus, 0x3FFF, 0x4000).unwrap();
        assert_eq!(bus.chip().ram_u16(SAMPLE_START), 0x3FFF);
        assert_eq!(bus.chip().ram_u16(SAMPLE_LENGTH), 0x4000);
        assert_eq!(bus.chip().stats().acquisitions, 1);
    }

    #[test]
    fn speed_never_zero() {
        let mut bus = bus();
        set_playback_speed(&mut bus, 0).unwrap();
        assert_eq!(bus.chip().ram(PLAYBACK_SPEED), 1);
        set_playback_speed(&mut bus, 200).unwrap();
        assert_eq!(bus.chip().ram(PLAYBACK_SPEED), 200);
    }

    #[test]
    fn accent_is_zero_or_one() {
        let mut bus = bus();
        set_accent(&mut bus, true).unwrap();
        assert_eq!(bus.chip().ram(ACCENT), 1);
        set_accent(&mut bus, false).unwrap();
        assert_eq!(bus.chip().ram(ACCENT), 0);
    }

    #[test]
    fn bank_comes_from_the_address() {
        let mut bus = bus();
        select_bank(&mut bus, 0x0012_8000).unwrap();
        assert_eq!(bus.chip().bank(), 0x25);
    }

    #[test]
    fn level_reads_the_meter() {
        let mut bus = bus();
        bus.chip().level().store(0x90, std::sync::atomic::Ordering::Relaxed);
        assert_eq!(output_level(&mut bus).unwrap(), 0x90);
        assert!(!bus.chip().holds_bus());
        assert_eq!(bus.chip().stats().violations, 0);
    }
}
