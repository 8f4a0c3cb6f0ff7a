//! Protocol adapters for the three sound paths.

pub mod fm;
pub mod pcm;
pub mod psg;

use tracing::info;

use crate::error::Result;
use crate::hw::{Bus, Coprocessor, PsgPort};
use crate::pipeline::project::{FmLevelShape, Instrument};
use fm::Fm;
use psg::Psg;

/// PSG and FM channel the sequence plays on.
pub const SEQ_CHANNEL: u8 = 0;

/// The sound hardware as the sequencer sees it.
pub struct Devices<C: Coprocessor, P: PsgPort> {
    pub bus: Bus<C>,
    pub psg: Psg<P>,
}

impl<C: Coprocessor, P: PsgPort> Devices<C, P> {
    pub fn new(bus: Bus<C>, psg: Psg<P>) -> Self {
        Self { bus, psg }
    }

    /// Bring every voice to a known, silent state.
    pub fn init(&mut self) -> Result<()> {
        self.psg.reset();
        pcm::stop(&mut self.bus)?;
        let mut hold = self.bus.hold()?;
        Fm::new(&mut hold).reset()?;
        info!("sound devices reset");
        Ok(())
    }

    /// Quiet the sequenced channel on all three voices.
    pub fn silence(&mut self) -> Result<()> {
        pcm::stop(&mut self.bus)?;
        self.psg.set_envelope(SEQ_CHANNEL, psg::ENVELOPE_SILENT);
        let mut hold = self.bus.hold()?;
        let mut fm = Fm::new(&mut hold);
        fm.note_off(SEQ_CHANNEL)?;
        fm.latch()
    }

    pub fn apply_instrument(&mut self, instrument: &Instrument, shape: FmLevelShape) -> Result<()> {
        let mut hold = self.bus.hold()?;
        Fm::new(&mut hold).apply_instrument(instrument, shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::sim::{PsgTap, SimZ80};

    fn devices() -> Devices<SimZ80, PsgTap> {
        Devices::new(Bus::new(SimZ80::new(), 8, 16), Psg::new(PsgTap::new()))
    }

    #[test]
    fn init_leaves_everything_quiet_and_the_bus_free() {
        let mut dev = devices();
        dev.init().unwrap();
        let chip = dev.bus.chip();
        assert!(!chip.holds_bus());
        assert_eq!(chip.stats().violations, 0);
        assert_eq!(chip.ym().violations(), 0);
        assert_eq!(chip.ram(pcm::STOP), 1);
        assert_eq!(chip.ram(pcm::PLAY), 0);
        for channel in 0..5 {
            assert_eq!(chip.ym().key_mask(channel), 0);
        }
        assert_eq!(dev.psg.port().written().len(), 12);
    }

    #[test]
    fn silence_keys_off_and_mutes() {
        let mut dev = devices();
        {
            let mut hold = dev.bus.hold().unwrap();
            Fm::new(&mut hold).note_on(SEQ_CHANNEL).unwrap();
        }
        dev.silence().unwrap();
        assert_eq!(dev.bus.chip().ym().key_mask(0), 0);
        assert_eq!(dev.psg.port().written(), &[0x9F]);
        assert_eq!(dev.bus.chip().ym().address(0), fm::REG_DAC_DATA);
    }
}
