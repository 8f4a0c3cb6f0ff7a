use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use super::frame::StereoFrame;
use super::psg::PsgSynth;
use super::sample_buffer::SampleBank;
use super::voice::PcmVoice;
use crate::audio_api::AudioCommand;

/// Renders what the chips were told to play. Lives on the audio thread.
pub struct Engine {
    psg: PsgSynth,
    pcm: PcmVoice,
    bank: SampleBank,
    kit_bank: u16, // where the kit sits in ROM
    bank_register: u16,
    level: Arc<AtomicU8>,
}

impl Engine {
    pub fn new(sample_rate: f32, bank: SampleBank, kit_bank: u16, level: Arc<AtomicU8>) -> Self {
        Self {
            psg: PsgSynth::new(sample_rate),
            pcm: PcmVoice::new(sample_rate),
            bank,
            kit_bank,
            bank_register: 0,
            level,
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Psg(byte) => self.psg.write(byte),
            AudioCommand::Mailbox { addr, value } => self.pcm.handle_write(addr, value),
            AudioCommand::Bank(bank) => self.bank_register = bank,
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            *frame = StereoFrame::mono(self.psg.next_sample());
        }
        // the driver reads whatever bank is selected; only the kit's bank holds samples
        if self.bank_register == self.kit_bank {
            self.pcm.render_into(&self.bank.data, out);
        }
        self.level.store(self.pcm.level(), Ordering::Relaxed);
    }
}
