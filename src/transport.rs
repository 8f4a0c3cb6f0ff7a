// Step clock: a step goes out on frames where the frame count divides by the tempo.

use tracing::{debug, error, info};

use crate::devices::fm::Fm;
use crate::devices::{pcm, Devices, SEQ_CHANNEL};
use crate::error::Result;
use crate::hw::controller::Pad;
use crate::hw::{Coprocessor, PsgPort};
use crate::pipeline::kit::KitLayout;
use crate::pipeline::project::{SequencerState, Step, FM_NOTE_OFF};
use crate::pitch::{note_to_block_fnum, note_to_divider};
use crate::shared::{Button, FrameReport, STEPS_PER_PATTERN};
use crate::devices::psg::ENVELOPE_SILENT;

// held together: play/stop
pub const PLAY_CHORD: [Button; 2] = [Button::A, Button::Down];

pub struct Transport {
    state: SequencerState,
    frame: u32,
    // set once the chord has toggled, cleared when it lets go
    chord_latched: bool,
    kit: KitLayout,
    kit_len: usize,
    psg_level: u8,
}

impl Transport {
    pub fn new(state: SequencerState, kit: KitLayout, kit_len: usize, psg_level: u8) -> Self {
        Self {
            state,
            frame: 0,
            chord_latched: false,
            kit,
            kit_len,
            psg_level: psg_level.min(ENVELOPE_SILENT),
        }
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SequencerState {
        &mut self.state
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn kit(&self) -> KitLayout {
        self.kit
    }

    /// A bus or FM timeout stops the transport before the error is returned.
    pub fn run_frame<C: Coprocessor, P: PsgPort>(&mut self, pad: &Pad, devices: &mut Devices<C, P>) -> Result<FrameReport> {
        self.frame = self.frame.wrapping_add(1);
        let mut report = FrameReport::default();

        let result = self.tick(pad, devices, &mut report);
        if let Err(e) = &result {
            if e.is_fatal() {
                self.state.playing = false;
                error!(frame = self.frame, "{e}; transport halted");
            }
        }
        result.map(|_| report)
    }

    fn tick<C: Coprocessor, P: PsgPort>(&mut self, pad: &Pad, devices: &mut Devices<C, P>, report: &mut FrameReport) -> Result<()> {
        if self.chord_down(pad) {
            report.toggled = Some(self.toggle(devices)?);
        }

        let tempo = u32::from(self.state.project.tempo.max(1));
        if self.state.playing && self.frame % tempo == 0 {
            let position = self.state.step_position;
            self.dispatch(devices)?;
            report.dispatched = Some(position);
            self.state.step_position = ((usize::from(position) + 1) % STEPS_PER_PATTERN) as u8;
        }
        Ok(())
    }

    // true once per chord press
    fn chord_down(&mut self, pad: &Pad) -> bool {
        if PLAY_CHORD.iter().all(|b| pad.is_pressed(*b)) {
            let fire = !self.chord_latched;
            self.chord_latched = true;
            fire
        } else {
            self.chord_latched = false;
            false
        }
    }

    // stopping rewinds to step 0
    pub fn toggle<C: Coprocessor, P: PsgPort>(&mut self, devices: &mut Devices<C, P>) -> Result<bool> {
        self.state.playing = !self.state.playing;
        if self.state.playing {
            info!(tempo = self.state.project.tempo, "playing");
        } else {
            self.state.step_position = 0;
            info!("stopped");
            devices.silence()?;
        }
        Ok(self.state.playing)
    }

    pub fn dispatch<C: Coprocessor, P: PsgPort>(&mut self, devices: &mut Devices<C, P>) -> Result<()> {
        let step = *self.state.current_step();
        debug!(position = self.state.step_position, ?step, "step");
        self.send_psg(&step, devices);
        self.send_fm(&step, devices)?;
        self.send_pcm(&step, devices)
    }

    fn send_psg<C: Coprocessor, P: PsgPort>(&self, step: &Step, devices: &mut Devices<C, P>) {
        if step.psg_note > 0 {
            devices.psg.set_tone(SEQ_CHANNEL, note_to_divider(step.psg_note));
            devices.psg.set_envelope(SEQ_CHANNEL, self.psg_level);
        } else {
            devices.psg.set_envelope(SEQ_CHANNEL, ENVELOPE_SILENT);
        }
    }

    fn send_fm<C: Coprocessor, P: PsgPort>(&self, step: &Step, devices: &mut Devices<C, P>) -> Result<()> {
        if step.fm_note == 0 {
            return Ok(());
        }
        let mut hold = devices.bus.hold()?;
        let mut fm = Fm::new(&mut hold);
        fm.note_off(SEQ_CHANNEL)?;
        if step.fm_note != FM_NOTE_OFF {
            let pitch = note_to_block_fnum(step.fm_note as u8);
            fm.set_pitch(SEQ_CHANNEL, pitch.block, pitch.fnum)?;
            fm.note_on(SEQ_CHANNEL)?;
        }
        fm.latch()
    }

    // Always stop first: a previous sample left running bleeds into the next step.
    fn send_pcm<C: Coprocessor, P: PsgPort>(&self, step: &Step, devices: &mut Devices<C, P>) -> Result<()> {
        pcm::stop(&mut devices.bus)?;
        let Some((start, length)) = self.kit.region(step.gate, self.kit_len) else {
            return Ok(());
        };
        pcm::set_accent(&mut devices.bus, step.accent)?;
        pcm::set_sample_region(&mut devices.bus, start, length)?;
        pcm::set_playback_speed(&mut devices.bus, step.speed)?;
        pcm::play(&mut devices.bus)
    }
}
