// Between the frame loop and the sequencer: pad edges in, screen edits, write-through
// saves, then one transport tick. Nothing in here knows which hardware it is talking to.

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::devices::{pcm, Devices};
use crate::error::{Result, SeqError};
use crate::hw::controller::Pad;
use crate::hw::{Coprocessor, Display, PsgPort, Sram};
use crate::pipeline::kit::{KitLayout, KIT_ROM_ADDRESS};
use crate::pipeline::persistence::{self, ChecksumPolicy};
use crate::pipeline::project::{FmLevelShape, Project, SequencerState};
use crate::shared::{Button, FrameReport};
use crate::transport::{Transport, PLAY_CHORD};
use crate::tui::screen::{Ui, UiAction};

/// The build options the sequencer runs with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Setup {
    pub kit: KitLayout,
    /// Bytes of sample data behind the kit.
    pub kit_len: usize,
    pub shape: FmLevelShape,
    pub checksum: ChecksumPolicy,
    pub psg_level: u8,
}

impl Setup {
    pub fn from_config(config: &Config, kit_len: usize) -> Self {
        Self {
            kit: config.kit_layout,
            kit_len,
            shape: config.fm_levels,
            checksum: config.checksum,
            psg_level: config.psg_step_level,
        }
    }
}

pub struct Middle<C: Coprocessor, P: PsgPort, S: Sram> {
    devices: Devices<C, P>,
    sram: S,
    transport: Transport,
    ui: Ui,
    pad: Pad,
    shape: FmLevelShape,
}

impl<C: Coprocessor, P: PsgPort, S: Sram> Middle<C, P, S> {
    /// Reset the voices, point the PCM driver at the kit, load or create the saved
    /// project and upload its FM voice.
    pub fn boot(mut devices: Devices<C, P>, mut sram: S, setup: Setup) -> Result<Self> {
        devices.init()?;
        pcm::select_bank(&mut devices.bus, KIT_ROM_ADDRESS)?;

        let gate_max = setup.kit.slots();
        let (project, status) = persistence::boot(&mut sram, setup.checksum, gate_max)?;
        devices.apply_instrument(&project.instrument, setup.shape)?;

        let mut ui = Ui::new(setup.shape, gate_max);
        ui.set_status(status.text());
        info!(status = status.text(), kit = ?setup.kit, kit_len = setup.kit_len, "booted");

        Ok(Self {
            devices,
            sram,
            transport: Transport::new(SequencerState::new(project), setup.kit, setup.kit_len, setup.psg_level),
            ui,
            pad: Pad::default(),
            shape: setup.shape,
        })
    }

    pub fn state(&self) -> &SequencerState {
        self.transport.state()
    }

    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    pub fn devices(&self) -> &Devices<C, P> {
        &self.devices
    }

    pub fn sram_mut(&mut self) -> &mut S {
        &mut self.sram
    }

    pub fn into_sram(self) -> S {
        self.sram
    }

    /// One video frame. `buttons` is this frame's decoded pad byte.
    pub fn frame<D: Display>(&mut self, buttons: u8, display: &mut D) -> FrameReport {
        self.pad.update(buttons);
        let pad = self.pad;
        let mut report = FrameReport::default();

        // the chord belongs to the transport, its buttons don't edit while both are down
        let chord_held = PLAY_CHORD.iter().all(|b| pad.is_pressed(*b));
        for button in pad.presses() {
            if chord_held && PLAY_CHORD.contains(&button) {
                continue;
            }
            let action = self.ui.handle_input(button, self.transport.state_mut());
            report.saved |= self.apply(action);
        }

        match self.transport.run_frame(&pad, &mut self.devices) {
            Ok(tick) => {
                report.toggled = tick.toggled;
                report.dispatched = tick.dispatched;
            }
            Err(e) => self.ui.set_status(e.status_text()),
        }
        if let Some(playing) = report.toggled {
            self.ui.set_status(if playing { "playing" } else { "stopped" });
        }

        let level = match pcm::output_level(&mut self.devices.bus) {
            Ok(level) => level,
            Err(e) => {
                debug!("no level this frame: {e}");
                0
            }
        };
        self.ui.render(self.transport.state(), level, display);
        report
    }

    fn apply(&mut self, action: UiAction) -> bool {
        match action {
            UiAction::None => false,
            UiAction::Edited => self.write_through(),
            UiAction::InstrumentEdited => {
                let saved = self.write_through();
                self.upload_instrument();
                saved
            }
            UiAction::Save => {
                let saved = self.write_through();
                if saved {
                    self.ui.set_status("saved");
                }
                saved
            }
            UiAction::Reset => {
                self.transport.state_mut().project = Project::default();
                let saved = self.write_through();
                self.upload_instrument();
                if saved {
                    self.ui.set_status("defaults restored");
                }
                info!("project reset to defaults");
                saved
            }
        }
    }

    fn write_through(&mut self) -> bool {
        match persistence::save(&mut self.sram, &self.transport.state().project) {
            Ok(()) => true,
            Err(e) => {
                self.report_error(&e);
                false
            }
        }
    }

    fn upload_instrument(&mut self) {
        let instrument = self.transport.state().project.instrument;
        if let Err(e) = self.devices.apply_instrument(&instrument, self.shape) {
            self.report_error(&e);
        }
    }

    fn report_error(&mut self, e: &SeqError) {
        if e.is_fatal() {
            error!("{e}");
        } else {
            warn!("{e}");
        }
        self.ui.set_status(e.status_text());
    }
}

/// The pad byte with only `buttons` held.
pub fn buttons_mask(buttons: &[Button]) -> u8 {
    buttons.iter().fold(0, |mask, b| mask | b.mask())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::fm::REG_FB_ALG;
    use crate::devices::psg::Psg;
    use crate::hw::Bus;
    use crate::hw::sim::{FileSram, PsgTap, SimZ80};
    use crate::pipeline::kit::KIT_BANK;
    use crate::pipeline::persistence::BootStatus;
    use crate::shared::SCREEN_H;
    use crate::tui::screen::{PcmColumn, Screen};
    use crate::tui::vdp::TextVdp;

    type TestMiddle = Middle<SimZ80, PsgTap, FileSram>;

    fn setup() -> Setup {
        Setup {
            kit: KitLayout::Split,
            kit_len: 0x4000,
            shape: FmLevelShape::Full,
            checksum: ChecksumPolicy::Strict,
            psg_level: 5,
        }
    }

    fn devices() -> Devices<SimZ80, PsgTap> {
        Devices::new(Bus::new(SimZ80::new(), 8, 16), Psg::new(PsgTap::new()))
    }

    fn boot(sram: FileSram) -> TestMiddle {
        Middle::boot(devices(), sram, setup()).unwrap()
    }

    fn screen_has(vdp: &TextVdp, text: &str) -> bool {
        (0..SCREEN_H).any(|y| vdp.row_text(y).contains(text))
    }

    #[test]
    fn blank_sram_boots_with_defaults_saved() {
        let mut m = boot(FileSram::in_memory());
        assert_eq!(m.ui().status(), BootStatus::Fresh.text());
        assert_eq!(m.state().project, Project::default());
        assert!(!m.state().playing);

        let saved = persistence::load(m.sram_mut(), ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(saved, Project::default());

        let chip = m.devices().bus.chip();
        assert_eq!(chip.bank(), KIT_BANK);
        assert_eq!(chip.ym().reg(0, REG_FB_ALG) & 0x07, 6);
        assert_eq!(chip.stats().violations, 0);
    }

    #[test]
    fn edits_are_written_through() {
        let mut m = boot(FileSram::in_memory());
        let mut vdp = TextVdp::new();
        let report = m.frame(Button::Right.mask(), &mut vdp);
        assert!(report.saved);
        assert_eq!(m.state().project.pattern.steps[0].gate, 2);

        let saved = persistence::load(m.sram_mut(), ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(saved.pattern.steps[0].gate, 2);

        // held, not pressed again
        assert!(!m.frame(Button::Right.mask(), &mut vdp).saved);
    }

    #[test]
    fn saved_project_survives_a_reboot() {
        let mut m = boot(FileSram::in_memory());
        let mut vdp = TextVdp::new();
        m.frame(Button::Down.mask(), &mut vdp);
        m.frame(0, &mut vdp);
        m.frame(Button::Right.mask(), &mut vdp);

        let m = boot(m.into_sram());
        assert_eq!(m.ui().status(), BootStatus::Loaded.text());
        assert_eq!(m.state().project.pattern.steps[1].gate, 1);
    }

    #[test]
    fn start_saves_and_says_so() {
        let mut m = boot(FileSram::in_memory());
        let mut vdp = TextVdp::new();
        assert!(m.frame(Button::Start.mask(), &mut vdp).saved);
        assert_eq!(m.ui().status(), "saved");
        assert!(screen_has(&vdp, "saved"));
    }

    #[test]
    fn chord_plays_without_editing() {
        let mut m = boot(FileSram::in_memory());
        let mut vdp = TextVdp::new();
        let chord = buttons_mask(&PLAY_CHORD);

        let report = m.frame(chord, &mut vdp);
        assert_eq!(report.toggled, Some(true));
        assert!(!report.saved);
        assert_eq!(m.ui().status(), "playing");
        assert_eq!(m.ui().screen(), Screen::PcmSeq { column: PcmColumn::Gate });
        assert_eq!(m.ui().cursor(), 0);

        // tempo 10, the chord landed on frame 1
        let dispatched: Vec<u8> = (0..10).filter_map(|_| m.frame(0, &mut vdp).dispatched).collect();
        assert_eq!(dispatched, vec![0]);

        assert_eq!(m.frame(chord, &mut vdp).toggled, Some(false));
        assert_eq!(m.ui().status(), "stopped");
        assert_eq!(m.state().step_position, 0);
    }

    #[test]
    fn reset_wipes_only_after_confirming() {
        let mut m = boot(FileSram::in_memory());
        let mut vdp = TextVdp::new();
        let mut tap = |m: &mut TestMiddle, button: Button| {
            let report = m.frame(button.mask(), &mut vdp);
            m.frame(0, &mut vdp);
            report
        };
        tap(&mut m, Button::Right);
        assert_eq!(m.state().project.pattern.steps[0].gate, 2);
        for _ in 0..4 {
            tap(&mut m, Button::B);
        }
        tap(&mut m, Button::Up);

        assert!(!tap(&mut m, Button::Right).saved);
        assert_eq!(m.state().project.pattern.steps[0].gate, 2);
        assert_eq!(m.ui().status(), "press again to reset");

        assert!(tap(&mut m, Button::Right).saved);
        assert_eq!(m.state().project, Project::default());
        assert_eq!(m.ui().status(), "defaults restored");
        let saved = persistence::load(m.sram_mut(), ChecksumPolicy::Strict, 2).unwrap();
        assert_eq!(saved, Project::default());
    }

    #[test]
    fn frame_draws_the_screen() {
        let mut m = boot(FileSram::in_memory());
        let mut vdp = TextVdp::new();
        m.frame(0, &mut vdp);
        assert!(screen_has(&vdp, "PCM"));
        assert!(screen_has(&vdp, BootStatus::Fresh.text()));
    }

    #[test]
    fn boot_fails_when_the_bus_never_comes() {
        let mut z80 = SimZ80::new();
        z80.set_grant_latency(100);
        let dev = Devices::new(Bus::new(z80, 10, 16), Psg::new(PsgTap::new()));
        match Middle::boot(dev, FileSram::in_memory(), setup()) {
            Err(SeqError::BusTimeout { polls }) => assert_eq!(polls, 10),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("boot should not succeed"),
        }
    }
}
