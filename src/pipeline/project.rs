// The pattern store: everything the record persists, plus the transport's live position.

use serde::{Deserialize, Serialize};

use crate::pitch::{FM_NOTE_MAX, PSG_NOTE_MAX};
use crate::shared::STEPS_PER_PATTERN;

pub const FM_CHANNELS: usize = 6;
pub const FM_OPERATORS: usize = 4;

pub const DEFAULT_TEMPO: u8 = 10;
pub const TEMPO_MIN: u8 = 1;
pub const SPEED_MIN: u8 = 1;

/// fm_note value that keys the channel off.
pub const FM_NOTE_OFF: i8 = -1;

// Boot pattern: one hit on the first step, accents on the beat, a falling speed sweep
// and a short riff on both tone voices.
const DEFAULT_GATE: [u8; STEPS_PER_PATTERN] = [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
const DEFAULT_ACCENT: [u8; STEPS_PER_PATTERN] = [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0];
const DEFAULT_SPEED: [u8; STEPS_PER_PATTERN] = [20, 21, 22, 30, 29, 28, 10, 12, 14, 15, 13, 11, 9, 8, 7, 6];
const DEFAULT_NOTES: [u8; STEPS_PER_PATTERN] = [20, 0, 22, 0, 29, 28, 0, 0, 14, 15, 0, 11, 0, 0, 7, 6];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub gate: u8,       // 0 = silent, otherwise the kit slot
    pub accent: bool,
    pub speed: u8,      // PCM rate divisor, never 0
    pub psg_note: u8,   // 0 = silent
    pub fm_note: i8,    // -1 = note off, 0 = hold, >0 = note on
}

/// Which value of a step an edit goes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepField {
    Gate,
    Accent,
    Speed,
    PsgNote,
    FmNote,
}

impl Step {
    /// Move a field by `delta`, clamped to its range. `gate_max` is the kit's slot count.
    /// Returns true if the value changed.
    pub fn nudge(&mut self, field: StepField, delta: i16, gate_max: u8) -> bool {
        let before = *self;
        match field {
            StepField::Gate => self.gate = nudge_u8(self.gate, delta, 0, gate_max),
            StepField::Accent => self.accent = nudge_u8(u8::from(self.accent), delta, 0, 1) == 1,
            StepField::Speed => self.speed = nudge_u8(self.speed, delta, SPEED_MIN, u8::MAX),
            StepField::PsgNote => self.psg_note = nudge_u8(self.psg_note, delta, 0, PSG_NOTE_MAX),
            StepField::FmNote => {
                self.fm_note = (i16::from(self.fm_note) + delta).clamp(i16::from(FM_NOTE_OFF), i16::from(FM_NOTE_MAX as i8)) as i8
            }
        }
        *self != before
    }

    pub fn get(&self, field: StepField) -> i16 {
        match field {
            StepField::Gate => i16::from(self.gate),
            StepField::Accent => i16::from(u8::from(self.accent)),
            StepField::Speed => i16::from(self.speed),
            StepField::PsgNote => i16::from(self.psg_note),
            StepField::FmNote => i16::from(self.fm_note),
        }
    }

    /// Pull every field back into range.
    pub fn clamped(self, gate_max: u8) -> Self {
        Self {
            gate: self.gate.min(gate_max),
            accent: self.accent,
            speed: self.speed.max(SPEED_MIN),
            psg_note: self.psg_note.min(PSG_NOTE_MAX),
            fm_note: self.fm_note.clamp(FM_NOTE_OFF, FM_NOTE_MAX as i8),
        }
    }
}

fn nudge_u8(value: u8, delta: i16, min: u8, max: u8) -> u8 {
    (i16::from(value) + delta).clamp(i16::from(min), i16::from(max)) as u8
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    pub steps: [Step; STEPS_PER_PATTERN],
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            steps: std::array::from_fn(|i| Step {
                gate: DEFAULT_GATE[i],
                accent: DEFAULT_ACCENT[i] == 1,
                speed: DEFAULT_SPEED[i],
                psg_note: DEFAULT_NOTES[i],
                fm_note: DEFAULT_NOTES[i] as i8,
            }),
        }
    }
}

impl Pattern {
    // indices wrap, there is no step 16
    pub fn step(&self, index: usize) -> &Step {
        &self.steps[index % STEPS_PER_PATTERN]
    }

    pub fn step_mut(&mut self, index: usize) -> &mut Step {
        &mut self.steps[index % STEPS_PER_PATTERN]
    }
}

/// How many operator levels the instrument screen edits and the chip receives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FmLevelShape {
    /// Four levels, channel 0's, shared by every channel.
    Carrier,
    /// A level per operator per channel.
    #[default]
    Full,
}

impl FmLevelShape {
    pub fn channels(self) -> usize {
        match self {
            FmLevelShape::Carrier => 1,
            FmLevelShape::Full => FM_CHANNELS,
        }
    }
}

/// One FM voice. Field widths are the register widths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instrument {
    pub lfo_enable: bool,
    pub lfo_speed: u8,  // 0..7
    pub detune: u8,     // 0..7
    pub multiplier: u8, // 0..15
    pub attack: u8,     // 0..31
    pub release: u8,    // 0..15
    pub sustain: u8,    // 0..15
    pub decay: u8,      // 0..31
    pub am: bool,
    pub feedback: u8,   // 0..7
    pub algorithm: u8,  // 0..7
    pub pan: u8,        // 0..3, bit 1 left, bit 0 right
    pub ams: u8,        // 0..3
    pub fms: u8,        // 0..7
    /// Total level per channel and logical operator, 0 loudest, 127 off.
    pub levels: [[u8; FM_OPERATORS]; FM_CHANNELS],
}

impl Default for Instrument {
    // algorithm 6 with OP2 as the audible modulated carrier
    fn default() -> Self {
        Self {
            lfo_enable: false,
            lfo_speed: 0,
            detune: 5,
            multiplier: 2,
            attack: 31,
            release: 15,
            sustain: 0,
            decay: 0,
            am: false,
            feedback: 0,
            algorithm: 6,
            pan: 3,
            ams: 3,
            fms: 5,
            levels: [[0x7F, 0x0A, 0x7F, 0x00]; FM_CHANNELS],
        }
    }
}

impl Instrument {
    pub fn get(&self, param: InstrumentParam) -> u8 {
        match param {
            InstrumentParam::LfoEnable => u8::from(self.lfo_enable),
            InstrumentParam::LfoSpeed => self.lfo_speed,
            InstrumentParam::Detune => self.detune,
            InstrumentParam::Multiplier => self.multiplier,
            InstrumentParam::Attack => self.attack,
            InstrumentParam::Release => self.release,
            InstrumentParam::Sustain => self.sustain,
            InstrumentParam::Decay => self.decay,
            InstrumentParam::Am => u8::from(self.am),
            InstrumentParam::Feedback => self.feedback,
            InstrumentParam::Algorithm => self.algorithm,
            InstrumentParam::Pan => self.pan,
            InstrumentParam::Ams => self.ams,
            InstrumentParam::Fms => self.fms,
            InstrumentParam::Level { channel, operator } => self.levels[channel % FM_CHANNELS][operator % FM_OPERATORS],
        }
    }

    /// Store `value` clamped to the parameter's range.
    pub fn set(&mut self, param: InstrumentParam, value: u8) {
        let value = value.min(param.max());
        match param {
            InstrumentParam::LfoEnable => self.lfo_enable = value == 1,
            InstrumentParam::LfoSpeed => self.lfo_speed = value,
            InstrumentParam::Detune => self.detune = value,
            InstrumentParam::Multiplier => self.multiplier = value,
            InstrumentParam::Attack => self.attack = value,
            InstrumentParam::Release => self.release = value,
            InstrumentParam::Sustain => self.sustain = value,
            InstrumentParam::Decay => self.decay = value,
            InstrumentParam::Am => self.am = value == 1,
            InstrumentParam::Feedback => self.feedback = value,
            InstrumentParam::Algorithm => self.algorithm = value,
            InstrumentParam::Pan => self.pan = value,
            InstrumentParam::Ams => self.ams = value,
            InstrumentParam::Fms => self.fms = value,
            InstrumentParam::Level { channel, operator } => self.levels[channel % FM_CHANNELS][operator % FM_OPERATORS] = value,
        }
    }

    pub fn nudge(&mut self, param: InstrumentParam, delta: i16) -> bool {
        let before = self.get(param);
        let after = nudge_u8(before, delta, 0, param.max());
        self.set(param, after);
        after != before
    }

    /// Every field pulled back into its register width.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for param in InstrumentParam::list(FmLevelShape::Full) {
            out.set(param, self.get(param));
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstrumentParam {
    LfoEnable,
    LfoSpeed,
    Detune,
    Multiplier,
    Attack,
    Release,
    Sustain,
    Decay,
    Am,
    Feedback,
    Algorithm,
    Pan,
    Ams,
    Fms,
    Level { channel: usize, operator: usize },
}

impl InstrumentParam {
    pub const SCALARS: [InstrumentParam; 14] = [
        InstrumentParam::LfoEnable,
        InstrumentParam::LfoSpeed,
        InstrumentParam::Detune,
        InstrumentParam::Multiplier,
        InstrumentParam::Attack,
        InstrumentParam::Release,
        InstrumentParam::Sustain,
        InstrumentParam::Decay,
        InstrumentParam::Am,
        InstrumentParam::Feedback,
        InstrumentParam::Algorithm,
        InstrumentParam::Pan,
        InstrumentParam::Ams,
        InstrumentParam::Fms,
    ];

    /// Scalars first, then the levels the shape exposes, channel-major.
    pub fn list(shape: FmLevelShape) -> Vec<InstrumentParam> {
        let levels = (0..shape.channels())
            .flat_map(|channel| (0..FM_OPERATORS).map(move |operator| InstrumentParam::Level { channel, operator }));
        Self::SCALARS.into_iter().chain(levels).collect()
    }

    pub fn max(self) -> u8 {
        match self {
            InstrumentParam::LfoEnable | InstrumentParam::Am => 1,
            InstrumentParam::Pan | InstrumentParam::Ams => 3,
            InstrumentParam::LfoSpeed
            | InstrumentParam::Detune
            | InstrumentParam::Feedback
            | InstrumentParam::Algorithm
            | InstrumentParam::Fms => 7,
            InstrumentParam::Multiplier | InstrumentParam::Release | InstrumentParam::Sustain => 15,
            InstrumentParam::Attack | InstrumentParam::Decay => 31,
            InstrumentParam::Level { .. } => 127,
        }
    }

    pub fn label(self) -> String {
        match self {
            InstrumentParam::LfoEnable => "LFO ON".into(),
            InstrumentParam::LfoSpeed => "LFO SPD".into(),
            InstrumentParam::Detune => "DETUNE".into(),
            InstrumentParam::Multiplier => "MULT".into(),
            InstrumentParam::Attack => "ATTACK".into(),
            InstrumentParam::Release => "RELEASE".into(),
            InstrumentParam::Sustain => "SUSTAIN".into(),
            InstrumentParam::Decay => "DECAY".into(),
            InstrumentParam::Am => "AM".into(),
            InstrumentParam::Feedback => "FEEDBK".into(),
            InstrumentParam::Algorithm => "ALGO".into(),
            InstrumentParam::Pan => "PAN".into(),
            InstrumentParam::Ams => "AMS".into(),
            InstrumentParam::Fms => "FMS".into(),
            InstrumentParam::Level { channel, operator } => format!("LVL {}.{}", channel, operator + 1),
        }
    }
}

/// What a record holds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub tempo: u8, // frames per step
    pub instrument: Instrument,
    pub pattern: Pattern,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            tempo: DEFAULT_TEMPO,
            instrument: Instrument::default(),
            pattern: Pattern::default(),
        }
    }
}

impl Project {
    pub fn nudge_tempo(&mut self, delta: i16) -> bool {
        let before = self.tempo;
        self.tempo = nudge_u8(self.tempo, delta, TEMPO_MIN, u8::MAX);
        self.tempo != before
    }
}

/// The live session: the project plus where the transport is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequencerState {
    pub project: Project,
    pub step_position: u8,
    pub playing: bool,
}

impl SequencerState {
    pub fn new(project: Project) -> Self {
        Self { project, step_position: 0, playing: false }
    }

    pub fn current_step(&self) -> &Step {
        self.project.pattern.step(usize::from(self.step_position))
    }
}
