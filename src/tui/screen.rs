//! The five editing screens.
//!
//! B cycles screens, Up/Down move the selection, A/C change column or parameter, Left/Right
//! change the selected value and Start saves. Each screen redraws itself in full every frame.

use crate::hw::Display;
use crate::pipeline::project::{FmLevelShape, InstrumentParam, SequencerState, StepField};
use crate::shared::{Button, Plane, METER_ROW, SCREEN_H, SCREEN_W, STATUS_ROW, STEPS_PER_PATTERN, TILE_BLANK, TILE_FILL, TILE_GRADIENT};

const BLANK_TILE: [u32; 8] = [0x1111_1111; 8];
const FILL_TILE: [u32; 8] = [
    0x3333_3333,
    0x4444_4444,
    0x5555_5555,
    0x6666_6666,
    0x6666_6666,
    0x5555_5555,
    0x4444_4444,
    0x3333_3333,
];
const GRADIENT_TILE: [u32; 8] = [0x789a_a987; 8];

const PALETTE: [(u8, u16); 10] = [
    (0, 0x0888), // background
    (1, 0x0222),
    (3, 0x0040), // meter
    (4, 0x0060),
    (5, 0x0080),
    (6, 0x00A0),
    (7, 0x0600), // backdrop gradient
    (8, 0x0800),
    (9, 0x0A00),
    (10, 0x0C00),
];

const METER_CELLS: u16 = 38;
const STEP_X: u16 = 3;
const VALUE_X: u16 = 12;

/// Palette, tiles and the backdrop. Once at boot.
pub fn load_assets<D: Display>(display: &mut D) {
    for (index, rgb) in PALETTE {
        display.set_palette_entry(index, rgb);
    }
    display.load_tile(&BLANK_TILE, TILE_BLANK);
    display.load_tile(&FILL_TILE, TILE_FILL);
    display.load_tile(&GRADIENT_TILE, TILE_GRADIENT);
    for y in 0..SCREEN_H {
        for x in 0..SCREEN_W {
            display.set_tile(Plane::B, TILE_GRADIENT, x, y);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcmColumn {
    Gate,
    Accent,
    Speed,
}

impl PcmColumn {
    const ALL: [PcmColumn; 3] = [PcmColumn::Gate, PcmColumn::Accent, PcmColumn::Speed];

    fn field(self) -> StepField {
        match self {
            PcmColumn::Gate => StepField::Gate,
            PcmColumn::Accent => StepField::Accent,
            PcmColumn::Speed => StepField::Speed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectItem {
    Tempo,
    Save,
    Reset,
}

impl ProjectItem {
    const ALL: [ProjectItem; 3] = [ProjectItem::Tempo, ProjectItem::Save, ProjectItem::Reset];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    PcmSeq { column: PcmColumn },
    PsgSeq,
    FmSeq,
    FmInst { param: usize },
    Project { item: ProjectItem },
}

/// What the middle layer has to do after an input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiAction {
    None,
    /// Pattern or tempo changed: write through.
    Edited,
    /// Write through and upload the voice.
    InstrumentEdited,
    Save,
    Reset,
}

// one column of a step grid: x, width and the field it shows
struct Column {
    x: u16,
    width: u16,
    field: StepField,
}

const PCM_COLUMNS: [Column; 3] = [
    Column { x: 6, width: 2, field: StepField::Gate },
    Column { x: 9, width: 2, field: StepField::Accent },
    Column { x: 12, width: 2, field: StepField::Speed },
];
const PSG_COLUMNS: [Column; 1] = [Column { x: 6, width: 2, field: StepField::PsgNote }];
const FM_COLUMNS: [Column; 1] = [Column { x: 6, width: 3, field: StepField::FmNote }];

fn format_field(field: StepField, value: i16) -> String {
    match field {
        StepField::Speed => format!("{value:02X}"),
        StepField::FmNote if value < 0 => "OFF".into(),
        StepField::FmNote => format!("{value:3}"),
        _ => format!("{value:02}"),
    }
}

fn wrap(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta).rem_euclid(len as isize) as usize
}

impl Screen {
    pub fn next(self) -> Screen {
        match self {
            Screen::PcmSeq { .. } => Screen::PsgSeq,
            Screen::PsgSeq => Screen::FmSeq,
            Screen::FmSeq => Screen::FmInst { param: 0 },
            Screen::FmInst { .. } => Screen::Project { item: ProjectItem::Tempo },
            Screen::Project { .. } => Screen::PcmSeq { column: PcmColumn::Gate },
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Screen::PcmSeq { .. } => "PCM",
            Screen::PsgSeq => "PSG",
            Screen::FmSeq => "YMF",
            Screen::FmInst { .. } => "INS",
            Screen::Project { .. } => "PRJ",
        }
    }

    fn columns(self) -> &'static [Column] {
        match self {
            Screen::PcmSeq { .. } => &PCM_COLUMNS,
            Screen::PsgSeq => &PSG_COLUMNS,
            Screen::FmSeq => &FM_COLUMNS,
            _ => &[],
        }
    }

    fn selected_field(self) -> Option<StepField> {
        match self {
            Screen::PcmSeq { column } => Some(column.field()),
            Screen::PsgSeq => Some(StepField::PsgNote),
            Screen::FmSeq => Some(StepField::FmNote),
            _ => None,
        }
    }

    // A/C and Up/Down on the screens that have a list of their own
    fn move_selection(&mut self, delta: isize, shape: FmLevelShape) {
        match self {
            Screen::PcmSeq { column } => {
                let at = PcmColumn::ALL.iter().position(|c| c == column).unwrap_or(0);
                *column = PcmColumn::ALL[wrap(at, delta, PcmColumn::ALL.len())];
            }
            Screen::FmInst { param } => *param = wrap(*param, delta, InstrumentParam::list(shape).len()),
            Screen::Project { item } => {
                let at = ProjectItem::ALL.iter().position(|i| i == item).unwrap_or(0);
                *item = ProjectItem::ALL[wrap(at, delta, ProjectItem::ALL.len())];
            }
            Screen::PsgSeq | Screen::FmSeq => {}
        }
    }

    fn change_value(self, delta: i16, cursor: u8, state: &mut SequencerState, ctx: &UiContext) -> UiAction {
        if let Some(field) = self.selected_field() {
            let step = state.project.pattern.step_mut(usize::from(cursor));
            return if step.nudge(field, delta, ctx.gate_max) { UiAction::Edited } else { UiAction::None };
        }
        match self {
            Screen::FmInst { param } => {
                let params = InstrumentParam::list(ctx.shape);
                match params.get(param) {
                    Some(p) if state.project.instrument.nudge(*p, delta) => UiAction::InstrumentEdited,
                    _ => UiAction::None,
                }
            }
            Screen::Project { item: ProjectItem::Tempo } => {
                if state.project.nudge_tempo(delta) { UiAction::Edited } else { UiAction::None }
            }
            Screen::Project { item: ProjectItem::Save } => UiAction::Save,
            Screen::Project { item: ProjectItem::Reset } => UiAction::Reset,
            _ => UiAction::None,
        }
    }

    fn render<D: Display>(self, state: &SequencerState, cursor: u8, ctx: &UiContext, display: &mut D) {
        display.draw_text(Plane::A, self.title(), SCREEN_W - 4, 0);
        match self {
            Screen::PcmSeq { .. } | Screen::PsgSeq | Screen::FmSeq => self.render_steps(state, cursor, display),
            Screen::FmInst { param } => render_instrument(state, param, ctx.shape, display),
            Screen::Project { item } => render_project(state, item, display),
        }
    }

    fn render_steps<D: Display>(self, state: &SequencerState, cursor: u8, display: &mut D) {
        let selected = self.selected_field();
        for (row, step) in state.project.pattern.steps.iter().enumerate() {
            let y = row as u16;
            display.draw_text(Plane::A, &format!("{row:02}"), STEP_X, y);
            for column in self.columns() {
                display.draw_text(Plane::A, &format_field(column.field, step.get(column.field)), column.x, y);
            }
        }
        // step_position is the next step to sound; while playing mark the one that just did
        let marker = if state.playing {
            (usize::from(state.step_position) + STEPS_PER_PATTERN - 1) % STEPS_PER_PATTERN
        } else {
            usize::from(state.step_position)
        };
        display.draw_text(Plane::A, "-->", 0, marker as u16);
        if let Some(column) = self.columns().iter().find(|c| Some(c.field) == selected) {
            let y = u16::from(cursor);
            display.draw_text(Plane::A, ">", column.x - 1, y);
            display.draw_text(Plane::A, "<", column.x + column.width, y);
        }
    }
}

fn render_instrument<D: Display>(state: &SequencerState, selected: usize, shape: FmLevelShape, display: &mut D) {
    let params = InstrumentParam::list(shape);
    let rows = STEPS_PER_PATTERN;
    let page = selected / rows;
    for (row, param) in params.iter().enumerate().skip(page * rows).take(rows) {
        let y = (row % rows) as u16;
        display.draw_text(Plane::A, &param.label(), STEP_X, y);
        display.draw_text(Plane::A, &format!("{:3}", state.project.instrument.get(*param)), VALUE_X, y);
        if row == selected {
            display.draw_text(Plane::A, ">", VALUE_X - 1, y);
            display.draw_text(Plane::A, "<", VALUE_X + 3, y);
        }
    }
}

fn render_project<D: Display>(state: &SequencerState, selected: ProjectItem, display: &mut D) {
    for (row, item) in ProjectItem::ALL.iter().enumerate() {
        let y = row as u16;
        let label = match item {
            ProjectItem::Tempo => "TEMPO",
            ProjectItem::Save => "SAVE",
            ProjectItem::Reset => "RESET",
        };
        display.draw_text(Plane::A, label, STEP_X, y);
        if *item == ProjectItem::Tempo {
            display.draw_text(Plane::A, &format!("{:3}", state.project.tempo), VALUE_X, y);
        }
        if *item == selected {
            display.draw_text(Plane::A, ">", STEP_X - 1, y);
            display.draw_text(Plane::A, "<", VALUE_X + 3, y);
        }
    }
}

// fixed for the session
struct UiContext {
    shape: FmLevelShape,
    gate_max: u8,
}

/// Screen selection, edit cursor and status line.
pub struct Ui {
    screen: Screen,
    cursor: u8,
    status: String,
    // first Left/Right on RESET arms it, the next one resets
    reset_armed: bool,
    ctx: UiContext,
}

impl Ui {
    pub fn new(shape: FmLevelShape, gate_max: u8) -> Self {
        Self {
            screen: Screen::PcmSeq { column: PcmColumn::Gate },
            cursor: 0,
            status: String::new(),
            reset_armed: false,
            ctx: UiContext { shape, gate_max },
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn cursor(&self) -> u8 {
        self.cursor
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = text.into();
    }

    pub fn handle_input(&mut self, button: Button, state: &mut SequencerState) -> UiAction {
        let steps = STEPS_PER_PATTERN;
        let has_steps = self.screen.selected_field().is_some();
        let armed = std::mem::take(&mut self.reset_armed);
        match button {
            Button::B => {
                self.screen = self.screen.next();
                UiAction::None
            }
            Button::Start => UiAction::Save,
            Button::Up | Button::Down => {
                let delta = if button == Button::Down { 1 } else { -1 };
                if has_steps {
                    self.cursor = wrap(usize::from(self.cursor), delta, steps) as u8;
                } else {
                    self.screen.move_selection(delta, self.ctx.shape);
                }
                UiAction::None
            }
            Button::A | Button::C => {
                self.screen.move_selection(if button == Button::A { 1 } else { -1 }, self.ctx.shape);
                UiAction::None
            }
            Button::Left | Button::Right => {
                if self.screen == (Screen::Project { item: ProjectItem::Reset }) && !armed {
                    self.reset_armed = true;
                    self.status = "press again to reset".into();
                    return UiAction::None;
                }
                let delta = if button == Button::Right { 1 } else { -1 };
                self.screen.change_value(delta, self.cursor, state, &self.ctx)
            }
        }
    }

    /// Redraw plane A: the screen, the status line and the level meter.
    pub fn render<D: Display>(&self, state: &SequencerState, level: u8, display: &mut D) {
        for y in 0..SCREEN_H {
            display.clear_region(Plane::A, 0, y, SCREEN_W);
        }
        self.screen.render(state, self.cursor, &self.ctx, display);
        display.draw_text(Plane::A, &self.status, STEP_X, STATUS_ROW);

        let lit = u16::from(level >> 4);
        for i in 0..METER_CELLS {
            let tile = if i <= lit { TILE_FILL } else { TILE_BLANK };
            display.set_tile(Plane::A, tile, i + 1, METER_ROW);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::project::{Project, FM_NOTE_OFF};
    use crate::tui::vdp::{Cell, TextVdp};

    fn state() -> SequencerState {
        SequencerState::new(Project::default())
    }

    #[test]
    fn b_cycles_all_five_screens() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        let mut titles = Vec::new();
        for _ in 0..5 {
            titles.push(ui.screen().title());
            ui.handle_input(Button::B, &mut st);
        }
        assert_eq!(titles, ["PCM", "PSG", "YMF", "INS", "PRJ"]);
        assert_eq!(ui.screen().title(), "PCM");
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        ui.handle_input(Button::Up, &mut st);
        assert_eq!(ui.cursor(), 15);
        ui.handle_input(Button::Down, &mut st);
        assert_eq!(ui.cursor(), 0);
    }

    #[test]
    fn pcm_columns_edit_their_own_field() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        ui.handle_input(Button::Down, &mut st);
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::Edited);
        assert_eq!(st.project.pattern.steps[1].gate, 1);

        ui.handle_input(Button::A, &mut st);
        ui.handle_input(Button::A, &mut st);
        assert_eq!(ui.screen(), Screen::PcmSeq { column: PcmColumn::Speed });
        ui.handle_input(Button::Left, &mut st);
        assert_eq!(st.project.pattern.steps[1].speed, 20);

        ui.handle_input(Button::C, &mut st);
        assert_eq!(ui.screen(), Screen::PcmSeq { column: PcmColumn::Accent });
    }

    #[test]
    fn clamped_edit_reports_nothing_to_save() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        st.project.pattern.steps[0].gate = 2;
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::None);
    }

    #[test]
    fn fm_screen_reaches_note_off() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        ui.handle_input(Button::B, &mut st);
        ui.handle_input(Button::B, &mut st);
        ui.handle_input(Button::Down, &mut st);
        assert_eq!(ui.handle_input(Button::Left, &mut st), UiAction::Edited);
        assert_eq!(st.project.pattern.steps[1].fm_note, FM_NOTE_OFF);
    }

    #[test]
    fn instrument_screen_walks_the_parameter_list() {
        let mut ui = Ui::new(FmLevelShape::Carrier, 2);
        let mut st = state();
        for _ in 0..3 {
            ui.handle_input(Button::B, &mut st);
        }
        ui.handle_input(Button::C, &mut st);
        assert_eq!(ui.screen(), Screen::FmInst { param: 17 });
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::InstrumentEdited);
        assert_eq!(st.project.instrument.levels[0][3], 1);
    }

    #[test]
    fn project_screen_items() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        for _ in 0..4 {
            ui.handle_input(Button::B, &mut st);
        }
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::Edited);
        assert_eq!(st.project.tempo, 11);
        ui.handle_input(Button::A, &mut st);
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::Save);
        ui.handle_input(Button::Down, &mut st);
        assert_eq!(ui.handle_input(Button::Left, &mut st), UiAction::None);
        assert_eq!(ui.handle_input(Button::Left, &mut st), UiAction::Reset);
        assert_eq!(ui.handle_input(Button::Start, &mut st), UiAction::Save);
    }

    #[test]
    fn reset_needs_a_second_press() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        for _ in 0..4 {
            ui.handle_input(Button::B, &mut st);
        }
        ui.handle_input(Button::Up, &mut st);
        assert_eq!(ui.screen(), Screen::Project { item: ProjectItem::Reset });

        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::None);
        assert_eq!(ui.status(), "press again to reset");

        // anything in between disarms it
        ui.handle_input(Button::Up, &mut st);
        ui.handle_input(Button::Down, &mut st);
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::None);
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::Reset);
        // and a reset leaves it disarmed
        assert_eq!(ui.handle_input(Button::Right, &mut st), UiAction::None);
    }

    #[test]
    fn pcm_screen_layout() {
        let ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        st.step_position = 2;
        let mut vdp = TextVdp::new();
        ui.render(&st, 0x35, &mut vdp);

        assert_eq!(&vdp.row_text(0)[..15], "   00>01<01 14 ");
        assert_eq!(&vdp.row_text(0)[36..], "PCM ");
        assert_eq!(&vdp.row_text(2)[..3], "-->");
        // 0x35 >> 4 = 3: cells 1..=4 lit
        assert_eq!(vdp.cell(Plane::A, 4, METER_ROW), Cell::Tile(TILE_FILL));
        assert_eq!(vdp.cell(Plane::A, 5, METER_ROW), Cell::Tile(TILE_BLANK));
        assert_eq!(vdp.cell(Plane::A, 38, METER_ROW), Cell::Tile(TILE_BLANK));
        assert_eq!(vdp.cell(Plane::A, 0, METER_ROW), Cell::Empty);
    }

    #[test]
    fn marker_trails_the_step_while_playing() {
        let ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        st.playing = true;
        st.step_position = 3;
        let mut vdp = TextVdp::new();
        ui.render(&st, 0, &mut vdp);
        assert_eq!(&vdp.row_text(2)[..3], "-->");
        assert_ne!(&vdp.row_text(3)[..3], "-->");

        // step 15 sounded last when the position wrapped to 0
        st.step_position = 0;
        ui.render(&st, 0, &mut vdp);
        assert_eq!(&vdp.row_text(15)[..3], "-->");
    }

    #[test]
    fn status_line_and_fm_off() {
        let mut ui = Ui::new(FmLevelShape::Full, 2);
        let mut st = state();
        st.project.pattern.steps[0].fm_note = FM_NOTE_OFF;
        ui.handle_input(Button::B, &mut st);
        ui.handle_input(Button::B, &mut st);
        ui.set_status("checksum mismatch");
        let mut vdp = TextVdp::new();
        ui.render(&st, 0, &mut vdp);
        assert_eq!(&vdp.row_text(0)[..10], "-->00>OFF<");
        assert_eq!(vdp.row_text(STATUS_ROW).trim(), "checksum mismatch");
    }

    #[test]
    fn assets_fill_the_backdrop() {
        let mut vdp = TextVdp::new();
        load_assets(&mut vdp);
        assert_eq!(vdp.cell(Plane::B, 39, 27), Cell::Tile(TILE_GRADIENT));
        assert_eq!(vdp.tile_colour(TILE_FILL), Some(0x00A0));
    }
}
