// Types every layer agrees on.
//
// The frame loop, from the top:
//   - main.rs scans the pad (tui::input) and hands the decoded byte to the middle layer
//   - middle.rs turns it into edge events, lets the screen edit the project, writes the
//     record through to SRAM, then lets the transport gate and dispatch a step
//   - the transport talks to the three sound devices through devices/*, which only ever
//     see the hw traits, so the same code drives the simulators or real registers
//   - the screen draws into a Display (40x28 cells, two planes) and the TUI shows it

pub const STEPS_PER_PATTERN: usize = 16;

// screen geometry in cells, same as the console text mode
pub const SCREEN_W: u16 = 40;
pub const SCREEN_H: u16 = 28;

// rows used outside the step grid
pub const STATUS_ROW: u16 = 18;
pub const METER_ROW: u16 = 26;

// tile slots loaded at boot
pub const TILE_BLANK: u16 = 100;
pub const TILE_FILL: u16 = 101;
pub const TILE_GRADIENT: u16 = 102;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Button {
    Right,
    Left,
    Down,
    Up,
    B,
    C,
    A,
    Start,
}

impl Button {
    pub const ALL: [Button; 8] = [
        Button::Right,
        Button::Left,
        Button::Down,
        Button::Up,
        Button::B,
        Button::C,
        Button::A,
        Button::Start,
    ];

    // bit in the decoded pad byte
    pub const fn bit(self) -> u8 {
        match self {
            Button::Right => 0,
            Button::Left => 1,
            Button::Down => 2,
            Button::Up => 3,
            Button::B => 4,
            Button::C => 5,
            Button::A => 6,
            Button::Start => 7,
        }
    }

    pub const fn mask(self) -> u8 {
        1 << self.bit()
    }
}

// The two planes of the video chip. Text goes on A, the backdrop on B.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plane {
    A,
    B,
}

/// What one frame did, for the caller to log or display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// `Some(playing)` when the play chord flipped the transport this frame.
    pub toggled: Option<bool>,
    /// The step index that was sent to the sound devices, if the tempo gate fired.
    pub dispatched: Option<u8>,
    /// True when an edit was written through to SRAM.
    pub saved: bool,
}
