use std::time::Instant;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};

use crate::hw::controller::{ControllerPort, PIN_A_B, PIN_DOWN, PIN_LEFT, PIN_RIGHT, PIN_START_C, PIN_UP};
use crate::shared::Button;

// Without release events a key counts as held for this many frames after its last press
// or auto-repeat.
const HOLD_FRAMES: u32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Hold {
    Off,
    UntilRelease,
    Frames(u32),
}

/// The keyboard, wired up like a controller port so the pad scan runs unchanged.
pub struct KeyboardPad {
    held: [Hold; 8],
    select_high: bool,
    // the terminal reports releases, so holds last until one arrives
    sees_releases: bool,
    quit: bool,
}

impl Default for KeyboardPad {
    fn default() -> Self {
        Self::new()
    }
}

fn keys_for(code: KeyCode) -> &'static [Button] {
    match code {
        KeyCode::Up => &[Button::Up],
        KeyCode::Down => &[Button::Down],
        KeyCode::Left => &[Button::Left],
        KeyCode::Right => &[Button::Right],
        KeyCode::Char('z' | 'Z') => &[Button::A],
        KeyCode::Char('x' | 'X') => &[Button::B],
        KeyCode::Char('c' | 'C') => &[Button::C],
        KeyCode::Enter => &[Button::Start],
        KeyCode::Char(' ') => &[Button::A, Button::Down], // play/stop chord
        _ => &[],
    }
}

impl KeyboardPad {
    pub fn new() -> Self {
        Self {
            held: [Hold::Off; 8],
            select_high: false,
            sees_releases: false,
            quit: false,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn is_held(&self, button: Button) -> bool {
        self.held[usize::from(button.bit())] != Hold::Off
    }

    /// Take terminal events until `deadline`.
    pub fn pump(&mut self, deadline: Instant) -> anyhow::Result<()> {
        loop {
            let timeout = deadline.saturating_duration_since(Instant::now());
            if !event::poll(timeout)? {
                return Ok(());
            }
            if let Event::Key(key) = event::read()? {
                self.handle_key(key);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.quit = true;
            return;
        }
        if key.kind == KeyEventKind::Release {
            self.sees_releases = true;
        }
        let hold = match key.kind {
            KeyEventKind::Release => Hold::Off,
            _ if self.sees_releases => Hold::UntilRelease,
            _ => Hold::Frames(HOLD_FRAMES),
        };
        for button in keys_for(key.code) {
            self.held[usize::from(button.bit())] = hold;
        }
    }

    /// Age the fallback holds. Call once per frame after the scan.
    pub fn end_frame(&mut self) {
        for hold in &mut self.held {
            if let Hold::Frames(n) = hold {
                *hold = if *n <= 1 { Hold::Off } else { Hold::Frames(*n - 1) };
            }
        }
    }
}

impl ControllerPort for KeyboardPad {
    fn set_select(&mut self, high: bool) {
        self.select_high = high;
    }

    // lines are pulled low for pressed buttons
    fn read_data(&mut self) -> u8 {
        let lines: &[(Button, u8)] = if self.select_high {
            &[
                (Button::Up, PIN_UP),
                (Button::Down, PIN_DOWN),
                (Button::Left, PIN_LEFT),
                (Button::Right, PIN_RIGHT),
                (Button::B, PIN_A_B),
                (Button::C, PIN_START_C),
            ]
        } else {
            &[
                (Button::Up, PIN_UP),
                (Button::Down, PIN_DOWN),
                (Button::A, PIN_A_B),
                (Button::Start, PIN_START_C),
            ]
        };
        lines
            .iter()
            .filter(|(button, _)| self.is_held(*button))
            .fold(0xFF, |data, (_, pin)| data & !pin)
    }
}
