//! Three-button pad: the two-phase port scan and per-frame edge detection.

use crate::shared::Button;

// data lines, active low
pub const PIN_UP: u8 = 0x01;
pub const PIN_DOWN: u8 = 0x02;
pub const PIN_LEFT: u8 = 0x04;
pub const PIN_RIGHT: u8 = 0x08;
pub const PIN_A_B: u8 = 0x10; // A with select low, B with select high
pub const PIN_SELECT: u8 = 0x40;
pub const PIN_START_C: u8 = 0x80; // Start with select low, C with select high

/// One controller port: drive the select line, read the data lines.
pub trait ControllerPort {
    fn set_select(&mut self, high: bool);
    fn read_data(&mut self) -> u8;
}

/// Read both halves of the pad and decode them into a button byte (bit = [`Button::bit`]).
pub fn scan<P: ControllerPort>(port: &mut P) -> u8 {
    port.set_select(false);
    let low = port.read_data();
    port.set_select(true);
    let high = port.read_data();
    decode(low, high)
}

/// Decode the raw select-low and select-high reads.
pub fn decode(low: u8, high: u8) -> u8 {
    let pressed = |data: u8, pin: u8| data & pin == 0;
    let mut buttons = 0;
    let mut set = |b: Button, on: bool| {
        if on {
            buttons |= b.mask();
        }
    };
    set(Button::Up, pressed(low, PIN_UP));
    set(Button::Down, pressed(low, PIN_DOWN));
    set(Button::A, pressed(low, PIN_A_B));
    set(Button::Start, pressed(low, PIN_START_C));
    set(Button::Left, pressed(high, PIN_LEFT));
    set(Button::Right, pressed(high, PIN_RIGHT));
    set(Button::B, pressed(high, PIN_A_B));
    set(Button::C, pressed(high, PIN_START_C));
    buttons
}

/// Current and previous frame's buttons.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pad {
    pub buttons: u8,
    pub buttons_last: u8,
}

impl Pad {
    pub fn update(&mut self, buttons: u8) {
        self.buttons_last = self.buttons;
        self.buttons = buttons;
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons & button.mask() != 0
    }

    pub fn was_pressed(&self, button: Button) -> bool {
        self.buttons_last & button.mask() != 0
    }

    /// True only on the frame the button went down.
    pub fn just_pressed(&self, button: Button) -> bool {
        self.is_pressed(button) && !self.was_pressed(button)
    }

    /// Every button that went down this frame, in [`Button::ALL`] order.
    pub fn presses(&self) -> impl Iterator<Item = Button> + '_ {
        Button::ALL.into_iter().filter(|b| self.just_pressed(*b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a port wired to a fixed set of held buttons
    struct Wired {
        held: u8,
        select_high: bool,
        selects: Vec<bool>,
    }

    impl ControllerPort for Wired {
        fn set_select(&mut self, high: bool) {
            self.select_high = high;
            self.selects.push(high);
        }

        fn read_data(&mut self) -> u8 {
            let on = |b: Button| self.held & b.mask() != 0;
            let mut low_active = 0;
            if on(Button::Up) {
                low_active |= PIN_UP;
            }
            if on(Button::Down) {
                low_active |= PIN_DOWN;
            }
            if self.select_high {
                if on(Button::Left) {
                    low_active |= PIN_LEFT;
                }
                if on(Button::Right) {
                    low_active |= PIN_RIGHT;
                }
                if on(Button::B) {
                    low_active |= PIN_A_B;
                }
                if on(Button::C) {
                    low_active |= PIN_START_C;
                }
            } else {
                if on(Button::A) {
                    low_active |= PIN_A_B;
                }
                if on(Button::Start) {
                    low_active |= PIN_START_C;
                }
            }
            !low_active
        }
    }

    #[test]
    fn scan_toggles_select_low_then_high() {
        let mut port = Wired { held: 0, select_high: true, selects: vec![] };
        assert_eq!(scan(&mut port), 0);
        assert_eq!(port.selects, vec![false, true]);
    }

    #[test]
    fn scan_decodes_every_button() {
        for b in Button::ALL {
            let mut port = Wired { held: b.mask(), select_high: true, selects: vec![] };
            assert_eq!(scan(&mut port), b.mask(), "{b:?}");
        }
        let all = Button::ALL.iter().fold(0, |acc, b| acc | b.mask());
        let mut port = Wired { held: all, select_high: true, selects: vec![] };
        assert_eq!(scan(&mut port), all);
    }

    #[test]
    fn held_button_fires_once() {
        let mut pad = Pad::default();
        let mut presses = 0;
        for _ in 0..30 {
            pad.update(Button::Left.mask());
            if pad.just_pressed(Button::Left) {
                presses += 1;
            }
        }
        assert_eq!(presses, 1);

        pad.update(0);
        pad.update(Button::Left.mask());
        assert!(pad.just_pressed(Button::Left));
    }

    #[test]
    fn presses_lists_only_new_buttons() {
        let mut pad = Pad::default();
        pad.update(Button::A.mask());
        pad.update(Button::A.mask() | Button::Down.mask());
        assert_eq!(pad.presses().collect::<Vec<_>>(), vec![Button::Down]);
    }
}
