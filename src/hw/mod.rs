// Everything the sequencer touches on the console goes through these traits.

pub mod controller;
pub mod sim;

use tracing::trace;

use crate::error::{Result, SeqError};
use crate::shared::Plane;

/// Reads and writes are only legal between a granted request and the release.
pub trait Coprocessor {
    fn request_bus(&mut self);
    fn bus_granted(&mut self) -> bool;
    fn release_bus(&mut self);
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

pub trait PsgPort {
    fn write(&mut self, byte: u8);
}

// addressed by physical byte offset
pub trait Sram {
    fn unlock(&mut self);
    fn lock(&mut self);
    fn read(&mut self, offset: usize) -> u8;
    fn write(&mut self, offset: usize, value: u8);

    fn commit(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub trait Display {
    fn draw_text(&mut self, plane: Plane, text: &str, x: u16, y: u16);
    fn clear_region(&mut self, plane: Plane, x: u16, y: u16, width: u16);
    // rgb is 0x0BGR
    fn set_palette_entry(&mut self, index: u8, rgb: u16);
    fn load_tile(&mut self, bitmap: &[u32; 8], slot: u16);
    fn set_tile(&mut self, plane: Plane, slot: u16, x: u16, y: u16);
}

// Some(failed polls) once `ready` says yes, None after `max_polls` tries.
pub fn spin_until(max_polls: u32, mut ready: impl FnMut() -> bool) -> Option<u32> {
    for n in 0..max_polls {
        if ready() {
            return Some(n);
        }
        std::hint::spin_loop();
    }
    None
}

pub struct Bus<C: Coprocessor> {
    chip: C,
    grant_polls: u32,
    fm_busy_polls: u32,
}

impl<C: Coprocessor> Bus<C> {
    pub fn new(chip: C, grant_polls: u32, fm_busy_polls: u32) -> Self {
        Self {
            chip,
            grant_polls: grant_polls.max(1),
            fm_busy_polls: fm_busy_polls.max(1),
        }
    }

    // released when the hold drops
    pub fn hold(&mut self) -> Result<BusHold<'_, C>> {
        let polls = self.grant_polls;
        self.chip.request_bus();
        match spin_until(polls, || self.chip.bus_granted()) {
            Some(waited) => {
                trace!(waited, "bus granted");
                Ok(BusHold {
                    chip: &mut self.chip,
                    fm_busy_polls: self.fm_busy_polls,
                })
            }
            None => {
                self.chip.release_bus();
                Err(SeqError::BusTimeout { polls })
            }
        }
    }

    pub fn chip(&self) -> &C {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }
}

/// A granted bus. Never keep one across a frame.
pub struct BusHold<'a, C: Coprocessor> {
    chip: &'a mut C,
    fm_busy_polls: u32,
}

impl<C: Coprocessor> BusHold<'_, C> {
    pub fn read(&mut self, addr: u16) -> u8 {
        self.chip.read(addr)
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.chip.write(addr, value);
    }

    pub fn fm_busy_polls(&self) -> u32 {
        self.fm_busy_polls
    }
}

impl<C: Coprocessor> Drop for BusHold<'_, C> {
    fn drop(&mut self) {
        self.chip.release_bus();
    }
}
