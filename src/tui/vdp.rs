// Two character-cell planes in place of the VDP's. view.rs turns the cells into spans.

use std::collections::HashMap;

use crate::hw::Display;
use crate::shared::{Plane, SCREEN_H, SCREEN_W};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cell {
    #[default]
    Empty,
    Char(char),
    Tile(u16),
}

pub struct TextVdp {
    planes: [Vec<Cell>; 2],
    palette: [u16; 16],
    tiles: HashMap<u16, [u32; 8]>,
}

impl Default for TextVdp {
    fn default() -> Self {
        Self::new()
    }
}

fn plane_index(plane: Plane) -> usize {
    match plane {
        Plane::A => 0,
        Plane::B => 1,
    }
}

fn cell_index(x: u16, y: u16) -> Option<usize> {
    (x < SCREEN_W && y < SCREEN_H).then(|| usize::from(y) * usize::from(SCREEN_W) + usize::from(x))
}

impl TextVdp {
    pub fn new() -> Self {
        let cells = usize::from(SCREEN_W) * usize::from(SCREEN_H);
        Self {
            planes: [vec![Cell::Empty; cells], vec![Cell::Empty; cells]],
            palette: [0; 16],
            tiles: HashMap::new(),
        }
    }

    pub fn cell(&self, plane: Plane, x: u16, y: u16) -> Cell {
        cell_index(x, y).map_or(Cell::Empty, |i| self.planes[plane_index(plane)][i])
    }

    pub fn row_text(&self, y: u16) -> String {
        (0..SCREEN_W)
            .map(|x| match self.cell(Plane::A, x, y) {
                Cell::Char(c) => c,
                _ => ' ',
            })
            .collect()
    }

    pub fn palette(&self, index: u8) -> u16 {
        self.palette[usize::from(index & 0x0F)]
    }

    // colour of the pixel in the middle of the tile
    pub fn tile_colour(&self, slot: u16) -> Option<u16> {
        let bitmap = self.tiles.get(&slot)?;
        let pixel = (bitmap[3] >> 16) & 0x0F;
        Some(self.palette(pixel as u8))
    }
}

impl Display for TextVdp {
    fn draw_text(&mut self, plane: Plane, text: &str, x: u16, y: u16) {
        let cells = &mut self.planes[plane_index(plane)];
        for (i, c) in text.chars().enumerate() {
            match cell_index(x.saturating_add(i as u16), y) {
                Some(at) => cells[at] = Cell::Char(c),
                None => break,
            }
        }
    }

    fn clear_region(&mut self, plane: Plane, x: u16, y: u16, width: u16) {
        let cells = &mut self.planes[plane_index(plane)];
        for dx in 0..width {
            if let Some(at) = cell_index(x.saturating_add(dx), y) {
                cells[at] = Cell::Empty;
            }
        }
    }

    fn set_palette_entry(&mut self, index: u8, rgb: u16) {
        self.palette[usize::from(index & 0x0F)] = rgb & 0x0EEE;
    }

    fn load_tile(&mut self, bitmap: &[u32; 8], slot: u16) {
        self.tiles.insert(slot, *bitmap);
    }

    fn set_tile(&mut self, plane: Plane, slot: u16, x: u16, y: u16) {
        if let Some(at) = cell_index(x, y) {
            self.planes[plane_index(plane)][at] = Cell::Tile(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_clipped_at_the_right_edge() {
        let mut vdp = TextVdp::new();
        vdp.draw_text(Plane::A, "PCM!", SCREEN_W - 3, 0);
        assert_eq!(&vdp.row_text(0)[37..], "PCM");
        assert_eq!(vdp.cell(Plane::A, 0, 1), Cell::Empty);
    }

    #[test]
    fn clear_only_touches_its_plane() {
        let mut vdp = TextVdp::new();
        vdp.draw_text(Plane::A, "hello", 2, 5);
        vdp.set_tile(Plane::B, 7, 3, 5);
        vdp.clear_region(Plane::A, 2, 5, 3);
        assert_eq!(vdp.row_text(5).trim(), "lo");
        assert_eq!(vdp.cell(Plane::B, 3, 5), Cell::Tile(7));
    }

    #[test]
    fn tile_colour_comes_from_the_palette() {
        let mut vdp = TextVdp::new();
        vdp.set_palette_entry(10, 0x0C00);
        vdp.load_tile(&[0x789a_a987; 8], 102);
        assert_eq!(vdp.tile_colour(102), Some(0x0C00));
        assert_eq!(vdp.tile_colour(5), None);
    }
}
