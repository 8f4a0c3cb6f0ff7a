use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::shared::{Plane, SCREEN_H, SCREEN_W, TILE_BLANK, TILE_FILL};
use crate::tui::vdp::{Cell, TextVdp};

const HELP: &str = "arrows move/edit  z/c column  x screen  enter save  space play  esc quit";

/// 0x0BGR, three bits per gun.
pub fn to_color(word: u16) -> Color {
    let gun = |shift: u16| ((word >> shift) & 0x07) as u8 * 36;
    Color::Rgb(gun(1), gun(5), gun(9))
}

fn tile_glyph(slot: u16) -> char {
    match slot {
        TILE_FILL => '█',
        TILE_BLANK => '░',
        _ => '▒',
    }
}

fn cell_span(vdp: &TextVdp, x: u16, y: u16) -> Span<'static> {
    let mut style = Style::default().fg(Color::White);
    if let Cell::Tile(slot) = vdp.cell(Plane::B, x, y) {
        if let Some(word) = vdp.tile_colour(slot) {
            style = style.bg(to_color(word));
        }
    }
    match vdp.cell(Plane::A, x, y) {
        Cell::Char(c) => Span::styled(c.to_string(), style),
        Cell::Tile(slot) => {
            if let Some(word) = vdp.tile_colour(slot) {
                style = style.fg(to_color(word));
            }
            Span::styled(tile_glyph(slot).to_string(), style)
        }
        Cell::Empty => Span::styled(" ", style),
    }
}

pub fn screen_lines(vdp: &TextVdp) -> Vec<Line<'static>> {
    (0..SCREEN_H)
        .map(|y| Line::from((0..SCREEN_W).map(|x| cell_span(vdp, x, y)).collect::<Vec<_>>()))
        .collect()
}

pub fn render(frame: &mut Frame, area: Rect, vdp: &TextVdp, playing: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(SCREEN_H + 2), // screen + border
            Constraint::Length(1),            // key help
            Constraint::Min(0),
        ])
        .split(area);

    let width = (SCREEN_W + 2).min(sections[0].width);
    let screen_area = Rect { width, ..sections[0] };
    let title = if playing { " megaseq > " } else { " megaseq " };
    let screen = Paragraph::new(screen_lines(vdp)).block(Block::bordered().title(title));
    frame.render_widget(screen, screen_area);
    frame.render_widget(Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)), sections[1]);
}
