use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

use crate::spectrum::renderer::{Rgb, Surface};

/// Vertical pixels per terminal row. One column is one pixel wide.
pub const PIXELS_PER_ROW: f32 = 16.0;

const EIGHTHS: [char; 9] = [
    ' ', '\u{2581}', '\u{2582}', '\u{2583}', '\u{2584}', '\u{2585}', '\u{2586}', '\u{2587}',
    '\u{2588}',
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Empty,
    /// Bottom-anchored fill, in eighths of a row.
    Fill(u8, Rgb),
    Line(Rgb),
    Text(char, Rgb),
}

/// Terminal cell grid the spectrum renderer draws into.
pub struct CellCanvas {
    columns: usize,
    rows: usize,
    background: Rgb,
    cells: Vec<Cell>,
}

impl CellCanvas {
    pub fn new(columns: u16, rows: u16) -> Self {
        let columns = columns as usize;
        let rows = rows as usize;
        Self {
            columns,
            rows,
            background: Rgb(0, 0, 0),
            cells: vec![Cell::Empty; columns * rows],
        }
    }

    /// Size in renderer pixels.
    pub fn pixel_size(&self) -> (f32, f32) {
        (self.columns as f32, self.rows as f32 * PIXELS_PER_ROW)
    }

    fn cell_mut(&mut self, column: usize, row: usize) -> Option<&mut Cell> {
        if column < self.columns && row < self.rows {
            self.cells.get_mut(row * self.columns + column)
        } else {
            None
        }
    }

    fn column_of(&self, x: f32) -> Option<usize> {
        let column = x.floor();
        (column >= 0.0 && (column as usize) < self.columns).then_some(column as usize)
    }

    pub fn lines(&self) -> Vec<Line<'static>> {
        let bg = to_color(self.background);
        self.cells
            .chunks(self.columns.max(1))
            .map(|row| {
                let spans: Vec<Span<'static>> = row
                    .iter()
                    .map(|cell| {
                        let (ch, fg) = match *cell {
                            Cell::Empty => (' ', bg),
                            Cell::Fill(eighths, color) => {
                                (EIGHTHS[eighths.min(8) as usize], to_color(color))
                            }
                            Cell::Line(color) => ('\u{2502}', to_color(color)),
                            Cell::Text(ch, color) => (ch, to_color(color)),
                        };
                        Span::styled(ch.to_string(), Style::default().fg(fg).bg(bg))
                    })
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

const fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

impl Surface for CellCanvas {
    fn clear(&mut self, color: Rgb) {
        self.background = color;
        self.cells.fill(Cell::Empty);
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        let first = x.floor().max(0.0) as usize;
        let last = ((x + width).ceil().max(0.0) as usize).min(self.columns);
        let bottom = y + height;

        for row in 0..self.rows {
            let top_px = row as f32 * PIXELS_PER_ROW;
            let covered = (bottom.min(top_px + PIXELS_PER_ROW) - y.max(top_px)).max(0.0);
            let eighths = (covered / PIXELS_PER_ROW * 8.0).round() as u8;
            if eighths == 0 {
                continue;
            }
            for column in first..last {
                if let Some(cell) = self.cell_mut(column, row) {
                    *cell = match *cell {
                        Cell::Fill(existing, _) if existing >= eighths => continue,
                        _ => Cell::Fill(eighths, color),
                    };
                }
            }
        }
    }

    fn vline(&mut self, x: f32, color: Rgb) {
        let Some(column) = self.column_of(x) else {
            return;
        };
        for row in 0..self.rows {
            if let Some(cell) = self.cell_mut(column, row)
                && *cell == Cell::Empty
            {
                *cell = Cell::Line(color);
            }
        }
    }

    fn label(&mut self, x: f32, y: f32, text: &str, color: Rgb) {
        let row = ((y / PIXELS_PER_ROW).floor().max(0.0)) as usize;
        let len = text.chars().count() as f32;
        let start = (x - len / 2.0).round().max(0.0) as usize;

        for (offset, ch) in text.chars().enumerate() {
            if let Some(cell) = self.cell_mut(start + offset, row) {
                *cell = Cell::Text(ch, color);
            }
        }
    }
}
