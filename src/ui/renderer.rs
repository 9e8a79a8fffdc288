/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Rasterize the scene's `Appearance`s into the `front` buffer
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// ## Pixel → cell mapping
///
/// Entities live in a logical pixel window (1000x800 by default). One
/// terminal cell covers `px_per_col` x `px_per_row` pixels; the canvas is
/// centered in the terminal and `origin` is its top-left cell. A rect
/// covers every cell its pixel span touches.
///
/// Alpha is honoured by blending over whatever is already in the cell,
/// so translucent win zones tint the floor instead of hiding it.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::LayoutConfig;
use crate::domain::color::Rgba;
use crate::domain::entity::{Appearance, Shape};
use crate::domain::geometry::Rect;

const HELP_LINE: &str = "WASD/arrows move  Shift sprint  Tab switch  R restart  Esc quit";

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Rgba,
    bg: Rgba,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: Rgba::WHITE, bg: Rgba::BACKGROUND };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Rgba::rgb(255, 0, 255), bg: Rgba::rgb(255, 0, 255) };
}

fn term_color(c: Rgba) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

/// `src` over `dst` using `src.a`; the result is opaque.
fn blend(src: Rgba, dst: Rgba) -> Rgba {
    let a = src.a as u32;
    let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * (255 - a) + 127) / 255) as u8;
    Rgba::rgb(mix(src.r, dst.r), mix(src.g, dst.g), mix(src.b, dst.b))
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(&mut self.cells[y as usize * self.width + x as usize])
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn paint_bg(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(cell) = self.cell_mut(x, y) {
            cell.bg = blend(color, cell.bg);
        }
    }

    fn paint_char(&mut self, x: i32, y: i32, ch: char, fg: Rgba) {
        if let Some(cell) = self.cell_mut(x, y) {
            cell.ch = ch;
            cell.fg = fg;
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: i32, y: i32, s: &str, fg: Rgba) {
        for (i, ch) in s.chars().enumerate() {
            self.paint_char(x + i as i32, y, ch, fg);
        }
    }
}

/// Cell-space rectangle (half-open), relative to the canvas origin.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct CellSpan {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

impl CellSpan {
    fn of(rect: &Rect, layout: &LayoutConfig) -> Self {
        let (cw, ch) = (layout.px_per_col, layout.px_per_row);
        CellSpan {
            x0: rect.x.div_euclid(cw),
            y0: rect.y.div_euclid(ch),
            x1: (rect.right() + cw - 1).div_euclid(cw),
            y1: (rect.bottom() + ch - 1).div_euclid(ch),
        }
    }

    fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (self.y0..self.y1).flat_map(move |y| (self.x0..self.x1).map(move |x| (x, y)))
    }

    fn on_border(&self, x: i32, y: i32) -> bool {
        x == self.x0 || x == self.x1 - 1 || y == self.y0 || y == self.y1 - 1
    }
}

// ── Rasterizer ──

fn rasterize(buf: &mut FrameBuffer, origin: (i32, i32), look: &Appearance, layout: &LayoutConfig) {
    let span = CellSpan::of(&look.rect, layout);
    let (ox, oy) = origin;

    match look.shape {
        Shape::Solid => {
            for (x, y) in span.cells() {
                buf.paint_bg(ox + x, oy + y, look.color);
            }
        }
        Shape::Frame { width } if width > 0 => {
            for (x, y) in span.cells().filter(|&(x, y)| span.on_border(x, y)) {
                buf.paint_bg(ox + x, oy + y, look.color);
            }
        }
        Shape::Frame { .. } => {}
        Shape::Grate { .. } => {
            for (x, y) in span.cells().filter(|&(x, y)| span.on_border(x, y)) {
                buf.paint_char(ox + x, oy + y, '▒', look.color);
            }
        }
    }

    if let Some(inner) = look.inner {
        let inner_span = CellSpan::of(&inner, layout);
        for (x, y) in inner_span.cells().filter(|&(x, y)| inner_span.on_border(x, y)) {
            buf.paint_char(ox + x, oy + y, '■', look.color);
        }
    }

    // Label: centered block of lines.
    if look.label.is_empty() {
        return;
    }
    let lines = look.label.len() as i32;
    let mid_y = (span.y0 + span.y1 - 1) / 2;
    let top = mid_y - (lines - 1) / 2;
    for (i, line) in look.label.iter().enumerate() {
        let len = line.chars().count() as i32;
        let left = (span.x0 + span.x1 - len) / 2;
        buf.put_str(ox + left, oy + top + i as i32, line, look.label_color);
    }
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    layout: LayoutConfig,
}

impl Renderer {
    pub fn new(layout: LayoutConfig) -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            layout,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(term_color(Rgba::BACKGROUND)),
            Clear(ClearType::All)
        )?;
        self.sync_size()?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Top-left cell of the logical canvas (may be negative on tiny terminals).
    pub fn origin(&self) -> (i32, i32) {
        canvas_origin(self.term_w, self.term_h, &self.layout)
    }

    /// Force a full repaint on the next frame (scene change).
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, looks: &[Appearance], status: Option<&str>) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.sync_size()?;
        }

        self.front.clear();
        let origin = self.origin();
        for look in looks {
            rasterize(&mut self.front, origin, look, &self.layout);
        }

        let bottom = self.term_h as i32 - 1;
        if let Some(msg) = status {
            self.front.put_str(0, bottom - 1, msg, Rgba::rgb(255, 120, 120));
        }
        self.front.put_str(0, bottom, HELP_LINE, Rgba::rgb(140, 140, 140));

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn sync_size(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.invalidate();
        queue!(self.writer, SetBackgroundColor(term_color(Rgba::BACKGROUND)), Clear(ClearType::All))?;
        log::debug!("terminal size {tw}x{th}");
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Rgba::WHITE;
        let mut last_bg = Rgba::BACKGROUND;

        queue!(self.writer,
            SetForegroundColor(term_color(last_fg)),
            SetBackgroundColor(term_color(last_bg)),
        )?;

        for y in 0..self.front.height {
            let mut need_move = true;
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(term_color(cell.fg)))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(term_color(cell.bg)))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }

        self.writer.flush()
    }
}

pub fn canvas_origin(term_w: usize, term_h: usize, layout: &LayoutConfig) -> (i32, i32) {
    let cols = layout.window_width / layout.px_per_col;
    let rows = layout.window_height / layout.px_per_row;
    ((term_w as i32 - cols) / 2, (term_h as i32 - rows) / 2)
}
