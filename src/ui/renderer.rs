/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. `begin_frame` clears the `front` buffer (and picks up resizes)
///   2. `draw_region` composes each region into `front`
///   3. `present` compares each cell with `back` (previous frame) and only
///      emits terminal commands for cells that changed, batched with
///      `queue!` and flushed once
///   4. Swap front/back
///
/// ## Coordinates
///
/// The game thinks in logical viewport pixels (1300×900 by default). Row 0
/// of the terminal is the HUD; the rest is the play area, and `Scale` maps
/// logical pixels onto its cells. The input side uses the same `Scale` to
/// turn mouse cells back into logical pixels.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::Facing;
use crate::domain::rect::{Rect, Viewport};
use crate::domain::stage::MapCell;
use crate::sim::ports::{self, Region};
use crate::ui::menu::Page;

/// Terminal rows above the play area.
pub const HUD_ROWS: u16 = 1;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for all "empty" terminal cells, so the
    /// gaps between rows match the cells on VTE-based terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel cell used to invalidate the back buffer.
    /// Different from any real cell, so every position will be diff'd.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
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

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Write a string centred on column `cx`.
    fn put_centered(&mut self, cx: usize, y: usize, s: &str, fg: Color, bg: Color) {
        let half = s.chars().count() / 2;
        self.put_str(cx.saturating_sub(half), y, s, fg, bg);
    }

    fn fill(&mut self, x0: usize, y0: usize, x1: usize, y1: usize, cell: Cell) {
        for y in y0..=y1 {
            for x in x0..=x1 {
                self.set(x, y, cell);
            }
        }
    }
}

// ── Scale: logical pixels ↔ terminal cells ──

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Scale {
    pub cols: u16,
    pub rows: u16,
    pub viewport: Viewport,
}

impl Scale {
    /// Play area for a terminal of `term_w`×`term_h` cells.
    pub fn fit(term_w: u16, term_h: u16, viewport: Viewport) -> Self {
        Scale {
            cols: term_w.max(1),
            rows: term_h.saturating_sub(HUD_ROWS).max(1),
            viewport,
        }
    }

    /// Terminal cell (column, row) containing a logical point.
    pub fn to_cell(&self, x: f32, y: f32) -> (usize, usize) {
        let col = (x / self.viewport.width * self.cols as f32).floor();
        let row = (y / self.viewport.height * self.rows as f32).floor();
        let col = col.clamp(0.0, (self.cols - 1) as f32) as usize;
        let row = row.clamp(0.0, (self.rows - 1) as f32) as usize;
        (col, row + HUD_ROWS as usize)
    }

    /// Logical point at the centre of a terminal cell; `None` on the HUD.
    pub fn to_logical(&self, col: u16, row: u16) -> Option<(f32, f32)> {
        if row < HUD_ROWS || col >= self.cols {
            return None;
        }
        let row = row - HUD_ROWS;
        if row >= self.rows {
            return None;
        }
        let x = (col as f32 + 0.5) * self.viewport.width / self.cols as f32;
        let y = (row as f32 + 0.5) * self.viewport.height / self.rows as f32;
        Some((x, y))
    }

    /// Inclusive cell span covered by a rectangle.
    fn span(&self, rect: &Rect) -> (usize, usize, usize, usize) {
        let (x0, y0) = self.to_cell(rect.x, rect.y);
        let (x1, y1) = self.to_cell(rect.right() - 0.01, rect.bottom() - 0.01);
        (x0, y0, x1.max(x0), y1.max(y0))
    }
}

// ── Palette ──

const HUD_BG: Color = Color::Rgb { r: 40, g: 40, b: 60 };
const GROUND: Color = Color::Rgb { r: 30, g: 60, b: 35 };
const ACTOR: Color = Color::Rgb { r: 230, g: 200, b: 60 };
const TITLE: Color = Color::Rgb { r: 90, g: 140, b: 255 };
const BUTTON: Color = Color::Rgb { r: 0, g: 100, b: 0 };
const BUTTON_FOCUS: Color = Color::Rgb { r: 0, g: 150, b: 60 };
const BAR: Color = Color::Rgb { r: 200, g: 40, b: 40 };
const DIM: Color = Color::Rgb { r: 140, g: 140, b: 140 };
const DEBUG_BG: Color = Color::Rgb { r: 40, g: 40, b: 40 };

/// Width of one stage box on the map, in columns.
const MAP_CELL_W: usize = 14;
const MAP_CELL_H: usize = 3;

// ── Renderer ──

pub struct TerminalRenderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: u16,
    term_h: u16,
    scale: Scale,
    enhanced_keys: bool,
}

impl TerminalRenderer {
    pub fn new(viewport: Viewport) -> Self {
        TerminalRenderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            scale: Scale::fit(80, 24, viewport),
            enhanced_keys: false,
        }
    }

    /// Enter the alternate screen with mouse capture. Returns whether the
    /// terminal reports key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.enhanced_keys = true;
        }
        log::info!("terminal ready, key release events: {}", self.enhanced_keys);

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.apply_size(tw, th);
        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    fn apply_size(&mut self, tw: u16, th: u16) {
        self.term_w = tw;
        self.term_h = th;
        self.front.resize(tw as usize, th as usize);
        self.back.resize(tw as usize, th as usize);
        // Force full repaint: back ≠ front for every cell.
        self.back.cells.fill(Cell::INVALID);
        self.scale = Scale::fit(tw, th, self.scale.viewport);
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the terminal
        // default, which may differ from BASE_BG.
        queue!(self.writer, SetForegroundColor(Color::White), SetBackgroundColor(Cell::BASE_BG))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    continue;
                }
                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_hud(&mut self, text: &str, fg: Color) {
        let w = self.front.width;
        self.front.fill(0, 0, w.saturating_sub(1), 0, Cell::new(' ', fg, HUD_BG));
        self.front.put_str(1, 0, text, fg, HUD_BG);
    }

    fn compose_stage(&mut self, name: &str) {
        let (w, h) = (self.front.width, self.front.height);
        if w == 0 || h <= HUD_ROWS as usize {
            return;
        }
        self.front.fill(0, HUD_ROWS as usize, w - 1, h - 1, Cell::new(' ', Color::White, GROUND));
        self.compose_hud(name, Color::White);
        let help = "WASD move  Shift sprint  P menu  M map  I inventory  Esc quit";
        let x = w.saturating_sub(help.len() + 1);
        if x > name.chars().count() + 2 {
            self.front.put_str(x, 0, help, DIM, HUD_BG);
        }
    }

    fn compose_actor(&mut self, rect: &Rect, facing: Facing) {
        let (x0, y0, x1, y1) = self.scale.span(rect);
        self.front.fill(x0, y0, x1, y1, Cell::new(' ', Color::Black, ACTOR));
        // sprite mirrored with the facing: eye on the leading side
        let (eye_x, eye) = match facing {
            Facing::Left => (x0, '<'),
            Facing::Right => (x1, '>'),
        };
        self.front.set(eye_x, y0, Cell::new(eye, Color::Black, ACTOR));
    }

    fn compose_map(&mut self, cells: &[MapCell]) {
        self.compose_hud("Map", TITLE);
        let Some(min_x) = cells.iter().map(|c| c.x).min() else { return };
        let Some(min_y) = cells.iter().map(|c| c.y).min() else { return };
        let max_x = cells.iter().map(|c| c.x).max().unwrap_or(min_x);
        let max_y = cells.iter().map(|c| c.y).max().unwrap_or(min_y);

        let grid_w = (max_x - min_x + 1) as usize * MAP_CELL_W;
        let grid_h = (max_y - min_y + 1) as usize * MAP_CELL_H;
        let ox = self.front.width.saturating_sub(grid_w) / 2;
        let oy = HUD_ROWS as usize + self.front.height.saturating_sub(HUD_ROWS as usize + grid_h) / 2;

        for cell in cells {
            let x = ox + (cell.x - min_x) as usize * MAP_CELL_W;
            let y = oy + (cell.y - min_y) as usize * MAP_CELL_H;
            let (fg, bg) = if cell.current { (Color::Black, ACTOR) } else { (Color::White, GROUND) };
            self.front.fill(x, y, x + MAP_CELL_W - 2, y + MAP_CELL_H - 2, Cell::new(' ', fg, bg));
            let label: String = cell.name.chars().take(MAP_CELL_W - 2).collect();
            self.front.put_centered(x + (MAP_CELL_W - 1) / 2, y, &label, fg, bg);
        }
    }

    fn compose_inventory(&mut self, items: &[String], current_item: &str) {
        self.compose_hud("", TITLE);
        let (cx, _) = self.scale.to_cell(self.scale.viewport.width / 2.0, 0.0);
        self.front.put_centered(cx, 0, "Inventory", TITLE, HUD_BG);

        let (left, top) = self.scale.to_cell(200.0, 100.0);
        let (right, _) = self.scale.to_cell(600.0, 100.0);
        self.front.put_str(left, top, "Items:", TITLE, Cell::BASE_BG);
        for (i, name) in items.iter().enumerate() {
            self.front.put_str(left, top + 1 + i, name, Color::White, Cell::BASE_BG);
        }
        self.front.put_str(right, top, "Current Item:", TITLE, Cell::BASE_BG);
        self.front.put_str(right, top + 1, current_item, Color::White, Cell::BASE_BG);
    }

    fn compose_menu(&mut self, page: &Page, focused: Option<usize>, volume: f32) {
        self.compose_hud("", TITLE);
        let (cx, _) = self.scale.to_cell(self.scale.viewport.width / 2.0, 0.0);
        self.front.put_centered(cx, 0, &page.name, TITLE, HUD_BG);

        for (i, button) in page.buttons.iter().enumerate() {
            let bg = if focused == Some(i) { BUTTON_FOCUS } else { BUTTON };
            let (x0, y0, x1, y1) = self.scale.span(&button.rect);
            self.front.fill(x0, y0, x1, y1, Cell::new(' ', Color::White, bg));
            self.front.put_centered((x0 + x1 + 1) / 2, (y0 + y1) / 2, &button.label, Color::White, bg);
        }

        if let Some(bar) = page.volume_bar {
            let (x0, y0, x1, y1) = self.scale.span(&bar);
            self.front.fill(x0, y0, x1, y1, Cell::new(' ', Color::White, Color::Black));
            let percent = (volume.clamp(0.0, 1.0) * 100.0).round() as usize;
            let filled = (x1 - x0 + 1) * percent / 100;
            if filled > 0 {
                self.front.fill(x0, y0, x0 + filled - 1, y1, Cell::new(' ', Color::White, BAR));
            }
            let text = format!("{percent}%");
            let mid = (x0 + x1 + 1) / 2;
            let half = text.len() / 2;
            for (i, ch) in text.chars().enumerate() {
                let x = (mid + i).saturating_sub(half);
                let bg = self.front.get(x, y0).bg;
                self.front.set(x, y0, Cell::new(ch, Color::White, bg));
            }
        }
    }

    fn compose_debug(&mut self, lines: &[String]) {
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        let x = self.front.width.saturating_sub(width);
        for (i, line) in lines.iter().enumerate() {
            let y = HUD_ROWS as usize + i;
            self.front.fill(x, y, self.front.width.saturating_sub(1), y, Cell::new(' ', Color::White, DEBUG_BG));
            self.front.put_str(x + 1, y, line, Color::White, DEBUG_BG);
        }
    }
}

impl ports::Renderer for TerminalRenderer {
    fn begin_frame(&mut self) {
        let (tw, th) = terminal::size().unwrap_or((self.term_w, self.term_h));
        if tw != self.term_w || th != self.term_h {
            log::debug!("terminal resized to {tw}x{th}");
            self.apply_size(tw, th);
        }
        self.front.clear();
    }

    fn draw_region(&mut self, region: &Region) {
        match region {
            Region::StageName(name) => self.compose_stage(name),
            Region::Actor { rect, facing } => self.compose_actor(rect, *facing),
            Region::MapGrid(cells) => self.compose_map(cells),
            Region::InventoryPanel { items, current_item } => self.compose_inventory(items, current_item),
            Region::MenuPage { page, focused, volume } => self.compose_menu(page, *focused, *volume),
            Region::Debug(lines) => self.compose_debug(lines),
        }
    }

    fn present(&mut self) -> io::Result<()> {
        self.flush_diff()?;
        // Swap: current front becomes next back
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VP: Viewport = Viewport { width: 1300.0, height: 900.0 };

    #[test]
    fn scale_leaves_hud_row() {
        let s = Scale::fit(130, 91, VP);
        assert_eq!((s.cols, s.rows), (130, 90));
        assert_eq!(s.to_cell(0.0, 0.0), (0, 1));
        assert_eq!(s.to_cell(1299.9, 899.9), (129, 90));
        assert_eq!(s.to_logical(5, 0), None);
    }

    #[test]
    fn cell_centre_maps_back_into_the_same_cell() {
        let s = Scale::fit(97, 33, VP);
        for (col, row) in [(0, 1), (48, 17), (96, 32)] {
            let (x, y) = s.to_logical(col, row).unwrap();
            assert_eq!(s.to_cell(x, y), (col as usize, row as usize));
        }
    }

    #[test]
    fn points_outside_are_clamped() {
        let s = Scale::fit(80, 25, VP);
        assert_eq!(s.to_cell(-50.0, 5000.0), (0, 24));
        assert_eq!(s.to_logical(80, 3), None);
        assert_eq!(s.to_logical(3, 25), None);
    }

    #[test]
    fn span_covers_rect() {
        let s = Scale::fit(130, 91, VP);
        // 40x60 px actor at the origin: 4 columns, 6 rows
        assert_eq!(s.span(&Rect::new(0.0, 0.0, 40.0, 60.0)), (0, 1, 3, 6));
    }

    #[test]
    fn tiny_terminal_does_not_underflow() {
        let s = Scale::fit(0, 0, VP);
        assert_eq!((s.cols, s.rows), (1, 1));
        assert_eq!(s.to_cell(650.0, 450.0), (0, 1));
    }

    #[test]
    fn buffer_writes_clip() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.put_str(2, 0, "abc", Color::White, Cell::BASE_BG);
        assert_eq!(fb.get(2, 0).ch, 'a');
        assert_eq!(fb.get(3, 0).ch, 'b');
        fb.put_centered(1, 1, "xyz", Color::White, Cell::BASE_BG);
        assert_eq!(fb.get(0, 1).ch, 'x');
        assert_eq!(fb.get(9, 9), Cell::BLANK);
    }
}
