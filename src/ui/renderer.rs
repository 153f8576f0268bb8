/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The world is y-up in pixels; the screen is y-down in rows. One tile
/// is drawn as one terminal row by `CELL_W` columns, and the world row
/// `r` lands on screen row `height - 1 - r` before the camera offset.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};
use tracing::{debug, info};

use crate::domain::entity::{Facing, Pose};
use crate::domain::tile::{Layer, Tile};
use crate::sim::session::Session;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: [u8; 16],
    ch_len: u8,
    fg: Color,
    bg: Color,
    wide: bool,    // occupies 2 terminal columns
    cont: bool,    // right half of a wide char (skip render)
}

impl Cell {
    /// Every cell paints an explicit background; terminal-default
    /// backgrounds leave visible seams between rows on some terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell {
        ch: [b' ', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: false,
    };

    const WIDE_CONT: Cell = Cell {
        ch: [0; 16],
        ch_len: 0,
        fg: Color::White,
        bg: Cell::BASE_BG,
        wide: false,
        cont: true,
    };

    /// Differs from any real cell; filling `back` with it forces a full repaint.
    const INVALID: Cell = Cell {
        ch: [b'?', 0,0,0, 0,0,0,0, 0,0,0,0, 0,0,0,0],
        ch_len: 1,
        fg: Color::Magenta,
        bg: Color::Magenta,
        wide: false,
        cont: false,
    };

    #[inline]
    fn norm_bg(bg: Color) -> Color {
        match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        }
    }

    fn from_char(c: char, fg: Color, bg: Color) -> Self {
        let mut cell = Self::BLANK;
        cell.ch_len = c.encode_utf8(&mut cell.ch).len() as u8;
        cell.fg = fg;
        cell.bg = Self::norm_bg(bg);
        cell
    }

    fn from_char_wide(c: char, bg: Color) -> Self {
        let mut cell = Self::from_char(c, Color::Reset, bg);
        cell.wide = true;
        cell
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.ch[..self.ch_len as usize]).unwrap_or("")
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
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
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

    /// Write a string at (x, y), one column per char, clipped at the edge.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::from_char(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::from_char(' ', Color::White, bg));
        }
    }

    /// Two narrow glyphs filling one tile.
    fn put_tile(&mut self, col: usize, row: usize, glyph: (char, char), fg: Color, bg: Color) {
        self.set(col, row, Cell::from_char(glyph.0, fg, bg));
        self.set(col + 1, row, Cell::from_char(glyph.1, fg, bg));
    }

    /// One wide glyph filling one tile.
    fn put_wide(&mut self, col: usize, row: usize, c: char, bg: Color) {
        self.set(col, row, Cell::from_char_wide(c, bg));
        self.set(col + 1, row, Cell::WIDE_CONT);
    }
}

// ── Camera ──

/// Viewport over the level in tile units, screen orientation (row 0 on top).
#[derive(Clone, Debug, Default)]
pub struct Camera {
    /// Left-most visible column (negative when centering a narrow level)
    pub x: i32,
    /// Top-most visible screen row
    pub y: i32,
    pub view_w: usize,
    pub view_h: usize,
}

impl Camera {
    /// Follow a target with a dead zone: only scroll when the target
    /// enters the outer fifth of the viewport. Levels smaller than the
    /// viewport are centered.
    pub fn follow(&mut self, target_x: i32, target_y: i32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 { return; }
        self.x = follow_axis(self.x, target_x, self.view_w, world_w);
        self.y = follow_axis(self.y, target_y, self.view_h, world_h);
    }
}

fn follow_axis(pos: i32, target: i32, view: usize, world: usize) -> i32 {
    let view = view as i32;
    let world = world as i32;
    if world <= view {
        return -((view - world) / 2);
    }
    let margin = view / 5;
    let mut pos = pos;
    if target < pos + margin {
        pos = target - margin;
    } else if target > pos + view - margin - 1 {
        pos = target - view + margin + 1;
    }
    pos.clamp(0, world - view)
}

// ── Glyphs ──

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const SKY_BG: Color = Color::Rgb { r: 18, g: 24, b: 48 };
const BANNER_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

fn player_glyph(pose: Pose, facing: Facing) -> (char, char) {
    match (pose, facing) {
        (Pose::Jump, _) => ('☻', '↑'),
        (Pose::Idle, Facing::Right) => ('☺', '›'),
        (Pose::Idle, Facing::Left) => ('‹', '☺'),
        // Alternate the stride glyph every other walk frame
        (Pose::Walk(f), Facing::Right) => ('☺', if f % 2 == 0 { '›' } else { '»' }),
        (Pose::Walk(f), Facing::Left) => (if f % 2 == 0 { '‹' } else { '«' }, '☺'),
    }
}

fn spike_glyph(frame: u8) -> (char, char) {
    if frame % 2 == 0 { ('▲', '▲') } else { ('△', '△') }
}

fn background_glyph(frame: u8) -> (char, char) {
    match frame % 4 {
        0 => ('·', ' '),
        1 => (' ', '·'),
        2 => ('∙', ' '),
        _ => (' ', '∙'),
    }
}

// ── Renderer ──

/// Terminal columns per tile.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HELP: &str = " ←/→ A/D:Move  ↑/W:Jump  R:Reset  Esc/Q:Quit  │  Pad: A:Jump  Start:Reset  Select:Quit";

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    enhanced_keys: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::default(),
            enhanced_keys: false,
        }
    }

    /// Enter raw mode and the alternate screen. Returns whether the
    /// terminal will report key releases.
    pub fn init(&mut self) -> io::Result<bool> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
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
        info!(key_release = self.enhanced_keys, "terminal ready");

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(self.enhanced_keys)
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.enhanced_keys {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
        }
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Draw one frame. `pad_connected` adds a gamepad marker to the HUD.
    pub fn render(&mut self, session: &Session, pad_connected: bool) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            debug!(cols = tw, rows = th, "terminal resized");
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.update_camera(session);

        self.front.clear();
        self.compose_game(session, pad_connected);
        if session.banner.is_visible() {
            self.compose_banner(session);
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn update_camera(&mut self, s: &Session) {
        let level = &s.level;
        let reserved_rows = MAP_ROW + 2; // HUD + gap + help
        let max_view_h = self.term_h.saturating_sub(reserved_rows).max(1);
        self.camera.view_w = (self.term_w / CELL_W).max(1);
        self.camera.view_h = max_view_h.min(level.height().max(1));

        let (col, row) = player_tile(s);
        let screen_row = level.height() as i32 - 1 - row;
        self.camera.follow(col, screen_row, level.width(), level.height());
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut x = 0;
            while x < self.front.width {
                let cell = self.front.get(x, y);
                let prev = self.back.get(x, y);

                if cell.cont {
                    if cell != prev { need_move = true; }
                    x += 1;
                    continue;
                }

                let cont_changed = cell.wide
                    && x + 1 < self.front.width
                    && self.front.get(x + 1, y) != self.back.get(x + 1, y);

                if cell == prev && !cont_changed {
                    need_move = true;
                    x += 1;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }

                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }

                queue!(self.writer, Print(cell.as_str()))?;

                if cell.wide {
                    last_x = x + 1;
                    x += 2;
                } else {
                    last_x = x;
                    x += 1;
                }
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, s: &Session, pad_connected: bool) {
        let buf_w = self.front.width;
        let level = &s.level;

        // ── HUD ──
        let hud = hud_text(&level.name, s.score, s.can_jump, pad_connected);
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        let cam = self.camera.clone();
        let (pcol, prow) = player_tile(s);
        let height = level.height() as i32;

        for vy in 0..cam.view_h {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            let world_row = height - 1 - (cam.y + vy as i32);

            for vx in 0..cam.view_w {
                let col = vx * CELL_W;
                if col + 1 >= buf_w { break; }
                let world_col = cam.x + vx as i32;

                if world_col == pcol && world_row == prow {
                    let glyph = player_glyph(s.player.pose, s.player.facing);
                    self.front.put_tile(col, row, glyph, Color::Rgb { r: 255, g: 230, b: 120 }, SKY_BG);
                } else {
                    self.compose_cell(s, world_col, world_row, col, row);
                }
            }
        }

        // ── Help bar ──
        let help_row = MAP_ROW + cam.view_h + 1;
        if help_row < self.front.height {
            self.front.put_str(0, help_row, HELP, Color::DarkGrey, Color::Reset);
        }
    }

    /// Terrain and sprites for one tile. Anything outside the level is void.
    fn compose_cell(&mut self, s: &Session, wc: i32, wr: i32, col: usize, row: usize) {
        let level = &s.level;
        if wc < 0 || wr < 0 || wc as usize >= level.width() || wr as usize >= level.height() {
            self.front.put_tile(col, row, (' ', ' '), Color::White, Cell::BASE_BG);
            return;
        }
        let (wc, wr) = (wc as usize, wr as usize);

        if let Some(sprite) = level.sprite_at(wc, wr) {
            match sprite.layer {
                Layer::Duck => {
                    // Bob the duck by flashing its backdrop
                    let bg = if level.frame(Layer::Duck) % 2 == 0 {
                        SKY_BG
                    } else {
                        Color::Rgb { r: 30, g: 50, b: 90 }
                    };
                    self.front.put_wide(col, row, '🦆', bg);
                }
                _ => {
                    let glyph = spike_glyph(level.frame(Layer::Spike));
                    self.front.put_tile(col, row, glyph, Color::Rgb { r: 230, g: 60, b: 60 }, SKY_BG);
                }
            }
            return;
        }

        match level.terrain.get(wc, wr) {
            Tile::Platform => self.front.put_tile(
                col, row, ('▀', '▀'),
                Color::Rgb { r: 90, g: 190, b: 80 },
                Color::Rgb { r: 110, g: 70, b: 35 },
            ),
            Tile::Background => self.front.put_tile(
                col, row, background_glyph(level.frame(Layer::Background)),
                Color::Rgb { r: 90, g: 100, b: 140 },
                SKY_BG,
            ),
            Tile::Empty => self.front.put_tile(col, row, (' ', ' '), Color::White, SKY_BG),
        }
    }

    /// Centered win box over the map.
    fn compose_banner(&mut self, s: &Session) {
        let b = &s.banner;
        let lines = [b.title.as_str(), b.final_score.as_str(), b.reset_hint.as_str()];
        let inner = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;

        let map_mid = MAP_ROW + self.camera.view_h / 2;
        let top = map_mid.saturating_sub(lines.len() / 2 + 1);
        let left = self.front.width.saturating_sub(inner) / 2;

        for r in 0..lines.len() + 2 {
            for x in 0..inner {
                self.front.set(left + x, top + r, Cell::from_char(' ', Color::Black, BANNER_BG));
            }
        }
        for (i, line) in lines.iter().enumerate() {
            let pad = (inner - line.chars().count()) / 2;
            self.front.put_str(left + pad, top + 1 + i, line, Color::Black, BANNER_BG);
        }
    }
}

/// Top status line: level, score, ground marker and gamepad marker.
fn hud_text(level_name: &str, score: i32, grounded: bool, pad_connected: bool) -> String {
    let ground = if grounded { "●" } else { "○" };
    let pad = if pad_connected { "  │  Pad" } else { "" };
    format!(" Jump It  │  {level_name}  │  Score: {score}  {ground}{pad} ")
}

/// Tile the player's centre is in.
fn player_tile(s: &Session) -> (i32, i32) {
    let ts = s.level.tile_size();
    ((s.player.x / ts).floor() as i32, (s.player.y / ts).floor() as i32)
}

/// Best-effort terminal restore for the panic path.
pub fn restore_terminal() {
    let mut out = io::stdout();
    let _ = execute!(out, ResetColor, cursor::Show, terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}
