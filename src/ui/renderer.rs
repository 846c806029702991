/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame from a `Snapshot` into the `front` buffer
///   2. Compare each cell with `back` (the previous frame)
///   3. Emit terminal commands only for cells that changed
///   4. Batch everything with `queue!`, flush once
///   5. Swap front/back
///
/// Screen layout (terminal cells, one grid cell = CELL_W columns):
///
/// ```text
///   row 0   HUD: score · lines left · timer · drop speed
///   row 2   ┌────────────────────┐   NEXT
///           │                    │   ....
///           │     10 × 20        │
///           │                    │   R1  ●●●●○○○
///           │                    │   R2  OUT
///           └────────────────────┘
///   last    status line (latest notable event)
/// ```
///
/// The renderer never touches the `Match`; it only reads snapshots.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::config::MatchConfig;
use crate::domain::cell::ShapeKind;
use crate::domain::entity::{Facing, Runner};
use crate::domain::grid::{COLS, ROWS};
use crate::domain::shape::Shape;
use crate::sim::event::{EliminationCause, GameEvent, Outcome, Side};
use crate::sim::world::{Phase, Snapshot};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, so
    /// inter-row gaps match the cell colour on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never produced by composition; forces a full repaint when
    /// written into the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
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

    /// One char per column; clipped at the right edge.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width {
                break;
            }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill(&mut self, x: usize, y: usize, w: usize, h: usize, bg: Color) {
        for yy in y..y + h {
            for xx in x..x + w {
                self.set(xx, yy, Cell::new(' ', Color::White, bg));
            }
        }
    }
}

// ── Layout ──

/// Terminal columns per grid column.
const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const BOARD_X: usize = 2;
const BOARD_Y: usize = 3;
const BOARD_W: usize = COLS * CELL_W;
const SIDE_X: usize = BOARD_X + BOARD_W + 4;

/// Smallest terminal that fits the board, side panel and status line.
const MIN_W: usize = SIDE_X + 24;
const MIN_H: usize = BOARD_Y + ROWS + 3;

// ── Palette ──

const FRAME: Color = Color::Rgb { r: 90, g: 90, b: 120 };
const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const GREEN: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const RED: Color = Color::Rgb { r: 255, g: 60, b: 60 };
const CYAN: Color = Color::Rgb { r: 100, g: 200, b: 255 };
const GREY: Color = Color::Rgb { r: 180, g: 180, b: 180 };
const SHADE: Color = Color::Rgb { r: 40, g: 40, b: 55 };

const RUNNER_COLORS: [Color; 3] = [
    Color::Rgb { r: 255, g: 255, b: 255 },
    Color::Rgb { r: 255, g: 150, b: 220 },
    Color::Rgb { r: 150, g: 255, b: 200 },
];

fn kind_color(kind: ShapeKind) -> Color {
    let (r, g, b) = kind.rgb();
    Color::Rgb { r, g, b }
}

fn runner_color(id: usize) -> Color {
    RUNNER_COLORS[id % RUNNER_COLORS.len()]
}

// ── Text helpers ──

/// `mm:ss`, rounding partial seconds up so 0:00 means time is really out.
pub fn format_clock(ms: u64) -> String {
    let secs = ms.div_ceil(1000);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Status-line text for events worth telling the players about.
pub fn describe(event: &GameEvent) -> Option<String> {
    let text = match event {
        GameEvent::CountdownFinished => "GO!".to_string(),
        GameEvent::LinesCleared { count, remaining } => {
            format!("{count} line(s) cleared, {remaining} to go")
        }
        GameEvent::RunnerEliminated { runner, cause } => {
            let how = match cause {
                EliminationCause::Crushed => "crushed",
                EliminationCause::PushedIntoSolid => "squashed against a wall",
                EliminationCause::Buried => "buried",
                EliminationCause::HeadStrike => "hit their head",
                EliminationCause::FellOut => "fell out",
            };
            format!("Runner {} {how}", runner + 1)
        }
        GameEvent::RunnerSheltered { runner } => format!("Runner {} ducked the push", runner + 1),
        GameEvent::BlockDestroyed => "Block shot to pieces!".to_string(),
        GameEvent::ShotsRecharged { runner, shots } => {
            format!("Runner {} reloaded ({shots})", runner + 1)
        }
        GameEvent::SpeedIncreased { drop_interval_ms } => {
            format!("Speed up! {drop_interval_ms} ms per drop")
        }
        GameEvent::MatchEnded { outcome } => outcome_text(*outcome).to_string(),
        _ => return None,
    };
    Some(text)
}

fn outcome_text(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::LineQuotaReached => "Line quota reached",
        Outcome::AllRunnersEliminated => "Every runner is out",
        Outcome::BlockEscaped => "A block escaped the top",
        Outcome::TimeExpired => "Time is up",
    }
}

// ══════════════════════════════════════════════════════════════
// Renderer
// ══════════════════════════════════════════════════════════════

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, snap: &Snapshot, cfg: &MatchConfig, status: &str) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(snap.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(snap.phase);
        }

        compose(&mut self.front, snap, cfg, status);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colours, not ResetColor: the terminal default may
        // differ from BASE_BG and show line artifacts.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

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
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

// ══════════════════════════════════════════════════════════════
// Compose: build front buffer content
// ══════════════════════════════════════════════════════════════

fn compose(buf: &mut FrameBuffer, snap: &Snapshot, cfg: &MatchConfig, status: &str) {
    buf.clear();

    if buf.width < MIN_W || buf.height < MIN_H {
        let msg = format!("Terminal too small: need {MIN_W}x{MIN_H}");
        buf.put_str(0, 0, &msg, RED, Color::Reset);
        return;
    }

    match snap.phase {
        Phase::Menu => compose_menu(buf, cfg),
        Phase::Countdown | Phase::Running | Phase::Paused | Phase::GameOver => {
            compose_hud(buf, snap);
            compose_board(buf, snap);
            compose_side_panel(buf, snap);
        }
    }

    match snap.phase {
        Phase::Countdown => compose_countdown(buf, snap),
        Phase::Paused => compose_pause_overlay(buf),
        Phase::GameOver => compose_game_over(buf, snap),
        Phase::Menu | Phase::Running => {}
    }

    if !status.is_empty() {
        let row = buf.height - 1;
        let line = format!(" ◈ {status} ");
        buf.put_str(0, row, &line, Color::Black, GOLD);
    }
}

fn compose_hud(buf: &mut FrameBuffer, snap: &Snapshot) {
    let hud = format!(
        " BLOCK RUNNERS   Score:{:<6}  Lines left:{:<3}  Time {}   Drop {}ms ",
        snap.score,
        snap.lines_remaining,
        format_clock(snap.time_left_ms),
        snap.drop_interval_ms,
    );
    buf.put_str(0, HUD_ROW, &hud, GOLD, Color::Reset);
}

fn board_cell(buf: &mut FrameBuffer, row: i32, col: i32, glyph: [char; 2], fg: Color, bg: Color) {
    if row < 0 || col < 0 || row as usize >= ROWS || col as usize >= COLS {
        return;
    }
    let x = BOARD_X + col as usize * CELL_W;
    let y = BOARD_Y + row as usize;
    buf.set(x, y, Cell::new(glyph[0], fg, bg));
    buf.set(x + 1, y, Cell::new(glyph[1], fg, bg));
}

fn compose_board(buf: &mut FrameBuffer, snap: &Snapshot) {
    // Frame
    let right = BOARD_X + BOARD_W;
    let bottom = BOARD_Y + ROWS;
    buf.set(BOARD_X - 1, BOARD_Y - 1, Cell::new('┌', FRAME, Color::Reset));
    buf.set(right, BOARD_Y - 1, Cell::new('┐', FRAME, Color::Reset));
    buf.set(BOARD_X - 1, bottom, Cell::new('└', FRAME, Color::Reset));
    buf.set(right, bottom, Cell::new('┘', FRAME, Color::Reset));
    for x in BOARD_X..right {
        buf.set(x, BOARD_Y - 1, Cell::new('─', FRAME, Color::Reset));
        buf.set(x, bottom, Cell::new('─', FRAME, Color::Reset));
    }
    for y in BOARD_Y..bottom {
        buf.set(BOARD_X - 1, y, Cell::new('│', FRAME, Color::Reset));
        buf.set(right, y, Cell::new('│', FRAME, Color::Reset));
    }

    // Solidified cells
    for (r, row) in snap.grid.iter_rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            match cell.kind() {
                Some(kind) => board_cell(buf, r as i32, c as i32, [' ', ' '], Color::Black, kind_color(kind)),
                None => board_cell(buf, r as i32, c as i32, ['·', ' '], SHADE, Color::Reset),
            }
        }
    }

    // Live block, drawn with a bracket so it reads apart from the stack
    if let Some(block) = &snap.block {
        let color = kind_color(block.kind);
        for (r, c) in block.cells() {
            board_cell(buf, r, c, ['[', ']'], Color::Black, color);
        }
    }

    for p in &snap.projectiles {
        let r = p.row(snap.cell_size);
        let c = p.col(snap.cell_size);
        board_cell(buf, r, c, ['│', ' '], GOLD, Color::Reset);
    }

    for runner in snap.runners.iter().filter(|r| r.is_active()) {
        let (r, c) = runner_cell(runner, snap.cell_size);
        let digit = char::from_digit(runner.id as u32 + 1, 10).unwrap_or('?');
        let glyph = match runner.facing {
            Facing::Left => ['◄', digit],
            Facing::Right => [digit, '►'],
        };
        board_cell(buf, r, c, glyph, runner_color(runner.id), Color::Reset);
    }
}

/// Grid cell a runner is drawn in: the row holding its vertical centre.
fn runner_cell(runner: &Runner, cell: f32) -> (i32, i32) {
    let row = ((runner.y + runner.height / 2.0) / cell).floor() as i32;
    (row, runner.col)
}

fn compose_side_panel(buf: &mut FrameBuffer, snap: &Snapshot) {
    let next = format!("NEXT {}", snap.next_kind.letter());
    buf.put_str(SIDE_X, BOARD_Y - 1, &next, GOLD, Color::Reset);
    let shape = Shape::of(snap.next_kind);
    let color = kind_color(snap.next_kind);
    for (r, c) in shape.filled_cells() {
        let x = SIDE_X + c as usize * CELL_W;
        let y = BOARD_Y + r as usize;
        buf.set(x, y, Cell::new(' ', Color::Black, color));
        buf.set(x + 1, y, Cell::new(' ', Color::Black, color));
    }

    let base = BOARD_Y + 6;
    buf.put_str(SIDE_X, base, "RUNNERS", GOLD, Color::Reset);
    for (i, runner) in snap.runners.iter().enumerate() {
        let y = base + 2 + i * 2;
        let tag = if runner.bot { "bot" } else { "" };
        let label = format!("R{} {tag:<3}", runner.id + 1);
        buf.put_str(SIDE_X, y, &label, runner_color(runner.id), Color::Reset);
        if runner.eliminated {
            buf.put_str(SIDE_X + 8, y, "OUT", RED, Color::Reset);
            continue;
        }
        let ammo: String = (0..snap.max_shots)
            .map(|n| if n < runner.shots_remaining { '●' } else { '○' })
            .take(12)
            .collect();
        buf.put_str(SIDE_X + 8, y, &ammo, GREEN, Color::Reset);
        if let Some(left) = runner.recharge_left_ms {
            let secs = u64::from(left).div_ceil(1000);
            buf.put_str(SIDE_X + 8, y + 1, &format!("reload {secs}s"), GREY, Color::Reset);
        }
    }

    let stats = format!("Cleared {}", snap.lines_cleared);
    buf.put_str(SIDE_X, base + 10, &stats, GREY, Color::Reset);
}

/// A box centred on the board.
fn board_box(buf: &mut FrameBuffer, lines: &[(&str, Color)]) {
    let h = lines.len() + 2;
    let y0 = BOARD_Y + (ROWS - h) / 2;
    buf.fill(BOARD_X, y0, BOARD_W, h, SHADE);
    for (i, (text, fg)) in lines.iter().enumerate() {
        let len = text.chars().count().min(BOARD_W);
        let x = BOARD_X + (BOARD_W - len) / 2;
        buf.put_str(x, y0 + 1 + i, text, *fg, SHADE);
    }
}

fn compose_countdown(buf: &mut FrameBuffer, snap: &Snapshot) {
    let secs = u64::from(snap.countdown_left_ms).div_ceil(1000).max(1);
    let n = secs.to_string();
    board_box(buf, &[("GET READY", GOLD), ("", GOLD), (&n, GREEN)]);
}

fn compose_pause_overlay(buf: &mut FrameBuffer) {
    board_box(buf, &[("PAUSED", GOLD), ("", GOLD), ("P  resume", CYAN), ("ESC  menu", CYAN)]);
}

fn compose_game_over(buf: &mut FrameBuffer, snap: &Snapshot) {
    let (winner, reason) = match snap.outcome {
        Some(o) => (
            match o.winner() {
                Side::Controller => "BLOCKS WIN",
                Side::Runners => "RUNNERS WIN",
            },
            outcome_text(o),
        ),
        None => ("GAME OVER", ""),
    };
    let score = format!("Score {}", snap.score);
    board_box(
        buf,
        &[
            (winner, GOLD),
            (reason, GREY),
            ("", GREY),
            (&score, Color::White),
            ("", GREY),
            ("ENTER rematch", GREEN),
            ("ESC   menu", CYAN),
        ],
    );
}

fn compose_menu(buf: &mut FrameBuffer, cfg: &MatchConfig) {
    let title = [
        r" ___ _         _     ___                              ",
        r"| _ ) |___  __| |__ | _ \_  _ _ _  _ _  ___ _ _ ___   ",
        r"| _ \ / _ \/ _| / / |   / || | ' \| ' \/ -_) '_(_-<   ",
        r"|___/_\___/\__|_\_\ |_|_\\_,_|_||_|_||_\___|_| /__/   ",
    ];
    for (i, line) in title.iter().enumerate() {
        buf.put_str(2, 1 + i, line, GOLD, Color::Reset);
    }

    let base = 7;
    let options = [
        format!("1-3    Runners      {}", cfg.runner_count),
        format!("B      Bots         {}", cfg.bot_runners),
        format!("V      Speed        {} ({} ms)", cfg.speed.name(), cfg.drop_interval_ms()),
        format!("       Lines to win {}", cfg.lines_to_win),
        format!("       Match        {}", format_clock(cfg.match_duration_ms)),
        format!("       Shots        {}", cfg.max_shots),
    ];
    for (i, line) in options.iter().enumerate() {
        let fg = if i < 3 { Color::White } else { GREY };
        buf.put_str(6, base + i, line, fg, Color::Reset);
    }
    buf.put_str(6, base + 7, "ENTER  Start", GREEN, Color::Reset);
    buf.put_str(6, base + 8, "Q      Quit", Color::White, Color::Reset);

    let help = [
        "Controls",
        "  Blocks    A/D move   W rotate   S drop",
        "  Runner 1  ←/→ move   ↑ jump     ↓ shoot",
        "  Runner 2  F/H move   T jump     G shoot",
        "  Runner 3  J/L move   I jump     K shoot",
        "  P pause   ESC menu",
    ];
    for (i, line) in help.iter().enumerate() {
        let fg = if i == 0 { GOLD } else { CYAN };
        buf.put_str(6, base + 10 + i, line, fg, Color::Reset);
    }
}
