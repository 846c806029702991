/// Entities: Block (grid units), Runner and Projectile (pixel units),
/// plus the per-tick input intents that drive them.
///
/// Two coordinate systems share one playfield:
///   - Block cells live at integer `(row, col)`; `y` may be negative
///     while a block is still entering from above.
///   - Runners and projectiles live at pixel `(x, y)`. A runner's
///     horizontal position is always a whole column: `x == col * cell`.
///     Its vertical position is continuous and is mapped to rows with
///     `floor(y / cell)`.

use serde::Serialize;

use super::cell::ShapeKind;
use super::grid::COLS;
use super::shape::Shape;

/// Upper bound on runners in a match.
pub const MAX_RUNNERS: usize = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum Facing {
    Left,
    Right,
}

// ══════════════════════════════════════════════════════════════
// Block
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Serialize)]
pub struct Block {
    pub kind: ShapeKind,
    pub shape: Shape,
    /// Column of the shape matrix's left edge.
    pub x: i32,
    /// Row of the shape matrix's top edge (negative while spawning).
    pub y: i32,
}

impl Block {
    /// Centered horizontally, fully above the visible area.
    pub fn spawn(kind: ShapeKind) -> Self {
        let shape = Shape::of(kind);
        let n = shape.size() as i32;
        Block {
            kind,
            shape,
            x: COLS as i32 / 2 - n / 2,
            y: -n,
        }
    }

    /// Absolute `(row, col)` of every filled cell, shifted by an offset.
    pub fn cells_offset(&self, d_col: i32, d_row: i32) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .filled_cells()
            .map(move |(r, c)| (self.y + r + d_row, self.x + c + d_col))
    }

    /// Absolute `(row, col)` of every filled cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells_offset(0, 0)
    }

    /// Is the absolute cell `(row, col)` a filled cell of this block?
    pub fn covers(&self, row: i32, col: i32) -> bool {
        self.shape.filled(row - self.y, col - self.x)
    }

    pub fn is_destroyed(&self) -> bool {
        self.shape.is_empty()
    }
}

// ══════════════════════════════════════════════════════════════
// Runner
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Serialize)]
pub struct Runner {
    pub id: usize,
    /// Pixel x of the left edge. Always `col * cell`.
    pub x: f32,
    /// Pixel y of the top edge.
    pub y: f32,
    pub col: i32,
    pub width: f32,
    pub height: f32,
    pub velocity_y: f32,
    pub standing: bool,
    /// Monotonic: once set, never cleared.
    pub eliminated: bool,
    pub shots_remaining: u32,
    /// Milliseconds until the next recharge; `None` when no recharge is running.
    pub recharge_left_ms: Option<u32>,
    pub facing: Facing,
    /// Driven by `domain::ai` instead of keyboard intents.
    pub bot: bool,
}

impl Runner {
    /// A runner on the floor at `col`, one cell tall.
    pub fn new(id: usize, col: i32, cell: f32, floor_px: f32, max_shots: u32) -> Self {
        Runner {
            id,
            x: col as f32 * cell,
            y: floor_px - cell,
            col,
            width: cell,
            height: cell,
            velocity_y: 0.0,
            standing: false,
            eliminated: false,
            shots_remaining: max_shots,
            recharge_left_ms: None,
            facing: Facing::Right,
            bot: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.eliminated
    }

    /// Row containing the top edge.
    pub fn top_row(&self, cell: f32) -> i32 {
        (self.y / cell).floor() as i32
    }

    /// Row containing the last pixel of the body.
    pub fn bottom_row(&self, cell: f32) -> i32 {
        ((self.y + self.height - 1.0) / cell).floor() as i32
    }

    /// Move to `col`, keeping `x` in step.
    pub fn set_col(&mut self, col: i32, cell: f32) {
        self.col = col;
        self.x = col as f32 * cell;
    }

    pub fn eliminate(&mut self) -> bool {
        if self.eliminated {
            return false;
        }
        self.eliminated = true;
        self.velocity_y = 0.0;
        self.recharge_left_ms = None;
        true
    }
}

// ══════════════════════════════════════════════════════════════
// Projectile
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Serialize)]
pub struct Projectile {
    pub id: u64,
    /// Runner that fired it.
    pub owner: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    /// Negative = upward.
    pub velocity_y: f32,
}

impl Projectile {
    /// Column of the projectile's horizontal centre.
    pub fn col(&self, cell: f32) -> i32 {
        ((self.x + self.width / 2.0) / cell).floor() as i32
    }

    pub fn row(&self, cell: f32) -> i32 {
        (self.y / cell).floor() as i32
    }
}

// ══════════════════════════════════════════════════════════════
// Input intents
// ══════════════════════════════════════════════════════════════

/// Controller input for one tick.
/// `left` / `right` / `soft_drop` are held (repeat on the move timer),
/// `rotate` is edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControllerIntent {
    pub left: bool,
    pub right: bool,
    pub soft_drop: bool,
    pub rotate: bool,
}

/// Runner input for one tick.
/// `left` / `right` are held, `jump` / `shoot` are edge-triggered.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunnerIntent {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub shoot: bool,
}

impl RunnerIntent {
    pub fn is_idle(&self) -> bool {
        !(self.left || self.right || self.jump || self.shoot)
    }
}

/// Everything the simulation consumes in one tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct Intents {
    pub controller: ControllerIntent,
    pub runners: [RunnerIntent; MAX_RUNNERS],
    /// Toggle Running ⇄ Paused.
    pub toggle_pause: bool,
}
