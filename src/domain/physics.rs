/// Runner and projectile motion: discrete per-frame steps.
///
/// ## Gravity
///
/// One frame: `velocity_y += gravity; y += velocity_y`.
/// Positive y is downward. There is no horizontal velocity: runners move
/// a whole column at a time (see `rules::runner_step`).
///
/// ## Landing Specification
///
/// After gravity, `check_landing` looks one frame ahead
/// (`next_y = y + velocity_y`) and takes the FIRST surface that applies:
///   1. The first grid cell in the runner's column between the rows of
///      `y + height` and `next_y + height` (only while not rising)
///   2. A live block cell in the runner's column whose top edge the
///      runner's bottom edge crosses this frame (swept by `velocity_y`,
///      so fast falls cannot tunnel through the block)
///   3. The playfield floor
///
/// A landing sets `standing`, zeroes `velocity_y`, and snaps `y` so the
/// runner's bottom edge rests exactly on the surface. With no landing the
/// runner is airborne (`standing == false`).

use serde::Serialize;

use super::entity::{Block, Projectile, Runner};
use super::grid::{Grid, ROWS};

/// Per-frame physics constants, all in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Physics {
    pub cell: f32,
    pub gravity: f32,
    pub jump_strength: f32,
    pub projectile_speed: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Physics { cell: 30.0, gravity: 0.5, jump_strength: 10.0, projectile_speed: 10.0 }
    }
}

impl Physics {
    /// Pixel y of the playfield floor.
    pub fn floor_px(&self) -> f32 {
        ROWS as f32 * self.cell
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Surface {
    Grid,
    Block,
    Floor,
}

/// One frame of gravity.
pub fn apply_gravity(runner: &mut Runner, phys: &Physics) {
    runner.velocity_y += phys.gravity;
    runner.y += runner.velocity_y;
}

/// Resolve what the runner stands on. See module docs for the order.
pub fn check_landing(runner: &mut Runner, grid: &Grid, block: Option<&Block>, phys: &Physics) -> Option<Surface> {
    runner.standing = false;
    if runner.eliminated {
        return None;
    }

    let cell = phys.cell;
    let next_bottom = runner.y + runner.velocity_y + runner.height;

    // 1. grid, every row the bottom edge crosses this frame
    if runner.velocity_y >= 0.0 {
        let from = ((runner.y + runner.height) / cell).floor() as i32;
        let to = (next_bottom / cell).floor() as i32;
        let col = runner.col;
        if let Some(row) = (from..=to).find(|&r| grid.in_bounds(r, col) && grid.is_occupied(r, col)) {
            land(runner, row as f32 * cell);
            return Some(Surface::Grid);
        }
    }

    // 2. block, swept
    if let Some(b) = block {
        let hit = b
            .cells()
            .filter(|&(_, c)| c == runner.col)
            .map(|(r, _)| r as f32 * cell)
            .find(|&top| next_bottom >= top && next_bottom < top + runner.velocity_y + 1.0);
        if let Some(top) = hit {
            land(runner, top);
            return Some(Surface::Block);
        }
    }

    // 3. floor
    let floor = phys.floor_px();
    if runner.y + runner.height >= floor {
        land(runner, floor);
        return Some(Surface::Floor);
    }

    None
}

fn land(runner: &mut Runner, surface_y: f32) {
    runner.y = surface_y - runner.height;
    runner.standing = true;
    runner.velocity_y = 0.0;
}

/// Start a jump. Only works from a standing position.
pub fn jump(runner: &mut Runner, phys: &Physics) -> bool {
    if runner.eliminated || !runner.standing {
        return false;
    }
    runner.velocity_y = -phys.jump_strength;
    runner.standing = false;
    true
}

/// Has the runner left the playfield through the bottom? True once its
/// top edge is past the floor.
pub fn fell_out(runner: &Runner, phys: &Physics) -> bool {
    runner.y > phys.floor_px()
}

/// A new upward shot from the runner's column, just above its head.
pub fn spawn_projectile(id: u64, runner: &Runner, phys: &Physics) -> Projectile {
    Projectile {
        id,
        owner: runner.id,
        x: runner.x,
        y: runner.y - 5.0,
        width: phys.cell,
        velocity_y: -phys.projectile_speed,
    }
}

/// Sub-steps per frame so that no single step moves more than one cell.
pub fn projectile_substeps(p: &Projectile, cell: f32) -> u32 {
    ((p.velocity_y.abs() / cell).ceil() as u32).max(1)
}

/// One sub-step of projectile flight: `1 / steps` of a frame.
pub fn advance_projectile(p: &mut Projectile, steps: u32) {
    p.y += p.velocity_y / steps.max(1) as f32;
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
