/// Bot runner brain: produces a `RunnerIntent` from the visible state.
///
/// Priorities, first match wins:
///   1. **Eliminated**: idle.
///   2. **Threatened**: a live block cell is in the bot's column above it,
///      within `THREAT_ROWS`. Shoot it if ammo allows and no shot of ours
///      is in flight, and run for the nearest safe column. If the step
///      toward safety is blocked, jump.
///   3. **Safe**: drift back toward `home_col` so bots spread out.
///
/// Pure: reads grid/block/runner, never mutates.

use super::entity::{Block, Runner, RunnerIntent};
use super::grid::{Grid, COLS};
use super::rules::{self, HorizontalStep};

/// How far above the bot a block cell still counts as a threat.
pub const THREAT_ROWS: i32 = 8;

pub fn decide(
    grid: &Grid,
    block: &Block,
    runner: &Runner,
    home_col: i32,
    shot_in_flight: bool,
    cell: f32,
) -> RunnerIntent {
    let mut intent = RunnerIntent::default();
    if runner.eliminated {
        return intent;
    }

    let top = runner.top_row(cell);
    if threat_above(block, runner.col, top) {
        intent.shoot = runner.shots_remaining > 0 && !shot_in_flight;
        if let Some(dir) = flee_direction(block, runner.col, top) {
            steer(grid, block, runner, dir, cell, &mut intent);
        }
        return intent;
    }

    // ── Safe: wander home ──
    let dir = (home_col - runner.col).signum();
    if dir != 0 && !threat_above(block, runner.col + dir, top) {
        steer(grid, block, runner, dir, cell, &mut intent);
    }
    intent
}

/// Is there a live block cell in `col` between `top - THREAT_ROWS` and `top`?
fn threat_above(block: &Block, col: i32, top: i32) -> bool {
    block
        .cells()
        .any(|(r, c)| c == col && r <= top && top - r <= THREAT_ROWS)
}

/// Direction (-1 / +1) toward the nearest column with no threat.
/// Ties go left.
fn flee_direction(block: &Block, col: i32, top: i32) -> Option<i32> {
    for dist in 1..COLS as i32 {
        for dir in [-1, 1] {
            let c = col + dir * dist;
            if (0..COLS as i32).contains(&c) && !threat_above(block, c, top) {
                return Some(dir);
            }
        }
    }
    None
}

fn steer(grid: &Grid, block: &Block, runner: &Runner, dir: i32, cell: f32, intent: &mut RunnerIntent) {
    match rules::runner_step(grid, Some(block), runner, dir, cell) {
        HorizontalStep::Blocked => intent.jump = runner.standing,
        _ => {
            intent.left = dir < 0;
            intent.right = dir > 0;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
