/// Interaction resolver: applies the verdicts of `domain::rules` and
/// `domain::physics` to the match, and records what happened.
///
/// Every function here takes the whole `Match` plus the tick's event
/// list. None of them look at time except `recharge`; scheduling is
/// `step`'s job.
///
/// ## Projectile impact, per projectile per frame
/// ┌──────────────────────────────────┬──────────────────────────────────┐
/// │ After advancing (first match)     │ Effect                           │
/// ├──────────────────────────────────┼──────────────────────────────────┤
/// │ row < 0 (left through the top)    │ discard, no score                │
/// │ row >= ROWS                       │ discard, no score                │
/// │ live block cell at (row, col)     │ clear that shape cell, +1,       │
/// │                                   │ discard; empty block → respawn   │
/// │ occupied grid cell at (row, col)  │ clear it, +1, discard, line scan │
/// │ otherwise                         │ keeps flying                     │
/// └──────────────────────────────────┴──────────────────────────────────┘

use log::debug;

use crate::config::RechargePolicy;
use crate::domain::grid::ROWS;
use crate::domain::entity::Facing;
use crate::domain::physics;
use crate::domain::rules::{self, HorizontalStep, PushOutcome};
use super::event::{EliminationCause, GameEvent};
use super::world::Match;

// ══════════════════════════════════════════════════════════════
// Runners: elimination
// ══════════════════════════════════════════════════════════════

pub fn eliminate(m: &mut Match, i: usize, cause: EliminationCause, events: &mut Vec<GameEvent>) {
    if m.runners[i].eliminate() {
        debug!("runner {i} eliminated: {cause:?}");
        events.push(GameEvent::RunnerEliminated { runner: i, cause });
    }
}

// ══════════════════════════════════════════════════════════════
// Block: drop, shift, rotate, solidify
// ══════════════════════════════════════════════════════════════

/// One row down (auto-drop or soft drop). Runners under the projected
/// cells are crushed first; then the block either moves or solidifies.
pub fn drop_block(m: &mut Match, events: &mut Vec<GameEvent>) {
    let victims = rules::crush_victims(&m.block, &m.runners, 0, 1, m.phys.cell);
    for i in victims {
        eliminate(m, i, EliminationCause::Crushed, events);
    }
    if m.pending_outcome().is_some() {
        return;
    }

    if rules::can_move(&m.grid, &m.block, 0, 1) {
        m.block.y += 1;
    } else {
        solidify(m, events);
    }
}

/// One column sideways. Runners in the way are pushed, sheltered or
/// crushed; the block itself moves iff the grid allows it.
pub fn shift_block(m: &mut Match, dir: i32, events: &mut Vec<GameEvent>) -> bool {
    let cell = m.phys.cell;
    for outcome in rules::plan_push(&m.grid, &m.block, &m.runners, dir, cell) {
        match outcome {
            PushOutcome::Pushed { runner, from, to } => {
                m.runners[runner].set_col(to, cell);
                debug!("runner {runner} pushed {from} -> {to}");
                events.push(GameEvent::RunnerPushed { runner, from, to });
            }
            PushOutcome::Sheltered { runner } => {
                events.push(GameEvent::RunnerSheltered { runner });
            }
            PushOutcome::Crushed { runner } => {
                eliminate(m, runner, EliminationCause::PushedIntoSolid, events);
            }
        }
    }

    if rules::can_move(&m.grid, &m.block, dir, 0) {
        m.block.x += dir;
        true
    } else {
        false
    }
}

pub fn rotate_block(m: &mut Match, events: &mut Vec<GameEvent>) -> bool {
    match rules::try_rotate(&m.grid, &m.block) {
        Some(shape) => {
            m.block.shape = shape;
            events.push(GameEvent::BlockRotated);
            true
        }
        None => false,
    }
}

/// Write the block into the grid and bring in the next one.
///
/// Runners still inside the footprint are buried first. A block with any
/// cell outside the grid is not written at all: it escaped, and the
/// match is over.
pub fn solidify(m: &mut Match, events: &mut Vec<GameEvent>) {
    if m.block.is_destroyed() {
        respawn_block(m, events);
        return;
    }

    let cell = m.phys.cell;
    for i in rules::runners_inside_block(&m.block, &m.runners, cell) {
        eliminate(m, i, EliminationCause::Buried, events);
    }

    if rules::block_escapes(&m.grid, &m.block) {
        m.escaped = true;
        debug!("block escaped the arena at y={}", m.block.y);
        events.push(GameEvent::BlockEscaped);
        return;
    }

    let kind = m.block.kind;
    let cells: Vec<(i32, i32)> = m.block.cells().collect();
    for (row, col) in cells {
        m.grid.occupy(row, col, kind);
    }
    events.push(GameEvent::BlockSolidified { kind });

    clear_lines(m, events);
    respawn_block(m, events);
}

fn respawn_block(m: &mut Match, events: &mut Vec<GameEvent>) {
    let kind = m.spawn_block();
    events.push(GameEvent::BlockSpawned { kind });
}

pub fn clear_lines(m: &mut Match, events: &mut Vec<GameEvent>) {
    let count = m.grid.clear_full_rows();
    if count == 0 {
        return;
    }
    m.lines_cleared += count as u32;
    m.lines_remaining = m.lines_remaining.saturating_sub(count as u32);
    debug!("{count} line(s) cleared, {} to go", m.lines_remaining);
    events.push(GameEvent::LinesCleared { count, remaining: m.lines_remaining });
}

// ══════════════════════════════════════════════════════════════
// Runners: actions
// ══════════════════════════════════════════════════════════════

pub fn move_runner(m: &mut Match, i: usize, dir: i32, events: &mut Vec<GameEvent>) -> bool {
    let cell = m.phys.cell;
    let step = rules::runner_step(&m.grid, Some(&m.block), &m.runners[i], dir, cell);
    let r = &mut m.runners[i];
    r.facing = if dir < 0 { Facing::Left } else { Facing::Right };
    match step {
        HorizontalStep::Blocked => false,
        HorizontalStep::Step { col } => {
            r.set_col(col, cell);
            true
        }
        HorizontalStep::Climb { col, y } => {
            r.set_col(col, cell);
            r.y = y;
            r.velocity_y = 0.0;
            events.push(GameEvent::RunnerClimbed { runner: i, col });
            true
        }
    }
}

pub fn jump(m: &mut Match, i: usize, events: &mut Vec<GameEvent>) -> bool {
    if physics::jump(&mut m.runners[i], &m.phys) {
        events.push(GameEvent::RunnerJumped { runner: i });
        return true;
    }
    false
}

/// Fire upward. With `shoot_digs_below` on and a grid cell right under
/// the runner, that cell is dug out instead, free of charge.
pub fn shoot(m: &mut Match, i: usize, events: &mut Vec<GameEvent>) -> bool {
    let cell = m.phys.cell;
    if m.runners[i].eliminated {
        return false;
    }

    if m.config.tuning.shoot_digs_below {
        let r = &m.runners[i];
        let (row, col) = (r.bottom_row(cell) + 1, r.col);
        if m.grid.clear(row, col) {
            m.score += 1;
            debug!("runner {i} dug ({row}, {col})");
            events.push(GameEvent::GridCellShot { runner: i, row, col });
            clear_lines(m, events);
            return true;
        }
    }

    if m.runners[i].shots_remaining == 0 {
        return false;
    }

    let id = m.alloc_projectile_id();
    let policy = m.config.recharge_policy;
    let recharge_ms = m.config.recharge_ms;
    let r = &mut m.runners[i];
    r.shots_remaining -= 1;
    let start_timer = match policy {
        RechargePolicy::AllOrNothing => r.shots_remaining == 0,
        RechargePolicy::PerShot => true,
    };
    if start_timer && r.recharge_left_ms.is_none() {
        r.recharge_left_ms = Some(recharge_ms);
    }
    let shots_left = r.shots_remaining;
    let p = physics::spawn_projectile(id, r, &m.phys);
    m.projectiles.push(p);
    events.push(GameEvent::ShotFired { runner: i, shots_left });
    true
}

// ══════════════════════════════════════════════════════════════
// Runners: gravity frame
// ══════════════════════════════════════════════════════════════

/// One physics frame for every active runner: fell-out, gravity, head
/// strike, then landing. Fell-out looks at where the frame starts, so a
/// runner crossing the floor this frame still lands on it.
pub fn runner_frame(m: &mut Match, events: &mut Vec<GameEvent>) {
    let cell = m.phys.cell;
    for i in 0..m.runners.len() {
        if m.runners[i].eliminated {
            continue;
        }
        if physics::fell_out(&m.runners[i], &m.phys) {
            eliminate(m, i, EliminationCause::FellOut, events);
            continue;
        }

        physics::apply_gravity(&mut m.runners[i], &m.phys);

        if rules::head_strike(&m.block, &m.runners[i], cell) {
            eliminate(m, i, EliminationCause::HeadStrike, events);
            continue;
        }

        physics::check_landing(&mut m.runners[i], &m.grid, Some(&m.block), &m.phys);
    }
}

// ══════════════════════════════════════════════════════════════
// Projectiles
// ══════════════════════════════════════════════════════════════

/// One frame of flight and impact for every projectile, in firing order.
pub fn projectile_frame(m: &mut Match, events: &mut Vec<GameEvent>) {
    let mut i = 0;
    while i < m.projectiles.len() {
        if fly_projectile(m, i, events) {
            m.projectiles.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Move projectile `i` through one frame in sub-steps of at most one
/// cell, testing every row it enters. True once it is spent.
fn fly_projectile(m: &mut Match, i: usize, events: &mut Vec<GameEvent>) -> bool {
    let cell = m.phys.cell;
    let steps = physics::projectile_substeps(&m.projectiles[i], cell);
    for _ in 0..steps {
        let p = &mut m.projectiles[i];
        physics::advance_projectile(p, steps);
        let (row, col, owner) = (p.row(cell), p.col(cell), p.owner);

        if row < 0 || row >= ROWS as i32 {
            return true;
        }

        if m.block.covers(row, col) {
            m.block.shape.clear(row - m.block.y, col - m.block.x);
            m.score += 1;
            debug!("runner {owner} shot block cell ({row}, {col})");
            events.push(GameEvent::BlockCellShot { runner: owner, row, col });
            if m.block.is_destroyed() {
                events.push(GameEvent::BlockDestroyed);
                respawn_block(m, events);
            }
            return true;
        }

        if m.grid.clear(row, col) {
            m.score += 1;
            debug!("runner {owner} shot grid cell ({row}, {col})");
            events.push(GameEvent::GridCellShot { runner: owner, row, col });
            clear_lines(m, events);
            return true;
        }
    }
    false
}

// ══════════════════════════════════════════════════════════════
// Ammo recharge
// ══════════════════════════════════════════════════════════════

pub fn recharge(m: &mut Match, dt: u32, events: &mut Vec<GameEvent>) {
    let policy = m.config.recharge_policy;
    let max = m.config.max_shots;
    let full_ms = m.config.recharge_ms;
    for (i, r) in m.runners.iter_mut().enumerate() {
        if r.eliminated {
            continue;
        }
        let Some(left) = r.recharge_left_ms else { continue };
        let left = left.saturating_sub(dt);
        if left > 0 {
            r.recharge_left_ms = Some(left);
            continue;
        }
        r.shots_remaining = match policy {
            RechargePolicy::AllOrNothing => max,
            RechargePolicy::PerShot => (r.shots_remaining + 1).min(max),
        };
        r.recharge_left_ms = match policy {
            RechargePolicy::PerShot if r.shots_remaining < max => Some(full_ms),
            _ => None,
        };
        events.push(GameEvent::ShotsRecharged { runner: i, shots: r.shots_remaining });
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
