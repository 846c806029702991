/// Collision, crush and push rules, truth-table driven.
///
/// Pure functions over grid/block/runner state, no side effects.
/// They decide "what would happen"; `sim::resolve` applies the verdicts.
///
/// ## Block vs. grid (`block_collides`)
/// ┌──────────────────────────────┬──────────┐
/// │ Any filled cell at...         │ Collides │
/// ├──────────────────────────────┼──────────┤
/// │ col < 0 or col >= COLS        │ YES      │
/// │ row >= ROWS                   │ YES      │
/// │ row < 0 (above the grid)      │ no       │
/// │ occupied grid cell            │ YES      │
/// │ a runner                      │ no       │
/// └──────────────────────────────┴──────────┘
///
/// ## Runner horizontal step (`runner_step`)
/// ┌──────────────────────────────────────┬─────────────┐
/// │ Condition (checked in order)          │ Result      │
/// ├──────────────────────────────────────┼─────────────┤
/// │ eliminated                            │ Blocked     │
/// │ dest col out of bounds                │ Blocked     │
/// │ grid cell in body span at dest        │ Climb if the│
/// │                                       │ lifted span │
/// │                                       │ is free,    │
/// │                                       │ else Blocked│
/// │ live block cell in body span at dest  │ Blocked     │
/// │ otherwise                             │ Step        │
/// └──────────────────────────────────────┴─────────────┘
///
/// ## Crush (`crush_victims`), per projected block cell in a runner's column
/// ┌──────────────────────────────────┬───────────────────────────┐
/// │ Block cell row                    │ Verdict                   │
/// ├──────────────────────────────────┼───────────────────────────┤
/// │ == runner top row                 │ eliminated iff standing   │
/// │ top < row <= bottom (inside body) │ eliminated                │
/// │ otherwise                         │ untouched                 │
/// └──────────────────────────────────┴───────────────────────────┘
///
/// ## Push (`plan_push`), per runner beside a block cell in the move direction
/// ┌──────────────────────────────────────────┬────────────┐
/// │ Condition                                 │ Outcome    │
/// ├──────────────────────────────────────────┼────────────┤
/// │ runner's next col in bounds and grid-free │ Pushed     │
/// │ blocked, runner inside an EMPTY shape cell│ Sheltered  │
/// │ blocked, runner inside a FILLED shape cell│ Crushed    │
/// │ blocked, runner outside the shape square  │ Crushed    │
/// └──────────────────────────────────────────┴────────────┘
/// Pushing never stops the block; the block moves iff the grid-only
/// check passes.

use super::entity::{Block, Runner};
use super::grid::{Grid, COLS, ROWS};
use super::shape::Shape;

// ── Block vs. grid ──

/// Would `shape` placed with its top-left at `(y, x)` hit a wall,
/// the floor, or an occupied grid cell?
pub fn shape_collides(grid: &Grid, shape: &Shape, x: i32, y: i32) -> bool {
    shape.filled_cells().any(|(r, c)| {
        let row = y + r;
        let col = x + c;
        col < 0 || col >= COLS as i32 || row >= ROWS as i32 || (row >= 0 && grid.is_occupied(row, col))
    })
}

/// Grid-only collision for the block shifted by an offset.
pub fn block_collides(grid: &Grid, block: &Block, d_col: i32, d_row: i32) -> bool {
    shape_collides(grid, &block.shape, block.x + d_col, block.y + d_row)
}

/// `Block::can_move`: the offset is free of walls, floor and grid cells.
/// Runners never block a block.
pub fn can_move(grid: &Grid, block: &Block, d_col: i32, d_row: i32) -> bool {
    !block_collides(grid, block, d_col, d_row)
}

/// The rotated shape, if it fits where the block is. No wall kicks.
pub fn try_rotate(grid: &Grid, block: &Block) -> Option<Shape> {
    let rotated = block.shape.rotated();
    if shape_collides(grid, &rotated, block.x, block.y) {
        None
    } else {
        Some(rotated)
    }
}

// ── Runner horizontal movement ──

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum HorizontalStep {
    Blocked,
    /// Move one column, same height.
    Step { col: i32 },
    /// Move one column and snap up to `y`.
    Climb { col: i32, y: f32 },
}

/// Decide one horizontal step for a runner. See truth table above.
pub fn runner_step(grid: &Grid, block: Option<&Block>, runner: &Runner, dir: i32, cell: f32) -> HorizontalStep {
    if runner.eliminated {
        return HorizontalStep::Blocked;
    }
    let next_col = runner.col + dir;
    if next_col < 0 || next_col >= COLS as i32 {
        return HorizontalStep::Blocked;
    }

    let top = runner.top_row(cell);
    let bottom = runner.bottom_row(cell);

    let grid_blocked = (top..=bottom).any(|r| grid.in_bounds(r, next_col) && grid.is_occupied(r, next_col));
    if grid_blocked {
        // Climb: snap the top edge one row up and require the whole lifted
        // body to be free at the destination column.
        let lifted_top = top - 1;
        if lifted_top < 0 {
            return HorizontalStep::Blocked;
        }
        let lifted_y = lifted_top as f32 * cell;
        let lifted_bottom = ((lifted_y + runner.height - 1.0) / cell).floor() as i32;
        let clear = (lifted_top..=lifted_bottom).all(|r| !grid.is_occupied(r, next_col));
        return if clear {
            HorizontalStep::Climb { col: next_col, y: lifted_y }
        } else {
            HorizontalStep::Blocked
        };
    }

    if let Some(b) = block {
        if (top..=bottom).any(|r| b.covers(r, next_col)) {
            return HorizontalStep::Blocked;
        }
    }

    HorizontalStep::Step { col: next_col }
}

// ── Crush ──

/// Runners that the block would crush if it moved by `(d_col, d_row)`.
/// Returns runner indices in ascending order, without duplicates.
pub fn crush_victims(block: &Block, runners: &[Runner], d_col: i32, d_row: i32, cell: f32) -> Vec<usize> {
    let mut victims: Vec<usize> = Vec::new();
    for (row, col) in block.cells_offset(d_col, d_row) {
        for (i, r) in runners.iter().enumerate() {
            if r.eliminated || r.col != col || victims.contains(&i) {
                continue;
            }
            let top = r.top_row(cell);
            let bottom = r.bottom_row(cell);
            let on_head = row == top && r.standing;
            let in_body = row > top && row <= bottom;
            if on_head || in_body {
                victims.push(i);
            }
        }
    }
    victims.sort_unstable();
    victims
}

// ── Push ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PushOutcome {
    Pushed { runner: usize, from: i32, to: i32 },
    Sheltered { runner: usize },
    Crushed { runner: usize },
}

/// Work out what a horizontal block move in `dir` does to each runner.
/// Each runner appears at most once, in the order its first contact
/// cell is met (row-major over the shape).
pub fn plan_push(grid: &Grid, block: &Block, runners: &[Runner], dir: i32, cell: f32) -> Vec<PushOutcome> {
    let mut outcomes: Vec<PushOutcome> = Vec::new();
    let mut seen: Vec<usize> = Vec::new();

    for (row, col) in block.cells() {
        for (i, r) in runners.iter().enumerate() {
            if r.eliminated || seen.contains(&i) {
                continue;
            }
            let r_row = r.top_row(cell);
            if col + dir != r.col || row != r_row {
                continue;
            }
            seen.push(i);

            let next_col = r.col + dir;
            let world_blocked = next_col < 0 || next_col >= COLS as i32 || grid.is_occupied(r_row, next_col);
            if !world_blocked {
                outcomes.push(PushOutcome::Pushed { runner: i, from: r.col, to: next_col });
                continue;
            }

            let rel_row = r_row - block.y;
            let rel_col = r.col - block.x;
            let sheltered = block.shape.contains(rel_row, rel_col) && !block.shape.filled(rel_row, rel_col);
            if sheltered {
                outcomes.push(PushOutcome::Sheltered { runner: i });
            } else {
                outcomes.push(PushOutcome::Crushed { runner: i });
            }
        }
    }
    outcomes
}

// ── Solidify / head strike ──

/// Runners whose body overlaps any filled cell of the block right now.
pub fn runners_inside_block(block: &Block, runners: &[Runner], cell: f32) -> Vec<usize> {
    runners
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.eliminated)
        .filter(|(_, r)| (r.top_row(cell)..=r.bottom_row(cell)).any(|row| block.covers(row, r.col)))
        .map(|(i, _)| i)
        .collect()
}

/// Did a rising runner drive its head into a live block cell?
pub fn head_strike(block: &Block, runner: &Runner, cell: f32) -> bool {
    !runner.eliminated && runner.velocity_y < 0.0 && block.covers(runner.top_row(cell), runner.col)
}

/// Will the block escape the arena when written down?
/// True if any filled cell is outside the grid.
pub fn block_escapes(grid: &Grid, block: &Block) -> bool {
    block.cells().any(|(r, c)| !grid.in_bounds(r, c))
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::ShapeKind;
    use crate::domain::grid::tests::grid_from;

    const CELL: f32 = 30.0;
    const FLOOR: f32 = ROWS as f32 * CELL;

    fn runner_at(col: i32, row: i32) -> Runner {
        let mut r = Runner::new(0, col, CELL, FLOOR, 7);
        r.y = row as f32 * CELL;
        r.standing = true;
        r
    }

    fn block_at(rows: &[&str], x: i32, y: i32) -> Block {
        Block { kind: ShapeKind::T, shape: Shape::from_rows(rows), x, y }
    }

    // ── block_collides ──

    #[test]
    fn block_above_grid_does_not_collide() {
        let g = Grid::new();
        let b = Block::spawn(ShapeKind::I);
        assert!(!block_collides(&g, &b, 0, 0));
        assert!(can_move(&g, &b, 0, 1));
    }

    #[test]
    fn block_hits_walls_and_floor() {
        let g = Grid::new();
        let b = block_at(&["##", "##"], 0, 18);
        assert!(block_collides(&g, &b, -1, 0));
        assert!(block_collides(&g, &b, 0, 1));
        assert!(!block_collides(&g, &b, 1, 0));
        let right = block_at(&["##", "##"], 8, 0);
        assert!(block_collides(&g, &right, 1, 0));
    }

    #[test]
    fn block_hits_grid_cells() {
        let g = grid_from(&["....#....."]);
        let b = block_at(&["##", "##"], 3, 17);
        assert!(block_collides(&g, &b, 0, 1));
        assert!(!block_collides(&g, &b, -1, 1));
    }

    #[test]
    fn empty_shape_columns_ignore_walls() {
        // Vertical I sits in column 2 of its square; col 0 and 1 are empty.
        let g = Grid::new();
        let b = block_at(&["..#.", "..#.", "..#.", "..#."], -2, 0);
        assert!(!block_collides(&g, &b, 0, 0));
        assert!(block_collides(&g, &b, -1, 0));
    }

    #[test]
    fn rotation_rejected_when_blocked() {
        let g = grid_from(&["..#.......", ".........."]);
        // horizontal I fills row 17; rotated it would fill col 2 rows 16..19
        let b = block_at(&["....", "####", "....", "...."], 0, 16);
        assert!(try_rotate(&g, &b).is_none());
        let free = Grid::new();
        assert!(try_rotate(&free, &b).is_some());
    }

    // ── runner_step ──

    #[test]
    fn step_into_free_column() {
        let g = Grid::new();
        let r = runner_at(4, 19);
        assert_eq!(runner_step(&g, None, &r, 1, CELL), HorizontalStep::Step { col: 5 });
        assert_eq!(runner_step(&g, None, &r, -1, CELL), HorizontalStep::Step { col: 3 });
    }

    #[test]
    fn step_blocked_by_walls() {
        let g = Grid::new();
        assert_eq!(runner_step(&g, None, &runner_at(0, 19), -1, CELL), HorizontalStep::Blocked);
        assert_eq!(runner_step(&g, None, &runner_at(9, 19), 1, CELL), HorizontalStep::Blocked);
    }

    #[test]
    fn climb_single_step() {
        let g = grid_from(&[".....#...."]);
        let r = runner_at(4, 19);
        assert_eq!(
            runner_step(&g, None, &r, 1, CELL),
            HorizontalStep::Climb { col: 5, y: 18.0 * CELL }
        );
    }

    #[test]
    fn no_climb_over_two_high_wall() {
        let g = grid_from(&[".....#....", ".....#...."]);
        let r = runner_at(4, 19);
        assert_eq!(runner_step(&g, None, &r, 1, CELL), HorizontalStep::Blocked);
    }

    #[test]
    fn no_climb_at_top_row() {
        let mut g = Grid::new();
        g.occupy(0, 5, ShapeKind::O);
        let r = runner_at(4, 0);
        assert_eq!(runner_step(&g, None, &r, 1, CELL), HorizontalStep::Blocked);
    }

    #[test]
    fn live_block_blocks_without_climb() {
        let g = Grid::new();
        let b = block_at(&["##", "##"], 5, 18);
        let r = runner_at(4, 19);
        assert_eq!(runner_step(&g, Some(&b), &r, 1, CELL), HorizontalStep::Blocked);
        // block cells above the runner's span don't matter
        let high = block_at(&["##", "##"], 5, 10);
        assert_eq!(runner_step(&g, Some(&high), &r, 1, CELL), HorizontalStep::Step { col: 5 });
    }

    #[test]
    fn eliminated_runner_never_moves() {
        let g = Grid::new();
        let mut r = runner_at(4, 19);
        r.eliminate();
        assert_eq!(runner_step(&g, None, &r, 1, CELL), HorizontalStep::Blocked);
    }

    // ── crush_victims ──

    #[test]
    fn standing_runner_crushed_by_descending_row() {
        let r = runner_at(4, 19);
        // bottom row of this block is fully filled; moving down puts it on row 19
        let b = block_at(&["...", "###", "..."], 3, 17);
        assert_eq!(crush_victims(&b, &[r], 0, 1, CELL), vec![0]);
    }

    #[test]
    fn airborne_runner_escapes_top_contact() {
        let mut r = runner_at(4, 19);
        r.standing = false;
        let b = block_at(&["...", "###", "..."], 3, 17);
        assert!(crush_victims(&b, &[r], 0, 1, CELL).is_empty());
    }

    #[test]
    fn body_overlap_is_unconditional() {
        let mut r = runner_at(4, 18);
        r.y += 10.0; // spans rows 18 and 19
        r.standing = false;
        // block cell lands on row 19: strictly inside the body
        let b = block_at(&["#"], 4, 18);
        assert_eq!(crush_victims(&b, &[r], 0, 1, CELL), vec![0]);
    }

    #[test]
    fn other_columns_untouched() {
        let r = runner_at(6, 19);
        let b = block_at(&["###"], 3, 18);
        assert!(crush_victims(&b, &[r], 0, 1, CELL).is_empty());
    }

    #[test]
    fn eliminated_runner_not_reported() {
        let mut r = runner_at(4, 19);
        r.eliminate();
        let b = block_at(&["#"], 4, 18);
        assert!(crush_victims(&b, &[r], 0, 1, CELL).is_empty());
    }

    // ── plan_push ──

    #[test]
    fn push_into_free_cell() {
        let g = Grid::new();
        let r = runner_at(5, 19);
        let b = block_at(&["#"], 4, 19);
        assert_eq!(
            plan_push(&g, &b, &[r], 1, CELL),
            vec![PushOutcome::Pushed { runner: 0, from: 5, to: 6 }]
        );
    }

    #[test]
    fn push_into_grid_cell_crushes() {
        let g = grid_from(&["......#..."]);
        let r = runner_at(5, 19);
        let b = block_at(&["#"], 4, 19);
        assert_eq!(plan_push(&g, &b, &[r], 1, CELL), vec![PushOutcome::Crushed { runner: 0 }]);
    }

    #[test]
    fn push_against_wall_crushes() {
        let g = Grid::new();
        let r = runner_at(0, 19);
        let b = block_at(&["#"], 1, 19);
        assert_eq!(plan_push(&g, &b, &[r], -1, CELL), vec![PushOutcome::Crushed { runner: 0 }]);
    }

    #[test]
    fn runner_in_shape_gap_is_sheltered() {
        // Runner sits in the empty (1,1) cell of the matrix,
        // against a grid cell on its right.
        let g = grid_from(&[".......#.."]);
        let b = block_at(&["...", "#..", "..."], 5, 18);
        let r = runner_at(6, 19);
        // cell (19,5) pushes right into runner at col 6 row 19
        assert_eq!(plan_push(&g, &b, &[r], 1, CELL), vec![PushOutcome::Sheltered { runner: 0 }]);
    }

    #[test]
    fn only_leading_edge_pushes() {
        let g = Grid::new();
        let r = runner_at(6, 19);
        let b = block_at(&["##"], 4, 19);
        assert_eq!(
            plan_push(&g, &b, &[r], 1, CELL),
            vec![PushOutcome::Pushed { runner: 0, from: 6, to: 7 }]
        );
    }

    #[test]
    fn runner_on_other_row_not_pushed() {
        let g = Grid::new();
        let r = runner_at(5, 19);
        let b = block_at(&["#"], 4, 18);
        assert!(plan_push(&g, &b, &[r], 1, CELL).is_empty());
    }

    // ── solidify helpers ──

    #[test]
    fn runner_inside_block_detected() {
        let r = runner_at(4, 19);
        let b = block_at(&["#"], 4, 19);
        assert_eq!(runners_inside_block(&b, &[r.clone()], CELL), vec![0]);
        let beside = block_at(&["#"], 5, 19);
        assert!(runners_inside_block(&beside, &[r], CELL).is_empty());
    }

    #[test]
    fn escape_detects_cells_above_grid() {
        let g = Grid::new();
        let b = block_at(&["##", "##"], 4, -1);
        assert!(block_escapes(&g, &b));
        let inside = block_at(&["##", "##"], 4, 0);
        assert!(!block_escapes(&g, &inside));
    }

    #[test]
    fn head_strike_only_when_rising() {
        let mut r = runner_at(4, 10);
        let b = block_at(&["#"], 4, 10);
        r.velocity_y = -5.0;
        assert!(head_strike(&b, &r, CELL));
        r.velocity_y = 2.0;
        assert!(!head_strike(&b, &r, CELL));
    }
}
