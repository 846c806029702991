/// The persistent playfield: a fixed COLS × ROWS matrix of cells.
///
/// Coordinates are `(row, col)` with row 0 at the top. Queries take
/// signed indices because blocks spawn above the visible area and
/// runners can be pushed against the walls:
///   - rows above the grid (`row < 0`) read as empty
///   - columns outside `0..COLS` and rows below the floor read as
///     out of bounds (see `in_bounds`)
///
/// Dimensions never change after construction. `clear_full_rows`
/// removes rows and inserts the same number of empty rows at the top.

use serde::Serialize;

use super::cell::{Cell, ShapeKind};

pub const COLS: usize = 10;
pub const ROWS: usize = 20;

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Grid {
    cells: Vec<Vec<Cell>>,
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Grid { cells: vec![vec![Cell::Empty; COLS]; ROWS] }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, |r| r.len())
    }

    /// Is (row, col) a real cell of the grid?
    #[inline]
    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < ROWS && (col as usize) < COLS
    }

    #[inline]
    pub fn cell(&self, row: i32, col: i32) -> Cell {
        if self.in_bounds(row, col) {
            self.cells[row as usize][col as usize]
        } else {
            Cell::Empty
        }
    }

    /// Occupancy of an in-bounds cell. Anything outside reads as free;
    /// callers that care about walls check `in_bounds` themselves.
    #[inline]
    pub fn is_occupied(&self, row: i32, col: i32) -> bool {
        self.cell(row, col).is_occupied()
    }

    /// Write a tag. Out-of-bounds writes are ignored and return false.
    pub fn occupy(&mut self, row: i32, col: i32, tag: ShapeKind) -> bool {
        if !self.in_bounds(row, col) {
            return false;
        }
        self.cells[row as usize][col as usize] = Cell::Filled(tag);
        true
    }

    /// Empty a cell. Returns true if it was occupied.
    pub fn clear(&mut self, row: i32, col: i32) -> bool {
        if !self.is_occupied(row, col) {
            return false;
        }
        self.cells[row as usize][col as usize] = Cell::Empty;
        true
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|c| c.is_occupied())
    }

    /// Remove every full row and compact everything above it downward.
    ///
    /// Scans bottom-up. After a removal the same index is scanned again,
    /// because the row that was above has just shifted into it.
    pub fn clear_full_rows(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = ROWS;
        while row > 0 {
            let r = row - 1;
            if self.is_row_full(r) {
                self.cells.remove(r);
                self.cells.insert(0, vec![Cell::Empty; COLS]);
                cleared += 1;
                // re-scan r
            } else {
                row -= 1;
            }
        }
        cleared
    }

    /// Row-major view for rendering.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.iter().map(|r| r.as_slice())
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_occupied()).count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Build a grid from an ASCII diagram aligned to the BOTTOM rows.
    /// `'#'` = filled (tag I), any letter in IJLOSTZ = that tag,
    /// `'.'` or `' '` = empty.
    pub(crate) fn grid_from(rows: &[&str]) -> Grid {
        let mut g = Grid::new();
        let offset = ROWS - rows.len();
        for (i, line) in rows.iter().enumerate() {
            for (c, ch) in line.chars().enumerate() {
                let tag = match ch {
                    '#' | 'I' => Some(ShapeKind::I),
                    'J' => Some(ShapeKind::J),
                    'L' => Some(ShapeKind::L),
                    'O' => Some(ShapeKind::O),
                    'S' => Some(ShapeKind::S),
                    'T' => Some(ShapeKind::T),
                    'Z' => Some(ShapeKind::Z),
                    _ => None,
                };
                if let Some(t) = tag {
                    g.occupy((offset + i) as i32, c as i32, t);
                }
            }
        }
        g
    }

    #[test]
    fn new_grid_is_empty_and_sized() {
        let g = Grid::new();
        assert_eq!(g.rows(), ROWS);
        assert_eq!(g.cols(), COLS);
        assert_eq!(g.occupied_count(), 0);
    }

    #[test]
    fn out_of_bounds_reads_free_and_writes_ignored() {
        let mut g = Grid::new();
        assert!(!g.is_occupied(-1, 0));
        assert!(!g.is_occupied(0, 10));
        assert!(!g.occupy(-1, 0, ShapeKind::O));
        assert!(!g.occupy(20, 0, ShapeKind::O));
        assert_eq!(g.occupied_count(), 0);
    }

    #[test]
    fn single_full_row_clears_and_shifts() {
        let mut g = grid_from(&[
            "T.........",
            "OOOOOOOOOO",
        ]);
        assert_eq!(g.clear_full_rows(), 1);
        // T shifted down one row into the bottom row
        assert_eq!(g.cell(19, 0), Cell::Filled(ShapeKind::T));
        assert_eq!(g.cell(18, 0), Cell::Empty);
        // no O survives anywhere
        assert!(g.iter_rows().flatten().all(|c| *c != Cell::Filled(ShapeKind::O)));
        assert_eq!(g.occupied_count(), 1);
    }

    #[test]
    fn adjacent_full_rows_rescan_same_index() {
        let mut g = grid_from(&[
            "Z.........",
            "##########",
            "##########",
            "S.........",
            "##########",
        ]);
        assert_eq!(g.clear_full_rows(), 3);
        assert_eq!(g.cell(19, 0), Cell::Filled(ShapeKind::S));
        assert_eq!(g.cell(18, 0), Cell::Filled(ShapeKind::Z));
        assert_eq!(g.occupied_count(), 2);
    }

    #[test]
    fn no_full_rows_is_noop() {
        let mut g = grid_from(&["#########."]);
        let before = g.clone();
        assert_eq!(g.clear_full_rows(), 0);
        assert_eq!(g, before);
    }

    #[test]
    fn clear_single_cell() {
        let mut g = grid_from(&["#........."]);
        assert!(g.clear(19, 0));
        assert!(!g.clear(19, 0));
        assert!(!g.clear(-3, 0));
    }

    proptest! {
        #[test]
        fn prop_dimensions_survive_any_clears(
            fills in proptest::collection::vec((0i32..ROWS as i32, 0i32..COLS as i32), 0..200),
            full_rows in proptest::collection::vec(0usize..ROWS, 0..6),
        ) {
            let mut g = Grid::new();
            for (r, c) in fills {
                g.occupy(r, c, ShapeKind::L);
            }
            for r in &full_rows {
                for c in 0..COLS as i32 {
                    g.occupy(*r as i32, c, ShapeKind::I);
                }
            }
            let full_before = (0..ROWS).filter(|&r| g.is_row_full(r)).count();
            let cleared = g.clear_full_rows();
            prop_assert_eq!(cleared, full_before);
            prop_assert_eq!(g.rows(), ROWS);
            prop_assert_eq!(g.cols(), COLS);
            prop_assert!((0..ROWS).all(|r| !g.is_row_full(r)));
        }
    }
}
