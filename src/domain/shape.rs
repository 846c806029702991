/// Shape matrices and rotation.
///
/// A shape is an N×N boolean matrix (N ∈ {2, 3, 4}), row-major,
/// `cells[row][col]`. Rotation is a clockwise quarter turn:
///
/// ```text
///   rotated[r][c] = cells[N - 1 - c][r]
/// ```
///
/// Rotation never changes N, so a rotated shape always occupies the
/// same bounding square as the original.

use rand::Rng;
use serde::Serialize;

use super::cell::ShapeKind;

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct Shape {
    cells: Vec<Vec<bool>>,
}

impl Shape {
    /// Spawn matrix for a kind, in its default orientation.
    pub fn of(kind: ShapeKind) -> Self {
        let rows: &[&str] = match kind {
            ShapeKind::I => &["....", "####", "....", "...."],
            ShapeKind::J => &["#..", "###", "..."],
            ShapeKind::L => &["..#", "###", "..."],
            ShapeKind::O => &["##", "##"],
            ShapeKind::S => &[".##", "##.", "..."],
            ShapeKind::T => &[".#.", "###", "..."],
            ShapeKind::Z => &["##.", ".##", "..."],
        };
        Shape::from_rows(rows)
    }

    /// Build from an ASCII diagram: `'#'` = filled, anything else = empty.
    /// Rows must form a square.
    pub fn from_rows(rows: &[&str]) -> Self {
        let cells = rows
            .iter()
            .map(|r| r.chars().map(|ch| ch == '#').collect())
            .collect();
        Shape { cells }
    }

    /// Side length N of the bounding square.
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Is (row, col) inside the matrix and filled?
    /// Negative or out-of-range indices read as empty.
    pub fn filled(&self, row: i32, col: i32) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        self.cells
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .copied()
            .unwrap_or(false)
    }

    /// Does (row, col) fall inside the bounding square at all?
    pub fn contains(&self, row: i32, col: i32) -> bool {
        let n = self.size() as i32;
        row >= 0 && col >= 0 && row < n && col < n
    }

    /// Clear one matrix cell. Returns true if it was filled.
    pub fn clear(&mut self, row: i32, col: i32) -> bool {
        if !self.filled(row, col) {
            return false;
        }
        self.cells[row as usize][col as usize] = false;
        true
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|r| r.iter().all(|&c| !c))
    }

    pub fn filled_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c).count()
    }

    /// Iterate `(row, col)` of every filled cell, row-major.
    pub fn filled_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, f)| **f)
                .map(move |(c, _)| (r as i32, c as i32))
        })
    }

    /// Clockwise quarter turn. Pure: the caller decides whether to keep it.
    pub fn rotated(&self) -> Shape {
        let n = self.size();
        let mut cells = vec![vec![false; n]; n];
        for (r, row) in cells.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = self.cells[n - 1 - c][r];
            }
        }
        Shape { cells }
    }
}

/// Pick a uniformly random shape kind.
pub fn random_kind<R: Rng>(rng: &mut R) -> ShapeKind {
    ShapeKind::ALL[rng.random_range(0..ShapeKind::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn spawn_shapes_have_expected_sizes() {
        assert_eq!(Shape::of(ShapeKind::I).size(), 4);
        assert_eq!(Shape::of(ShapeKind::O).size(), 2);
        for k in [ShapeKind::J, ShapeKind::L, ShapeKind::S, ShapeKind::T, ShapeKind::Z] {
            assert_eq!(Shape::of(k).size(), 3);
        }
        for k in ShapeKind::ALL {
            assert_eq!(Shape::of(k).filled_count(), 4);
        }
    }

    #[test]
    fn rotate_t_clockwise() {
        let t = Shape::of(ShapeKind::T);
        assert_eq!(t.rotated(), Shape::from_rows(&[".#.", ".##", ".#."]));
    }

    #[test]
    fn rotate_i_is_vertical() {
        let i = Shape::of(ShapeKind::I).rotated();
        assert_eq!(i, Shape::from_rows(&["..#.", "..#.", "..#.", "..#."]));
    }

    #[test]
    fn four_rotations_is_identity() {
        for k in ShapeKind::ALL {
            let s = Shape::of(k);
            assert_eq!(s.rotated().rotated().rotated().rotated(), s);
        }
    }

    #[test]
    fn clear_cell_until_empty() {
        let mut o = Shape::of(ShapeKind::O);
        assert!(o.clear(0, 0));
        assert!(!o.clear(0, 0)); // already clear
        assert!(!o.clear(5, 5)); // outside
        o.clear(0, 1);
        o.clear(1, 0);
        assert!(!o.is_empty());
        o.clear(1, 1);
        assert!(o.is_empty());
    }

    #[test]
    fn filled_and_contains_bounds() {
        let s = Shape::of(ShapeKind::J);
        assert!(s.filled(0, 0));
        assert!(!s.filled(0, 1));
        assert!(!s.filled(-1, 0));
        assert!(s.contains(2, 2));
        assert!(!s.contains(3, 0));
    }

    #[test]
    fn random_kind_is_deterministic_for_seed() {
        let mut a = Pcg32::seed_from_u64(7);
        let mut b = Pcg32::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(random_kind(&mut a), random_kind(&mut b));
        }
    }
}
