/// Grid cell values and the shape kinds that own them.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

use serde::Serialize;

/// The seven falling shapes. Doubles as the colour/owner tag
/// written into the grid when a block solidifies.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum ShapeKind {
    I,
    J,
    L,
    O,
    S,
    T,
    Z,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::I,
        ShapeKind::J,
        ShapeKind::L,
        ShapeKind::O,
        ShapeKind::S,
        ShapeKind::T,
        ShapeKind::Z,
    ];

    /// RGB used by the renderer for this kind.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ShapeKind::I => (239, 68, 68),
            ShapeKind::J => (249, 115, 22),
            ShapeKind::L => (234, 179, 8),
            ShapeKind::O => (34, 197, 94),
            ShapeKind::S => (6, 182, 212),
            ShapeKind::T => (59, 130, 246),
            ShapeKind::Z => (139, 92, 246),
        }
    }

    pub fn letter(self) -> char {
        match self {
            ShapeKind::I => 'I',
            ShapeKind::J => 'J',
            ShapeKind::L => 'L',
            ShapeKind::O => 'O',
            ShapeKind::S => 'S',
            ShapeKind::T => 'T',
            ShapeKind::Z => 'Z',
        }
    }
}

/// One cell of the persistent grid.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub enum Cell {
    #[default]
    Empty,
    Filled(ShapeKind),
}

impl Cell {
    /// Does this cell block blocks, runners and projectiles?
    pub fn is_occupied(self) -> bool {
        matches!(self, Cell::Filled(_))
    }

    pub fn is_empty(self) -> bool {
        !self.is_occupied()
    }

    /// Owner tag, if any.
    pub fn kind(self) -> Option<ShapeKind> {
        match self {
            Cell::Filled(k) => Some(k),
            Cell::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cell_is_empty() {
        assert_eq!(Cell::default(), Cell::Empty);
        assert!(Cell::default().is_empty());
    }

    #[test]
    fn filled_cell_reports_owner() {
        let c = Cell::Filled(ShapeKind::T);
        assert!(c.is_occupied());
        assert_eq!(c.kind(), Some(ShapeKind::T));
        assert_eq!(Cell::Empty.kind(), None);
    }

    #[test]
    fn every_kind_has_distinct_colour() {
        let mut seen = Vec::new();
        for k in ShapeKind::ALL {
            assert!(!seen.contains(&k.rgb()));
            seen.push(k.rgb());
        }
    }
}
