/// Pure game rules: cells, shapes, the grid, entities and the
/// collision / physics / bot logic that operates on them.

pub mod ai;
pub mod cell;
pub mod entity;
pub mod grid;
pub mod physics;
pub mod rules;
pub mod shape;
