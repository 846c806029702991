/// Mutable match state and the fixed-order tick that advances it.

pub mod clock;
pub mod event;
pub mod resolve;
pub mod step;
pub mod world;
