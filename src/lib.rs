//! Block Runners: a shared-grid arena where one player steers falling
//! blocks and up to three runners jump, shoot and dodge on the same grid.
//!
//! `domain` holds pure data and rule functions, `sim` owns a running
//! match and advances it one tick at a time, `config` loads the
//! settings. The terminal front end lives in the binary.

pub mod config;
pub mod domain;
pub mod sim;
