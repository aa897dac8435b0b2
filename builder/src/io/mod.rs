//! I/O helpers for builder commands.

pub mod artifact;
pub mod config;
pub mod evaluator;
pub mod loader;
pub mod process;
