//! Schema module - configuration types for the solver.

mod config;

pub use config::*;
