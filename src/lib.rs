//! Evolutionary search for Light-Up (Akari) puzzle solutions.
//!
//! A Light-Up board is a grid of white cells and black squares. Bulbs
//! placed on white cells illuminate their row and column until blocked by
//! a black square; no bulb may shine on another, and a black square may
//! carry a quota on how many of its neighbors hold bulbs. This crate
//! searches for fully-lit bulb placements with a generate-and-test
//! evolutionary loop.
//!
//! # Architecture
//!
//! - `schema`: configuration types for puzzles, the search, and outputs
//! - `puzzle`: the constraint engine — placement legality, shine
//!   propagation, scoring, and random instance generation
//! - `evolve`: genotypes and the generational search driver
//! - `report`: run-log and solution-file writers
//!
//! # Example
//!
//! ```rust,no_run
//! use akari_evo::{Driver, SolverConfig};
//!
//! let config = SolverConfig::default();
//! let mut driver = Driver::new(config).expect("configuration is valid");
//!
//! let result = driver
//!     .run_with_callback(|progress| {
//!         println!(
//!             "run {} gen {}: best ratio {:.3}",
//!             progress.run, progress.generation, progress.best_fitness_ratio
//!         );
//!     })
//!     .expect("search completes");
//!
//! println!("best fitness: {}", result.best.fitness);
//! println!("{}", result.best_board.render(&result.best.bulbs));
//! ```

pub mod evolve;
pub mod puzzle;
pub mod report;
pub mod schema;

// Re-export commonly used types
pub use evolve::{Driver, DriverError, ExperimentResult, Genotype, RunOutcome, RunProgress};
pub use puzzle::{Board, Coordinate, Evaluation, PuzzleError, Quota};
pub use schema::{ConfigError, SolverConfig};
