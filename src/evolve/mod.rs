//! Evolutionary search over bulb placements.
//!
//! The search system consists of:
//!
//! - **Genotypes** (`genotype`): candidate bulb sets with cached fitness
//! - **Driver** (`driver`): the generational loop — evaluation, parent
//!   selection, n-point crossover, bulb-shuffle mutation, and survivor
//!   selection — plus a random-search baseline over the same budget
//!
//! Selection strategies are configured per run: parents come from
//! fitness-proportional roulette or a k-tournament, survivors from (μ+λ)
//! truncation or a k-tournament. All randomness flows through one seeded
//! RNG owned by the driver, so a fixed `random_seed` reproduces a run
//! exactly.

mod driver;
mod genotype;

pub use driver::{Driver, DriverError, ExperimentResult, RunOutcome, RunProgress};
pub use genotype::Genotype;
