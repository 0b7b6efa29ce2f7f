//! Puzzle constraint engine: board representation, placement legality,
//! shine propagation, scoring, and random instance generation.

mod board;
mod coordinate;
mod generate;

pub use board::{Board, Evaluation, PuzzleError, Quota};
pub use coordinate::Coordinate;
pub use generate::generate_random_board;
