//! Candidate solutions for the evolutionary search.

use std::collections::BTreeSet;

use crate::puzzle::{Board, Coordinate, Evaluation};

/// A candidate bulb placement with its cached score.
///
/// Genotypes never own a board; one immutable [`Board`] is shared by every
/// candidate in a run. Fitness fields stay zero until the first evaluation
/// and are reset to zero when an evaluation finds the set invalid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Genotype {
    /// Bulb positions. Ordered iteration is the determinism contract used
    /// by crossover slicing.
    pub bulbs: BTreeSet<Coordinate>,
    /// Count of illuminated cells at the last evaluation.
    pub fitness: usize,
    /// `fitness` over the board's illuminable cell count.
    pub fitness_ratio: f64,
}

impl Genotype {
    /// An empty, unevaluated candidate.
    pub fn new() -> Self {
        Self::default()
    }

    /// A candidate starting from a pre-seeded bulb set.
    pub fn with_bulbs(bulbs: BTreeSet<Coordinate>) -> Self {
        Self {
            bulbs,
            ..Self::default()
        }
    }

    /// Score this candidate against `board` and cache the result.
    pub fn score(&mut self, board: &Board, enforce_quotas: bool) -> Evaluation {
        let evaluation = board.check_valid_solution(&self.bulbs, enforce_quotas);
        self.fitness = evaluation.fitness();
        self.fitness_ratio = board.fitness_ratio(self.fitness);
        evaluation
    }
}
