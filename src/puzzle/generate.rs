//! Random generation of solvable puzzle instances.
//!
//! Boards are built by scattering black squares and scratch bulbs over a
//! shuffled coordinate list, then gated through the solution checker so the
//! returned board is known to admit at least one valid solution. The
//! scratch bulbs are discarded; only the black squares survive.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;

use super::{Board, Coordinate, PuzzleError, Quota};
use crate::schema::{BoardGenConfig, DimensionSpec};

/// Generate a board that is known to admit at least one valid solution.
///
/// Each attempt walks a shuffled list of coordinates. A coordinate becomes
/// a black square with probability `black_square_prob`: a quota target is
/// drawn from the configured weight distribution, the square is temporarily
/// marked don't-care so neighboring bulbs can pack legally on both sides of
/// it, bulbs are greedily placed on its neighbors up to the target, and the
/// quota is resolved down to the count actually placed. Otherwise the
/// coordinate becomes a scratch bulb with probability `bulb_prob`. Cells
/// left unshined and unassigned after the pass are filled with don't-care
/// black squares so the board stays fully explainable.
///
/// Attempts repeat until the checker accepts the construction, bounded by
/// `max_generation_attempts`.
pub fn generate_random_board<R: Rng + ?Sized>(
    config: &BoardGenConfig,
    enforce_quotas: bool,
    rng: &mut R,
) -> Result<Board, PuzzleError> {
    let quota_dist = WeightedIndex::new(&config.quota_weights)?;

    for attempt in 1..=config.max_generation_attempts {
        let board = attempt_board(config, &quota_dist, enforce_quotas, rng);
        if let Some(board) = board {
            log::debug!(
                "generated {}x{} board with {} black squares on attempt {}",
                board.num_rows(),
                board.num_cols(),
                board.black_squares().len(),
                attempt
            );
            return Ok(board);
        }
    }

    Err(PuzzleError::GenerationFailed {
        attempts: config.max_generation_attempts,
    })
}

fn attempt_board<R: Rng + ?Sized>(
    config: &BoardGenConfig,
    quota_dist: &WeightedIndex<f64>,
    enforce_quotas: bool,
    rng: &mut R,
) -> Option<Board> {
    let (num_rows, num_cols) = match config.dimensions {
        DimensionSpec::Fixed { rows, cols } => (rows, cols),
        DimensionSpec::Random { min, max } => {
            (rng.gen_range(min..=max), rng.gen_range(min..=max))
        }
    };

    let mut board = Board::new(num_rows, num_cols, BTreeMap::new());
    let mut bulbs: BTreeSet<Coordinate> = BTreeSet::new();

    let mut coords: Vec<Coordinate> = (0..num_rows)
        .flat_map(|x| (0..num_cols).map(move |y| Coordinate::new(x, y)))
        .collect();
    coords.shuffle(rng);

    for &coord in &coords {
        if bulbs.contains(&coord) {
            continue;
        }

        if rng.gen_bool(config.black_square_prob) {
            let target = quota_dist.sample(rng) as u8;

            // Placeholder so the new square already delimits its row and
            // column while neighbors are packed.
            board.set_black(coord, Quota::DontCare);

            let mut placed = 0u8;
            for adjacent in board.adjacent_coords(coord) {
                if placed < target && board.place_bulb(&mut bulbs, adjacent) {
                    placed += 1;
                }
            }

            board.set_black(coord, Quota::Exactly(placed));
        } else if rng.gen_bool(config.bulb_prob) {
            board.place_bulb(&mut bulbs, coord);
        }
    }

    let evaluation = board.check_valid_solution(&bulbs, enforce_quotas);
    if !evaluation.valid {
        // Convert every unexplained cell into a don't-care black square.
        for &coord in &coords {
            if !evaluation.shined.contains(&coord)
                && !bulbs.contains(&coord)
                && !board.is_black(coord)
            {
                board.set_black(coord, Quota::DontCare);
            }
        }
    }

    if board.check_valid_solution(&bulbs, enforce_quotas).valid {
        Some(board)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::schema::BoardGenConfig;

    fn small_config() -> BoardGenConfig {
        BoardGenConfig {
            dimensions: DimensionSpec::Fixed { rows: 6, cols: 6 },
            ..BoardGenConfig::default()
        }
    }

    #[test]
    fn test_generated_board_admits_a_solution() {
        let mut rng = StdRng::seed_from_u64(11);
        let board = generate_random_board(&small_config(), true, &mut rng).expect("generate");

        assert_eq!(board.num_rows(), 6);
        assert_eq!(board.num_cols(), 6);

        // Rebuild a witness solution the way generation did: forced bulbs
        // plus greedy random fill must at least be scoreable.
        let mut bulbs = std::collections::BTreeSet::new();
        board.force_adjacency_bulbs(&mut bulbs);
        let eval = board.check_valid_solution(&bulbs, false);
        assert!(eval.valid);
    }

    #[test]
    fn test_generation_is_reproducible_for_a_seed() {
        let config = small_config();
        let a = generate_random_board(&config, true, &mut StdRng::seed_from_u64(99))
            .expect("generate");
        let b = generate_random_board(&config, true, &mut StdRng::seed_from_u64(99))
            .expect("generate");

        assert_eq!(a, b);
    }

    #[test]
    fn test_random_dimensions_stay_in_bounds() {
        let config = BoardGenConfig {
            dimensions: DimensionSpec::Random { min: 4, max: 7 },
            ..BoardGenConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        let board = generate_random_board(&config, false, &mut rng).expect("generate");

        assert!((4..=7).contains(&board.num_rows()));
        assert!((4..=7).contains(&board.num_cols()));
    }

    #[test]
    fn test_quota_targets_resolve_to_placed_count() {
        let mut rng = StdRng::seed_from_u64(42);
        let board = generate_random_board(&small_config(), true, &mut rng).expect("generate");

        for (&square, &quota) in board.black_squares() {
            if let Quota::Exactly(n) = quota {
                // A quota can never exceed the number of neighbors.
                assert!((n as usize) <= board.adjacent_coords(square).len());
            }
        }
    }
}
