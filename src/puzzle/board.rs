//! Board representation and the placement/validity rules of the puzzle.
//!
//! A [`Board`] owns the fixed part of a puzzle instance: grid dimensions and
//! the black squares with their adjacency quotas. Candidate bulb sets are
//! owned by the caller and passed into each operation, so one board can
//! score any number of candidates without copying.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use rand::Rng;

use super::Coordinate;

/// Adjacency requirement carried by a black square.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    /// Exactly this many orthogonal neighbors must hold bulbs.
    Exactly(u8),
    /// The square is exempt from quota enforcement.
    DontCare,
}

impl Quota {
    /// Decode a raw file/config value using the configured sentinel.
    pub fn from_raw(value: u8, dont_care_value: u8) -> Self {
        if value >= dont_care_value {
            Quota::DontCare
        } else {
            Quota::Exactly(value)
        }
    }

    /// Encode back to the raw value written in puzzle and solution files.
    pub fn to_raw(self, dont_care_value: u8) -> u8 {
        match self {
            Quota::Exactly(n) => n,
            Quota::DontCare => dont_care_value,
        }
    }
}

/// Errors raised by board construction and puzzle-file parsing.
#[derive(Debug, thiserror::Error)]
pub enum PuzzleError {
    #[error("puzzle file is truncated: missing {0}")]
    MissingHeader(&'static str),
    #[error("puzzle file line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("no valid board generated after {attempts} attempts")]
    GenerationFailed { attempts: usize },
    #[error("invalid quota weight distribution")]
    QuotaWeights(#[from] rand::distributions::WeightedError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Outcome of scoring a bulb set against a board.
///
/// Invalid solutions carry an empty shined set, so their fitness is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the bulb set is a valid solution candidate.
    pub valid: bool,
    /// Every illuminated cell, bulbs included.
    pub shined: BTreeSet<Coordinate>,
}

impl Evaluation {
    fn invalid() -> Self {
        Self {
            valid: false,
            shined: BTreeSet::new(),
        }
    }

    /// Number of illuminated cells. Zero when invalid.
    pub fn fitness(&self) -> usize {
        self.shined.len()
    }
}

/// A fixed Light-Up puzzle instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    num_rows: usize,
    num_cols: usize,
    black_squares: BTreeMap<Coordinate, Quota>,
}

impl Board {
    /// Create a board from explicit parts.
    pub fn new(
        num_rows: usize,
        num_cols: usize,
        black_squares: BTreeMap<Coordinate, Quota>,
    ) -> Self {
        Self {
            num_rows,
            num_cols,
            black_squares,
        }
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    /// The black squares and their quotas, in coordinate order.
    pub fn black_squares(&self) -> &BTreeMap<Coordinate, Quota> {
        &self.black_squares
    }

    /// Count of cells that can be illuminated: the fitness denominator.
    pub fn total_non_black(&self) -> usize {
        self.num_rows * self.num_cols - self.black_squares.len()
    }

    /// Whether `coord` holds a black square.
    pub fn is_black(&self, coord: Coordinate) -> bool {
        self.black_squares.contains_key(&coord)
    }

    pub(crate) fn set_black(&mut self, coord: Coordinate, quota: Quota) {
        self.black_squares.insert(coord, quota);
    }

    /// The up-to-4 orthogonal neighbors of `coord`, clipped to the grid.
    pub fn adjacent_coords(&self, coord: Coordinate) -> Vec<Coordinate> {
        let mut adjacent = Vec::with_capacity(4);

        if coord.x > 0 {
            adjacent.push(Coordinate::new(coord.x - 1, coord.y));
        }
        if coord.x + 1 < self.num_rows {
            adjacent.push(Coordinate::new(coord.x + 1, coord.y));
        }
        if coord.y > 0 {
            adjacent.push(Coordinate::new(coord.x, coord.y - 1));
        }
        if coord.y + 1 < self.num_cols {
            adjacent.push(Coordinate::new(coord.x, coord.y + 1));
        }

        adjacent
    }

    /// Number of bulbs among `coords`.
    pub fn count_bulbs(&self, coords: &[Coordinate], bulbs: &BTreeSet<Coordinate>) -> usize {
        coords.iter().filter(|c| bulbs.contains(c)).count()
    }

    /// A uniformly random coordinate on the grid.
    pub fn random_coord<R: Rng + ?Sized>(&self, rng: &mut R) -> Coordinate {
        Coordinate::new(
            rng.gen_range(0..self.num_rows),
            rng.gen_range(0..self.num_cols),
        )
    }

    fn black_between_in_row(&self, x: usize, lo_y: usize, hi_y: usize) -> bool {
        if hi_y - lo_y < 2 {
            return false;
        }
        // Same-row coordinates are contiguous under the row-major order.
        self.black_squares
            .range(Coordinate::new(x, lo_y + 1)..=Coordinate::new(x, hi_y - 1))
            .next()
            .is_some()
    }

    fn black_between_in_col(&self, y: usize, lo_x: usize, hi_x: usize) -> bool {
        (lo_x + 1..hi_x).any(|x| self.black_squares.contains_key(&Coordinate::new(x, y)))
    }

    /// Attempt to add a bulb at `coord` to `bulbs`.
    ///
    /// Fails without mutating when `coord` is a black square, or when any
    /// bulb already in `bulbs` shares its row or column without a black
    /// square strictly between them. Two bulbs closer than two cells along
    /// an axis are always illegal; no blocker can fit between them.
    pub fn place_bulb(&self, bulbs: &mut BTreeSet<Coordinate>, coord: Coordinate) -> bool {
        if self.is_black(coord) {
            return false;
        }

        for &bulb in bulbs.iter() {
            if bulb.x == coord.x {
                let (lo, hi) = (bulb.y.min(coord.y), bulb.y.max(coord.y));
                if hi - lo < 2 || !self.black_between_in_row(coord.x, lo, hi) {
                    return false;
                }
            }
            if bulb.y == coord.y {
                let (lo, hi) = (bulb.x.min(coord.x), bulb.x.max(coord.x));
                if hi - lo < 2 || !self.black_between_in_col(coord.y, lo, hi) {
                    return false;
                }
            }
        }

        bulbs.insert(coord);
        true
    }

    /// Repeatedly sample random coordinates through [`Board::place_bulb`]
    /// until one sticks or `max_attempts` draws are exhausted.
    pub fn place_bulb_randomly<R: Rng + ?Sized>(
        &self,
        bulbs: &mut BTreeSet<Coordinate>,
        rng: &mut R,
        max_attempts: usize,
    ) -> bool {
        for _ in 0..max_attempts {
            if self.place_bulb(bulbs, self.random_coord(rng)) {
                return true;
            }
        }
        false
    }

    /// Score a complete bulb set.
    ///
    /// Traces shine from every bulb outward along its row and column,
    /// stopping each ray at the first black square. A ray reaching another
    /// bulb invalidates the set; [`Board::place_bulb`] makes that state
    /// unreachable, but the check is cheap and the sets arrive from
    /// arbitrary callers. With `enforce_quotas`, every black square with a
    /// concrete quota must have exactly that many adjacent bulbs.
    pub fn check_valid_solution(
        &self,
        bulbs: &BTreeSet<Coordinate>,
        enforce_quotas: bool,
    ) -> Evaluation {
        let mut shined = BTreeSet::new();

        for &bulb in bulbs {
            // Left, right, up, down rays in propagation order.
            let rays: [Vec<Coordinate>; 4] = [
                (0..bulb.y).rev().map(|y| Coordinate::new(bulb.x, y)).collect(),
                (bulb.y + 1..self.num_cols)
                    .map(|y| Coordinate::new(bulb.x, y))
                    .collect(),
                (0..bulb.x).rev().map(|x| Coordinate::new(x, bulb.y)).collect(),
                (bulb.x + 1..self.num_rows)
                    .map(|x| Coordinate::new(x, bulb.y))
                    .collect(),
            ];

            for ray in rays {
                for coord in ray {
                    if self.is_black(coord) {
                        break;
                    }
                    if bulbs.contains(&coord) {
                        return Evaluation::invalid();
                    }
                    shined.insert(coord);
                }
            }
        }

        shined.extend(bulbs.iter().copied());

        if enforce_quotas {
            for (&square, &quota) in &self.black_squares {
                if let Quota::Exactly(required) = quota {
                    let adjacent = self.adjacent_coords(square);
                    if self.count_bulbs(&adjacent, bulbs) != required as usize {
                        return Evaluation::invalid();
                    }
                }
            }
        }

        Evaluation {
            valid: true,
            shined,
        }
    }

    /// Fitness ratio for a given fitness against this board.
    pub fn fitness_ratio(&self, fitness: usize) -> f64 {
        let denominator = self.total_non_black();
        if denominator == 0 {
            return 0.0;
        }
        fitness as f64 / denominator as f64
    }

    /// Place the bulbs that are forced by quota arithmetic.
    ///
    /// When a black square's quota equals its count of non-black neighbors,
    /// every one of those neighbors must hold a bulb. Iteration follows the
    /// coordinate order of the black-square map, so the result is the same
    /// on every call and under every RNG seed.
    pub fn force_adjacency_bulbs(&self, bulbs: &mut BTreeSet<Coordinate>) {
        for (&square, &quota) in &self.black_squares {
            let Quota::Exactly(required) = quota else {
                continue;
            };

            let open: Vec<Coordinate> = self
                .adjacent_coords(square)
                .into_iter()
                .filter(|c| !self.is_black(*c))
                .collect();

            if required as usize == open.len() {
                for coord in open {
                    self.place_bulb(bulbs, coord);
                }
            }
        }
    }

    /// Parse a puzzle definition.
    ///
    /// Line 1 holds the column count, line 2 the row count, and every
    /// remaining non-empty line a 1-indexed `col row quota` triple defining
    /// a black square. Raw quota values at or above `dont_care_value` decode
    /// to [`Quota::DontCare`].
    pub fn parse(input: &str, dont_care_value: u8) -> Result<Self, PuzzleError> {
        let mut lines = input.lines().enumerate();

        let num_cols = parse_header(lines.next(), "column count")?;
        let num_rows = parse_header(lines.next(), "row count")?;

        if num_rows == 0 || num_cols == 0 {
            return Err(PuzzleError::Parse {
                line: 1,
                reason: "board dimensions must be non-zero".into(),
            });
        }

        let mut black_squares = BTreeMap::new();

        for (index, line) in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<usize> = line
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|e: std::num::ParseIntError| PuzzleError::Parse {
                    line: index + 1,
                    reason: e.to_string(),
                })?;

            let &[col, row, raw_quota] = fields.as_slice() else {
                return Err(PuzzleError::Parse {
                    line: index + 1,
                    reason: format!("expected `col row quota`, got {} fields", fields.len()),
                });
            };

            if col == 0 || col > num_cols || row == 0 || row > num_rows {
                return Err(PuzzleError::Parse {
                    line: index + 1,
                    reason: format!("black square ({col}, {row}) is outside the board"),
                });
            }

            let coord = Coordinate::new(row - 1, col - 1);
            let quota = Quota::from_raw(
                u8::try_from(raw_quota).map_err(|_| PuzzleError::Parse {
                    line: index + 1,
                    reason: format!("quota {raw_quota} does not fit in a byte"),
                })?,
                dont_care_value,
            );
            black_squares.insert(coord, quota);
        }

        Ok(Self::new(num_rows, num_cols, black_squares))
    }

    /// Read and parse a puzzle file.
    pub fn load<P: AsRef<Path>>(path: P, dont_care_value: u8) -> Result<Self, PuzzleError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, dont_care_value)
    }

    /// Text rendering of the board with a bulb set overlaid.
    ///
    /// `_` is an empty white square, a digit is a black square with that
    /// quota, `#` a don't-care black square, and `!` a bulb.
    pub fn render(&self, bulbs: &BTreeSet<Coordinate>) -> String {
        let mut out = String::with_capacity(self.num_rows * (self.num_cols * 2 + 1));

        for x in 0..self.num_rows {
            for y in 0..self.num_cols {
                let coord = Coordinate::new(x, y);
                match self.black_squares.get(&coord) {
                    Some(Quota::Exactly(n)) => out.push_str(&n.to_string()),
                    Some(Quota::DontCare) => out.push('#'),
                    None if bulbs.contains(&coord) => out.push('!'),
                    None => out.push('_'),
                }
                if y + 1 < self.num_cols {
                    out.push(' ');
                }
            }
            let _ = writeln!(out);
        }

        out
    }
}

fn parse_header(
    line: Option<(usize, &str)>,
    what: &'static str,
) -> Result<usize, PuzzleError> {
    let (index, text) = line.ok_or(PuzzleError::MissingHeader(what))?;
    text.trim().parse().map_err(|_| PuzzleError::Parse {
        line: index + 1,
        reason: format!("expected {what}"),
    })
}
