//! Run logs and solution files.
//!
//! Both formats are consumed by offline analysis tooling, so the layouts
//! are fixed: the run log is a `Run <n>` header followed by tab-separated
//! `eval  avg_ratio  best_ratio` rows, and the solution file's header and
//! black-square section mirror the 1-indexed puzzle input format, followed
//! by the shined-square count and the bulb coordinates.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::evolve::RunProgress;
use crate::puzzle::{Board, Coordinate};

/// Append-style writer for the per-generation run log.
pub struct RunLog<W: Write> {
    writer: W,
    current_run: Option<usize>,
}

impl RunLog<BufWriter<File>> {
    /// Create (truncate) a run log file.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> RunLog<W> {
    /// Wrap an arbitrary writer.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "Result Log")?;
        Ok(Self {
            writer,
            current_run: None,
        })
    }

    /// Record one generation. Emits a run header whenever the run index
    /// changes.
    pub fn record(&mut self, progress: &RunProgress) -> io::Result<()> {
        if self.current_run != Some(progress.run) {
            writeln!(self.writer)?;
            writeln!(self.writer, "Run {}", progress.run)?;
            self.current_run = Some(progress.run);
        }

        writeln!(
            self.writer,
            "{}\t{:.6}\t{:.6}",
            progress.eval_count, progress.avg_fitness_ratio, progress.best_fitness_ratio
        )
    }

    /// Flush buffered rows.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Write a solution: column count, row count, the sorted black-square
/// triples, the shined-square count, and the sorted bulb coordinates.
pub fn write_solution<W: Write>(
    writer: &mut W,
    board: &Board,
    bulbs: &BTreeSet<Coordinate>,
    shined_count: usize,
    dont_care_value: u8,
) -> io::Result<()> {
    writeln!(writer, "{}", board.num_cols())?;
    writeln!(writer, "{}", board.num_rows())?;

    for (&coord, &quota) in board.black_squares() {
        writeln!(
            writer,
            "{} {} {}",
            coord.y + 1,
            coord.x + 1,
            quota.to_raw(dont_care_value)
        )?;
    }

    writeln!(writer, "{shined_count}")?;

    for coord in bulbs {
        writeln!(writer, "{} {}", coord.y + 1, coord.x + 1)?;
    }

    Ok(())
}

/// Write a solution to a file path.
pub fn save_solution<P: AsRef<Path>>(
    path: P,
    board: &Board,
    bulbs: &BTreeSet<Coordinate>,
    shined_count: usize,
    dont_care_value: u8,
) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_solution(&mut writer, board, bulbs, shined_count, dont_care_value)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use super::*;
    use crate::puzzle::Quota;

    fn progress(run: usize, eval_count: usize) -> RunProgress {
        RunProgress {
            run,
            generation: 0,
            eval_count,
            avg_fitness_ratio: 0.25,
            best_fitness_ratio: 0.5,
        }
    }

    #[test]
    fn test_run_log_layout() {
        let mut buffer = Vec::new();
        {
            let mut log = RunLog::new(&mut buffer).expect("log");
            log.record(&progress(1, 10)).expect("row");
            log.record(&progress(1, 20)).expect("row");
            log.record(&progress(2, 10)).expect("row");
            log.flush().expect("flush");
        }

        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(
            text,
            "Result Log\n\nRun 1\n10\t0.250000\t0.500000\n20\t0.250000\t0.500000\n\nRun 2\n10\t0.250000\t0.500000\n"
        );
    }

    #[test]
    fn test_run_log_to_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.log");

        let mut log = RunLog::create(&path).expect("create");
        log.record(&progress(1, 14)).expect("row");
        log.flush().expect("flush");

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("Result Log\n"));
        assert!(text.contains("Run 1\n14\t"));
    }

    #[test]
    fn test_solution_round_trips_through_parser() {
        let board = Board::new(
            3,
            4,
            BTreeMap::from([
                (Coordinate::new(0, 1), Quota::Exactly(1)),
                (Coordinate::new(2, 3), Quota::DontCare),
            ]),
        );
        let mut bulbs = BTreeSet::new();
        assert!(board.place_bulb(&mut bulbs, Coordinate::new(0, 0)));

        let eval = board.check_valid_solution(&bulbs, true);
        assert!(eval.valid);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("solution.txt");
        save_solution(&path, &board, &bulbs, eval.fitness(), 9).expect("save");

        let text = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["4", "3", "2 1 1", "4 3 9", "3", "1 1"]
        );

        // The header and black-square prefix parse back to the same board.
        let prefix = lines[..4].join("\n");
        let parsed = Board::parse(&prefix, 9).expect("parse");
        assert_eq!(parsed.num_rows(), board.num_rows());
        assert_eq!(parsed.black_squares(), board.black_squares());
    }
}
