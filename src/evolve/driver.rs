//! The evolutionary search driver.
//!
//! Orchestrates the population lifecycle over one or more independent runs:
//! initialization, evaluation, parent selection, recombination, mutation,
//! and survivor selection, until the board is fully lit or the evaluation
//! budget runs out.

use std::collections::BTreeSet;

use rand::Rng;
use rand::SeedableRng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;

use crate::puzzle::{Board, Coordinate, PuzzleError, generate_random_board};
use crate::schema::{
    ConfigError, ParentSelection, PuzzleConfig, PuzzleSource, SolverConfig, SurvivorSelection,
};

use super::Genotype;

/// Errors raised while constructing or running the driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
}

/// Snapshot reported to the progress callback once per generation.
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// 1-based run index.
    pub run: usize,
    /// 0-based generation index within the run.
    pub generation: usize,
    /// Evaluations consumed so far in this run.
    pub eval_count: usize,
    /// Mean fitness ratio over every evaluation seen this run.
    pub avg_fitness_ratio: f64,
    /// Fitness ratio of the all-time best genotype.
    pub best_fitness_ratio: f64,
}

/// Final accounting for one run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// 1-based run index.
    pub run: usize,
    /// Generations completed.
    pub generations: usize,
    /// Evaluations consumed.
    pub evaluations: usize,
    /// Best fitness observed in this run.
    pub best_fitness: usize,
    /// Best fitness ratio observed in this run.
    pub best_fitness_ratio: f64,
    /// Whether this run fully lit its board.
    pub solved: bool,
}

/// Result of a whole experiment.
#[derive(Debug, Clone)]
pub struct ExperimentResult {
    /// Per-run accounting, in run order.
    pub outcomes: Vec<RunOutcome>,
    /// The all-time best genotype across runs.
    pub best: Genotype,
    /// The board the best genotype was scored against. Runs with a random
    /// puzzle source regenerate their board, so this snapshot travels with
    /// the genotype.
    pub best_board: Board,
}

/// Which cohort an evaluation pass scores.
#[derive(Clone, Copy)]
enum Cohort {
    Population,
    Children,
}

/// Evolutionary driver over a fixed configuration.
pub struct Driver {
    config: SolverConfig,
    rng: StdRng,
    board: Board,
    population: Vec<Genotype>,
    parents: Vec<usize>,
    children: Vec<Genotype>,
    best: Genotype,
    best_board: Board,
    run_best_fitness: usize,
    eval_count: usize,
    ratio_sum: f64,
    ratios_seen: usize,
}

impl Driver {
    /// Validate the configuration, seed the RNG, and set up the first run.
    pub fn new(config: SolverConfig) -> Result<Self, DriverError> {
        config.validate()?;

        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let board = build_board(&config.puzzle, &mut rng)?;

        let mut driver = Self {
            config,
            rng,
            best_board: board.clone(),
            board,
            population: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            best: Genotype::new(),
            run_best_fitness: 0,
            eval_count: 0,
            ratio_sum: 0.0,
            ratios_seen: 0,
        };
        driver.init_population();

        Ok(driver)
    }

    /// The board of the current run.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Reset run state: fresh board, fresh population, zeroed counters.
    fn init_run(&mut self) -> Result<(), PuzzleError> {
        self.board = build_board(&self.config.puzzle, &mut self.rng)?;
        self.run_best_fitness = 0;
        self.eval_count = 0;
        self.ratio_sum = 0.0;
        self.ratios_seen = 0;
        self.init_population();
        Ok(())
    }

    /// Build μ genotypes: identical forced-bulb seed, then random fill
    /// until the consecutive-failure tolerance is hit. Exhausting the
    /// tolerance just ends the fill for that genotype.
    fn init_population(&mut self) {
        let mu = self.config.evolution.population_size;

        let mut seed_bulbs = BTreeSet::new();
        if self.config.evolution.seed_forced_bulbs {
            self.board.force_adjacency_bulbs(&mut seed_bulbs);
        }

        let mut population: Vec<Genotype> = (0..mu)
            .map(|_| Genotype::with_bulbs(seed_bulbs.clone()))
            .collect();
        for genotype in &mut population {
            self.fill_randomly(&mut genotype.bulbs);
        }

        self.population = population;
        self.parents.clear();
        self.children.clear();
    }

    fn fill_randomly(&mut self, bulbs: &mut BTreeSet<Coordinate>) {
        let Self {
            board, rng, config, ..
        } = self;

        let mut failures = 0;
        while failures < config.evolution.placement_failure_limit {
            if board.place_bulb_randomly(bulbs, rng, config.puzzle.max_placement_attempts) {
                failures = 0;
            } else {
                failures += 1;
            }
        }
    }

    /// Score one genotype and fold it into the run statistics.
    fn record(&mut self, genotype: &mut Genotype) {
        genotype.score(&self.board, self.config.puzzle.enforce_adjacency_quotas);

        self.ratio_sum += genotype.fitness_ratio;
        self.ratios_seen += 1;
        self.run_best_fitness = self.run_best_fitness.max(genotype.fitness);

        // Strictly greater replaces; ties keep the incumbent.
        if genotype.fitness > self.best.fitness {
            self.best = genotype.clone();
            self.best_board = self.board.clone();
        }

        self.eval_count += 1;
    }

    fn evaluate(&mut self, cohort: Cohort) {
        let mut genotypes = match cohort {
            Cohort::Population => std::mem::take(&mut self.population),
            Cohort::Children => std::mem::take(&mut self.children),
        };

        for genotype in &mut genotypes {
            self.record(genotype);
        }

        match cohort {
            Cohort::Population => self.population = genotypes,
            Cohort::Children => self.children = genotypes,
        }
    }

    fn avg_fitness_ratio(&self) -> f64 {
        if self.ratios_seen == 0 {
            0.0
        } else {
            self.ratio_sum / self.ratios_seen as f64
        }
    }

    fn progress(&self, run: usize, generation: usize) -> RunProgress {
        RunProgress {
            run,
            generation,
            eval_count: self.eval_count,
            avg_fitness_ratio: self.avg_fitness_ratio(),
            best_fitness_ratio: self.best.fitness_ratio,
        }
    }

    /// Draw the parent pool as indices into the population.
    fn select_parents(&mut self) {
        let Self {
            population,
            parents,
            rng,
            config,
            ..
        } = self;

        let pool_size = config.evolution.parent_pool_size;
        parents.clear();

        match config.evolution.parent_selection {
            ParentSelection::FitnessProportional => {
                match WeightedIndex::new(population.iter().map(|g| g.fitness_ratio)) {
                    Ok(dist) => {
                        parents.extend((0..pool_size).map(|_| dist.sample(rng)));
                    }
                    // A population that is uniformly unfit has no usable
                    // weights; draw uniformly instead.
                    Err(_) => {
                        parents
                            .extend((0..pool_size).map(|_| rng.gen_range(0..population.len())));
                    }
                }
            }
            ParentSelection::Tournament { size } => {
                for _ in 0..pool_size {
                    let winner = (0..size)
                        .map(|_| rng.gen_range(0..population.len()))
                        .max_by(|&a, &b| {
                            population[a]
                                .fitness_ratio
                                .total_cmp(&population[b].fitness_ratio)
                        })
                        .unwrap_or(0);
                    parents.push(winner);
                }
            }
        }
    }

    /// Breed λ children from the parent pool.
    fn recombine(&mut self) {
        let Self {
            population,
            parents,
            children,
            rng,
            config,
            ..
        } = self;

        children.clear();

        for _ in 0..config.evolution.offspring_size {
            let parent_a = &population[parents[rng.gen_range(0..parents.len())]];
            let parent_b = &population[parents[rng.gen_range(0..parents.len())]];

            let bulbs = crossover_bulbs(
                &parent_a.bulbs,
                &parent_b.bulbs,
                config.evolution.crossover_points,
                config.evolution.crossover_bias,
                rng,
            );
            children.push(Genotype::with_bulbs(bulbs));
        }
    }

    /// Shuffle one bulb per selected child: remove a random bulb, then try
    /// to place a fresh one. A failed re-placement leaves the child with
    /// one bulb fewer.
    fn mutate(&mut self) {
        let Self {
            board,
            children,
            rng,
            config,
            ..
        } = self;

        for child in children.iter_mut() {
            if !rng.gen_bool(config.evolution.mutation_probability) {
                continue;
            }

            if !child.bulbs.is_empty() {
                let index = rng.gen_range(0..child.bulbs.len());
                if let Some(&victim) = child.bulbs.iter().nth(index) {
                    child.bulbs.remove(&victim);
                }
            }

            let mut failures = 0;
            while failures < config.evolution.mutation_failure_limit {
                if board.place_bulb_randomly(
                    &mut child.bulbs,
                    rng,
                    config.puzzle.max_placement_attempts,
                ) {
                    break;
                }
                failures += 1;
            }
        }
    }

    /// Merge children into the population and cut back to μ.
    fn select_survivors(&mut self) {
        let Self {
            population,
            children,
            rng,
            config,
            ..
        } = self;

        let mu = config.evolution.population_size;
        let mut pool = std::mem::take(population);
        pool.append(children);

        match config.evolution.survivor_selection {
            SurvivorSelection::Truncation => {
                pool.sort_by(|a, b| b.fitness_ratio.total_cmp(&a.fitness_ratio));
                pool.truncate(mu);
                *population = pool;
            }
            SurvivorSelection::Tournament { size } => {
                let mut survivors = Vec::with_capacity(mu);
                while survivors.len() < mu && !pool.is_empty() {
                    let winner = (0..size)
                        .map(|_| rng.gen_range(0..pool.len()))
                        .max_by(|&a, &b| {
                            pool[a].fitness_ratio.total_cmp(&pool[b].fitness_ratio)
                        })
                        .unwrap_or(0);
                    survivors.push(pool.swap_remove(winner));
                }
                *population = survivors;
            }
        }
    }

    fn run_solved(&self) -> bool {
        self.run_best_fitness == self.board.total_non_black()
    }

    fn terminated(&self) -> bool {
        self.run_solved() || self.eval_count >= self.config.experiment.max_evaluations
    }

    fn outcome(&self, run: usize, generations: usize) -> RunOutcome {
        RunOutcome {
            run,
            generations,
            evaluations: self.eval_count,
            best_fitness: self.run_best_fitness,
            best_fitness_ratio: self.board.fitness_ratio(self.run_best_fitness),
            solved: self.run_solved(),
        }
    }

    /// Run the full experiment, invoking `callback` once per generation.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<ExperimentResult, PuzzleError>
    where
        F: FnMut(&RunProgress),
    {
        let mut outcomes = Vec::with_capacity(self.config.experiment.runs);

        for run in 1..=self.config.experiment.runs {
            if run > 1 {
                self.init_run()?;
            }

            let mut generation = 0;
            loop {
                self.evaluate(Cohort::Population);
                callback(&self.progress(run, generation));

                self.select_parents();
                self.recombine();
                self.mutate();
                self.evaluate(Cohort::Children);
                self.select_survivors();

                generation += 1;
                if self.terminated() {
                    break;
                }
            }

            let outcome = self.outcome(run, generation);
            log::info!(
                "run {} finished: {} generations, {} evaluations, best ratio {:.4}{}",
                run,
                outcome.generations,
                outcome.evaluations,
                outcome.best_fitness_ratio,
                if outcome.solved { " (solved)" } else { "" }
            );
            outcomes.push(outcome);
        }

        Ok(ExperimentResult {
            outcomes,
            best: self.best.clone(),
            best_board: self.best_board.clone(),
        })
    }

    /// Run the full experiment without progress reporting.
    pub fn run(&mut self) -> Result<ExperimentResult, PuzzleError> {
        self.run_with_callback(|_| {})
    }

    /// Random-search baseline over the same budget accounting: every
    /// sample is an independent genotype filled by random placement, with
    /// no selection pressure.
    pub fn random_search_with_callback<F>(
        &mut self,
        mut callback: F,
    ) -> Result<ExperimentResult, PuzzleError>
    where
        F: FnMut(&RunProgress),
    {
        let mut outcomes = Vec::with_capacity(self.config.experiment.runs);

        for run in 1..=self.config.experiment.runs {
            if run > 1 {
                self.init_run()?;
            }

            let mut samples = 0;
            while !self.terminated() {
                let mut genotype = Genotype::new();
                self.fill_randomly(&mut genotype.bulbs);
                self.record(&mut genotype);

                samples += 1;
                callback(&self.progress(run, samples));
            }

            outcomes.push(self.outcome(run, samples));
        }

        Ok(ExperimentResult {
            outcomes,
            best: self.best.clone(),
            best_board: self.best_board.clone(),
        })
    }
}

fn build_board<R: Rng + ?Sized>(
    puzzle: &PuzzleConfig,
    rng: &mut R,
) -> Result<Board, PuzzleError> {
    match &puzzle.source {
        PuzzleSource::File { path } => Board::load(path, puzzle.dont_care_value),
        PuzzleSource::Random(gen_config) => {
            generate_random_board(gen_config, puzzle.enforce_adjacency_quotas, rng)
        }
    }
}

/// n-point crossover over two bulb sets.
///
/// Both sets are sliced as sequences in coordinate order. Cut indices are
/// drawn non-decreasing, bounded by the shorter parent's last index, with a
/// final cut one past that bound; each segment comes from the first parent
/// with probability `bias` and is unioned into the child. With an empty
/// parent there is nothing the cuts can cover, so the child is empty.
fn crossover_bulbs<R: Rng + ?Sized>(
    a: &BTreeSet<Coordinate>,
    b: &BTreeSet<Coordinate>,
    points: usize,
    bias: f64,
    rng: &mut R,
) -> BTreeSet<Coordinate> {
    let a_bulbs: Vec<Coordinate> = a.iter().copied().collect();
    let b_bulbs: Vec<Coordinate> = b.iter().copied().collect();
    let min_len = a_bulbs.len().min(b_bulbs.len());

    let mut child = BTreeSet::new();
    if min_len == 0 {
        return child;
    }

    let bound = min_len - 1;
    let mut cuts = Vec::with_capacity(points + 1);
    let mut start = 0;
    for _ in 0..points {
        let cut = rng.gen_range(start..=bound);
        cuts.push(cut);
        start = cut;
    }
    cuts.push(bound + 1);

    let mut prev = 0;
    for &cut in &cuts {
        let segment = if rng.gen_bool(bias) {
            &a_bulbs[prev..cut]
        } else {
            &b_bulbs[prev..cut]
        };
        child.extend(segment.iter().copied());
        prev = cut;
    }

    child
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::schema::{BoardGenConfig, DimensionSpec, EvolutionConfig};

    fn test_config() -> SolverConfig {
        SolverConfig {
            puzzle: PuzzleConfig {
                source: PuzzleSource::Random(BoardGenConfig {
                    dimensions: DimensionSpec::Fixed { rows: 5, cols: 5 },
                    ..BoardGenConfig::default()
                }),
                ..PuzzleConfig::default()
            },
            evolution: EvolutionConfig {
                population_size: 8,
                offspring_size: 6,
                parent_pool_size: 4,
                ..EvolutionConfig::default()
            },
            experiment: crate::schema::ExperimentConfig {
                runs: 1,
                max_evaluations: 200,
            },
            random_seed: Some(1234),
            ..SolverConfig::default()
        }
    }

    fn config_from_puzzle(dir: &tempfile::TempDir, text: &str) -> SolverConfig {
        let path = dir.path().join("puzzle.txt");
        let mut file = std::fs::File::create(&path).expect("create puzzle file");
        file.write_all(text.as_bytes()).expect("write puzzle file");

        let mut config = test_config();
        config.puzzle.source = PuzzleSource::File { path };
        config
    }

    #[test]
    fn test_population_size_constant_after_survival() {
        for (mu, lambda) in [(1, 1), (4, 9), (8, 3)] {
            let mut config = test_config();
            config.evolution.population_size = mu;
            config.evolution.offspring_size = lambda;

            let mut driver = Driver::new(config).expect("driver");
            driver.evaluate(Cohort::Population);
            driver.select_parents();
            driver.recombine();
            driver.mutate();
            driver.evaluate(Cohort::Children);
            driver.select_survivors();

            assert_eq!(driver.population.len(), mu);
        }
    }

    #[test]
    fn test_tournament_survival_keeps_population_size() {
        let mut config = test_config();
        config.evolution.survivor_selection = SurvivorSelection::Tournament { size: 3 };

        let mut driver = Driver::new(config).expect("driver");
        driver.evaluate(Cohort::Population);
        driver.select_parents();
        driver.recombine();
        driver.evaluate(Cohort::Children);
        driver.select_survivors();

        assert_eq!(driver.population.len(), 8);
    }

    #[test]
    fn test_parent_selection_fills_pool_when_all_unfit() {
        // Zero fitness ratios across the board: roulette weights are
        // unusable and the uniform fallback must kick in.
        let mut driver = Driver::new(test_config()).expect("driver");
        for genotype in &mut driver.population {
            genotype.fitness = 0;
            genotype.fitness_ratio = 0.0;
        }

        driver.select_parents();
        assert_eq!(driver.parents.len(), 4);
    }

    #[test]
    fn test_tournament_parent_selection_fills_pool() {
        let mut config = test_config();
        config.evolution.parent_selection = ParentSelection::Tournament { size: 3 };

        let mut driver = Driver::new(config).expect("driver");
        driver.evaluate(Cohort::Population);
        driver.select_parents();

        assert_eq!(driver.parents.len(), 4);
        assert!(driver.parents.iter().all(|&i| i < driver.population.len()));
    }

    #[test]
    fn test_mutation_of_empty_child_is_guarded() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Single-cell board, fully black: nothing can ever be placed.
        let mut config = config_from_puzzle(&dir, "1\n1\n1 1 9\n");
        config.evolution.mutation_probability = 1.0;

        let mut driver = Driver::new(config).expect("driver");
        driver.children = vec![Genotype::new()];
        driver.mutate();

        assert!(driver.children[0].bulbs.is_empty());
    }

    #[test]
    fn test_forced_bulbs_seed_every_genotype() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Black square at (0, 0) with quota 2 and exactly two open
        // neighbors: both neighbors are forced everywhere.
        let config = config_from_puzzle(&dir, "3\n3\n1 1 2\n");

        let driver = Driver::new(config).expect("driver");
        for genotype in &driver.population {
            assert!(genotype.bulbs.contains(&Coordinate::new(0, 1)));
            assert!(genotype.bulbs.contains(&Coordinate::new(1, 0)));
        }
    }

    #[test]
    fn test_run_terminates_on_solved_board() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A single white cell: one bulb solves it immediately.
        let config = config_from_puzzle(&dir, "1\n1\n");

        let mut driver = Driver::new(config).expect("driver");
        let result = driver.run().expect("run");

        assert_eq!(result.outcomes.len(), 1);
        assert!(result.outcomes[0].solved);
        assert_eq!(result.best.fitness, 1);
    }

    #[test]
    fn test_run_stops_at_evaluation_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Quota 3 with only two neighbors is unsatisfiable, so no genotype
        // is ever valid and only the budget can stop the run.
        let mut config = config_from_puzzle(&dir, "2\n2\n1 1 3\n");
        config.experiment.max_evaluations = 40;

        let mut driver = Driver::new(config).expect("driver");
        let result = driver.run().expect("run");

        let outcome = &result.outcomes[0];
        assert!(!outcome.solved);
        assert!(outcome.evaluations >= 40);
        assert_eq!(outcome.best_fitness, 0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let run = || {
            let mut driver = Driver::new(test_config()).expect("driver");
            driver.run().expect("run")
        };

        let a = run();
        let b = run();

        assert_eq!(a.best.bulbs, b.best.bulbs);
        assert_eq!(a.best.fitness, b.best.fitness);
        assert_eq!(a.outcomes[0].evaluations, b.outcomes[0].evaluations);
    }

    #[test]
    fn test_best_tracking_keeps_incumbent_on_ties() {
        let dir = tempfile::tempdir().expect("tempdir");
        // 1x3 board with a don't-care blocker in the middle: a bulb on
        // either side scores exactly 1.
        let config = config_from_puzzle(&dir, "3\n1\n2 1 9\n");
        let mut driver = Driver::new(config).expect("driver");
        driver.best = Genotype::new();

        let mut incumbent = Genotype::with_bulbs([Coordinate::new(0, 0)].into_iter().collect());
        let mut challenger = Genotype::with_bulbs([Coordinate::new(0, 2)].into_iter().collect());

        driver.record(&mut incumbent);
        driver.record(&mut challenger);

        // Equal fitness must not replace the incumbent.
        assert_eq!(incumbent.fitness, challenger.fitness);
        assert_eq!(driver.best.bulbs, incumbent.bulbs);
    }

    #[test]
    fn test_random_search_respects_budget() {
        let mut config = test_config();
        config.experiment.max_evaluations = 30;

        let mut driver = Driver::new(config).expect("driver");
        let result = driver.random_search_with_callback(|_| {}).expect("search");

        let outcome = &result.outcomes[0];
        assert!(outcome.solved || outcome.evaluations >= 30);
    }

    #[test]
    fn test_crossover_empty_parent_yields_empty_child() {
        let mut rng = StdRng::seed_from_u64(5);
        let empty = BTreeSet::new();
        let full: BTreeSet<Coordinate> =
            [Coordinate::new(0, 0), Coordinate::new(2, 2)].into_iter().collect();

        let child = crossover_bulbs(&empty, &full, 3, 0.5, &mut rng);
        assert!(child.is_empty());
    }

    proptest! {
        #[test]
        fn prop_crossover_child_is_subset_of_parent_union(
            a_raw in proptest::collection::btree_set((0usize..10, 0usize..10), 0..12),
            b_raw in proptest::collection::btree_set((0usize..10, 0usize..10), 0..12),
            points in 1usize..5,
            bias in 0.0f64..=1.0,
            seed in any::<u64>(),
        ) {
            let a: BTreeSet<Coordinate> =
                a_raw.into_iter().map(|(x, y)| Coordinate::new(x, y)).collect();
            let b: BTreeSet<Coordinate> =
                b_raw.into_iter().map(|(x, y)| Coordinate::new(x, y)).collect();

            let mut rng = StdRng::seed_from_u64(seed);
            let child = crossover_bulbs(&a, &b, points, bias, &mut rng);

            prop_assert!(child.iter().all(|c| a.contains(c) || b.contains(c)));
        }
    }
}
