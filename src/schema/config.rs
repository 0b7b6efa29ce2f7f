//! Configuration types for the evolutionary puzzle search.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_dont_care_value() -> u8 {
    5
}
fn default_max_placement_attempts() -> usize {
    100
}
fn default_black_square_prob() -> f64 {
    0.2
}
fn default_bulb_prob() -> f64 {
    0.3
}
fn default_quota_weights() -> Vec<f64> {
    vec![0.3, 0.25, 0.2, 0.15, 0.1]
}
fn default_max_generation_attempts() -> usize {
    1000
}
fn default_population_size() -> usize {
    50
}
fn default_offspring_size() -> usize {
    25
}
fn default_parent_pool_size() -> usize {
    20
}
fn default_crossover_points() -> usize {
    2
}
fn default_crossover_bias() -> f64 {
    0.5
}
fn default_mutation_probability() -> f64 {
    0.3
}
fn default_placement_failure_limit() -> usize {
    5
}
fn default_mutation_failure_limit() -> usize {
    5
}
fn default_runs() -> usize {
    1
}
fn default_max_evaluations() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}

/// Top-level solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Puzzle source and rule settings.
    pub puzzle: PuzzleConfig,
    /// Evolutionary search parameters.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Experiment run and budget settings.
    #[serde(default)]
    pub experiment: ExperimentConfig,
    /// Output file paths. Omitted paths suppress the corresponding file.
    #[serde(default)]
    pub output: OutputConfig,
    /// Random seed for reproducibility. Unset draws from entropy.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            puzzle: PuzzleConfig::default(),
            evolution: EvolutionConfig::default(),
            experiment: ExperimentConfig::default(),
            output: OutputConfig::default(),
            random_seed: None,
        }
    }
}

/// Puzzle instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleConfig {
    /// Where the board comes from.
    #[serde(default)]
    pub source: PuzzleSource,
    /// Raw quota value that marks a black square as exempt from quota
    /// enforcement. Must exceed 4, the maximum possible adjacency.
    #[serde(default = "default_dont_care_value")]
    pub dont_care_value: u8,
    /// Whether concrete quotas participate in solution validity.
    #[serde(default = "default_true")]
    pub enforce_adjacency_quotas: bool,
    /// Random coordinate draws per random bulb placement.
    #[serde(default = "default_max_placement_attempts")]
    pub max_placement_attempts: usize,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            source: PuzzleSource::default(),
            dont_care_value: default_dont_care_value(),
            enforce_adjacency_quotas: true,
            max_placement_attempts: default_max_placement_attempts(),
        }
    }
}

/// Where the puzzle instance comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PuzzleSource {
    /// Parse a puzzle definition file.
    File { path: PathBuf },
    /// Generate a random solvable instance.
    Random(BoardGenConfig),
}

impl Default for PuzzleSource {
    fn default() -> Self {
        Self::Random(BoardGenConfig::default())
    }
}

/// Random board generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardGenConfig {
    /// Board dimensions: fixed or drawn per attempt.
    #[serde(default)]
    pub dimensions: DimensionSpec,
    /// Probability that a visited cell becomes a black square.
    #[serde(default = "default_black_square_prob")]
    pub black_square_prob: f64,
    /// Probability that a visited cell becomes a scratch bulb.
    #[serde(default = "default_bulb_prob")]
    pub bulb_prob: f64,
    /// Weight of each quota target value; index is the target. The list
    /// length fixes the don't-care sentinel of generated boards.
    #[serde(default = "default_quota_weights")]
    pub quota_weights: Vec<f64>,
    /// Bound on full regeneration attempts before giving up.
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: usize,
}

impl Default for BoardGenConfig {
    fn default() -> Self {
        Self {
            dimensions: DimensionSpec::default(),
            black_square_prob: default_black_square_prob(),
            bulb_prob: default_bulb_prob(),
            quota_weights: default_quota_weights(),
            max_generation_attempts: default_max_generation_attempts(),
        }
    }
}

/// Board dimension selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum DimensionSpec {
    /// Always this shape.
    Fixed { rows: usize, cols: usize },
    /// Rows and columns drawn uniformly from `min..=max` per attempt.
    Random { min: usize, max: usize },
}

impl Default for DimensionSpec {
    fn default() -> Self {
        Self::Random { min: 6, max: 10 }
    }
}

/// Evolutionary loop parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population size μ.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Offspring pool size λ.
    #[serde(default = "default_offspring_size")]
    pub offspring_size: usize,
    /// Number of parents drawn each generation.
    #[serde(default = "default_parent_pool_size")]
    pub parent_pool_size: usize,
    /// Parent selection strategy.
    #[serde(default)]
    pub parent_selection: ParentSelection,
    /// Survivor selection strategy.
    #[serde(default)]
    pub survivor_selection: SurvivorSelection,
    /// Cut count for n-point crossover.
    #[serde(default = "default_crossover_points")]
    pub crossover_points: usize,
    /// Probability that a crossover segment comes from the first parent.
    #[serde(default = "default_crossover_bias")]
    pub crossover_bias: f64,
    /// Probability that a child is mutated.
    #[serde(default = "default_mutation_probability")]
    pub mutation_probability: f64,
    /// Seed every genotype with the quota-forced bulbs before random fill.
    #[serde(default = "default_true")]
    pub seed_forced_bulbs: bool,
    /// Consecutive failed random placements that end initial bulb fill.
    #[serde(default = "default_placement_failure_limit")]
    pub placement_failure_limit: usize,
    /// Failed re-placement rounds tolerated during mutation.
    #[serde(default = "default_mutation_failure_limit")]
    pub mutation_failure_limit: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            offspring_size: default_offspring_size(),
            parent_pool_size: default_parent_pool_size(),
            parent_selection: ParentSelection::default(),
            survivor_selection: SurvivorSelection::default(),
            crossover_points: default_crossover_points(),
            crossover_bias: default_crossover_bias(),
            mutation_probability: default_mutation_probability(),
            seed_forced_bulbs: true,
            placement_failure_limit: default_placement_failure_limit(),
            mutation_failure_limit: default_mutation_failure_limit(),
        }
    }
}

fn default_tournament_size() -> usize {
    3
}

/// Parent selection strategy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ParentSelection {
    /// Roulette wheel weighted by fitness ratio, with replacement.
    FitnessProportional,
    /// k-tournament, with replacement.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
}

impl Default for ParentSelection {
    fn default() -> Self {
        Self::FitnessProportional
    }
}

/// Survivor selection strategy over the combined μ+λ pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SurvivorSelection {
    /// Keep the μ best by fitness ratio.
    Truncation,
    /// k-tournament; each winner leaves the pool.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
}

impl Default for SurvivorSelection {
    fn default() -> Self {
        Self::Truncation
    }
}

/// Experiment-level run and budget settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of independent runs.
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// Fitness evaluation budget per run.
    #[serde(default = "default_max_evaluations")]
    pub max_evaluations: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            max_evaluations: default_max_evaluations(),
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Run log destination.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Best-solution file destination.
    #[serde(default)]
    pub solution_file: Option<PathBuf>,
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("population size (mu) must be non-zero")]
    ZeroPopulation,
    #[error("offspring size (lambda) must be non-zero")]
    ZeroOffspring,
    #[error("parent pool size must be non-zero")]
    ZeroParentPool,
    #[error("crossover point count must be non-zero")]
    ZeroCrossoverPoints,
    #[error("tournament size must be non-zero")]
    ZeroTournamentSize,
    #[error("{name} must lie in [0, 1], got {value}")]
    ProbabilityRange { name: &'static str, value: f64 },
    #[error("don't-care value must exceed the maximum adjacency quota of 4")]
    DontCareTooSmall,
    #[error("quota weights must be non-empty, at most {max} entries, got {actual}")]
    QuotaWeightCount { max: usize, actual: usize },
    #[error("quota weights must be non-negative with a positive sum")]
    QuotaWeightRange,
    #[error("board dimensions must be non-zero with min <= max")]
    InvalidDimensions,
    #[error("max board generation attempts must be non-zero")]
    ZeroGenerationAttempts,
    #[error("max bulb placement attempts must be non-zero")]
    ZeroPlacementAttempts,
    #[error("experiment must have at least one run")]
    ZeroRuns,
    #[error("evaluation budget must be non-zero")]
    ZeroEvaluationBudget,
}

impl SolverConfig {
    /// Validate every parameter before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.puzzle.validate()?;
        self.evolution.validate()?;

        if self.experiment.runs == 0 {
            return Err(ConfigError::ZeroRuns);
        }
        if self.experiment.max_evaluations == 0 {
            return Err(ConfigError::ZeroEvaluationBudget);
        }

        Ok(())
    }
}

impl PuzzleConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.dont_care_value <= 4 {
            return Err(ConfigError::DontCareTooSmall);
        }
        if self.max_placement_attempts == 0 {
            return Err(ConfigError::ZeroPlacementAttempts);
        }

        if let PuzzleSource::Random(gen_config) = &self.source {
            gen_config.validate(self.dont_care_value)?;
        }

        Ok(())
    }
}

impl BoardGenConfig {
    fn validate(&self, dont_care_value: u8) -> Result<(), ConfigError> {
        match self.dimensions {
            DimensionSpec::Fixed { rows, cols } => {
                if rows == 0 || cols == 0 {
                    return Err(ConfigError::InvalidDimensions);
                }
            }
            DimensionSpec::Random { min, max } => {
                if min == 0 || min > max {
                    return Err(ConfigError::InvalidDimensions);
                }
            }
        }

        probability("black_square_prob", self.black_square_prob)?;
        probability("bulb_prob", self.bulb_prob)?;

        // Quota targets must stay below the don't-care sentinel.
        if self.quota_weights.is_empty() || self.quota_weights.len() > dont_care_value as usize {
            return Err(ConfigError::QuotaWeightCount {
                max: dont_care_value as usize,
                actual: self.quota_weights.len(),
            });
        }
        if self.quota_weights.iter().any(|&w| w < 0.0 || !w.is_finite())
            || self.quota_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(ConfigError::QuotaWeightRange);
        }

        if self.max_generation_attempts == 0 {
            return Err(ConfigError::ZeroGenerationAttempts);
        }

        Ok(())
    }
}

impl EvolutionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::ZeroPopulation);
        }
        if self.offspring_size == 0 {
            return Err(ConfigError::ZeroOffspring);
        }
        if self.parent_pool_size == 0 {
            return Err(ConfigError::ZeroParentPool);
        }
        if self.crossover_points == 0 {
            return Err(ConfigError::ZeroCrossoverPoints);
        }

        if let ParentSelection::Tournament { size: 0 } = self.parent_selection {
            return Err(ConfigError::ZeroTournamentSize);
        }
        if let SurvivorSelection::Tournament { size: 0 } = self.survivor_selection {
            return Err(ConfigError::ZeroTournamentSize);
        }

        probability("crossover_bias", self.crossover_bias)?;
        probability("mutation_probability", self.mutation_probability)?;

        Ok(())
    }
}

fn probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) || !value.is_finite() {
        return Err(ConfigError::ProbabilityRange { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        SolverConfig::default().validate().expect("default config");
    }

    #[test]
    fn test_rejects_zero_population() {
        let mut config = SolverConfig::default();
        config.evolution.population_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroPopulation)
        ));
    }

    #[test]
    fn test_rejects_out_of_range_probability() {
        let mut config = SolverConfig::default();
        config.evolution.mutation_probability = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbabilityRange {
                name: "mutation_probability",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_small_dont_care_value() {
        let mut config = SolverConfig::default();
        config.puzzle.dont_care_value = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DontCareTooSmall)
        ));
    }

    #[test]
    fn test_rejects_oversized_quota_weights() {
        let mut config = SolverConfig::default();
        let PuzzleSource::Random(gen_config) = &mut config.puzzle.source else {
            panic!("default source is random");
        };
        gen_config.quota_weights = vec![1.0; 6];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::QuotaWeightCount { max: 5, actual: 6 })
        ));
    }

    #[test]
    fn test_rejects_inverted_dimension_bounds() {
        let mut config = SolverConfig::default();
        let PuzzleSource::Random(gen_config) = &mut config.puzzle.source else {
            panic!("default source is random");
        };
        gen_config.dimensions = DimensionSpec::Random { min: 9, max: 6 };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = SolverConfig::default();
        let json = serde_json::to_string_pretty(&config).expect("serialize");
        let parsed: SolverConfig = serde_json::from_str(&json).expect("deserialize");
        parsed.validate().expect("round-tripped config");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{
            "puzzle": { "source": { "type": "File", "path": "puzzles/a1.txt" } },
            "evolution": { "population_size": 10 }
        }"#;
        let config: SolverConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(config.evolution.population_size, 10);
        assert_eq!(config.evolution.offspring_size, default_offspring_size());
        assert!(config.puzzle.enforce_adjacency_quotas);
        assert!(matches!(config.puzzle.source, PuzzleSource::File { .. }));
    }
}
