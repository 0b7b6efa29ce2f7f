//! Akari solver CLI - run the evolutionary search from a JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use akari_evo::report::{RunLog, save_solution};
use akari_evo::{Driver, SolverConfig};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Run the evolutionary Light-Up solver from a JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to solver configuration file");
        eprintln!();
        eprintln!("Print an example configuration with the --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: SolverConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    let output = config.output.clone();
    let enforce_quotas = config.puzzle.enforce_adjacency_quotas;
    let dont_care_value = config.puzzle.dont_care_value;
    let runs = config.experiment.runs;

    let mut driver = Driver::new(config).unwrap_or_else(|e| {
        eprintln!("Error setting up the search: {}", e);
        std::process::exit(1);
    });

    let mut run_log = match &output.log_file {
        Some(path) => Some(RunLog::create(path).unwrap_or_else(|e| {
            eprintln!("Error creating run log: {}", e);
            std::process::exit(1);
        })),
        None => None,
    };

    println!("Light-Up Evolutionary Search");
    println!("============================");
    println!(
        "Board: {}x{} ({} black squares)",
        driver.board().num_rows(),
        driver.board().num_cols(),
        driver.board().black_squares().len()
    );
    println!("Runs: {}", runs);
    println!();

    let start = Instant::now();

    let result = driver
        .run_with_callback(|progress| {
            if let Some(log) = run_log.as_mut() {
                if let Err(e) = log.record(progress) {
                    eprintln!("Error writing run log: {}", e);
                    std::process::exit(1);
                }
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Error during the search: {}", e);
            std::process::exit(1);
        });

    if let Some(log) = run_log.as_mut() {
        if let Err(e) = log.flush() {
            eprintln!("Error writing run log: {}", e);
            std::process::exit(1);
        }
    }

    let elapsed = start.elapsed();

    for outcome in &result.outcomes {
        println!(
            "Run {}: {} generations, {} evaluations, best ratio {:.4}{}",
            outcome.run,
            outcome.generations,
            outcome.evaluations,
            outcome.best_fitness_ratio,
            if outcome.solved { " (solved)" } else { "" }
        );
    }
    println!();

    let evaluation = result
        .best_board
        .check_valid_solution(&result.best.bulbs, enforce_quotas);

    println!("Best solution:");
    println!(
        "  Fitness: {}/{}",
        result.best.fitness,
        result.best_board.total_non_black()
    );
    println!(
        "  Valid: {} ({} shined squares)",
        evaluation.valid,
        evaluation.fitness()
    );
    println!();
    println!("{}", result.best_board.render(&result.best.bulbs));
    println!("Time: {:.2}s", elapsed.as_secs_f32());

    if let Some(path) = &output.solution_file {
        save_solution(
            path,
            &result.best_board,
            &result.best.bulbs,
            evaluation.fitness(),
            dont_care_value,
        )
        .unwrap_or_else(|e| {
            eprintln!("Error writing solution file: {}", e);
            std::process::exit(1);
        });
        println!("Solution written to {}", path.display());
    }
}

fn print_example_config() {
    let config = SolverConfig::default();

    println!("Example configuration (config.json):");
    println!(
        "{}",
        serde_json::to_string_pretty(&config).expect("default config serializes")
    );
}
