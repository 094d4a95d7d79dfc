// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/audit.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/audit.yaml --seed 0x1234... --trials 20

mod compare;

use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simple_logger::SimpleLogger;

use compare::stats::print_table;
use compare::{run_trials, ScenarioFile};

struct Options {
    path: PathBuf,
    seed: Option<[u8; 32]>,
    trials: Option<usize>,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX] [--trials N]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/audit.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/history.yaml --seed 0x123456...", args[0]);
        std::process::exit(1);
    }

    if let Err(e) = SimpleLogger::new().with_level(LevelFilter::Warn).init() {
        eprintln!("logger: {}", e);
    }

    let options = match parse_options(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = if options.path.is_file() {
        run_scenario_file(&options.path, &options)
    } else if options.path.is_dir() {
        run_scenario_directory(&options.path, &options)
    } else {
        Err(format!("Path does not exist: {}", options.path.display()).into())
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_options(args: &[String]) -> Result<Options, Box<dyn Error>> {
    let mut options = Options {
        path: PathBuf::from(&args[1]),
        seed: None,
        trials: None,
    };

    let mut rest = args[2..].iter();
    while let Some(flag) = rest.next() {
        let value = rest.next().ok_or_else(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "--seed" => options.seed = Some(parse_seed_hex(value)?),
            "--trials" => options.trials = Some(value.parse()?),
            other => return Err(format!("unknown option {}", other).into()),
        }
    }
    Ok(options)
}

fn run_scenario_directory(dir: &Path, options: &Options) -> Result<(), Box<dyn Error>> {
    let mut scenarios: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| matches!(path.extension().and_then(|s| s.to_str()), Some("yaml" | "yml")))
        .collect();
    scenarios.sort();

    if scenarios.is_empty() {
        return Err(format!("No .yaml files found in {}", dir.display()).into());
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                  ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, options)?;
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    Ok(())
}

fn run_scenario_file(path: &Path, options: &Options) -> Result<(), Box<dyn Error>> {
    println!("Loading scenario from: {}", path.display());
    let scenario = ScenarioFile::load(path)?;

    println!("\n╔════════════════════════════════════════════════════════╗");
    let title = scenario.meta.name.clone().unwrap_or_else(|| {
        format!(
            "Scenario: {}",
            path.file_stem().and_then(|s| s.to_str()).unwrap_or("?")
        )
    });
    println!("║  {:<54}║", title);
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }
    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let config = &scenario.config;
    let trials = options.trials.unwrap_or(scenario.trials);

    println!("Configuration:");
    println!("  Nodes: {}", config.node_count);
    println!("  Free-riders: {:.0}%", config.free_rider_ratio * 100.0);
    println!("  Topology: {:?}", config.topology);
    println!("  Relay: {:?}, delay {:?}", config.relay_strategy, config.relay_delay);
    println!("  Punishment: {:?}", config.incentive.punishment);
    println!("  Horizon: {}, broadcasts: {}", config.horizon, config.broadcasts);
    println!("  Trials: {}", trials);
    println!("\nStarting simulation...\n");

    let averages = run_trials(config, &scenario.policies, trials, options.seed)?;
    print_table(&averages);

    println!("✓ Scenario complete!\n");
    Ok(())
}

fn parse_seed_hex(hex: &str) -> Result<[u8; 32], Box<dyn Error>> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut seed = [0u8; 32];

    for (i, chunk) in hex.as_bytes().chunks(2).take(32).enumerate() {
        let byte_str = std::str::from_utf8(chunk)?;
        seed[i] = u8::from_str_radix(byte_str, 16)?;
    }

    Ok(seed)
}
