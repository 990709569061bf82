//! Main CLI application for the Sokoban SAT planner

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sokoban_sat::{
    board::{create_example_maps, load_board},
    config::{CliOverrides, PlanMode, SearchStrategy, Settings},
    sat::SatEncoder,
    search::{Plan, PlanValidator, SearchOutcome},
    solve_map,
    utils::{ColorOutput, PlanFormatter, ResultsTable},
};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sokoban_sat")]
#[command(about = "Bounded-horizon Sokoban planner on top of a SAT solver")]
#[command(version = "0.1.0")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Formulation and horizon strategy in one selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RunMode {
    /// Push mode, horizons one by one
    Linear,
    /// Push mode, strided horizons then bisection
    Binary,
    PullLinear,
    PullBinary,
}

impl RunMode {
    fn split(self) -> (PlanMode, SearchStrategy) {
        match self {
            RunMode::Linear => (PlanMode::Push, SearchStrategy::Linear),
            RunMode::Binary => (PlanMode::Push, SearchStrategy::Binary),
            RunMode::PullLinear => (PlanMode::Pull, SearchStrategy::Linear),
            RunMode::PullBinary => (PlanMode::Pull, SearchStrategy::Binary),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the shortest plan of a map
    Solve {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Map file (overrides config)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Run mode (overrides config)
        #[arg(short, long, value_enum)]
        run: Option<RunMode>,

        /// Largest horizon to try (overrides config)
        #[arg(long)]
        max_horizon: Option<usize>,

        /// Wall-clock budget in seconds (overrides config)
        #[arg(long)]
        timeout: Option<u64>,

        /// Disable tunnel macro clauses
        #[arg(long)]
        no_tunnels: bool,

        /// Results table to append to (overrides config)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Print the plan frame by frame
        #[arg(long)]
        render: bool,

        /// Save the plan to this file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show board analyses and encoding size for one horizon
    Analyze {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Map file (overrides config)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Horizon to size the encoding for
        #[arg(long, default_value_t = 10)]
        horizon: usize,

        /// Analyze the pull formulation
        #[arg(long)]
        pull: bool,
    },

    /// Write the formula of one horizon as DIMACS CNF
    Encode {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Map file (overrides config)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Horizon to encode
        #[arg(long)]
        horizon: usize,

        /// Encode the pull formulation
        #[arg(long)]
        pull: bool,

        /// Output DIMACS file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Check a saved JSON plan against a map and draw it
    Render {
        /// Configuration file path
        #[arg(short, long, default_value = "config/default.yaml")]
        config: PathBuf,

        /// Map file (overrides config)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Plan file written by `solve` in json format
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Create example configuration and map files
    Setup {
        /// Directory to create files in
        #[arg(short, long, default_value = ".")]
        directory: PathBuf,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Solve {
            config,
            map,
            run,
            max_horizon,
            timeout,
            no_tunnels,
            results,
            render,
            output,
        } => {
            let (mode, strategy) = run.map(RunMode::split).unzip();
            let overrides = CliOverrides {
                map_file: map,
                mode,
                strategy,
                max_horizon,
                timeout_seconds: timeout,
                no_tunnels,
                results_file: results,
                render,
            };
            solve_command(config, overrides, output, cli.verbose)
        }
        Commands::Analyze {
            config,
            map,
            horizon,
            pull,
        } => analyze_command(config, map, horizon, pull),
        Commands::Encode {
            config,
            map,
            horizon,
            pull,
            output,
        } => encode_command(config, map, horizon, pull, output),
        Commands::Render { config, map, plan } => render_command(config, map, plan).map(|_| ()),
        Commands::Setup { directory, force } => setup_command(directory, force),
    }
}

/// Settings from `config_path`, or defaults when the file is missing
fn load_settings(config_path: &Path) -> Result<Settings> {
    if config_path.exists() {
        Settings::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    } else {
        println!(
            "{}",
            ColorOutput::warning(&format!("Config file {} not found, using defaults", config_path.display()))
        );
        Ok(Settings::default())
    }
}

/// Settings for the single-horizon commands
fn horizon_settings(config_path: &Path, map: Option<PathBuf>, pull: bool) -> Result<Settings> {
    let mut settings = load_settings(config_path)?;
    let overrides = CliOverrides {
        map_file: map,
        mode: pull.then_some(PlanMode::Pull),
        ..Default::default()
    };
    settings.merge_with_cli(&overrides);
    Ok(settings)
}

fn solve_command(
    config_path: PathBuf,
    overrides: CliOverrides,
    plan_file: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    println!("{}", ColorOutput::info("Starting Sokoban SAT planner"));

    let mut settings = load_settings(&config_path)?;
    settings.merge_with_cli(&overrides);
    if plan_file.is_some() {
        settings.output.plan_file = plan_file;
    }

    if verbose {
        println!("Configuration:");
        println!("  Map file: {}", settings.input.map_file.display());
        println!("  Mode: {}", settings.search.mode);
        println!("  Strategy: {}", settings.search.strategy);
        println!(
            "  Horizons: {}..={}",
            settings.search.min_horizon, settings.search.max_horizon
        );
        println!("  Timeout: {}s", settings.search.timeout_seconds);
        println!();
    }

    settings.validate().context("Configuration validation failed")?;

    let outcome = solve_map(&settings).context("Failed to solve map")?;

    match &outcome {
        SearchOutcome::Solved { plan, horizon, attempts, elapsed } => {
            println!(
                "{}",
                ColorOutput::success(&format!(
                    "Found a plan of {} steps in {:.3}s ({} attempts)",
                    horizon,
                    elapsed.as_secs_f64(),
                    attempts
                ))
            );
            println!("\n{}", PlanFormatter::format_summary(plan));

            if settings.output.render {
                let board = load_board(&settings.input.map_file)?;
                println!("{}", PlanFormatter::format_plan(&board, plan));
            }

            if let Some(path) = &settings.output.plan_file {
                plan.save_to_file(path, settings.output.format)
                    .with_context(|| format!("Failed to save plan to {}", path.display()))?;
                println!("{}", ColorOutput::success(&format!("Plan saved to {}", path.display())));
            }
        }
        SearchOutcome::Exhausted { max_horizon, reason, .. } => {
            let message = match reason {
                Some(reason) => format!("No plan exists: {}", reason),
                None => format!("No plan within horizon {}", max_horizon),
            };
            println!("{}", ColorOutput::warning(&message));
        }
        SearchOutcome::TimedOut { last_horizon, .. } => {
            let reached = last_horizon.map_or_else(|| "none".to_string(), |h| h.to_string());
            println!(
                "{}",
                ColorOutput::warning(&format!("Timed out (last horizon tried: {})", reached))
            );
        }
    }

    if let Some(results) = &settings.output.results_file {
        let map_name = settings
            .input
            .map_file
            .file_name()
            .map_or_else(|| settings.input.map_file.display().to_string(), |name| name.to_string_lossy().into_owned());
        ResultsTable::append(results, &ResultsTable::row(&map_name, &outcome))?;
    }

    Ok(())
}

fn analyze_command(config_path: PathBuf, map: Option<PathBuf>, horizon: usize, pull: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Analyzing map..."));

    let settings = horizon_settings(&config_path, map, pull)?;
    let board = load_board(&settings.input.map_file)
        .with_context(|| format!("Failed to load map from {}", settings.input.map_file.display()))?;
    let encoder = SatEncoder::from_settings(board, &settings);
    let analysis = encoder.analysis();

    println!("Board ({}x{}):", encoder.board().rows, encoder.board().cols);
    println!("{}", encoder.board());
    println!("Analysis overlay (x dead, = tunnel, ~ pullable):");
    println!("{}", PlanFormatter::format_analysis(encoder.board(), analysis));

    println!("Board Statistics:");
    println!("  Walkable cells: {}", encoder.board().walkable().len());
    println!("  Players: {}", encoder.board().player_count());
    println!("  Boxes: {}", encoder.board().box_count());
    println!("  Targets: {}", encoder.board().targets().len());
    println!("  Dead cells: {}", analysis.deadlocks.len());
    println!("  Tunnels: {}", analysis.tunnels.len());
    if let Some(pullable) = &analysis.pullable {
        println!("  Pullable cells: {}", pullable.len());
    }

    if let Some(reason) = encoder.structural_obstacle() {
        println!("{}", ColorOutput::warning(&format!("Unsolvable at every horizon: {}", reason)));
    }

    println!("\n{}", encoder.estimate_complexity(horizon));
    let encoding = encoder.encode(horizon).context("Failed to build formula")?;
    println!("{}", encoding.statistics());

    Ok(())
}

fn encode_command(
    config_path: PathBuf,
    map: Option<PathBuf>,
    horizon: usize,
    pull: bool,
    output: PathBuf,
) -> Result<()> {
    let settings = horizon_settings(&config_path, map, pull)?;
    let board = load_board(&settings.input.map_file)
        .with_context(|| format!("Failed to load map from {}", settings.input.map_file.display()))?;
    let encoder = SatEncoder::from_settings(board, &settings);
    let encoding = encoder.encode(horizon).context("Failed to build formula")?;

    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    encoding
        .formula
        .write_dimacs(BufWriter::new(file), encoding.literals.variable_count())
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("{}", encoding.statistics());
    println!("{}", ColorOutput::success(&format!("Formula written to {}", output.display())));
    Ok(())
}

/// Returns whether the plan is legal on the map
fn render_command(config_path: PathBuf, map: Option<PathBuf>, plan_path: PathBuf) -> Result<bool> {
    let settings = horizon_settings(&config_path, map, false)?;
    let board = load_board(&settings.input.map_file)
        .with_context(|| format!("Failed to load map from {}", settings.input.map_file.display()))?;
    let plan = Plan::load_from_file(&plan_path)
        .with_context(|| format!("Failed to load plan from {}", plan_path.display()))?;

    let result = PlanValidator::new(&board).validate(&plan);
    if !result.is_valid {
        println!("{}", ColorOutput::error("Plan is invalid"));
        for violation in &result.violations {
            println!("  t={}: {}", violation.t, violation.description);
        }
        return Ok(false);
    }

    println!("{}", PlanFormatter::format_summary(&plan));
    println!("{}", PlanFormatter::format_plan(&board, &plan));
    println!(
        "{}",
        ColorOutput::success(&format!("Plan is valid ({} steps checked)", result.steps_checked))
    );
    Ok(true)
}

fn setup_command(directory: PathBuf, force: bool) -> Result<()> {
    println!("{}", ColorOutput::info("Setting up project structure..."));

    let config_dir = directory.join("config");
    let maps_dir = directory.join("input/maps");
    let output_dir = directory.join("output");

    for dir in [&config_dir, &maps_dir, &output_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    let config_path = config_dir.join("default.yaml");
    if !config_path.exists() || force {
        let mut default_settings = Settings::default();
        default_settings.input.map_file = maps_dir.join("straight.txt");
        default_settings.output.results_file = Some(output_dir.join("results.txt"));
        default_settings.to_file(&config_path)
            .context("Failed to create default configuration")?;
        println!("Created: {}", config_path.display());
    } else {
        println!("Skipped: {} (already exists)", config_path.display());
    }

    create_example_maps(&maps_dir).context("Failed to create example maps")?;
    println!("Created example maps in: {}", maps_dir.display());

    let examples_dir = config_dir.join("presets");
    std::fs::create_dir_all(&examples_dir)?;

    let mut pull_config = Settings::default();
    pull_config.search.mode = PlanMode::Pull;
    pull_config.input.map_file = maps_dir.join("pull.txt");
    pull_config.to_file(examples_dir.join("pull.yaml"))?;

    let mut corridor_config = Settings::default();
    corridor_config.search.strategy = SearchStrategy::Binary;
    corridor_config.input.map_file = maps_dir.join("corridor.txt");
    corridor_config.to_file(examples_dir.join("corridor.yaml"))?;

    println!("Created preset configurations in: {}", examples_dir.display());

    println!("\n{}", ColorOutput::success("Setup complete!"));
    println!("\nNext steps:");
    println!("1. Add your maps to {}", maps_dir.display());
    println!("2. Run: sokoban_sat solve --config {}", config_path.display());

    Ok(())
}
