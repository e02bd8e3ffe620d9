// main.rs - Conway's Game of Life on a torus split across a ring of workers
//
// The workers run as tasks on a tokio runtime; this thread is the display.

use clap::Parser;
use ring_life::{ComputeGroup, ConfigError, GridDims, LifeError, Pattern, SimConfig, Stage};
use tracing::info;

mod error;
mod headless;
mod logging;
mod patterns;
mod ui;

use error::CliError;
use patterns::PatternCatalog;

#[derive(Parser, Debug)]
#[command(name = "ring_life")]
#[command(about = "Conway's Game of Life on a torus, computed by a ring of workers", long_about = None)]
struct Args {
    /// Named initial pattern (see --list-patterns)
    #[arg(default_value = "glider")]
    pattern: String,

    /// Display width in pixels
    #[arg(default_value_t = 800)]
    resx: u32,

    /// Display height in pixels
    #[arg(default_value_t = 800)]
    resy: u32,

    /// Number of compute workers
    #[arg(short, long, default_value_t = 2)]
    workers: usize,

    /// Stop the simulation after this many generations
    #[arg(long)]
    generations: Option<u64>,

    /// Seed for --random (each worker offsets it by its rank)
    #[arg(long)]
    seed: Option<u64>,

    /// Ignore PATTERN and fill the grid at random
    #[arg(long, requires_all = ["rows", "cols"])]
    random: bool,

    /// Grid rows for --random
    #[arg(long, requires = "random")]
    rows: Option<usize>,

    /// Grid columns for --random
    #[arg(long, requires = "random")]
    cols: Option<usize>,

    /// Run without a window, pulling --frames snapshots
    #[arg(long)]
    headless: bool,

    /// Frames to pull in headless mode
    #[arg(long, default_value_t = 10)]
    frames: u64,

    /// Print the last headless frame as text
    #[arg(long, requires = "headless")]
    print_final: bool,

    /// List the built-in patterns and exit
    #[arg(long)]
    list_patterns: bool,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        err.exit();
    }
}

fn run(args: Args) -> Result<(), CliError> {
    logging::init_logging()?;

    let catalog = PatternCatalog::builtin();
    if args.list_patterns {
        for name in catalog.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let (label, pattern) = resolve_pattern(&args, &catalog)?;
    let dims = match &pattern {
        Some(pattern) => pattern.dims,
        None => random_dims(&args)?,
    };
    info!(pattern = %label, rows = dims.rows, cols = dims.cols, resx = args.resx, resy = args.resy, "Starting");

    let config = SimConfig {
        dims,
        workers: args.workers,
        max_generations: args.generations,
        seed: args.seed,
    };

    let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
    let (group, link) = ComputeGroup::spawn(runtime.handle(), &config, pattern.as_ref())?;

    if args.headless {
        let last = headless::run_headless(link, args.frames)
            .map_err(|source| LifeError::Communication { stage: Stage::Bridge, source })?;
        if let (true, Some(grid)) = (args.print_final, last) {
            print!("{}", grid.to_text());
        }
    } else {
        let title = format!("Conway's Game of Life - {label}");
        ui::run_window(link, &title, args.resx, args.resy)?;
    }

    let report = runtime.block_on(group.join())?;
    info!(
        generations = report.generations,
        frames = report.frames_served,
        population = report.snapshot.population(),
        "Simulation finished"
    );
    Ok(())
}

fn resolve_pattern(args: &Args, catalog: &PatternCatalog) -> Result<(String, Option<Pattern>), ConfigError> {
    if args.random {
        return Ok(("random".to_string(), None));
    }
    let pattern = catalog.lookup(&args.pattern)?;
    Ok((args.pattern.clone(), Some(pattern)))
}

fn random_dims(args: &Args) -> Result<GridDims, ConfigError> {
    GridDims::new(args.rows.unwrap_or(0), args.cols.unwrap_or(0))
}
