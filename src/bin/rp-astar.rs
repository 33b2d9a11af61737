//! rp-astar - run grid A* and BFS over a binary map
//!
//! Loads a map, searches from `--start` to `--goal`, and prints the distance,
//! path length and elapsed time of each search.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rp_heap::grid::{Grid, MapError, Point};
use rp_heap::pathfinding::{self, Heuristic, Path};
use rp_heap::{Global, PoolAlloc, Type1, Type2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Astar,
    Bfs,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RankPolicy {
    Type1,
    Type2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeuristicArg {
    Manhattan,
    Octile,
    Zero,
}

impl From<HeuristicArg> for Heuristic {
    fn from(arg: HeuristicArg) -> Self {
        match arg {
            HeuristicArg::Manhattan => Heuristic::Manhattan,
            HeuristicArg::Octile => Heuristic::Octile,
            HeuristicArg::Zero => Heuristic::Zero,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "rp-astar", version, about = "Grid search on a rank-pairing heap")]
struct Cli {
    /// Binary map file (length byte, width byte, then width rows of length cells)
    map: PathBuf,

    /// Start cell as `x,y`
    #[arg(long)]
    start: Point,

    /// Goal cell as `x,y`
    #[arg(long)]
    goal: Point,

    /// Which search to run
    #[arg(long, value_enum, default_value = "astar")]
    algorithm: Algorithm,

    /// A* heuristic
    #[arg(long, value_enum, default_value = "manhattan")]
    heuristic: HeuristicArg,

    /// Rank-reduction policy used by decrease
    #[arg(long, value_enum, default_value = "type2")]
    rank: RankPolicy,

    /// Draw heap nodes from a block pool instead of the global allocator
    #[arg(long)]
    pool: bool,

    /// Print the map with the path drawn on it
    #[arg(long)]
    render: bool,

    /// Enable debug logging
    #[arg(short, long, env = "RP_ASTAR_VERBOSE")]
    verbose: bool,
}

fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose { "rp_heap=debug" } else { "rp_heap=warn" };
    let filter = EnvFilter::try_from_env("RP_HEAP_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .try_init()?;
    Ok(())
}

fn run_astar(cli: &Cli, grid: &Grid) -> Result<Option<Path>, MapError> {
    let heuristic = cli.heuristic.into();
    match (cli.pool, cli.rank) {
        (false, RankPolicy::Type2) => {
            pathfinding::astar_in::<_, Type2>(grid, cli.start, cli.goal, heuristic, Global)
        }
        (false, RankPolicy::Type1) => {
            pathfinding::astar_in::<_, Type1>(grid, cli.start, cli.goal, heuristic, Global)
        }
        (true, RankPolicy::Type2) => pathfinding::astar_in::<PoolAlloc<_>, Type2>(
            grid,
            cli.start,
            cli.goal,
            heuristic,
            PoolAlloc::new(),
        ),
        (true, RankPolicy::Type1) => pathfinding::astar_in::<PoolAlloc<_>, Type1>(
            grid,
            cli.start,
            cli.goal,
            heuristic,
            PoolAlloc::new(),
        ),
    }
}

fn report(name: &str, grid: &Grid, result: Option<Path>, started: Instant, render: bool) {
    let elapsed = started.elapsed();
    match result {
        Some(path) => {
            println!("{name}: total distance {:.4}", path.cost);
            println!("{name}: path length {}", path.points.len());
            if render {
                print!("{}", grid.render(&path.points));
            }
        }
        None => println!("{name}: no path"),
    }
    println!("{name}: took {}ms", elapsed.as_millis());
}

fn run(cli: &Cli) -> Result<(), MapError> {
    let grid = Grid::load(&cli.map)?;
    grid.check(cli.start)?;
    grid.check(cli.goal)?;

    if matches!(cli.algorithm, Algorithm::Astar | Algorithm::Both) {
        let started = Instant::now();
        let result = run_astar(cli, &grid)?;
        report("a*", &grid, result, started, cli.render);
    }
    if matches!(cli.algorithm, Algorithm::Bfs | Algorithm::Both) {
        let started = Instant::now();
        let result = pathfinding::bfs(&grid, cli.start, cli.goal)?;
        report("bfs", &grid, result, started, cli.render);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    tracing::debug!(?cli, "parsed arguments");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
