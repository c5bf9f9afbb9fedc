use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, ValueEnum};
use log::{error, info};

use taskpool::{AnyValue, PoolConfig, PoolError, PoolMode, Result, Task, ThreadPool};

const DEFAULT_TASKS: u64 = 5;
const DEFAULT_SPAN: u64 = 100_000_000;

#[derive(Parser)]
#[command(
    name = "range-sum",
    version,
    about = "Sums 1..=tasks*span by splitting it across a worker pool"
)]
struct Cli {
    /// Initial number of workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Scaling policy
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Maximum number of queued tasks
    #[arg(long, value_name = "N")]
    queue_capacity: Option<usize>,

    /// Maximum number of workers in cached mode
    #[arg(long, value_name = "N")]
    thread_ceiling: Option<usize>,

    /// Number of disjoint ranges to submit
    #[arg(long, default_value_t = DEFAULT_TASKS)]
    tasks: u64,

    /// Length of each range
    #[arg(long, default_value_t = DEFAULT_SPAN)]
    span: u64,

    /// JSON pool configuration; flags above override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Fixed,
    Cached,
}

impl From<Mode> for PoolMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Fixed => PoolMode::Fixed,
            Mode::Cached => PoolMode::Cached,
        }
    }
}

/// Sums the integers in `begin..=end`.
struct RangeSum {
    begin: u64,
    end: u64,
}

impl Task for RangeSum {
    fn run(&self) -> AnyValue {
        let mut sum: u64 = 0;
        for i in self.begin..=self.end {
            sum += i;
        }
        AnyValue::new(sum)
    }
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => PoolConfig::from_file(path)?,
        None => PoolConfig::default(),
    };
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    if let Some(capacity) = cli.queue_capacity {
        config.queue_capacity = capacity;
    }
    if let Some(ceiling) = cli.thread_ceiling {
        config.thread_ceiling = ceiling;
    }
    if cli.tasks == 0 || cli.span == 0 {
        return Err(PoolError::InvalidConfig(
            "tasks and span must be at least 1".to_owned(),
        ));
    }
    let workers = cli.workers.unwrap_or_else(num_cpus::get);

    info!("range-sum {}", env!("CARGO_PKG_VERSION"));
    info!(
        "{} workers, {:?} mode, {} tasks of {} numbers",
        workers, config.mode, cli.tasks, cli.span
    );

    let pool = ThreadPool::with_config(config)?;
    pool.start(workers)?;

    let results: Vec<_> = (0..cli.tasks)
        .map(|i| {
            pool.submit(RangeSum {
                begin: i * cli.span + 1,
                end: (i + 1) * cli.span,
            })
        })
        .collect();

    let mut total: u64 = 0;
    for result in &results {
        total += result.get_as::<u64>()?;
    }
    info!("Peak workers: {}", pool.stats().peak_workers);

    println!("total: {}", total);
    Ok(())
}
