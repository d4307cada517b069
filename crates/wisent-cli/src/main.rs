/// Wisent command-line tool: decode data packages published in shared
/// memory by the Wisent load service, or raw buffer dumps on disk.
///
/// # Command overview
///
/// ```text
/// wisent <COMMAND> [OPTIONS]
///
/// Commands:
///   eager      Load a dataset, materialize it, print the tree or a column sum
///   lazy       Load a dataset and sum a column through a lazy view
///   inspect    Decode a buffer dump from disk (no service needed)
///   help       Print help information
///
/// Global options:
///   -v, --verbose    Log session events (honours RUST_LOG)
///   -q, --quiet      Log nothing
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                           |
/// |------|---------------------------------------------------|
/// | 0    | Success                                           |
/// | 1    | Error (service, shared memory, or decode failure) |
///
/// Results go to stdout; logs and errors go to stderr.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use wisent_session::SessionConfig;

mod cmd_eager;
mod cmd_inspect;
mod cmd_lazy;
mod output;

// ── CLI root ──────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "wisent", version, about = "Wisent buffer decoder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log session events at info level, or as RUST_LOG says.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all logging.
    #[arg(short, long, global = true)]
    quiet: bool,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset and decode it eagerly into a value tree.
    Eager(EagerArgs),
    /// Load a dataset and aggregate a column through a lazy view.
    Lazy(LazyArgs),
    /// Decode a raw buffer dump from a file.
    Inspect(InspectArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Where to find the load service and which dataset to ask it for.
///
/// ```text
/// ┌──────────────┬──────────────────────────────────────────────────────┐
/// │ Flag         │ Default                                              │
/// ├──────────────┼──────────────────────────────────────────────────────┤
/// │ --server     │ http://localhost:3000                                │
/// │ --name       │ datapackage (also the shared memory region name)     │
/// │ --data-dir   │ ../Data/owid-deaths/                                 │
/// │ --suffix     │ none; `_10x` loads datapackage_10x.json              │
/// │ --no-csv     │ off; set to keep CSV resources as paths              │
/// └──────────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct SessionArgs {
    /// Base URL of the load service.
    #[arg(long, default_value = "http://localhost:3000")]
    pub server: String,

    /// Dataset name; the service publishes it under the same region name.
    #[arg(long, default_value = "datapackage")]
    pub name: String,

    /// Directory containing the dataset descriptor.
    #[arg(long, default_value = "../Data/owid-deaths/")]
    pub data_dir: PathBuf,

    /// Suffix selecting an alternative dataset file.
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// Do not ask the service to load CSV resources into tables.
    #[arg(long)]
    pub no_csv: bool,
}

impl SessionArgs {
    pub fn to_config(&self) -> SessionConfig {
        SessionConfig {
            server_url: self.server.clone(),
            dataset_name: self.name.clone(),
            data_dir: self.data_dir.clone(),
            suffix: self.suffix.clone(),
            load_csv: !self.no_csv,
        }
    }
}

/// Arguments for `wisent eager`.
#[derive(clap::Args)]
pub struct EagerArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Sum this column of the first resource instead of printing the tree.
    #[arg(long)]
    pub column: Option<String>,

    /// Print the tree as JSON.
    #[arg(long, conflicts_with = "column")]
    pub json: bool,
}

/// Arguments for `wisent lazy`.
#[derive(clap::Args)]
pub struct LazyArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Column of the first resource to sum.
    #[arg(long, default_value = "Accidents (excl. road) - Death Rates")]
    pub column: String,
}

/// Arguments for `wisent inspect`.
///
/// Reads the whole file, prints the header counts and region sizes, then
/// the decoded tree.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to a raw buffer dump.
    pub file: PathBuf,

    /// Walk the tree through lazy views instead of the eager decoder.
    #[arg(long)]
    pub lazy: bool,

    /// Print the tree as JSON.
    #[arg(long)]
    pub json: bool,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("off")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match cli.command {
        Commands::Eager(args) => cmd_eager::run(&args),
        Commands::Lazy(args) => cmd_lazy::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}
