//! Command-line interface for classscan.

use std::fs::File;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use crate::config::{ScanConfig, SyntaxErrorPolicy, DEFAULT_CONFIG_NAMES};
use crate::report;
use crate::scan::Scanner;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Config written by `classscan init`.
const CONFIG_TEMPLATE: &str = include_str!("templates/classscan.yaml");

/// Extract class metadata from Python source trees without running them.
///
/// Every class definition found is reported with its bases, docstring,
/// decorators, attribute values and method signatures. Literal values
/// are rebuilt from the syntax tree; anything else is kept as source text.
#[derive(Parser)]
#[command(name = "classscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan directories for class definitions
    Scan(ScanArgs),
    /// Write a default classscan.yaml
    Init(InitArgs),
}

/// Arguments for the scan command.
#[derive(Parser)]
pub struct ScanArgs {
    /// Directories to scan (default: `roots` from the config)
    pub paths: Vec<PathBuf>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Keep only classes with a base whose name contains this marker
    #[arg(short, long)]
    pub marker: Option<String>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// What to do with files containing syntax errors: skip, report or recover
    #[arg(long)]
    pub syntax_errors: Option<SyntaxErrorPolicy>,

    /// Glob pattern for paths to leave out (repeatable)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Scan files in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Write output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "classscan.yaml")]
    pub output: PathBuf,
}

/// Install the stderr log subscriber.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Load the config named on the command line, or the discovered one, or
/// the defaults.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<ScanConfig> {
    if let Some(path) = explicit {
        return ScanConfig::parse_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e));
    }
    match ScanConfig::discover(Path::new(".")) {
        Some(path) => {
            debug!(config = %path.display(), "Using discovered config");
            ScanConfig::parse_file(&path)
                .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))
        }
        None => Ok(ScanConfig::default()),
    }
}

/// Fold command-line flags over a config. Flags win.
pub fn apply_args(mut config: ScanConfig, args: &ScanArgs) -> ScanConfig {
    if !args.paths.is_empty() {
        config.roots = args.paths.clone();
    }
    if args.marker.is_some() {
        config.marker_base = args.marker.clone();
    }
    if let Some(policy) = args.syntax_errors {
        config.syntax_errors = policy;
    }
    config.exclude.extend(args.exclude.iter().cloned());
    config.parallel |= args.parallel;
    config
}

/// Run the scan command.
pub fn run_scan(args: &ScanArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        anyhow::bail!("invalid format {:?}, must be 'pretty' or 'json'", args.format);
    }

    let config = apply_args(load_config(args.config.as_deref())?, args);
    if config.roots.is_empty() {
        anyhow::bail!(
            "no folders to scan: pass paths or set `roots` in {}",
            DEFAULT_CONFIG_NAMES.join(" or ")
        );
    }

    let scanner = Scanner::from_config(&config)?;
    let result = scanner.scan();

    match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            write_result(&result, &args.format, &mut out, false)?;
            out.flush()?;
            info!(output = %path.display(), "Wrote scan result");
        }
        None => {
            let stdout = io::stdout();
            let color = stdout.is_terminal();
            let mut out = stdout.lock();
            write_result(&result, &args.format, &mut out, color)?;
        }
    }

    Ok(EXIT_SUCCESS)
}

fn write_result<W: Write>(
    result: &crate::scan::ScanResult,
    format: &str,
    out: &mut W,
    color: bool,
) -> anyhow::Result<()> {
    match format {
        "json" => report::write_json(result, out),
        _ => report::write_pretty(result, out, color),
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("failed to create directory: {}", e))?;
        }
    }

    std::fs::write(&args.output, CONFIG_TEMPLATE)
        .map_err(|e| anyhow::anyhow!("failed to write config: {}", e))?;

    println!("Created {}", args.output.display());
    Ok(EXIT_SUCCESS)
}
