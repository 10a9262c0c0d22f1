use crate::config::{CliOverrides, Config};
use crate::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "potgather")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect translatable strings from a source tree into one gettext template")]
#[command(
    long_about = "potgather walks the given search paths, hands every source file to the \
                  first extractor that understands its format, and merges the partial \
                  catalogs into a single .pot template."
)]
#[command(after_help = "EXAMPLES:\n  \
    potgather src\n  \
    potgather src data --exclude src/vendor,'*.min.js' --output po/app.pot\n  \
    potgather --dry-run\n  \
    potgather --config potgather.toml --report -v")]
pub struct Cli {
    /// Directories or files to scan, relative to the current directory
    #[arg(value_name = "SEARCH_PATHS")]
    pub search_paths: Vec<String>,

    /// Paths or wildcard patterns to leave out (comma-separated)
    #[arg(short = 'x', long, value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Template file to write
    #[arg(short, long, help = "Output template path (default: messages.pot)")]
    pub output: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    #[arg(long, help = "Overwrite an existing output file")]
    pub force: bool,

    #[arg(long, help = "Write a JSON run report next to the template")]
    pub report: bool,

    /// Deadline for each external tool run
    #[arg(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Timeout for each extractor or merge run (seconds)"
    )]
    pub timeout: Option<u64>,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    #[arg(long, help = "List the files and extractor assignments without running any tool")]
    pub dry_run: bool,

    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        let search_paths = (!self.search_paths.is_empty()).then(|| self.search_paths.clone());

        CliOverrides::new()
            .with_search_paths(search_paths)
            .with_exclude(self.exclude.clone())
            .with_output(self.output.clone())
            .with_overwrite(self.force.then_some(true))
            .with_report(self.report.then_some(true))
            .with_timeout(self.timeout)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Diagnostic level for the tracing subscriber.
    pub fn log_level(&self) -> Level {
        match self.verbosity_level() {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
