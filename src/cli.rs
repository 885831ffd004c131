use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "reportzip")]
#[command(version)]
#[command(about = "Generate report archives and slice them into CSV files", long_about = None)]
#[command(after_help = "Examples:\n  \
  reportzip generate -d data -n 50         write data/archive_0.zip .. archive_49.zip\n  \
  reportzip extract -d data -w 4           write data/first.csv and data/second.csv\n  \
  reportzip run -d data --stored           generate, then extract")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose logging
    #[arg(short = 'v', global = true)]
    pub verbose: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate report archives
    Generate {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        generate: GenerateArgs,
    },
    /// Extract all archives into first.csv and second.csv
    Extract {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        extract: ExtractArgs,
    },
    /// Generate, then extract
    Run {
        #[command(flatten)]
        common: CommonArgs,
        #[command(flatten)]
        generate: GenerateArgs,
        #[command(flatten)]
        extract: ExtractArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Directory holding the archives and CSV files
    #[arg(short = 'd', long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Template the reports are rendered with and parsed by
    #[arg(short = 't', long, value_name = "NAME", default_value = "report.xml")]
    pub template: String,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Number of archives to write
    #[arg(short = 'n', long, default_value_t = 50)]
    pub archives: usize,

    /// Reports per archive
    #[arg(long, default_value_t = 100)]
    pub documents: usize,

    /// Directory to load templates from (default: built-in templates)
    #[arg(long, value_name = "DIR")]
    pub template_dir: Option<PathBuf>,

    /// Render format
    #[arg(short = 'f', long, default_value = "xml")]
    pub format: String,

    /// Store entries uncompressed
    #[arg(long)]
    pub stored: bool,

    #[arg(long, default_value_t = 1)]
    pub min_level: u32,

    #[arg(long, default_value_t = 100)]
    pub max_level: u32,

    #[arg(long, default_value_t = 1)]
    pub min_objects: u32,

    #[arg(long, default_value_t = 10)]
    pub max_objects: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Archives per chunk (default: archives / workers)
    #[arg(short = 'c', long)]
    pub chunk_size: Option<usize>,

    /// Parallel workers (default: available CPUs)
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Log level selected by `-v` / `-q`
    pub fn log_level(&self) -> Level {
        if self.is_very_quiet() {
            Level::ERROR
        } else if self.is_quiet() {
            Level::WARN
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}
