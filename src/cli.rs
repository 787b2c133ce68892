use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::codec::Dialect;
use crate::core::heuristics::HeuristicsConfig;
use crate::infra::config::{Config, ScanConfig};

/// Shared application context for global flags
#[derive(Clone, Debug, Default)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
    pub verbose: bool,  // global --verbose
    pub config: Option<PathBuf>,
    pub store: Option<PathBuf>,
}

#[derive(Parser)]
#[command(name = "sjm")]
#[command(
    about = "Mine legacy binaries for embedded Shift-JIS text and cull it down to translation candidates"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show what would be done without writing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: first of sjismine.toml/.yaml/.json/.sjismine.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Candidate store file (overrides [store] path)
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,
}

impl Cli {
    pub fn context(&self) -> AppContext {
        AppContext {
            quiet: self.quiet,
            no_color: self.no_color,
            dry_run: self.dry_run,
            verbose: self.verbose,
            config: self.config.clone(),
            store: self.store.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a binary and add decoded candidates to the store
    Extract(ExtractArgs),

    /// Apply heuristics and round-trip verification to stored candidates
    Cull(CullArgs),

    /// Extract and cull in one pass
    Run(RunArgs),

    /// Fill pending candidates from a reviewed translation table
    Translate(TranslateArgs),

    /// Write the translated dictionary file
    Export(ExportArgs),

    /// Initialize a sjismine.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Scan overrides shared by the pipeline commands
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Shift-JIS dialect used for scanning, decoding and verification
    #[arg(short, long, value_enum)]
    pub dialect: Option<Dialect>,

    /// Minimum characters per scanned run
    #[arg(long)]
    pub min_units: Option<usize>,

    /// Bytes per parallel scan chunk (0 = single thread)
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

impl ScanArgs {
    pub fn apply(&self, config: &mut ScanConfig) {
        if let Some(d) = self.dialect {
            config.dialect = d;
        }
        if let Some(n) = self.min_units {
            config.min_units = n;
        }
        if let Some(n) = self.chunk_size {
            config.chunk_size = n;
        }
    }
}

/// Heuristic threshold overrides
#[derive(Args, Debug, Clone, Default)]
pub struct HeuristicsArgs {
    /// Minimum characters per candidate
    #[arg(long)]
    pub min_length: Option<usize>,

    /// Minimum share of Japanese characters (percent)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_japaneseness: Option<u32>,

    /// Minimum distinct/total characters (percent)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub min_variety: Option<u32>,

    /// Consecutive repeats of one character that exclude a string (0 = off)
    #[arg(long)]
    pub max_repeat_run: Option<usize>,

    /// Keep strings containing CJK ideographs
    #[arg(long)]
    pub allow_chinese: bool,

    /// Regex for format placeholders
    #[arg(long)]
    pub escape_pattern: Option<String>,
}

impl HeuristicsArgs {
    pub fn apply(&self, config: &mut HeuristicsConfig) {
        if let Some(n) = self.min_length {
            config.min_length = n;
        }
        if let Some(p) = self.min_japaneseness {
            config.min_japaneseness_percent = p;
        }
        if let Some(p) = self.min_variety {
            config.min_variety_percent = p;
        }
        if let Some(n) = self.max_repeat_run {
            config.max_repeat_run = n;
        }
        if self.allow_chinese {
            config.exclude_chinese = false;
        }
        if let Some(p) = &self.escape_pattern {
            config.escape_pattern = p.clone();
        }
    }
}

#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Binary to scan
    pub binary: PathBuf,

    #[command(flatten)]
    pub scan: ScanArgs,
}

#[derive(Parser, Debug)]
pub struct CullArgs {
    /// Binary the stored candidates are verified against
    pub binary: PathBuf,

    /// Shift-JIS dialect used for verification
    #[arg(short, long, value_enum)]
    pub dialect: Option<Dialect>,

    #[command(flatten)]
    pub heuristics: HeuristicsArgs,

    /// Print character-class profiles of excluded strings
    #[arg(long)]
    pub explain: bool,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Binary to scan
    pub binary: PathBuf,

    #[command(flatten)]
    pub scan: ScanArgs,

    #[command(flatten)]
    pub heuristics: HeuristicsArgs,

    /// Write surviving candidates one per line (UTF-8) for review
    #[arg(long, value_name = "PATH")]
    pub candidates_out: Option<PathBuf>,

    /// Print character-class profiles of excluded strings
    #[arg(long)]
    pub explain: bool,
}

#[derive(Parser, Debug)]
pub struct TranslateArgs {
    /// JSON object mapping original text to translation
    #[arg(long, value_name = "JSON")]
    pub table: PathBuf,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Output file (overrides [export] output_file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Encoding of the dictionary file
    #[arg(short, long, value_enum)]
    pub dialect: Option<Dialect>,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}

/// Resolve the store path: `--store` wins over the config file.
pub fn store_path(ctx: &AppContext, config: &Config) -> PathBuf {
    ctx.store
        .clone()
        .unwrap_or_else(|| config.store.path.clone())
}
