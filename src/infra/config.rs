use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{AppContext, InitArgs};
use crate::core::codec::Dialect;
use crate::core::heuristics::HeuristicsConfig;
use crate::core::scan::DEFAULT_MIN_UNITS;
use crate::core::translate::DEFAULT_SENTINELS;

/// Config file names, in lookup priority order
pub const CONFIG_FILES: [&str; 4] =
    ["sjismine.toml", "sjismine.yaml", "sjismine.json", ".sjismine.toml"];

pub const ENV_PREFIX: &str = "SJISMINE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Byte scanning settings
    pub scan: ScanConfig,

    /// Exclusion thresholds
    pub heuristics: HeuristicsConfig,

    /// Candidate store location
    pub store: StoreConfig,

    /// Dictionary export settings
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig
{
    pub dialect: Dialect,
    /// Minimum units (characters) per emitted run
    pub min_units: usize,
    /// Target bytes per parallel chunk; 0 scans on one thread
    pub chunk_size: usize,
}

impl Default for ScanConfig
{
    fn default() -> Self
    {
        Self { dialect: Dialect::default(), min_units: DEFAULT_MIN_UNITS, chunk_size: 1024 * 1024 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig
{
    pub path: PathBuf,
}

impl Default for StoreConfig
{
    fn default() -> Self
    {
        Self { path: PathBuf::from(".sjismine/store.json") }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig
{
    pub output_file: PathBuf,
    /// Placeholder replies dropped before export
    pub sentinels: Vec<String>,
}

impl Default for ExportConfig
{
    fn default() -> Self
    {
        Self {
            output_file: PathBuf::from("dictionary.txt"),
            sentinels: DEFAULT_SENTINELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Load configuration from `explicit`, or the first config file found in the
/// working directory, then overlay `SJISMINE_` environment variables.
pub fn load_config(explicit: Option<&Path>) -> Result<Config>
{
    let mut builder = config::Config::builder();

    match explicit
    {
        Some(path) =>
        {
            if !path.exists()
            {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            builder = builder.add_source(config::File::from(path.to_path_buf()));
        }
        None =>
        {
            if let Some(path) = CONFIG_FILES
                .iter()
                .find(|p| Path::new(p).exists())
            {
                debug!(path, "using config file");
                builder = builder.add_source(config::File::with_name(path));
            }
        }
    }

    // SJISMINE_HEURISTICS__MIN_LENGTH=5 -> heuristics.min_length
    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let cfg = builder
        .build()
        .context("Failed to load configuration")?;
    let parsed: Config = cfg
        .try_deserialize()
        .context("Failed to parse configuration")?;

    Ok(parsed)
}

pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config_path = args
        .path
        .join(CONFIG_FILES[0]);

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let toml_string =
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")?;

    if ctx.dry_run
    {
        println!("{toml_string}");
        return Ok(());
    }

    std::fs::write(&config_path, toml_string).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}
