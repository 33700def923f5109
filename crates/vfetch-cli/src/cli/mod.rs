//! CLI for vfetch.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vfetch_core::config::{self, FetchConfig, TransportKind};

use commands::{run_cache_dir, run_fetch, run_get};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "vfetch")]
#[command(about = "vfetch: segmented, resumable download of reference data files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    /// Built-in multi-connection downloader (libcurl).
    Curl,
    /// External `aria2c` process.
    Aria2,
}

impl From<TransportArg> for TransportKind {
    fn from(t: TransportArg) -> Self {
        match t {
            TransportArg::Curl => TransportKind::Curl,
            TransportArg::Aria2 => TransportKind::Aria2,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the configured job (by default the dbSNP archive and its index).
    Fetch {
        /// Download directory (default: config `cache_dir`, else ~/.cache/vfetch).
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,
    },

    /// Download a single URL.
    Get {
        /// Direct HTTP/HTTPS URL.
        url: String,
        /// Local file name (default: last path segment of the URL).
        #[arg(long, short = 'o', value_name = "NAME")]
        out: Option<String>,
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        #[arg(long, value_enum)]
        transport: Option<TransportArg>,
    },

    /// Print the download directory, creating it if needed.
    CacheDir {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

/// Command-line flags take precedence over the config file.
fn apply_overrides(
    mut cfg: FetchConfig,
    dir: Option<PathBuf>,
    transport: Option<TransportArg>,
) -> FetchConfig {
    if dir.is_some() {
        cfg.cache_dir = dir;
    }
    if let Some(t) = transport {
        cfg.transport = t.into();
    }
    cfg
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Fetch { dir, transport } => {
                run_fetch(apply_overrides(cfg, dir, transport)).await?
            }
            CliCommand::Get {
                url,
                out,
                dir,
                transport,
            } => run_get(apply_overrides(cfg, dir, transport), url, out).await?,
            CliCommand::CacheDir { dir } => run_cache_dir(&apply_overrides(cfg, dir, None))?,
        }

        Ok(())
    }
}
