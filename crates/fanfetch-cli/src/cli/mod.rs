//! CLI for fanfetch.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use fanfetch_core::{config, logging};
use std::path::PathBuf;

use commands::{run_get, run_merge, run_probe, GetArgs};

/// Top-level CLI for fanfetch.
#[derive(Debug, Parser)]
#[command(name = "fanfetch")]
#[command(
    about = "fanfetch: split one HTTP download into byte ranges fetched by SSH workers",
    long_about = None
)]
pub struct Cli {
    /// Log to stderr at debug level instead of the log file.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL through the given workers and merge the chunks.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,

        /// SSH targets, comma separated (spaces ignored), passed verbatim to ssh/scp.
        #[arg(short = 'r', long = "remotes", value_name = "HOSTS")]
        remotes: String,

        /// Extra HTTP header, as given to curl (repeatable). Range headers are dropped.
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Output directory (must not exist). Default: ff-download-<unix time>.
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Main chunks to split the file into (default from config).
        #[arg(short = 'n', long, value_name = "N")]
        chunks: Option<usize>,

        /// Concurrent fetches per worker (default from config).
        #[arg(short = 't', long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Merge chunk files already in a directory (no size check).
    Merge {
        /// Directory holding ff-* chunk files.
        dir: PathBuf,

        /// Name of the merged file, created inside `dir`.
        #[arg(long, default_value = "download.bin")]
        name: String,
    },

    /// Show fetch tool and free space of each worker, and optionally the resource size.
    Probe {
        /// SSH targets, comma separated (spaces ignored).
        #[arg(short = 'r', long = "remotes", value_name = "HOSTS")]
        remotes: String,

        /// URL to size through the first worker.
        url: Option<String>,

        /// Extra HTTP header for the size probe (repeatable).
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,
    },
}

/// Splits a `-r` value into targets: spaces removed, empty entries dropped.
pub fn parse_remotes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|r| r.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .filter(|r| !r.is_empty())
        .collect()
}

fn init_logging(verbose: bool) {
    if verbose {
        logging::init_logging_stderr(true);
        return;
    }
    if let Err(e) = logging::init_logging() {
        logging::init_logging_stderr(false);
        tracing::warn!("log file unavailable, logging to stderr: {:#}", e);
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        init_logging(cli.verbose);
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                url,
                remotes,
                headers,
                output,
                chunks,
                threads,
            } => {
                let args = GetArgs {
                    url,
                    remotes: parse_remotes(&remotes),
                    headers,
                    output,
                    chunks,
                    threads,
                };
                run_get(&cfg, args).await?
            }
            CliCommand::Merge { dir, name } => run_merge(&dir, &name).await?,
            CliCommand::Probe {
                remotes,
                url,
                headers,
            } => run_probe(&cfg, &parse_remotes(&remotes), url.as_deref(), headers).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
