//! pvcreek: stream Wikimedia hourly pageview dumps from the command line.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use pvcreek::config::{Config, LogFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "pvcreek")]
#[command(about = "Stream, filter and parse Wikimedia hourly pageview dumps")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "pvcreek.toml")]
    config: PathBuf,

    /// Verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream records from a dump
    Stream {
        /// Dump filename (pageviews-YYYYMMDD-HH0000.gz), hour (2024-01-05T07) or local .gz path
        file: String,

        /// Base URL of the pageviews tree
        #[arg(long)]
        base_url: Option<String>,

        /// Cache directory (read if present, otherwise populated while streaming)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Keep lines starting with this prefix
        #[arg(long)]
        starts_with: Option<String>,

        /// Keep lines containing this substring
        #[arg(long)]
        contains: Option<String>,

        /// Keep lines matching this regex
        #[arg(long)]
        regex: Option<String>,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        limit: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Hide the progress spinner
        #[arg(short, long)]
        quiet: bool,
    },

    /// Download a dump into the cache without parsing it
    Download {
        /// Dump filename or hour
        file: String,

        /// Cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Base URL of the pageviews tree
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Print the dump filename and URL for an hour
    Filename {
        /// Timestamp, e.g. 2024-01-05T07 or 2024-01-05T07:30:00Z
        timestamp: String,

        /// Base URL of the pageviews tree
        #[arg(long)]
        base_url: Option<String>,
    },
}

/// Record output format
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Space-separated, one record per line
    Text,
    /// One JSON object per line
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(&cli.config)?;

    // Setup logging; -v flags take precedence over the configured level
    let log_level: Level = config.logging.effective_level(cli.verbose).into();
    match config.logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Commands::Stream {
            file,
            base_url,
            cache_dir,
            starts_with,
            contains,
            regex,
            limit,
            format,
            quiet,
        } => {
            let options = commands::stream::StreamOptions {
                file,
                base_url,
                cache_dir,
                starts_with,
                contains,
                regex,
                limit,
                format,
                quiet,
            };
            commands::stream::stream_records(config, options)
        }
        Commands::Download {
            file,
            cache_dir,
            base_url,
        } => commands::download::download_dump(config, file, cache_dir, base_url),
        Commands::Filename {
            timestamp,
            base_url,
        } => commands::filename::show_filename(config, timestamp, base_url),
    }
}
