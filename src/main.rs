//! oy-bestseller - Daily Olive Young Global bestseller ranking report
//!
//! Scrapes the ranking with TLS fingerprint emulation, keeps a CSV per day,
//! and posts the day-over-day movement to Slack.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use oy_bestseller::commands::{
    DailyRun, DiffCommand, DumpCommand, NotifyCommand, ScrapeCommand, UploadCommand,
};
use oy_bestseller::config::{Config, OutputFormat};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "oy-bestseller",
    version,
    about = "Daily Olive Young Global bestseller ranking report",
    long_about = "Scrapes the Olive Young Global bestseller page, stores a daily CSV snapshot \
                  (optionally on Google Drive), and posts rank movements to Slack."
)]
struct Cli {
    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "OY_PROXY")]
    proxy: Option<String>,

    /// Delay before the page request in milliseconds
    #[arg(long, global = true, env = "OY_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format for printed products
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Directory for CSV snapshots and debug dumps
    #[arg(long, global = true, env = "OY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily job: scrape, save, sync Drive, diff, post to Slack
    Run {
        /// Pretend today is this date (YYYY-MM-DD, KST)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Do not fall back to headless Chrome
        #[arg(long)]
        no_browser: bool,
    },

    /// Scrape the ranking and print it
    #[command(alias = "s")]
    Scrape {
        /// Maximum number of products to print
        #[arg(short, long)]
        max: Option<usize>,

        /// Do not fall back to headless Chrome
        #[arg(long)]
        no_browser: bool,
    },

    /// Compare two snapshot CSVs and print the ranking message
    Diff {
        /// Today's snapshot
        today: PathBuf,

        /// Previous snapshot (defaults to the previous day's file next to TODAY)
        previous: Option<PathBuf>,

        /// Post the message to Slack instead of printing it
        #[arg(long)]
        post: bool,
    },

    /// Post the top-10 price listing of a snapshot CSV to Slack
    Notify {
        csv: PathBuf,
    },

    /// Upload a snapshot CSV to the Google Drive folder
    Upload {
        csv: PathBuf,
    },

    /// Save the raw bestseller HTML under <data-dir>/debug
    Dump {
        /// Render with headless Chrome instead of plain HTTP
        #[arg(long)]
        browser: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Commands::Run { date, no_browser } => {
            let summary = DailyRun::new(config).date(date).no_browser(no_browser).execute().await?;
            info!(
                "Done: {} products for {} saved to {} (previous snapshot: {})",
                summary.product_count,
                summary.date,
                summary.csv_path.display(),
                if summary.had_previous { "yes" } else { "no" }
            );
        }

        Commands::Scrape { max, no_browser } => {
            let cmd = ScrapeCommand::new(config).max(max).no_browser(no_browser);
            let output = cmd.execute().await?;
            println!("{}", output);
        }

        Commands::Diff { today, previous, post } => {
            let cmd = DiffCommand::new(config, today, previous);
            if post {
                cmd.execute_and_post().await?;
            } else {
                println!("{}", cmd.execute()?);
            }
        }

        Commands::Notify { csv } => {
            NotifyCommand::new(config, csv).execute().await?;
        }

        Commands::Upload { csv } => {
            let id = UploadCommand::new(config, csv).execute().await?;
            println!("Uploaded (file id: {})", id);
        }

        Commands::Dump { browser } => {
            let path = DumpCommand::new(config, browser).execute().await?;
            println!("Saved {}", path.display());
        }
    }

    Ok(())
}
