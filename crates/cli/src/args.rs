use std::path::PathBuf;

use clap::{Parser, Subcommand};
use triwulan_core::config::MAX_AUTO_REFRESH_MINUTES;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "triwulan")]
#[command(about = "Monitor a bank's quarterly financial disclosures")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one live scrape cycle and print the snapshot
    Scrape {
        /// Print the full cycle report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract and validate metrics from a saved HTML page
    Extract {
        /// Saved HTML file
        file: PathBuf,

        /// URL the page was saved from; its path supplies the reporting period
        #[arg(long)]
        base: Option<Url>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List quarterly report links found in a saved HTML page, most recent first
    Links {
        /// Saved HTML file
        file: PathBuf,

        /// URL the page was saved from, used to resolve relative links
        #[arg(long)]
        base: Url,
    },

    /// Scrape repeatedly on the auto-refresh interval
    Watch {
        /// Minutes between cycles (defaults to the configured auto-refresh interval)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_AUTO_REFRESH_MINUTES))]
        interval_minutes: Option<u64>,

        /// Stop after this many cycles
        #[arg(long)]
        max_cycles: Option<u64>,
    },
}
