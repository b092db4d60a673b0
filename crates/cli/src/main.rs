//! triwulan command-line entry point.
//!
//! Logs go to stderr so scrape output on stdout can be piped.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use triwulan_core::AppConfig;

mod args;
mod commands;

use args::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let args = Args::parse();

    match args.command {
        Command::Scrape { json } => commands::scrape(&AppConfig::load()?, json).await,
        Command::Extract { file, base, json } => {
            let rules = AppConfig::load()?.rule_set();
            commands::extract(&file, base.as_ref(), json, &rules)
        }
        Command::Links { file, base } => commands::links(&file, &base),
        Command::Watch { interval_minutes, max_cycles } => {
            let config = AppConfig::load()?;
            let interval = match interval_minutes {
                Some(minutes) => Duration::from_secs(minutes.saturating_mul(60)),
                None => config.auto_refresh_interval(),
            };
            commands::watch(&config, interval, max_cycles).await
        }
    }
}
