//! `harvest` - collect records from a feed profile into CSV.

mod export;
mod profile;
mod settings;
mod windows;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use feed_harvest::{CollectionEngine, DateWindow};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::profile::FeedProfile;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Collect structured records from dynamically loading feeds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest a feed and write the records to CSV
    Run {
        /// Feed profile (JSON)
        #[arg(long)]
        profile: PathBuf,

        /// Stop after this many records
        #[arg(long)]
        target: Option<usize>,

        /// Navigation step budget per run
        #[arg(long)]
        max_steps: Option<usize>,

        /// Output CSV path (defaults to HARVEST_OUTPUT_DIR)
        #[arg(long)]
        out: Option<PathBuf>,

        /// First day of the date range (YYYY-MM-DD)
        #[arg(long, requires = "until")]
        since: Option<NaiveDate>,

        /// Last day of the date range (YYYY-MM-DD)
        #[arg(long, requires = "since")]
        until: Option<NaiveDate>,

        /// Days per window when a date range is given
        #[arg(long, default_value_t = 30)]
        period_days: u32,
    },

    /// Validate a profile and print its schema
    Check {
        #[arg(long)]
        profile: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_harvest=info,harvest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            profile,
            target,
            max_steps,
            out,
            since,
            until,
            period_days,
        } => {
            let windows = match (since, until) {
                (Some(since), Some(until)) => {
                    let windows = DateWindow::split(since, until, period_days);
                    if windows.is_empty() {
                        bail!("--since {since} is after --until {until}");
                    }
                    Some(windows)
                }
                _ => None,
            };
            cmd_run(profile, target, max_steps, out, windows).await
        }
        Commands::Check { profile } => cmd_check(profile),
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_run(
    profile_path: PathBuf,
    target: Option<usize>,
    max_steps: Option<usize>,
    out: Option<PathBuf>,
    windows: Option<Vec<DateWindow>>,
) -> Result<()> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    let profile = FeedProfile::load(&profile_path)?.with_settings(&settings);
    profile.validate()?;

    if windows.is_none() && profile.is_windowed() {
        warn!("Start URL has date placeholders but no --since/--until was given");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with the records collected so far");
            on_interrupt.cancel();
        }
    });

    let (records, stop) = match windows {
        Some(date_windows) => {
            let harvest = windows::harvest_windows(
                &date_windows,
                &profile.schema,
                &profile.collect,
                target,
                max_steps,
                &cancel,
                |window| profile.source_for(Some(window)),
            )
            .await?;
            info!(
                ran = harvest.window_stops.len(),
                windows = date_windows.len(),
                "Date windows harvested"
            );
            (harvest.records, harvest.stop)
        }
        None => {
            let source = profile.source_for(None)?;
            let mut engine = CollectionEngine::new(source, profile.schema.clone())?
                .with_config(profile.collect.clone())
                .with_cancellation(cancel.clone());
            let report = engine.collect(target, max_steps).await;
            (report.records, report.stop)
        }
    };

    let path = out.unwrap_or_else(|| export::default_path(&settings.output_dir, profile.display_name()));
    export::write_file(&path, &records)?;

    let summary = format!(
        "{} records from {} → {} ({})",
        records.len(),
        profile.display_name(),
        path.display(),
        stop
    );
    if stop.is_normal() {
        println!("{} {}", "✔".green().bold(), summary);
    } else {
        println!("{} {}", "⚠".yellow().bold(), summary.yellow());
    }

    Ok(())
}

fn cmd_check(profile_path: PathBuf) -> Result<()> {
    let profile = FeedProfile::load(&profile_path)?;
    profile.validate()?;

    println!("{} {}", "✔".green().bold(), profile.display_name().bold());
    println!("  source:   {}", profile.source.start_url);
    println!("  items:    {}", profile.source.item_selector);
    println!(
        "  identity: {} ({:?})",
        profile.schema.identity.field, profile.schema.identity.normalize
    );
    for field in &profile.schema.fields {
        println!(
            "  - {:<16} {:<10} {} strategies{}",
            field.name,
            field.kind.as_str(),
            field.strategies.len(),
            if field.required { ", required" } else { "" }
        );
    }

    Ok(())
}
