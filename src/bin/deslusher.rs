//! # Deslusher CLI - Undo a wave of renames
//!
//! Command-line interface for the Deslusher reconciliation engine.
//!
//! ## Features
//! - Rebuild the pre-rename layout of each drive as a tree of links
//! - Mirror the current layout for side-by-side comparison
//! - Verify that output trees only hold links into the content store
//!
//! ## Usage
//! ```bash
//! # Restore names changed since the first of December
//! deslusher --directory ./data deslush --datetime 2023-12-01T00:00:00Z
//!
//! # List directories that need a human decision
//! deslusher deslush --datetime 2023-12-01T00:00:00Z --show-condensed
//!
//! # Check the result
//! deslusher verify
//! ```

use clap::{Parser, Subcommand};
use colored::*;
use deslusher::utils::parse_timestamp;
use deslusher::{DeslushError, DeslusherBuilder, DriveReport, EventOrder, Result, VerificationReport};
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Deslusher CLI - Restore file names and locations from before a rename wave
#[derive(Parser)]
#[command(name = "deslusher")]
#[command(version)]
#[command(about = "Reconstruct the pre-rename layout of a drive from a snapshot and its rename log")]
#[command(long_about = None)]
struct Cli {
    /// Workspace directory holding documents, objects and output trees
    #[arg(short, long, global = true, default_value = "./data")]
    directory: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the pre-rename tree of each drive
    Deslush {
        /// Renames at or after this time are undone (ISO 8601, e.g. 2024-01-01T00:00:00Z)
        #[arg(long)]
        datetime: String,

        /// Only process this drive
        #[arg(long)]
        drive: Option<String>,

        /// Sort each file's rename events by time instead of trusting log order
        #[arg(long)]
        chronological: bool,

        /// List directories left for manual review
        #[arg(long)]
        show_condensed: bool,

        /// Show progress
        #[arg(long)]
        progress: bool,
    },

    /// Rebuild the current-layout mirror of each drive
    Mirror {
        /// Only process this drive
        #[arg(long)]
        drive: Option<String>,
    },

    /// Verify output trees
    Verify {
        /// Only verify this drive
        #[arg(long)]
        drive: Option<String>,

        /// Verify the mirror tree instead of the restored tree
        #[arg(long)]
        original: bool,
    },

    /// List drives in the workspace
    Drives,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    println!("Using '{}' for data storage", cli.directory.display());

    match cli.command {
        Commands::Deslush { datetime, drive, chronological, show_condensed, progress } => {
            cmd_deslush(cli.directory, datetime, drive, chronological, show_condensed, progress)
        }
        Commands::Mirror { drive } => cmd_mirror(cli.directory, drive),
        Commands::Verify { drive, original } => cmd_verify(cli.directory, drive, original),
        Commands::Drives => cmd_drives(cli.directory),
    }
}

/// Run the reconciliation engine
///
/// Each drive's restored tree is rebuilt from scratch under
/// `<directory>/onedrive/<drive>-deslushed`.
fn cmd_deslush(
    directory: PathBuf,
    datetime: String,
    drive: Option<String>,
    chronological: bool,
    show_condensed: bool,
    show_progress: bool,
) -> Result<()> {
    let cutoff = parse_timestamp(&datetime)?;
    let order = if chronological { EventOrder::Chronological } else { EventOrder::Recorded };
    let deslusher = DeslusherBuilder::new()
        .cutoff(cutoff)
        .event_order(order)
        .drive_filter(drive)
        .build(directory)?;

    let start = Instant::now();
    let mut reports = Vec::new();
    for drive in deslusher.drives()? {
        println!("{} '{}'...", "Deslushing onedrive".blue().bold(), drive.name);

        let progress = if show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .map_err(|e| DeslushError::internal(e.to_string()))?,
            );
            pb.set_message("Materializing candidates...");
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        } else {
            None
        };

        let report = deslusher.deslush_drive(&drive.name)?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        print_drive_report(&report, show_condensed);
        reports.push(report);
    }

    if reports.len() > 1 {
        let restored: usize = reports.iter().map(|r| r.files_restored).sum();
        let condensed: usize = reports.iter().map(DriveReport::condensed_directories).sum();
        println!(
            "\n{} {} files restored, {} directories awaiting review",
            "Total:".bold(),
            restored.to_string().green(),
            condensed.to_string().yellow()
        );
    }
    println!("  Time: {}", format_duration(truncate_millis(start.elapsed())).to_string().cyan());
    Ok(())
}

fn print_drive_report(report: &DriveReport, show_condensed: bool) {
    println!("Analyzed {} files", report.files_analyzed.to_string().cyan());
    println!(
        "Restored {} files and gathered candidates for {} files (with {} candidates in total)",
        report.files_restored.to_string().green(),
        report.condensed_directories().to_string().yellow(),
        report.total_candidates().to_string().yellow()
    );
    if !report.unresolved.is_empty() {
        println!(
            "{} renamed files match no current name and were not restored",
            report.unresolved.len().to_string().red()
        );
    }
    if show_condensed && !report.condensed.is_empty() {
        println!("\n{}", "Awaiting manual review:".bold());
        for condensed in &report.condensed {
            println!("  {} ({} candidates)", condensed.path.yellow(), condensed.candidates);
        }
    }
    println!("  Output: {}", report.restored_root.display().to_string().cyan());
}

/// Rebuild the current-layout mirror
fn cmd_mirror(directory: PathBuf, drive: Option<String>) -> Result<()> {
    let deslusher = DeslusherBuilder::new()
        .drive_filter(drive)
        .build_for_inspection(directory)?;

    for report in deslusher.mirror()? {
        println!(
            "{} Mirrored '{}': {} directories, {} links",
            "✓".green().bold(),
            report.drive,
            report.directories.to_string().cyan(),
            report.links.to_string().cyan()
        );
        println!("  Output: {}", report.mirror_root.display().to_string().cyan());
    }
    Ok(())
}

/// Verify output trees
fn cmd_verify(directory: PathBuf, drive: Option<String>, original: bool) -> Result<()> {
    let deslusher = DeslusherBuilder::new()
        .drive_filter(drive)
        .build_for_inspection(directory)?;

    let mut all_valid = true;
    for drive in deslusher.drives()? {
        let report = if original {
            deslusher.verify_mirror(&drive.name)?
        } else {
            deslusher.verify_restored(&drive.name)?
        };
        all_valid &= report.is_valid();
        print_verification(&drive.name, &report);
    }

    if !all_valid {
        return Err(DeslushError::VerificationFailed(
            "output trees contain problems".to_string(),
        ));
    }
    Ok(())
}

fn print_verification(drive: &str, report: &VerificationReport) {
    println!("\n{} '{}':", "Verification Report".bold(), drive);
    if report.is_valid() {
        println!("  Status: {}", "✓ VALID".green().bold());
    } else {
        println!("  Status: {}", "✗ INVALID".red().bold());
    }
    println!("  {}", report.summary());
    for path in report.dangling.iter().take(10) {
        println!("  {} {}", "dangling:".red(), path.display());
    }
    for path in report.outside_store.iter().take(10) {
        println!("  {} {}", "foreign:".red(), path.display());
    }
    for path in report.regular_files.iter().take(10) {
        println!("  {} {}", "not a link:".red(), path.display());
    }
}

/// List drives
fn cmd_drives(directory: PathBuf) -> Result<()> {
    let deslusher = DeslusherBuilder::new().build_for_inspection(directory)?;
    let workspace = deslusher.workspace();

    for drive in workspace.load_drives()? {
        let files = workspace.files_document(&drive.name).exists();
        let activities = workspace.activities_document(&drive.name).exists();
        println!(
            "{} {} files:{} activities:{}",
            drive.name.bold(),
            drive.id.dimmed(),
            mark(files),
            mark(activities)
        );
    }
    Ok(())
}

fn mark(present: bool) -> ColoredString {
    if present { "✓".green() } else { "✗".red() }
}

fn truncate_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
