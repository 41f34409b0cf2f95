//! diskscope - single-pass disk usage inspector.
//!
//! Usage:
//!   diskscope scan [PATH]          Space summary and breakdown
//!   diskscope duplicates [PATH]    Find duplicate files
//!   diskscope stale [PATH]         Files not accessed in a while
//!   diskscope largest [PATH]       Largest files, optionally filtered
//!   diskscope export [PATH]        Full scan report as JSON
//!   diskscope delete FILE...       Delete files
//!   diskscope archive FILE... -o ARCHIVE
//!                                  Archive files, then delete them

mod logging;
mod settings;

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use diskscope_analyze::{
    DuplicateReport, FileCategory, InventoryFilter, ScanSummary, SpaceBreakdown, StaleReport,
    TopFileEntry, format_age, largest_files,
};
use diskscope_core::{AnalysisOptions, Inventory, ScanConfig, unix_seconds};
use diskscope_engine::{ScanEvent, ScanReport, ScanRequest, ScanState, start_scan};
use diskscope_ops::{
    ArchiveFormat, ArchiveResult, DeleteOptions, DeleteResult, OperationComplete, start_archive,
    start_delete,
};

use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "diskscope",
    version,
    about = "Single-pass disk usage inspector",
    long_about = "diskscope walks a directory once and reports where the space goes: \
                  a size summary, the largest folders and files, duplicate files and \
                  files nobody has opened in a long time."
)]
struct Cli {
    /// TOML settings file with [scan] and [analysis] tables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file (filter with DISKSCOPE_LOG)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan and show size summary and breakdown
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Also look for duplicate files
        #[arg(long)]
        duplicates: bool,

        /// Also list files not accessed for this many days
        #[arg(long)]
        stale: Option<u32>,

        /// Also list the N largest files
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Find duplicate files
    Duplicates {
        #[command(flatten)]
        scan: ScanArgs,

        /// Only files larger than this are compared (e.g., "1KB", "1MB")
        #[arg(short, long)]
        min_size: Option<String>,

        /// Maximum number of duplicate groups to show
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List files not accessed for a number of days
    Stale {
        #[command(flatten)]
        scan: ScanArgs,

        /// Age threshold in days (default 365)
        #[arg(short, long)]
        days: Option<u32>,

        /// Maximum number of files to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List the largest files
    Largest {
        #[command(flatten)]
        scan: ScanArgs,

        /// Number of files to show (default 20)
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Only paths containing this text (case-insensitive)
        #[arg(short = 't', long)]
        text: Option<String>,

        /// Only files of at least this size (e.g., "10MB")
        #[arg(long)]
        min_size: Option<String>,

        /// Only files of at most this size
        #[arg(long)]
        max_size: Option<String>,

        /// Only these categories (repeatable)
        #[arg(long = "category", value_parser = parse_category)]
        categories: Vec<FileCategory>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Export the full scan report to JSON
    Export {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include duplicate detection
        #[arg(long)]
        duplicates: bool,

        /// Include files not accessed for this many days
        #[arg(long)]
        stale: Option<u32>,

        /// Include the N largest files
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },

    /// Delete files
    Delete {
        /// Files to delete
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Move to the trash instead of deleting permanently
        #[arg(long)]
        trash: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Compress files into an archive, then delete the originals
    Archive {
        /// Files to archive
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Archive to create
        #[arg(short, long)]
        output: PathBuf,

        /// Archive format (guessed from the output name when omitted)
        #[arg(long)]
        format: Option<ArchiveKind>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Options shared by every command that walks a directory.
#[derive(Args)]
struct ScanArgs {
    /// Path to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Skip entries matching this glob (repeatable)
    #[arg(short, long = "ignore")]
    ignore: Vec<String>,

    /// Maximum depth to descend
    #[arg(long)]
    max_depth: Option<u32>,

    /// Skip hidden files and directories
    #[arg(long)]
    no_hidden: bool,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Walker threads (0 = automatic)
    #[arg(long)]
    threads: Option<usize>,
}

impl ScanArgs {
    fn config(&self, settings: &Settings) -> Result<ScanConfig> {
        let root = self
            .path
            .canonicalize()
            .with_context(|| format!("Invalid path: {}", self.path.display()))?;

        let mut config = settings.scan_config(&root);
        config.ignore_patterns.extend(self.ignore.iter().cloned());
        if self.max_depth.is_some() {
            config.max_depth = self.max_depth;
        }
        if self.no_hidden {
            config.include_hidden = false;
        }
        if self.follow_symlinks {
            config.follow_symlinks = true;
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArchiveKind {
    Zip,
    TarGz,
}

impl From<ArchiveKind> for ArchiveFormat {
    fn from(kind: ArchiveKind) -> Self {
        match kind {
            ArchiveKind::Zip => ArchiveFormat::Zip,
            ArchiveKind::TarGz => ArchiveFormat::TarGz,
        }
    }
}

const DEFAULT_STALE_DAYS: u32 = 365;
const DEFAULT_TOP_FILES: usize = 20;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_file.as_deref())?;
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Command::Scan {
            scan,
            duplicates,
            stale,
            top,
            format,
        } => {
            let mut options = settings.analysis_options();
            options.compute_duplicates |= duplicates;
            options.stale_days = stale.or(options.stale_days);
            options.top_n = top.or(options.top_n);
            let report = run_request(ScanRequest::new(scan.config(&settings)?, options)).await?;
            print_scan(&report, format)?;
        }
        Command::Duplicates {
            scan,
            min_size,
            top,
            format,
        } => {
            let mut options = AnalysisOptions {
                compute_duplicates: true,
                ..settings.analysis_options()
            };
            if let Some(min_size) = min_size {
                options.min_duplicate_size = parse_size(&min_size)?;
            }
            options.stale_days = None;
            options.top_n = None;
            let report = run_request(ScanRequest::new(scan.config(&settings)?, options)).await?;
            print_duplicates(&report, top, format)?;
        }
        Command::Stale {
            scan,
            days,
            limit,
            format,
        } => {
            let days = days
                .or(settings.analysis.stale_days)
                .unwrap_or(DEFAULT_STALE_DAYS);
            let options = AnalysisOptions {
                stale_days: Some(days),
                ..AnalysisOptions::default()
            };
            let report = run_request(ScanRequest::new(scan.config(&settings)?, options)).await?;
            print_stale(&report, days, limit, format)?;
        }
        Command::Largest {
            scan,
            top,
            text,
            min_size,
            max_size,
            categories,
            format,
        } => {
            let n = top.or(settings.analysis.top_n).unwrap_or(DEFAULT_TOP_FILES);
            let mut filter = InventoryFilter::new();
            if let Some(text) = text {
                filter = filter.text(text);
            }
            if let Some(min) = min_size {
                filter = filter.min_size(parse_size(&min)?);
            }
            if let Some(max) = max_size {
                filter = filter.max_size(parse_size(&max)?);
            }
            for category in categories {
                filter = filter.category(category);
            }

            let request = ScanRequest::new(scan.config(&settings)?, AnalysisOptions::default());
            let report = run_request(request).await?;
            let filtered = Inventory::from_files(
                report.inventory.root_path.clone(),
                filter.apply(&report.inventory).into_iter().cloned().collect(),
            );
            print_largest(&largest_files(&filtered, n), format)?;
        }
        Command::Export {
            scan,
            output,
            duplicates,
            stale,
            top,
        } => {
            let mut options = settings.analysis_options();
            options.compute_duplicates |= duplicates;
            options.stale_days = stale.or(options.stale_days);
            options.top_n = top.or(options.top_n);
            let report = run_request(ScanRequest::new(scan.config(&settings)?, options)).await?;
            run_export(&report, output)?;
        }
        Command::Delete { paths, trash, yes } => {
            run_delete(paths, DeleteOptions { use_trash: trash }, yes).await?;
        }
        Command::Archive {
            paths,
            output,
            format,
            yes,
        } => {
            let format = match format {
                Some(kind) => kind.into(),
                None => ArchiveFormat::from_path(&output).unwrap_or_default(),
            };
            run_archive(paths, output, format, yes).await?;
        }
    }

    Ok(())
}

/// Run a scan in the background, showing a spinner until it completes.
async fn run_request(request: ScanRequest) -> Result<ScanReport> {
    eprintln!("Scanning {}...", request.config.root.display());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {wide_msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut handle = start_scan(request);
    let mut warnings = 0usize;

    while let Some(event) = handle.recv().await {
        match event {
            ScanEvent::Progress(p) => spinner.set_message(format!(
                "{} files, {} ({:.0} files/s)",
                p.files_scanned,
                format_size(p.bytes_scanned),
                p.files_per_second()
            )),
            ScanEvent::State(ScanState::Analyzing) => spinner.set_message("Analyzing..."),
            ScanEvent::HashProgress(p) => spinner.set_message(format!(
                "Comparing contents: {}/{} files, {} read",
                p.files_processed,
                p.total_files,
                format_size(p.bytes_hashed)
            )),
            ScanEvent::Warning(_) => warnings += 1,
            _ => {}
        }
    }

    spinner.finish_and_clear();
    let report = handle.finish().await.context("Scan failed")?;
    tracing::info!(
        files = report.summary.file_count,
        bytes = report.summary.total_size_bytes,
        warnings,
        "scan finished"
    );

    if warnings > 0 {
        eprintln!("{warnings} warning(s) during scan; set {}=warn for details", logging::LOG_ENV);
    }

    Ok(report)
}

/// Compact view of a scan for `scan --format json`.
#[derive(Serialize)]
struct ScanView<'a> {
    root: &'a Path,
    summary: &'a ScanSummary,
    breakdown: &'a SpaceBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicates: Option<&'a DuplicateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stale: Option<&'a StaleReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    largest: Option<&'a Vec<TopFileEntry>>,
    warnings: usize,
}

fn print_scan(report: &ScanReport, format: OutputFormat) -> Result<()> {
    let inventory = &report.inventory;

    if let OutputFormat::Json = format {
        let view = ScanView {
            root: &inventory.root_path,
            summary: &report.summary,
            breakdown: &report.breakdown,
            duplicates: report.duplicates.as_ref(),
            stale: report.stale.as_ref(),
            largest: report.largest.as_ref(),
            warnings: inventory.warnings.len(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let summary = &report.summary;
    println!();
    println!("{}", "─".repeat(70));
    println!(" {} - {}", inventory.root_path.display(), format_size(summary.total_size_bytes));
    println!(
        " {} files, {} directories, average {}",
        summary.file_count,
        inventory.dir_count,
        format_size(summary.average_size_bytes.round() as u64)
    );
    println!(" Scanned in {:.2}s", inventory.scan_duration.as_secs_f64());
    println!("{}", "─".repeat(70));
    println!();

    let total = report.breakdown.total;
    for slice in &report.breakdown.slices {
        let ratio = if total > 0 {
            slice.size as f64 / total as f64
        } else {
            0.0
        };
        let marker = if slice.is_folder { "/" } else { "" };
        println!(
            "  {:<40} {:>10} {:>5.1}% {}",
            truncate(&format!("{}{}", slice.label, marker), 40),
            format_size(slice.size),
            ratio * 100.0,
            make_bar(ratio, 10)
        );
    }

    if let Some(dups) = &report.duplicates {
        println!();
        println!(
            " Duplicates: {} groups, {} reclaimable",
            dups.group_count,
            format_size(dups.total_wasted_space)
        );
    }
    if let Some(stale) = &report.stale {
        println!(
            " Stale files: {} ({})",
            stale.files.len(),
            format_size(stale.total_size)
        );
    }
    if let Some(largest) = &report.largest {
        println!();
        println!(" Largest files:");
        for entry in largest {
            println!("   {:>10}  {}", format_size(entry.size), entry.path.display());
        }
    }

    if inventory.has_warnings() {
        println!();
        println!("{} warning(s) during scan", inventory.warnings.len());
    }

    Ok(())
}

fn print_duplicates(report: &ScanReport, top: usize, format: OutputFormat) -> Result<()> {
    let Some(dups) = &report.duplicates else {
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(70));
            println!(" Duplicate File Report");
            println!("{}", "─".repeat(70));
            println!();

            if dups.groups.is_empty() {
                println!(" No duplicate files found.");
            } else {
                println!(
                    " Found {} duplicate groups ({} files)",
                    dups.group_count, dups.files_with_duplicates
                );
                println!(" Total wasted space: {}", format_size(dups.total_wasted_space));
                println!();

                for (i, group) in dups.groups.iter().take(top).enumerate() {
                    println!(
                        " Group {} ({} files, {} each, {} wasted)",
                        i + 1,
                        group.count(),
                        format_size(group.size),
                        format_size(group.wasted_bytes)
                    );
                    for path in &group.paths {
                        println!("   {}", path.display());
                    }
                    println!();
                }

                if dups.groups.len() > top {
                    println!(" ... and {} more groups", dups.groups.len() - top);
                }
            }

            if !dups.unreadable.is_empty() {
                println!(" {} file(s) could not be read and were skipped", dups.unreadable.len());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(dups)?);
        }
    }

    Ok(())
}

fn print_stale(report: &ScanReport, days: u32, limit: usize, format: OutputFormat) -> Result<()> {
    let Some(stale) = &report.stale else {
        return Ok(());
    };

    match format {
        OutputFormat::Text => {
            let now = unix_seconds(SystemTime::now());
            println!();
            println!("{}", "─".repeat(70));
            println!(" Files not accessed in {days} days");
            println!("{}", "─".repeat(70));
            println!();

            if stale.is_empty() {
                println!(" No stale files found.");
                return Ok(());
            }

            println!(
                " {} files, {} total",
                stale.files.len(),
                format_size(stale.total_size)
            );
            println!();
            for entry in stale.files.iter().take(limit) {
                println!(
                    "   {:>10}  {:<16}  {} ago  {}",
                    format_size(entry.size),
                    format_time(entry.accessed),
                    format_age(entry.age(now)),
                    entry.path.display()
                );
            }
            if stale.files.len() > limit {
                println!("   ... and {} more", stale.files.len() - limit);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(stale)?);
        }
    }

    Ok(())
}

fn print_largest(entries: &[TopFileEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!();
            if entries.is_empty() {
                println!(" No matching files.");
            }
            for (i, entry) in entries.iter().enumerate() {
                println!(
                    " {:>3}. {:>10}  {:<16}  {}",
                    i + 1,
                    format_size(entry.size),
                    format_time(entry.modified),
                    entry.path.display()
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(entries)?);
        }
    }
    Ok(())
}

/// Export scan results to JSON.
fn run_export(report: &ScanReport, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)
                .with_context(|| format!("writing {}", output_path.display()))?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

async fn run_delete(paths: Vec<PathBuf>, options: DeleteOptions, yes: bool) -> Result<()> {
    let verb = if options.use_trash {
        "Move to trash"
    } else {
        "Permanently delete"
    };
    if !yes && !confirm(&format!("{verb} {} file(s)?", paths.len()))? {
        bail!("Aborted");
    }

    let bar = operation_bar(paths.len())?;
    let mut rx = start_delete(paths, options);
    let mut complete = None;

    while let Some(result) = rx.recv().await {
        match result {
            DeleteResult::Progress(p) => {
                bar.set_position(p.files_completed as u64);
                if let Some(current) = &p.current_file {
                    bar.set_message(current.display().to_string());
                }
            }
            DeleteResult::Complete(c) => complete = Some(c),
        }
    }
    bar.finish_and_clear();

    match complete {
        Some(complete) => report_operation(&complete),
        None => bail!("Delete worker stopped unexpectedly"),
    }
}

async fn run_archive(
    paths: Vec<PathBuf>,
    output: PathBuf,
    format: ArchiveFormat,
    yes: bool,
) -> Result<()> {
    let prompt = format!(
        "Archive {} file(s) into {} ({format}) and delete the originals?",
        paths.len(),
        output.display()
    );
    if !yes && !confirm(&prompt)? {
        bail!("Aborted");
    }

    let bar = operation_bar(paths.len())?;
    let mut rx = start_archive(paths, output, format);
    let mut outcome = None;

    while let Some(result) = rx.recv().await {
        match result {
            ArchiveResult::Progress(p) => {
                bar.set_prefix(p.operation_type.to_string());
                bar.set_position(p.files_completed as u64);
            }
            ArchiveResult::Complete(result) => outcome = Some(result),
        }
    }
    bar.finish_and_clear();

    let Some(outcome) = outcome else {
        bail!("Archive worker stopped unexpectedly");
    };
    let outcome = outcome.context("Archive failed; no files were deleted")?;

    println!(
        "Wrote {} ({}, {} entries)",
        outcome.archive_path.display(),
        format_size(outcome.archive_size),
        outcome.archived.len()
    );
    for skipped in &outcome.skipped {
        println!("  not archived: {skipped}");
    }
    report_operation(&outcome.deletion)
}

fn report_operation(complete: &OperationComplete) -> Result<()> {
    println!("{}, freed {}", complete.summary(), format_size(complete.bytes_processed));
    for error in &complete.errors {
        println!("  failed: {error}");
    }
    Ok(())
}

fn operation_bar(len: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:30}] {pos}/{len} {wide_msg}")?
            .progress_chars("█▓░"),
    );
    Ok(bar)
}

fn confirm(prompt: &str) -> Result<bool> {
    eprint!("{prompt} [y/N] ");
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn parse_category(s: &str) -> Result<FileCategory, String> {
    s.parse::<FileCategory>().map_err(|_| {
        format!("unknown category {s:?} (expected images, music, videos, documents, archives or system)")
    })
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Format a Unix timestamp as local date and time.
fn format_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Truncate a string to `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}

/// Parse a size string (e.g., "1KB", "10MB", "1GB").
fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim().to_uppercase();
    let digits = s.trim_end_matches(|c: char| !c.is_ascii_digit() && c != '.');
    let unit = &s[digits.len()..];
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        bail!("invalid size {s:?}: expected a non-negative number with an optional unit");
    }

    let multiplier: u64 = match unit {
        "" | "B" => 1,
        "K" | "KB" => 1024,
        "M" | "MB" => 1024 * 1024,
        "G" | "GB" => 1024 * 1024 * 1024,
        "T" | "TB" => 1024 * 1024 * 1024 * 1024,
        other => bail!("unknown size unit {other:?}"),
    };
    let num: f64 = digits
        .parse()
        .with_context(|| format!("invalid size {s:?}"))?;

    Ok((num * multiplier as f64) as u64)
}
