//! Main entry point for the zipfetch CLI application.
//!
//! Downloads a ZIP archive and either extracts it into a directory or lists
//! its contents.

use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use tokio::task::JoinHandle;

use zipfetch::{
    Cli, Downloader, ExtractReport, ProgressReceiver, SkipReason, ZipArchive, logging,
    progress_channel,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.quiet);

    if !cli.is_http_url() {
        bail!("'{}' is not an http:// or https:// URL", cli.url);
    }
    let url = Url::parse(&cli.url).with_context(|| format!("invalid URL '{}'", cli.url))?;

    let downloader = Downloader::new(cli.fetch_options(), cli.extract_options())?;

    let (tx, rx) = progress_channel();
    let bar = (!cli.is_very_quiet()).then(|| spawn_progress_bar(rx));

    if cli.is_listing() {
        let result = downloader.fetcher().fetch(&url, Some(&tx)).await;
        drop(tx);
        finish_progress_bar(bar).await;
        let data = result?;
        return list_files(&data, cli.verbose);
    }

    let result = downloader
        .download_and_extract(&url, &cli.extract_dir, Some(tx))
        .await;
    finish_progress_bar(bar).await;

    let report = result.with_context(|| format!("failed to download and extract {url}"))?;
    print_report(&report, &cli);
    Ok(())
}

/// Drive an `indicatif` bar from the progress channel until it closes.
fn spawn_progress_bar(mut rx: ProgressReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::no_length();
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} {bytes}/{total_bytes} {bytes_per_sec} {wide_bar}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        while let Some(progress) = rx.recv().await {
            if let Some(total) = progress.total {
                bar.set_length(total);
            }
            bar.set_position(progress.received);
        }
        bar.finish_and_clear();
    })
}

async fn finish_progress_bar(bar: Option<JoinHandle<()>>) {
    if let Some(bar) = bar {
        let _ = bar.await;
    }
}

fn print_report(report: &ExtractReport, cli: &Cli) {
    if !cli.is_quiet() {
        for file in &report.files {
            println!("  extracting: {}", file.display());
        }
    }

    for skipped in &report.skipped {
        let reason = match &skipped.reason {
            SkipReason::UnsafePath => "path escapes the destination".to_string(),
            SkipReason::UnreadableHeader => "damaged entry header".to_string(),
            SkipReason::Extraction(err) => err.clone(),
        };
        eprintln!("Skipping: {} ({})", skipped.name, reason);
    }
}

/// List files in the ZIP archive.
///
/// Supports two output formats:
/// - Simple format (`-l`): Just file names, one per line
/// - Verbose format (`-v`): Detailed table with size, compression ratio, and timestamps
fn list_files(data: &[u8], verbose: bool) -> Result<()> {
    let archive = ZipArchive::open(data).context("downloaded file is not a ZIP archive")?;

    if !verbose {
        for entry in archive.entries() {
            println!("{}", entry.name);
        }
        return Ok(());
    }

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in archive.entries() {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.name
        );

        if !entry.is_directory {
            total_uncompressed = total_uncompressed.saturating_add(entry.uncompressed_size);
            total_compressed = total_compressed.saturating_add(entry.compressed_size);
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>21}  {} files ({})",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count,
        format_size(data.len() as u64)
    );

    Ok(())
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed >= uncompressed {
        return "  0%".to_string();
    }
    let kept = u128::from(compressed) * 100 / u128::from(uncompressed);
    format!("{:>4}%", 100 - kept)
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
