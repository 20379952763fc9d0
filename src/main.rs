use anyhow::{Context, Result};
use clap::Parser;
use drivecarve::extractor::Extractor;
use drivecarve::index::{IndexStore, RestartMarker};
use drivecarve::scanner::Scanner;
use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A streaming file carver for raw disk images, recovering JPEG/PNG/ZIP/PDF by
/// structural parsing rather than filesystem metadata.
#[derive(Parser)]
#[command(
    author = "vkkkv",
    version,
    about = "Recover JPEG, PNG, ZIP and PDF files from a raw disk image or block device."
)]
struct Args {
    /// Path to the device or disk image to scan
    drive: PathBuf,

    /// Directory where recovered files are written
    #[arg(short, long, default_value = "recovered")]
    output: PathBuf,

    /// Discard any persisted index and restart marker before starting
    #[arg(long)]
    fresh: bool,

    /// Raise log verbosity to info
    #[arg(short, long)]
    verbose: bool,

    /// Raise log verbosity to debug
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let index_path = PathBuf::from("index.txt");
    let marker_path = PathBuf::from("last_write_index.txt");

    if args.fresh {
        log::info!("--fresh passed, discarding persisted index and restart marker");
        IndexStore::new(&index_path).remove()?;
        RestartMarker::new(&marker_path).remove()?;
    }

    let index_store = IndexStore::new(&index_path);
    let regions = index_store
        .load()
        .context("failed to load persisted index; repair or remove it and re-run with --fresh")?;

    log::info!("starting scan with {} region(s) already indexed", regions.len());
    if let (Some(first), Some(last)) = (regions.first(), regions.last()) {
        log::info!("index spans {}..{}", first.start, last.end);
    }

    let extractor = Extractor::new(RestartMarker::new(&marker_path), args.output.clone())
        .context("failed to load restart marker")?;

    let device = File::open(&args.drive)
        .with_context(|| format!("failed to open drive {}", args.drive.display()))?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            log::warn!("interrupt received, finishing current region and saving state");
            cancel.store(true, Ordering::Relaxed);
        })
        .context("failed to install interrupt handler")?;
    }

    let mut scanner = Scanner::new(device, index_store, extractor, regions, cancel);
    scanner.run().context("scan aborted")?;

    let (mut device, mut extractor, regions) = scanner.into_parts();
    log::info!(
        "scan complete, {} region(s) indexed; running final extraction pass",
        regions.len()
    );
    let written = extractor
        .run(&mut device, &regions)
        .context("extraction failed")?;

    println!(
        "Scan complete. {} region(s) indexed, {written} file(s) written to {}",
        regions.len(),
        args.output.display()
    );
    Ok(())
}
