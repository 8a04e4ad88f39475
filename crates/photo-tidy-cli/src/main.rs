mod commands;
mod logging;
mod progress;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use photo_tidy_core::classify::{self, Classification};
use photo_tidy_core::config::{self, AppConfig};
use photo_tidy_core::storage::Database;
use photo_tidy_core::{
    prune_raw_pairs, ExifReader, IngestEngine, IngestSettings, MetadataReader, Reconciler,
};
use progress::CliReporter;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.debug);

    if let Err(err) = run(args) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let config_path = args
        .config_file
        .clone()
        .unwrap_or_else(config::default_config_path);

    match args.command {
        Some(Commands::Init {
            db_file,
            source_dir,
            destination_dir,
        }) => run_init(&config_path, db_file, source_dir, destination_dir),
        Some(Commands::Copy {
            source_dir,
            destination_dir,
            workers,
            check_duplicates,
        }) => {
            let mut config = load(&config_path)?;
            if let Some(dir) = source_dir {
                config.source_dir = dir.to_string_lossy().into_owned();
            }
            if let Some(dir) = destination_dir {
                config.destination_dir = dir.to_string_lossy().into_owned();
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if let Some(check) = check_duplicates {
                config.duplicate_check = check.into();
            }
            config.validate()?;
            run_copy(&config)
        }
        Some(Commands::Scan {
            destination_dir,
            workers,
        }) => {
            let mut config = load(&config_path)?;
            if let Some(dir) = destination_dir {
                config.destination_dir = dir.to_string_lossy().into_owned();
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.validate()?;
            run_scan(&config)
        }
        Some(Commands::Exif { source_file }) => run_exif(&source_file),
        Some(Commands::RawDupes { image_dir, dry_run }) => run_raw_dupes(&image_dir, dry_run),
        Some(Commands::PrintConfig) => {
            let config = load(&config_path)?;
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<AppConfig> {
    config::load_configuration(path)
        .with_context(|| format!("Error loading configuration from {}", path.display()))
}

fn run_init(
    config_path: &Path,
    db_file: Option<PathBuf>,
    source_dir: Option<PathBuf>,
    destination_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = if config_path.exists() {
        config::read_configuration(config_path)
            .with_context(|| format!("Error reading {}", config_path.display()))?
    } else {
        AppConfig::default()
    };

    let persist = db_file.is_some() || source_dir.is_some() || destination_dir.is_some();
    if let Some(path) = db_file {
        config.db_file = path.to_string_lossy().into_owned();
    }
    if let Some(dir) = source_dir {
        config.source_dir = dir.to_string_lossy().into_owned();
    }
    if let Some(dir) = destination_dir {
        config.destination_dir = dir.to_string_lossy().into_owned();
    }
    config.validate()?;

    let db = Database::open(&config.db_file)
        .with_context(|| format!("Error creating hash index {}", config.db_file))?;
    info!(
        "Hash index {} ready (schema version {})",
        config.db_file.green(),
        db.schema_version()?
    );

    if persist {
        config.save(config_path)?;
        info!("Config saved to {}", config_path.display().to_string().green());
    }
    Ok(())
}

fn run_copy(config: &AppConfig) -> Result<()> {
    if config.source_dir.is_empty() || config.destination_dir.is_empty() {
        bail!("source_dir and destination_dir must be set");
    }

    let engine = IngestEngine::new(IngestSettings::from_config(config));
    install_interrupt_handler(engine.cancel_token())?;

    let reporter = CliReporter::new();
    let report = engine.ingest(&reporter)?;

    println!();
    info!(
        "{} copied ({} bytes), {} already existing, {} duplicates, {} unsupported",
        format!("{}", report.copied).green(),
        format!("{}", report.bytes_copied).green(),
        format!("{}", report.already_existing).yellow(),
        format!("{}", report.duplicates).yellow(),
        format!("{}", report.unsupported).cyan(),
    );
    Ok(())
}

fn run_scan(config: &AppConfig) -> Result<()> {
    if config.destination_dir.is_empty() {
        bail!("destination_dir must be set");
    }

    let reconciler = Reconciler::new(&config.destination_dir, &config.db_file)
        .with_workers(config.workers)
        .with_ignore_patterns(config.ignore_patterns.clone());
    install_interrupt_handler(reconciler.cancel_token())?;

    let reporter = CliReporter::new();
    let report = reconciler.reconcile(&reporter)?;

    println!();
    info!(
        "{} hashed, {} inserted, {} already recorded, {} unsupported",
        format!("{}", report.hashed).green(),
        format!("{}", report.inserted).green(),
        format!("{}", report.already_recorded).yellow(),
        format!("{}", report.unsupported).cyan(),
    );
    Ok(())
}

fn run_exif(source_file: &Path) -> Result<()> {
    let kind = match classify::classify(source_file)
        .with_context(|| format!("Error reading {}", source_file.display()))?
    {
        Classification::Supported(kind) => kind,
        Classification::Unsupported => bail!("{} is not a supported media file", source_file.display()),
    };
    println!("{}", kind.mime());

    if !kind.is_image() {
        return Ok(());
    }
    let tags = ExifReader
        .read_tags(source_file)
        .with_context(|| format!("Error reading metadata from {}", source_file.display()))?;
    for (name, value) in &tags {
        println!("NAME=[{}] VALUE=[{}]", name, value);
    }
    Ok(())
}

fn run_raw_dupes(image_dir: &Path, dry_run: bool) -> Result<()> {
    let report = prune_raw_pairs(image_dir, dry_run)?;
    let verb = if dry_run { "would delete" } else { "deleted" };
    for path in &report.removed {
        println!("{} {}", verb.red(), path.display());
    }
    for (first, second) in &report.unresolved {
        println!("{} {}, {}", "need to delete".yellow(), first.display(), second.display());
    }
    Ok(())
}

/// First Ctrl-C cancels the run, a second one exits immediately.
fn install_interrupt_handler(token: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        if token.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
        warn!("Interrupted, stopping after in-flight files...");
    })
    .context("Error installing interrupt handler")
}
