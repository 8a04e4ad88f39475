use clap::{Parser, Subcommand, ValueEnum};
use photo_tidy_core::DuplicateCheck;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "photo-tidy")]
#[command(about = "Copy photos and videos into a dated archive", long_about = None)]
pub struct Cli {
    /// Config file (default: $HOME/.config/photo-tidy/config.json)
    #[arg(long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Log at debug level regardless of TRACING_LEVEL
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the hash index and optionally save settings to the config file
    Init {
        #[arg(long)]
        db_file: Option<PathBuf>,
        #[arg(long)]
        source_dir: Option<PathBuf>,
        #[arg(long)]
        destination_dir: Option<PathBuf>,
    },
    /// Copy new media from the source into the archive
    Copy {
        #[arg(long)]
        source_dir: Option<PathBuf>,
        #[arg(long)]
        destination_dir: Option<PathBuf>,
        /// Number of copy workers
        #[arg(long)]
        workers: Option<usize>,
        /// Duplicate check to run before copying
        #[arg(long, value_enum)]
        check_duplicates: Option<DuplicateCheckArg>,
    },
    /// Record the hash of every file already in the archive
    Scan {
        #[arg(long)]
        destination_dir: Option<PathBuf>,
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the content type and metadata tags of one file
    Exif {
        #[arg(long)]
        source_file: PathBuf,
    },
    /// Delete the CR2 half of RAW+JPEG pairs
    RawDupes {
        #[arg(long)]
        image_dir: PathBuf,
        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DuplicateCheckArg {
    Off,
    HashIndex,
    DestinationScan,
}

impl From<DuplicateCheckArg> for DuplicateCheck {
    fn from(arg: DuplicateCheckArg) -> Self {
        match arg {
            DuplicateCheckArg::Off => DuplicateCheck::Off,
            DuplicateCheckArg::HashIndex => DuplicateCheck::HashIndex,
            DuplicateCheckArg::DestinationScan => DuplicateCheck::DestinationScan,
        }
    }
}
