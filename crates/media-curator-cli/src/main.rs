use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info, warn};
use media_curator_core::discovery::{expand_directories, normalize_dir_arg};
use media_curator_core::{logging, Config, Curator, LinkMode, LogLevel, Operation, TimeZonePolicy};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "media-curator")]
#[command(about = "Curate scraped image corpora")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run curation operations on corpus directories
    Curate {
        /// Corpus directories; `parent/*` selects every subdirectory of `parent`
        #[arg(required = true, value_parser = parse_dir)]
        directories: Vec<PathBuf>,

        /// Remove near-duplicate images, keeping the highest resolution
        #[arg(short = 'd', long)]
        duplicates: bool,

        /// Crop uniform borders
        #[arg(short = 'b', long)]
        borders: bool,

        /// Export engagement outliers into the ranking directories
        #[arg(short = 's', long)]
        sort: bool,

        /// Set file times to the post date
        #[arg(short = 't', long = "time")]
        timestamps: bool,

        /// Zero-pad the likes field of every file name
        #[arg(short = 'n', long)]
        normalize_likes: bool,

        /// SSIM score at or above which two images are duplicates
        #[arg(long)]
        threshold: Option<f64>,

        /// Number of preceding posts each post is ranked against
        #[arg(long)]
        window_size: Option<usize>,

        /// How ranked files are placed into the output directories
        #[arg(long, value_enum)]
        link_mode: Option<LinkArg>,

        /// Interpret post dates in UTC instead of local time
        #[arg(long)]
        utc: bool,

        /// Worker threads for border trimming (0 = one per core)
        #[arg(long)]
        threads: Option<usize>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write a rotating log file into this directory instead of logging to stderr
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Do not draw progress bars
        #[arg(long)]
        no_progress: bool,

        /// Verbosity level
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },

    /// Generate default configuration file
    GenerateConfig {
        /// Path to save configuration file
        #[arg(default_value = "media-curator.json")]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LinkArg {
    Copy,
    Hardlink,
    Symlink,
}

impl From<LinkArg> for LinkMode {
    fn from(arg: LinkArg) -> Self {
        match arg {
            LinkArg::Copy => LinkMode::Copy,
            LinkArg::Hardlink => LinkMode::HardLink,
            LinkArg::Symlink => LinkMode::SymLink,
        }
    }
}

fn parse_dir(arg: &str) -> Result<PathBuf, String> {
    Ok(normalize_dir_arg(arg))
}

/// Log level for `-v` repeated `verbose` times; without `-v` the configured level stands
fn verbosity_level(verbose: u8, configured: LogLevel) -> LogLevel {
    match verbose {
        0 => configured,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

fn init_logging(log_dir: Option<&PathBuf>, level: LogLevel) -> Result<(), anyhow::Error> {
    match log_dir {
        Some(dir) => logging::init_logger(dir, level.as_filter())?,
        None => {
            env_logger::Builder::new()
                .filter_level(level.as_filter())
                .parse_default_env()
                .init();
        }
    }
    Ok(())
}

fn main() -> Result<ExitCode, anyhow::Error> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::Curate {
            directories,
            duplicates,
            borders,
            sort,
            timestamps,
            normalize_likes,
            threshold,
            window_size,
            link_mode,
            utc,
            threads,
            config,
            log_dir,
            no_progress,
            verbose,
        } => {
            // Set up configuration
            let mut config = if let Some(config_path) = config {
                Config::from_file(&config_path)?
            } else {
                Config::default()
            };

            // Override config with command line arguments
            if let Some(threshold) = threshold {
                config.similarity_threshold = threshold;
            }
            if window_size.is_some() {
                config.window_size = window_size;
            }
            if let Some(mode) = link_mode {
                config.link_mode = mode.into();
            }
            if utc {
                config.time_zone = TimeZonePolicy::Utc;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }
            config.show_progress = !no_progress;

            // Set log level based on verbosity
            config.log_level = verbosity_level(verbose, config.log_level);

            init_logging(log_dir.as_ref(), config.log_level)?;

            // Validate configuration
            config.validate()?;

            let operations: Vec<Operation> = [
                (duplicates, Operation::Duplicates),
                (borders, Operation::Borders),
                (sort, Operation::Rank),
                (timestamps, Operation::Timestamps),
                (normalize_likes, Operation::NormalizeLikes),
            ]
            .into_iter()
            .filter_map(|(selected, op)| selected.then_some(op))
            .collect();

            if operations.is_empty() {
                warn!("No operation selected; pass at least one of -d -b -s -t -n");
                return Ok(ExitCode::FAILURE);
            }

            let (dirs, rejected) = expand_directories(&directories);
            for arg in &rejected {
                error!("Not a directory: {}", arg.display());
            }

            let curator = Curator::new(config);
            let mut succeeded = 0;

            info!("Starting curation of {} directories...", dirs.len());
            for dir in &dirs {
                let report = curator.process_dir(dir, &operations);
                print!("{}", report);
                if report.is_ok() {
                    succeeded += 1;
                }
            }
            info!("Curation complete: {}/{} directories", succeeded, dirs.len());

            if succeeded == 0 {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::GenerateConfig { path } => {
            let config = Config::default();
            config.save_to_file(&path)?;
            println!("Configuration file generated at: {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
