//! Core functionality for curating scraped media corpora.
//!
//! A corpus is a flat directory of images named `label_likes_YYYY-MM-DD_id.ext`. This library
//! provides the operations applied to such a directory:
//! - Near-duplicate pruning by structural similarity
//! - Border trimming
//! - Windowed engagement ranking
//! - File time restoration from post dates
//! - Zero-padding of the engagement field

// -- External Dependencies --
use log::{error, info};
use std::path::Path;

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, ErrorKind, Result};
pub use types::*;

// -- Public Modules --
pub mod config;
pub mod dedupe;
pub mod discovery;
pub mod filename;
pub mod logging;
pub mod normalize;
pub mod progress;
pub mod rank;
pub mod similarity;
pub mod store;
pub mod timestamps;
pub mod trim;
pub mod types;

use discovery::CorpusSnapshot;
use store::{FileStore, FsStore};

/// Main entry point for curating corpus directories
pub struct Curator<S: FileStore = FsStore> {
    config: Config,
    store: S,
}

impl Curator<FsStore> {
    /// Create a new Curator working on the real file system
    pub fn new(config: Config) -> Self {
        Self::with_store(config, FsStore)
    }
}

impl<S: FileStore> Curator<S> {
    /// Create a Curator backed by an arbitrary store
    pub fn with_store(config: Config, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one operation over a fresh listing of `dir`
    pub fn run_operation(&self, dir: &Path, operation: Operation) -> Result<OperationReport> {
        let snapshot = CorpusSnapshot::scan(&self.store, dir)?;
        info!(
            "Running {} on {} ({} files)",
            operation,
            dir.display(),
            snapshot.len()
        );

        match operation {
            Operation::Duplicates => dedupe::prune_duplicates(&self.store, &snapshot, &self.config),
            Operation::Borders => trim::trim_borders(&self.store, &snapshot, &self.config),
            Operation::Rank => rank::rank_corpus(&self.store, &snapshot, &self.config),
            Operation::Timestamps => {
                timestamps::restore_timestamps(&self.store, &snapshot, &self.config)
            }
            Operation::NormalizeLikes => {
                normalize::normalize_likes(&self.store, &snapshot, &self.config)
            }
        }
    }

    /// Run the requested operations on one directory.
    ///
    /// Operations run in [`Operation`] order whatever order they are given in, each on its
    /// own snapshot so that it sees the effect of the previous one. A directory-level error
    /// stops the remaining operations for this directory and is recorded in the report.
    pub fn process_dir(&self, dir: &Path, operations: &[Operation]) -> DirectoryReport {
        let mut ordered = operations.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut report = DirectoryReport {
            root: dir.to_path_buf(),
            reports: Vec::with_capacity(ordered.len()),
            fatal: None,
        };

        for operation in ordered {
            match self.run_operation(dir, operation) {
                Ok(op_report) => report.reports.push(op_report),
                Err(e) => {
                    error!("{} failed on {}: {}", operation, dir.display(), e);
                    report.fatal = Some(format!("{}: {}", operation, e));
                    break;
                }
            }
        }

        report
    }
}
