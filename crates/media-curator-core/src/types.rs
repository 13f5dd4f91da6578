use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::LinkMode;
use crate::error::{Error, ErrorKind};

/// Supported image formats
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Other(String),
}

impl ImageFormat {
    /// Determine format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" => Self::Jpeg,
            "png" => Self::Png,
            other => Self::Other(other.to_string()),
        }
    }

    /// Check if format is part of a scraped corpus
    pub fn is_supported(&self) -> bool {
        match self {
            Self::Jpeg | Self::Png => true,
            Self::Other(_) => false,
        }
    }
}

/// Curation operations, declared in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    /// Remove near-duplicate images
    Duplicates,

    /// Crop uniform borders
    Borders,

    /// Export engagement outliers
    Rank,

    /// Restore file times from post dates
    Timestamps,

    /// Zero-pad the engagement field
    NormalizeLikes,
}

impl Operation {
    /// Every operation, in execution order
    pub const ALL: [Operation; 5] = [
        Operation::Duplicates,
        Operation::Borders,
        Operation::Rank,
        Operation::Timestamps,
        Operation::NormalizeLikes,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Duplicates => "duplicates",
            Operation::Borders => "borders",
            Operation::Rank => "rank",
            Operation::Timestamps => "timestamps",
            Operation::NormalizeLikes => "normalize-likes",
        };
        f.write_str(name)
    }
}

/// Crop rectangle in pixel coordinates; `right` and `bottom` are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// A change an operation made to the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Image overwritten with the given region of itself
    Crop { path: PathBuf, region: BoundingBox },

    /// File removed because `kept` is a higher-resolution near-duplicate
    Delete {
        path: PathBuf,
        kept: PathBuf,
        similarity: f64,
    },

    /// File renamed
    Rename { from: PathBuf, to: PathBuf },

    /// Copy or link of `source` created at `target`
    Materialize {
        source: PathBuf,
        target: PathBuf,
        mode: LinkMode,
    },

    /// Access and modification times set to `timestamp` (Unix seconds)
    SetTimes { path: PathBuf, timestamp: i64 },

    /// Output directory removed and recreated empty
    RecreateDir { path: PathBuf },
}

/// A file an operation could not handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl SkippedFile {
    pub fn new(path: &Path, error: &Error) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Outcome of one operation over one corpus snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation: Operation,

    /// Files the operation handled without error (changed or not)
    pub processed: usize,

    /// Changes made, in the order they were applied
    pub applied: Vec<Mutation>,

    /// Files left out because of a per-file error
    pub skipped: Vec<SkippedFile>,
}

impl OperationReport {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            processed: 0,
            applied: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, path: &Path, error: &Error) {
        crate::logging::log_file_error(path, &self.operation.to_string(), error);
        self.skipped.push(SkippedFile::new(path, error));
    }

    pub fn skipped_count(&self, kind: ErrorKind) -> usize {
        self.skipped.iter().filter(|s| s.kind == kind).count()
    }
}

/// Everything that happened to one corpus directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub root: PathBuf,
    pub reports: Vec<OperationReport>,

    /// Directory-level error that stopped processing, if any
    pub fatal: Option<String>,
}

impl DirectoryReport {
    pub fn is_ok(&self) -> bool {
        self.fatal.is_none()
    }
}

impl fmt::Display for DirectoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.root.display())?;
        for report in &self.reports {
            writeln!(
                f,
                "  {:<16} processed {:>5}  changed {:>5}  skipped: format {} / decode {} / io {} / other {}",
                report.operation.to_string(),
                report.processed,
                report.applied.len(),
                report.skipped_count(ErrorKind::Format),
                report.skipped_count(ErrorKind::Decode),
                report.skipped_count(ErrorKind::Io),
                report.skipped_count(ErrorKind::Other),
            )?;
        }
        if let Some(fatal) = &self.fatal {
            writeln!(f, "  aborted: {}", fatal)?;
        }
        Ok(())
    }
}
