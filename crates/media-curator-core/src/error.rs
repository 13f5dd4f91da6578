use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the media-curator library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding error
    #[error("Image processing error: {0}")]
    Image(image::ImageError),

    /// File name does not follow the `label_likes_date_id.ext` grammar
    #[error("Malformed file name {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    /// File or directory not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A calendar date that cannot be mapped onto a file time
    #[error("Invalid timestamp for {path}: {reason}")]
    Time { path: PathBuf, reason: String },

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            other => Error::Image(other),
        }
    }
}

/// Coarse classification used when reporting skipped files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    Format,
    Decode,
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Format => "format",
            ErrorKind::Decode => "decode",
            ErrorKind::Io => "io",
            ErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

impl Error {
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format { .. } => ErrorKind::Format,
            Error::Image(_) => ErrorKind::Decode,
            Error::Io(_) | Error::FileNotFound(_) | Error::NotADirectory(_) => ErrorKind::Io,
            Error::Configuration(_) | Error::Time { .. } | Error::Unknown(_) => ErrorKind::Other,
        }
    }
}
