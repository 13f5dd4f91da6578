use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::store::FileStore;
use crate::types::ImageFormat;

/// The media files of one corpus directory, as seen by a single listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusSnapshot {
    pub root: PathBuf,
    pub items: Vec<PathBuf>,
}

impl CorpusSnapshot {
    /// List `root` through `store`
    pub fn scan(store: &dyn FileStore, root: &Path) -> Result<Self> {
        let items = store.list_media(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            items,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Get image format from file extension
fn get_image_format(path: &Path) -> Option<ImageFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(ImageFormat::from_extension)
}

/// Returns if the given path has a corpus media extension
pub fn is_media_path(path: &Path) -> bool {
    match get_image_format(path) {
        Some(format) => format.is_supported(),
        None => false,
    }
}

/// Resolve command-line directory arguments.
///
/// An argument ending in `/*` stands for every subdirectory of its parent. Returns the
/// directories to process (deduplicated, in argument order) and the arguments that did not
/// name a directory.
pub fn expand_directories(args: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut dirs: Vec<PathBuf> = Vec::new();
    let mut rejected = Vec::new();

    for arg in args {
        let text = arg.to_string_lossy();
        let expanded = match text.strip_suffix("/*") {
            Some(parent) => match subdirectories(Path::new(parent)) {
                Ok(children) => children,
                Err(_) => {
                    rejected.push(arg.clone());
                    continue;
                }
            },
            None if arg.is_dir() => vec![arg.clone()],
            None => {
                rejected.push(arg.clone());
                continue;
            }
        };

        for dir in expanded {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
    }

    (dirs, rejected)
}

/// Sorted immediate subdirectories of `parent`
fn subdirectories(parent: &Path) -> Result<Vec<PathBuf>> {
    if !parent.is_dir() {
        return Err(Error::NotADirectory(parent.to_path_buf()));
    }

    let mut children = Vec::new();
    for entry in WalkDir::new(parent).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_dir() {
            children.push(entry.into_path());
        }
    }
    children.sort();
    Ok(children)
}

/// Remove a trailing separator the shell may have completed
pub fn normalize_dir_arg(arg: &str) -> PathBuf {
    let trimmed = arg.trim_end_matches('/');
    if trimmed.is_empty() {
        PathBuf::from(arg)
    } else {
        PathBuf::from(trimmed)
    }
}

// -- Tests --
