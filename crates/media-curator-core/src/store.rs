//! File access behind a trait, so operations can run against a real directory or an in-memory
//! corpus in tests.

use image::{DynamicImage, ImageOutputFormat};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use walkdir::WalkDir;

use crate::config::LinkMode;
use crate::discovery::is_media_path;
use crate::error::{Error, Result};

/// Everything the curation operations need from the corpus storage
pub trait FileStore: Send + Sync {
    /// Media files directly inside `dir`, sorted by path
    fn list_media(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    fn read_image(&self, path: &Path) -> Result<DynamicImage>;

    /// Overwrite `path` with `image`, keeping the format implied by its extension
    fn write_image(&self, path: &Path, image: &DynamicImage) -> Result<()>;

    /// Native (width, height) of the stored image
    fn dimensions(&self, path: &Path) -> Result<(u32, u32)>;

    fn exists(&self, path: &Path) -> bool;

    fn remove(&self, path: &Path) -> Result<()>;

    /// Rename without overwriting an existing file
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Set access and modification time to `timestamp` (Unix seconds)
    fn set_times(&self, path: &Path, timestamp: i64) -> Result<()>;

    /// Remove `dir` with its contents if present, then create it empty
    fn recreate_dir(&self, dir: &Path) -> Result<()>;

    /// Place a copy or link of `source` at `target`
    fn materialize(&self, source: &Path, target: &Path, mode: LinkMode) -> Result<()>;
}

/// The real file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStore;

impl FileStore for FsStore {
    fn list_media(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.exists() {
            return Err(Error::FileNotFound(dir.to_path_buf()));
        }
        if !dir.is_dir() {
            return Err(Error::NotADirectory(dir.to_path_buf()));
        }

        let mut media = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if entry.file_type().is_file() && is_media_path(entry.path()) {
                media.push(entry.into_path());
            }
        }
        media.sort();
        Ok(media)
    }

    fn read_image(&self, path: &Path) -> Result<DynamicImage> {
        Ok(image::open(path)?)
    }

    fn write_image(&self, path: &Path, image: &DynamicImage) -> Result<()> {
        Ok(image.save(path)?)
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        Ok(image::image_dimensions(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove(&self, path: &Path) -> Result<()> {
        Ok(fs::remove_file(path)?)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if to.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            )));
        }
        Ok(fs::rename(from, to)?)
    }

    fn set_times(&self, path: &Path, timestamp: i64) -> Result<()> {
        let time = filetime::FileTime::from_unix_time(timestamp, 0);
        Ok(filetime::set_file_times(path, time, time)?)
    }

    fn recreate_dir(&self, dir: &Path) -> Result<()> {
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        Ok(fs::create_dir_all(dir)?)
    }

    fn materialize(&self, source: &Path, target: &Path, mode: LinkMode) -> Result<()> {
        match mode {
            LinkMode::Copy => {
                fs::copy(source, target)?;
            }
            LinkMode::HardLink => fs::hard_link(source, target)?,
            LinkMode::SymLink => {
                let source = fs::canonicalize(source)?;
                #[cfg(unix)]
                std::os::unix::fs::symlink(&source, target)?;
                #[cfg(windows)]
                std::os::windows::fs::symlink_file(&source, target)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct MemoryFile {
    bytes: Vec<u8>,
    timestamp: Option<i64>,
    link: Option<(PathBuf, LinkMode)>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, MemoryFile>,
    dirs: BTreeSet<PathBuf>,
}

/// An in-memory corpus. Images are held PNG-encoded regardless of their extension.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an (empty) directory
    pub fn add_dir(&self, dir: impl Into<PathBuf>) {
        self.lock().dirs.insert(dir.into());
    }

    /// Store `image` at `path`, registering its parent directory
    pub fn insert_image(&self, path: impl Into<PathBuf>, image: &DynamicImage) -> Result<()> {
        let bytes = encode_png(image)?;
        self.insert_bytes(path, bytes);
        Ok(())
    }

    /// Store raw bytes at `path`, registering its parent directory
    pub fn insert_bytes(&self, path: impl Into<PathBuf>, bytes: Vec<u8>) {
        let path = path.into();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            state.dirs.insert(parent.to_path_buf());
        }
        state.files.insert(
            path,
            MemoryFile {
                bytes,
                timestamp: None,
                link: None,
            },
        );
    }

    /// All file paths directly inside `dir`, media or not
    pub fn files_in(&self, dir: &Path) -> Vec<PathBuf> {
        self.lock()
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect()
    }

    /// Timestamp last set through [`FileStore::set_times`]
    pub fn timestamp(&self, path: &Path) -> Option<i64> {
        self.lock().files.get(path).and_then(|f| f.timestamp)
    }

    /// Source and mode of a materialized file
    pub fn link_of(&self, path: &Path) -> Option<(PathBuf, LinkMode)> {
        self.lock().files.get(path).and_then(|f| f.link.clone())
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        self.lock().dirs.contains(path)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the corpus from the assertions that follow
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bytes(&self, path: &Path) -> Result<Vec<u8>> {
        self.lock()
            .files
            .get(path)
            .map(|f| f.bytes.clone())
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
    }
}

impl FileStore for MemoryStore {
    fn list_media(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(dir) {
            return Err(Error::FileNotFound(dir.to_path_buf()));
        }
        Ok(self
            .files_in(dir)
            .into_iter()
            .filter(|p| is_media_path(p))
            .collect())
    }

    fn read_image(&self, path: &Path) -> Result<DynamicImage> {
        let bytes = self.bytes(path)?;
        Ok(image::load_from_memory(&bytes)?)
    }

    fn write_image(&self, path: &Path, image: &DynamicImage) -> Result<()> {
        let bytes = encode_png(image)?;
        let mut state = self.lock();
        let file = state
            .files
            .get_mut(path)
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;
        file.bytes = bytes;
        Ok(())
    }

    fn dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        let image = self.read_image(path)?;
        Ok((image.width(), image.height()))
    }

    fn exists(&self, path: &Path) -> bool {
        let state = self.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        if state.files.contains_key(to) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", to.display()),
            )));
        }
        let file = state
            .files
            .remove(from)
            .ok_or_else(|| Error::FileNotFound(from.to_path_buf()))?;
        state.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    fn set_times(&self, path: &Path, timestamp: i64) -> Result<()> {
        let mut state = self.lock();
        let file = state
            .files
            .get_mut(path)
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;
        file.timestamp = Some(timestamp);
        Ok(())
    }

    fn recreate_dir(&self, dir: &Path) -> Result<()> {
        let mut state = self.lock();
        state.files.retain(|p, _| !p.starts_with(dir));
        state.dirs.retain(|d| !d.starts_with(dir));
        state.dirs.insert(dir.to_path_buf());
        Ok(())
    }

    fn materialize(&self, source: &Path, target: &Path, mode: LinkMode) -> Result<()> {
        let mut state = self.lock();
        let parent = target.parent().unwrap_or_else(|| Path::new(""));
        if !state.dirs.contains(parent) {
            return Err(Error::FileNotFound(parent.to_path_buf()));
        }
        if state.files.contains_key(target) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            )));
        }
        let mut file = state
            .files
            .get(source)
            .cloned()
            .ok_or_else(|| Error::FileNotFound(source.to_path_buf()))?;
        file.link = Some((source.to_path_buf(), mode));
        state.files.insert(target.to_path_buf(), file);
        Ok(())
    }
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])))
    }

    #[test]
    fn test_fs_store_lists_only_top_level_media() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("abs_avg");
        fs::create_dir(&sub).unwrap();

        solid(4, 4).save(dir.path().join("b_1_2021-01-01_x.png")).unwrap();
        solid(4, 4).save(dir.path().join("a_1_2021-01-01_y.jpg")).unwrap();
        solid(4, 4).save(sub.join("c_1_2021-01-01_z.png")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let listed = FsStore.list_media(dir.path()).unwrap();
        assert_eq!(
            listed,
            vec![
                dir.path().join("a_1_2021-01-01_y.jpg"),
                dir.path().join("b_1_2021-01-01_x.png"),
            ]
        );
    }

    #[test]
    fn test_fs_store_missing_directory() {
        let result = FsStore.list_media(Path::new("/path/that/does/not/exist"));
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }

    #[test]
    fn test_fs_store_rename_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        fs::write(&a, b"a").unwrap();
        fs::write(&b, b"b").unwrap();

        assert!(FsStore.rename(&a, &b).is_err());
        assert_eq!(fs::read(&b).unwrap(), b"b");
    }

    #[test]
    fn test_fs_store_recreate_dir_discards_contents() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("abs_std");
        fs::create_dir(&out).unwrap();
        fs::write(out.join("stale.jpg"), b"old").unwrap();

        FsStore.recreate_dir(&out).unwrap();
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_memory_store_round_trips_images() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/corpus/a_1_2021-01-01_x.jpg");
        store.insert_image(&path, &solid(6, 3)).unwrap();

        assert_eq!(store.dimensions(&path).unwrap(), (6, 3));
        assert_eq!(store.list_media(Path::new("/corpus")).unwrap(), vec![path]);
    }

    #[test]
    fn test_memory_store_reports_undecodable_bytes() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/corpus/broken.png");
        store.insert_bytes(&path, b"not an image".to_vec());

        let err = store.read_image(&path).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }
}
