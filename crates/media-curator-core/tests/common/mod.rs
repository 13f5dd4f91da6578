use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway corpus directory
pub struct TestCorpus {
    pub dir: TempDir,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Save `image` under `name`; the extension picks the encoder
    pub fn add_image(&self, name: &str, image: &DynamicImage) -> PathBuf {
        let path = self.path(name);
        image.save(&path).unwrap();
        path
    }

    /// Create an empty file; enough for operations that only read names
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        File::create(&path).unwrap();
        path
    }

    /// Sorted file names directly inside `subdir` (or the root when empty)
    pub fn names(&self, subdir: &str) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.root().join(subdir))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// Alternating black and white bands, ten per image
pub fn stripes(size: u32, horizontal: bool) -> DynamicImage {
    let band = size / 10;
    DynamicImage::ImageLuma8(GrayImage::from_fn(size, size, |x, y| {
        let index = if horizontal { y / band } else { x / band };
        Luma([if index % 2 == 0 { 0 } else { 255 }])
    }))
}

/// A colored block of `inner` pixels centered on a white canvas with a margin of `margin`
pub fn framed(inner: (u32, u32), margin: u32) -> DynamicImage {
    let (w, h) = inner;
    let mut canvas = RgbImage::from_pixel(w + 2 * margin, h + 2 * margin, Rgb([255, 255, 255]));
    for y in 0..h {
        for x in 0..w {
            canvas.put_pixel(margin + x, margin + y, Rgb([(x * 7 % 200) as u8, 40, 90]));
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

/// One-pixel checkerboard; content reaches every edge
pub fn checkerboard(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    }))
}
