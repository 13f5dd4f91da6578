//! Border trimming.
//!
//! The color of pixel (0,0) is taken as the background. Per-channel differences from it are
//! pushed through `gain * d + bias` and clipped to the channel range, which drops faint
//! compression noise around the content; the bounding box of what survives is the crop.

use image::{DynamicImage, GenericImageView};
use log::debug;
use rayon::prelude::*;
use std::path::Path;

use crate::config::Config;
use crate::discovery::CorpusSnapshot;
use crate::error::{Error, Result};
use crate::logging::log_fs_modification;
use crate::progress::file_progress;
use crate::store::FileStore;
use crate::types::{BoundingBox, Mutation, Operation, OperationReport};

/// Noise suppression applied to background differences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimParams {
    pub gain: f32,
    pub bias: f32,
    pub borderless_ratio: f64,
}

impl From<&Config> for TrimParams {
    fn from(config: &Config) -> Self {
        Self {
            gain: config.trim_gain,
            bias: config.trim_bias,
            borderless_ratio: config.borderless_ratio,
        }
    }
}

/// What trimming decided for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimOutcome {
    /// Every pixel matches the background
    Uniform,

    /// Content covers (almost) the whole image
    Borderless,

    /// Image was cropped to the region
    Cropped(BoundingBox),
}

/// Bounding box of pixels that differ from the (0,0) color after noise suppression
pub fn content_box(image: &DynamicImage, gain: f32, bias: f32) -> Option<BoundingBox> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let rgba = image.to_rgba8();
    let reference = *rgba.get_pixel(0, 0);

    let mut bounds: Option<BoundingBox> = None;
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let differs = pixel
            .0
            .iter()
            .zip(reference.0.iter())
            .any(|(&p, &r)| amplify(p.abs_diff(r), gain, bias) > 0);
        if !differs {
            continue;
        }

        bounds = Some(match bounds {
            None => BoundingBox {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(b) => BoundingBox {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x + 1),
                bottom: b.bottom.max(y + 1),
            },
        });
    }
    bounds
}

fn amplify(difference: u8, gain: f32, bias: f32) -> u8 {
    (difference as f32 * gain + bias).clamp(0.0, 255.0) as u8
}

/// Decide how `image` should be trimmed, without touching storage
pub fn plan_trim(image: &DynamicImage, params: &TrimParams) -> TrimOutcome {
    let Some(region) = content_box(image, params.gain, params.bias) else {
        return TrimOutcome::Uniform;
    };

    let image_area = image.width() as u64 * image.height() as u64;
    if region.area() as f64 / image_area as f64 >= params.borderless_ratio {
        return TrimOutcome::Borderless;
    }
    TrimOutcome::Cropped(region)
}

/// Trim one file in place
pub fn trim_file(store: &dyn FileStore, path: &Path, params: &TrimParams) -> Result<TrimOutcome> {
    let image = store.read_image(path)?;
    let outcome = plan_trim(&image, params);

    if let TrimOutcome::Cropped(region) = outcome {
        let cropped = image.crop_imm(region.left, region.top, region.width(), region.height());
        store.write_image(path, &cropped)?;
        log_fs_modification(
            "crop",
            path,
            Some(&format!(
                "{}x{} -> {}x{}",
                image.width(),
                image.height(),
                region.width(),
                region.height()
            )),
        );
    }
    Ok(outcome)
}

/// Trim every image of the snapshot on a worker pool.
///
/// Each worker owns the files it is given; a failing file is reported and skipped.
pub fn trim_borders(
    store: &dyn FileStore,
    snapshot: &CorpusSnapshot,
    config: &Config,
) -> Result<OperationReport> {
    let params = TrimParams::from(config);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads())
        .build()
        .map_err(|e| Error::Unknown(format!("Failed to build thread pool: {}", e)))?;

    let progress = file_progress(snapshot.len(), "Trimming borders", config.show_progress);
    let outcomes: Vec<(&Path, Result<TrimOutcome>)> = pool.install(|| {
        snapshot
            .items
            .par_iter()
            .map(|path| {
                let outcome = trim_file(store, path, &params);
                progress.inc(1);
                (path.as_path(), outcome)
            })
            .collect()
    });
    progress.finish_and_clear();

    let mut report = OperationReport::new(Operation::Borders);
    for (path, outcome) in outcomes {
        match outcome {
            Ok(TrimOutcome::Cropped(region)) => {
                report.processed += 1;
                report.applied.push(Mutation::Crop {
                    path: path.to_path_buf(),
                    region,
                });
            }
            Ok(other) => {
                debug!("Left {} untouched: {:?}", path.display(), other);
                report.processed += 1;
            }
            Err(e) => report.skip(path, &e),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    /// 12x8 checkerboard of 2x2 cells on a white canvas, offset by (10, 6)
    fn framed_checkerboard() -> DynamicImage {
        let mut canvas = RgbImage::from_pixel(40, 30, WHITE);
        for y in 0..8 {
            for x in 0..12 {
                let black = ((x / 2) + (y / 2)) % 2 == 0;
                canvas.put_pixel(10 + x, 6 + y, if black { BLACK } else { WHITE });
            }
        }
        DynamicImage::ImageRgb8(canvas)
    }

    fn params() -> TrimParams {
        TrimParams::from(&Config::default())
    }

    #[test]
    fn test_content_box_of_framed_image() {
        let region = content_box(&framed_checkerboard(), 1.0, -100.0).unwrap();
        assert_eq!(
            region,
            BoundingBox {
                left: 10,
                top: 6,
                right: 22,
                bottom: 14
            }
        );
    }

    #[test]
    fn test_faint_noise_is_ignored() {
        let mut canvas = RgbImage::from_pixel(20, 20, WHITE);
        // Compression-like speckle close to the background
        canvas.put_pixel(1, 1, Rgb([200, 240, 250]));
        canvas.put_pixel(5, 5, BLACK);
        let region = content_box(&DynamicImage::ImageRgb8(canvas), 1.0, -100.0).unwrap();
        assert_eq!(
            region,
            BoundingBox {
                left: 5,
                top: 5,
                right: 6,
                bottom: 6
            }
        );
    }

    #[test]
    fn test_uniform_image_is_left_alone() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 9, Rgb([30, 60, 90])));
        assert_eq!(plan_trim(&image, &params()), TrimOutcome::Uniform);
    }

    #[test]
    fn test_borderless_image_is_left_alone() {
        // Content reaches every edge
        let image = RgbImage::from_fn(10, 10, |x, y| if (x + y) % 2 == 0 { BLACK } else { WHITE });
        assert_eq!(
            plan_trim(&DynamicImage::ImageRgb8(image), &params()),
            TrimOutcome::Borderless
        );
    }

    #[test]
    fn test_trim_is_idempotent() {
        let store = MemoryStore::new();
        let path = PathBuf::from("/corpus/a_1_2021-01-01_x.png");
        store.insert_image(&path, &framed_checkerboard()).unwrap();

        let first = trim_file(&store, &path, &params()).unwrap();
        assert!(matches!(first, TrimOutcome::Cropped(_)));
        let once = store.read_image(&path).unwrap().to_rgb8();
        assert_eq!(once.dimensions(), (12, 8));

        let second = trim_file(&store, &path, &params()).unwrap();
        assert_eq!(second, TrimOutcome::Borderless);
        let twice = store.read_image(&path).unwrap().to_rgb8();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_batch_skips_undecodable_files() {
        let store = MemoryStore::new();
        let root = PathBuf::from("/corpus");
        let framed = root.join("a_1_2021-01-01_x.png");
        let broken = root.join("a_2_2021-01-02_y.png");
        let plain = root.join("a_3_2021-01-03_z.png");
        store.insert_image(&framed, &framed_checkerboard()).unwrap();
        store.insert_bytes(&broken, b"truncated".to_vec());
        store
            .insert_image(&plain, &DynamicImage::ImageRgb8(RgbImage::from_pixel(5, 5, WHITE)))
            .unwrap();

        let snapshot = CorpusSnapshot::scan(&store, &root).unwrap();
        let mut config = Config::default();
        config.threads = 2;
        let report = trim_borders(&store, &snapshot, &config).unwrap();

        assert_eq!(report.processed, 2);
        assert_eq!(report.applied.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, broken);
        assert_eq!(report.skipped[0].kind, crate::error::ErrorKind::Decode);
        assert_eq!(store.dimensions(&framed).unwrap(), (12, 8));
    }

    /// Single row of `width` pixels, white before column `first` and black from there on
    fn strip(width: u32, first: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, 1, |x, _| {
            if x < first {
                WHITE
            } else {
                BLACK
            }
        }))
    }

    #[test]
    fn test_box_at_borderless_ratio_is_left_alone() {
        // 999 of 1000 pixels
        assert_eq!(plan_trim(&strip(1000, 1), &params()), TrimOutcome::Borderless);
    }

    #[test]
    fn test_box_just_under_borderless_ratio_is_cropped() {
        // 9989 of 10000 pixels
        assert_eq!(
            plan_trim(&strip(10_000, 11), &params()),
            TrimOutcome::Cropped(BoundingBox {
                left: 11,
                top: 0,
                right: 10_000,
                bottom: 1
            })
        );
    }
}
