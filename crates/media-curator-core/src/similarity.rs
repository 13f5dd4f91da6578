//! # Structural similarity
//!
//! Duplicate detection compares small grayscale thumbnails with the structural similarity
//! index (SSIM, Wang et al. 2004). The score combines local luminance, contrast and structure
//! over 7×7 windows and is averaged over every window that fits inside the image:
//!
//! ```text
//! SSIM(x, y) = (2·μx·μy + C1)(2·σxy + C2) / ((μx² + μy² + C1)(σx² + σy² + C2))
//! ```
//!
//! with `C1 = (0.01·L)²`, `C2 = (0.03·L)²` and `L = 1` for intensities in `[0, 1]`. Windows use
//! uniform weights and sample (co)variances. Identical thumbnails score exactly 1.0; unrelated
//! content lands near 0.
//!
//! Window sums come from summed-area tables, so a 100×100 comparison costs a few tens of
//! thousands of additions regardless of the window size.

use image::imageops::FilterType;
use image::DynamicImage;

const WINDOW: usize = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;
const DATA_RANGE: f64 = 1.0;

/// Square grayscale rendition of an image, intensities in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    size: u32,
    pixels: Vec<f64>,
}

impl Thumbnail {
    /// Downsample `image` to `size`×`size` grayscale
    pub fn from_image(image: &DynamicImage, size: u32) -> Self {
        let small = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_luma8();
        let pixels = small.pixels().map(|p| p[0] as f64 / 255.0).collect();
        Self { size, pixels }
    }

    /// Build from raw row-major intensities; `pixels.len()` must be `size * size`
    pub fn from_pixels(size: u32, pixels: Vec<f64>) -> Option<Self> {
        if pixels.len() != (size as usize) * (size as usize) {
            return None;
        }
        Some(Self { size, pixels })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Intensity at `(x, y)`
    pub fn value_at(&self, x: u32, y: u32) -> f64 {
        self.pixels[(y as usize) * (self.size as usize) + x as usize]
    }
}

/// Summed-area table with a zero first row and column
struct Integral {
    stride: usize,
    sums: Vec<f64>,
}

impl Integral {
    fn new(size: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = size + 1;
        let mut sums = vec![0.0; stride * stride];
        for y in 0..size {
            let mut row = 0.0;
            for x in 0..size {
                row += value(y * size + x);
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + row;
            }
        }
        Self { stride, sums }
    }

    /// Sum over the `WINDOW`×`WINDOW` block whose top-left corner is `(x, y)`
    fn window(&self, x: usize, y: usize) -> f64 {
        let s = self.stride;
        let (x1, y1) = (x + WINDOW, y + WINDOW);
        self.sums[y1 * s + x1] - self.sums[y * s + x1] - self.sums[y1 * s + x]
            + self.sums[y * s + x]
    }
}

/// Mean SSIM between two thumbnails of equal size.
///
/// Returns 0.0 when the sizes differ or the thumbnails are smaller than one window.
pub fn structural_similarity(a: &Thumbnail, b: &Thumbnail) -> f64 {
    if a.size != b.size || (a.size as usize) < WINDOW {
        return 0.0;
    }
    let size = a.size as usize;

    let sum_a = Integral::new(size, |i| a.pixels[i]);
    let sum_b = Integral::new(size, |i| b.pixels[i]);
    let sum_aa = Integral::new(size, |i| a.pixels[i] * a.pixels[i]);
    let sum_bb = Integral::new(size, |i| b.pixels[i] * b.pixels[i]);
    let sum_ab = Integral::new(size, |i| a.pixels[i] * b.pixels[i]);

    let n = (WINDOW * WINDOW) as f64;
    let sample = n / (n - 1.0);
    let c1 = (K1 * DATA_RANGE).powi(2);
    let c2 = (K2 * DATA_RANGE).powi(2);

    let positions = size - WINDOW + 1;
    let mut total = 0.0;
    for y in 0..positions {
        for x in 0..positions {
            let mu_a = sum_a.window(x, y) / n;
            let mu_b = sum_b.window(x, y) / n;
            let var_a = (sum_aa.window(x, y) / n - mu_a * mu_a) * sample;
            let var_b = (sum_bb.window(x, y) / n - mu_b * mu_b) * sample;
            let cov = (sum_ab.window(x, y) / n - mu_a * mu_b) * sample;

            let numerator = (2.0 * mu_a * mu_b + c1) * (2.0 * cov + c2);
            let denominator = (mu_a * mu_a + mu_b * mu_b + c1) * (var_a + var_b + c2);
            total += numerator / denominator;
        }
    }

    total / (positions * positions) as f64
}
