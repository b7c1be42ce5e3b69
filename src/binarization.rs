// src/binarization.rs - Global Otsu threshold selection and two-level masking

use image::{GrayImage, Luma, Rgba};
use log::{debug, info};

use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::pixel_source::{Bounds, PixelSource};

/// Mask value for pixels at or below the threshold
pub const BACKGROUND: u8 = 0;
/// Mask value for pixels strictly above the threshold
pub const FOREGROUND: u8 = 255;

/// 256-bucket grayscale histogram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u64; 256],
    total: u64,
}

impl Histogram {
    pub fn new() -> Self {
        Self { counts: [0; 256], total: 0 }
    }

    /// Build from raw bucket counts; the total is their sum
    pub fn from_counts(counts: [u64; 256]) -> Self {
        let total = counts.iter().sum();
        Self { counts, total }
    }

    #[inline]
    pub fn add(&mut self, intensity: u8) {
        self.counts[intensity as usize] += 1;
        self.total += 1;
    }

    pub fn counts(&self) -> &[u64; 256] {
        &self.counts
    }

    pub fn count(&self, intensity: u8) -> u64 {
        self.counts[intensity as usize]
    }

    /// Number of pixels accumulated
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Sum of `intensity * count` over all buckets
    pub fn intensity_sum(&self) -> f64 {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &c)| i as f64 * c as f64)
            .sum()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Two-level (0/255) mask congruent to the source bounds
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    bounds: Bounds,
    pixels: GrayImage,
}

impl BinaryMask {
    fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            pixels: GrayImage::new(bounds.width(), bounds.height()),
        }
    }

    /// Wrap an existing gray image anchored at the origin.
    ///
    /// Values other than 0 are treated as foreground by the tracer.
    pub fn from_gray(pixels: GrayImage) -> Self {
        Self {
            bounds: Bounds::from_dimensions(pixels.width(), pixels.height()),
            pixels,
        }
    }

    /// Mask value at `(x, y)` in source coordinates
    #[inline]
    pub fn value(&self, x: i32, y: i32) -> u8 {
        let px = (x - self.bounds.min_x) as u32;
        let py = (y - self.bounds.min_y) as u32;
        self.pixels.get_pixel(px, py)[0]
    }

    #[inline]
    fn set(&mut self, x: i32, y: i32, value: u8) {
        let px = (x - self.bounds.min_x) as u32;
        let py = (y - self.bounds.min_y) as u32;
        self.pixels.put_pixel(px, py, Luma([value]));
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    pub fn into_gray(self) -> GrayImage {
        self.pixels
    }
}

impl PixelSource for BinaryMask {
    fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    fn rgba_at(&self, x: i32, y: i32) -> Rgba<u8> {
        let v = self.value(x, y);
        Rgba([v, v, v, 255])
    }

    #[inline]
    fn luma_at(&self, x: i32, y: i32) -> u8 {
        self.value(x, y)
    }
}

/// Scan every pixel once and accumulate its grayscale intensity
pub fn build_histogram<S: PixelSource + ?Sized>(source: &S, cancel: &CancelToken) -> Result<Histogram> {
    let bounds = source.bounds();
    let mut histogram = Histogram::new();

    for y in bounds.min_y..bounds.max_y {
        cancel.check()?;
        for x in bounds.min_x..bounds.max_x {
            histogram.add(source.luma_at(x, y));
        }
    }

    debug!("Histogram built over {} pixels", histogram.total());
    Ok(histogram)
}

#[inline]
fn between_class_variance(w_b: u64, w_f: u64, sum_b: f64, sum_total: f64) -> f64 {
    let mean_b = sum_b / w_b as f64;
    let mean_f = (sum_total - sum_b) / w_f as f64;
    let diff = mean_b - mean_f;
    w_b as f64 * w_f as f64 * diff * diff
}

/// Otsu threshold: the intensity maximising between-class variance.
///
/// Single forward pass over 0..=255. Intensities with no background mass are
/// skipped, the scan stops once the foreground is empty, and the first
/// maximum wins on ties. Returns 0 when no split is ever evaluated.
pub fn otsu_threshold(histogram: &Histogram, cancel: &CancelToken) -> Result<u8> {
    let total = histogram.total();
    let sum_total = histogram.intensity_sum();

    let mut sum_b = 0.0;
    let mut w_b = 0u64;
    let mut max_variance = 0.0;
    let mut threshold = 0u8;

    for t in 0..=255u8 {
        cancel.check()?;

        let count = histogram.count(t);
        w_b += count;
        if w_b == 0 {
            continue;
        }

        let w_f = total - w_b;
        if w_f == 0 {
            break;
        }

        sum_b += t as f64 * count as f64;

        let variance = between_class_variance(w_b, w_f, sum_b, sum_total);
        if variance > max_variance {
            max_variance = variance;
            threshold = t;
        }
    }

    debug!("Otsu threshold {} (variance {:.1})", threshold, max_variance);
    Ok(threshold)
}

/// Map every pixel to FOREGROUND if its intensity is above `threshold`, else BACKGROUND
pub fn apply_threshold<S: PixelSource + ?Sized>(
    source: &S,
    threshold: u8,
    cancel: &CancelToken,
) -> Result<BinaryMask> {
    let bounds = source.bounds();
    let mut mask = BinaryMask::new(bounds);

    for y in bounds.min_y..bounds.max_y {
        cancel.check()?;
        for x in bounds.min_x..bounds.max_x {
            let value = if source.luma_at(x, y) > threshold {
                FOREGROUND
            } else {
                BACKGROUND
            };
            mask.set(x, y, value);
        }
    }

    Ok(mask)
}

/// Histogram, Otsu threshold and thresholding in one call
pub fn binarize<S: PixelSource + ?Sized>(source: &S, cancel: &CancelToken) -> Result<BinaryMask> {
    let histogram = build_histogram(source, cancel)?;
    let threshold = otsu_threshold(&histogram, cancel)?;
    let mask = apply_threshold(source, threshold, cancel)?;

    // A cancel that lands after the last row poll still discards the mask
    cancel.check()?;

    let bounds = mask.bounds();
    info!("Binarized {}x{} image at threshold {}", bounds.width(), bounds.height(), threshold);
    Ok(mask)
}
