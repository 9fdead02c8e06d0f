//! Luminosity mask computation
//!
//! Classifies every pixel as background (near-white) or foreground:
//! per-channel Gaussian smoothing, Rec.709 luminosity, a fixed threshold and
//! removal of small background regions.
//!
//! Mask polarity is fixed for the whole crate: `true` means "erase this pixel".

use crate::{
    config::MaskParams,
    error::{EraseError, Result},
};
use image::DynamicImage;
use ndarray::{Array2, Array3, ArrayView1, ArrayViewMut1, Axis};
use tracing::{instrument, trace};

/// Rec.709 luminosity weights for linear RGB
pub const LUMA_WEIGHTS: [f32; 3] = [0.2125, 0.7154, 0.0721];

/// Gaussian kernels are truncated at this many standard deviations
const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// Binary background mask with the dimensions of its source image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErasureMask {
    width: u32,
    height: u32,
    /// Row-major, `true` = background (erase)
    data: Vec<bool>,
}

impl ErasureMask {
    /// Create a mask from row-major data
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(EraseError::invalid_input(format!(
                "Mask data has {} values, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create a mask with every pixel set to `erase`
    #[must_use]
    pub fn filled(width: u32, height: u32, erase: bool) -> Self {
        Self {
            width,
            height,
            data: vec![erase; width as usize * height as usize],
        }
    }

    /// Mask dimensions (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel at (x, y) is background
    ///
    /// Out-of-bounds coordinates are reported as foreground.
    #[must_use]
    pub fn is_erased(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Row-major mask values
    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Number of background pixels
    #[must_use]
    pub fn erased_count(&self) -> usize {
        self.data.iter().filter(|&&erase| erase).count()
    }

    /// Number of foreground pixels
    #[must_use]
    pub fn kept_count(&self) -> usize {
        self.data.len() - self.erased_count()
    }
}

/// Compute the background mask of an image
///
/// # Errors
/// - `InvalidInput` if the image has zero width or height
/// - `InvalidConfig` if the threshold or sigma are out of range
#[instrument(skip(image), fields(width = image.width(), height = image.height()))]
pub fn compute_mask(image: &DynamicImage, params: &MaskParams) -> Result<ErasureMask> {
    params.validate()?;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(EraseError::invalid_input(format!(
            "Cannot compute a mask for an empty {}x{} image",
            width, height
        )));
    }

    let rgb = normalized_rgb(image)?;
    let smoothed = gaussian_blur_channels(&rgb, params.sigma);
    let lum = luminance(&smoothed);

    let mut data: Vec<bool> = lum.iter().map(|&l| l >= params.lum_threshold).collect();
    let before = data.iter().filter(|&&b| b).count();
    remove_small_regions(
        &mut data,
        width as usize,
        height as usize,
        params.hole_threshold,
    );
    trace!(
        thresholded = before,
        kept_as_background = data.iter().filter(|&&b| b).count(),
        "Mask cleanup"
    );

    ErasureMask::new(width, height, data)
}

/// Convert any image encoding to an `(height, width, 3)` array in [0, 1]
///
/// Alpha is dropped, grayscale is replicated across channels.
pub fn normalized_rgb(image: &DynamicImage) -> Result<Array3<f32>> {
    let rgb = image.to_rgb32f();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw()).map_err(|e| {
        EraseError::internal(format!("Failed to shape {}x{} RGB buffer: {}", width, height, e))
    })
}

/// Rec.709 luminosity of an `(height, width, 3)` array
#[must_use]
pub fn luminance(rgb: &Array3<f32>) -> Array2<f32> {
    rgb.map_axis(Axis(2), |px| {
        px.iter()
            .zip(LUMA_WEIGHTS.iter())
            .map(|(value, weight)| value * weight)
            .sum()
    })
}

/// Grayscale luminosity of an image, normalized to [0, 1]
pub fn grayscale(image: &DynamicImage) -> Result<Array2<f32>> {
    Ok(luminance(&normalized_rgb(image)?))
}

/// Smooth every channel of an `(height, width, channels)` array independently
#[must_use]
pub fn gaussian_blur_channels(image: &Array3<f32>, sigma: f32) -> Array3<f32> {
    if sigma <= 0.0 {
        return image.clone();
    }

    let mut out = Array3::<f32>::zeros(image.raw_dim());
    for (channel, mut target) in image
        .axis_iter(Axis(2))
        .zip(out.axis_iter_mut(Axis(2)))
    {
        target.assign(&gaussian_blur(&channel.to_owned(), sigma));
    }
    out
}

/// Separable Gaussian blur of a single plane with nearest-edge extension
#[must_use]
pub fn gaussian_blur(plane: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if sigma <= 0.0 || plane.is_empty() {
        return plane.clone();
    }
    let (rows, cols) = plane.dim();

    let kernel = gaussian_kernel(sigma, cols - 1);
    let mut horizontal = Array2::<f32>::zeros(plane.raw_dim());
    for (src, dst) in plane.rows().into_iter().zip(horizontal.rows_mut()) {
        convolve_lane(src, dst, &kernel);
    }

    let kernel = gaussian_kernel(sigma, rows - 1);
    let mut out = Array2::<f32>::zeros(plane.raw_dim());
    for (src, dst) in horizontal.columns().into_iter().zip(out.columns_mut()) {
        convolve_lane(src, dst, &kernel);
    }
    out
}

/// Normalized 1D Gaussian kernel of radius `round(4 * sigma)`, capped at
/// `max_radius`
///
/// Past `max_radius` every tap of a lane of length `max_radius + 1` lands on
/// an edge pixel, so the weight beyond the cap is folded into the two end
/// taps.
fn gaussian_kernel(sigma: f32, max_radius: usize) -> Vec<f32> {
    let sigma = f64::from(sigma);
    let full_radius = (f64::from(GAUSSIAN_TRUNCATE) * sigma + 0.5).floor();
    let radius = if full_radius > max_radius as f64 {
        max_radius
    } else {
        full_radius as usize
    };

    let two_sigma_sq = 2.0 * sigma * sigma;
    let weight = |x: f64| (-x * x / two_sigma_sq).exp();

    let mut kernel: Vec<f64> = (0..=2 * radius)
        .map(|i| weight(i as f64 - radius as f64))
        .collect();
    if full_radius > radius as f64 {
        let tail = tail_weight(radius as f64 + 1.0, full_radius, &weight);
        if let Some(first) = kernel.first_mut() {
            *first += tail;
        }
        if let Some(last) = kernel.last_mut() {
            *last += tail;
        }
    }

    let sum: f64 = kernel.iter().sum();
    kernel.into_iter().map(|w| (w / sum) as f32).collect()
}

/// Sum of `weight(k)` for integer `k` in `[from, to]`
///
/// Long ranges only occur for very large sigma, where the Gaussian is smooth
/// on the unit scale and Simpson's rule over `[from - 0.5, to + 0.5]` matches
/// the sum.
fn tail_weight(from: f64, to: f64, weight: &impl Fn(f64) -> f64) -> f64 {
    const EXACT_TAPS: f64 = 4096.0;
    const SIMPSON_INTERVALS: usize = 1024;

    if to - from < EXACT_TAPS {
        let mut sum = 0.0;
        let mut k = from;
        while k <= to {
            sum += weight(k);
            k += 1.0;
        }
        return sum;
    }

    let (a, b) = (from - 0.5, to + 0.5);
    let h = (b - a) / SIMPSON_INTERVALS as f64;
    let inner: f64 = (1..SIMPSON_INTERVALS)
        .map(|i| {
            let factor = if i % 2 == 1 { 4.0 } else { 2.0 };
            factor * weight(a + i as f64 * h)
        })
        .sum();
    (weight(a) + inner + weight(b)) * h / 3.0
}

fn convolve_lane(src: ArrayView1<'_, f32>, mut dst: ArrayViewMut1<'_, f32>, kernel: &[f32]) {
    let len = src.len();
    let radius = kernel.len() / 2;
    for (i, out) in dst.iter_mut().enumerate() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                // clamp to the edge pixel on both sides
                let j = (i + k).saturating_sub(radius).min(len - 1);
                weight * src[j]
            })
            .sum();
    }
}

/// Drop 4-connected `true` regions smaller than `min_area` pixels
///
/// Two-pass connected component labelling with union-find.
pub fn remove_small_regions(mask: &mut [bool], width: usize, height: usize, min_area: usize) {
    if min_area <= 1 || mask.len() != width * height {
        return;
    }

    let mut labels = vec![0u32; mask.len()];
    let mut parent = vec![0u32; 1]; // label 0 = not part of any region
    let mut next_label = 1u32;

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if !mask[idx] {
                continue;
            }

            let left = if x > 0 { labels[idx - 1] } else { 0 };
            let top = if y > 0 { labels[idx - width] } else { 0 };

            labels[idx] = match (left, top) {
                (0, 0) => {
                    parent.push(next_label);
                    next_label += 1;
                    next_label - 1
                },
                (l, 0) | (0, l) => find(&mut parent, l),
                (l, t) => {
                    let rl = find(&mut parent, l);
                    let rt = find(&mut parent, t);
                    if rl != rt {
                        union(&mut parent, rl, rt);
                    }
                    rl.min(rt)
                },
            };
        }
    }

    let mut sizes = vec![0usize; parent.len()];
    for label in &mut labels {
        if *label > 0 {
            *label = find(&mut parent, *label);
            sizes[*label as usize] += 1;
        }
    }

    for (value, &label) in mask.iter_mut().zip(labels.iter()) {
        if label > 0 && sizes[label as usize] < min_area {
            *value = false;
        }
    }
}

fn find(parent: &mut [u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        parent[x as usize] = parent[parent[x as usize] as usize]; // path halving
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra.max(rb) as usize] = ra.min(rb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn white_with_black_square(size: u32, square: u32) -> DynamicImage {
        let start = (size - square) / 2;
        let end = start + square;
        DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
            if (start..end).contains(&x) && (start..end).contains(&y) {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    fn params(sigma: f32, hole_threshold: usize) -> MaskParams {
        MaskParams {
            lum_threshold: 0.95,
            sigma,
            hole_threshold,
        }
    }

    #[test]
    fn test_all_white_is_all_background() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 100, Rgb([255, 255, 255])));
        let mask = compute_mask(&image, &params(0.0, 0)).unwrap();

        assert_eq!(mask.dimensions(), (100, 100));
        assert_eq!(mask.erased_count(), 100 * 100);
        assert_eq!(mask.kept_count(), 0);
    }

    #[test]
    fn test_black_square_is_foreground() {
        let image = white_with_black_square(100, 50);
        let mask = compute_mask(&image, &params(0.0, 0)).unwrap();

        assert_eq!(mask.kept_count(), 50 * 50);
        for y in 0..100 {
            for x in 0..100 {
                let inside = (25..75).contains(&x) && (25..75).contains(&y);
                assert_eq!(mask.is_erased(x, y), !inside, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_smoothing_grows_foreground_edges() {
        let image = white_with_black_square(100, 50);
        let mask = compute_mask(&image, &params(1.0, 0)).unwrap();

        assert!(!mask.is_erased(50, 50));
        assert!(!mask.is_erased(25, 25));
        // the pixel just outside the square picks up dark mass from the blur
        assert!(!mask.is_erased(24, 50));
        assert!(mask.is_erased(0, 0));
        assert!(mask.is_erased(99, 99));
        assert!(mask.kept_count() > 50 * 50);
    }

    #[test]
    fn test_mask_is_deterministic() {
        let image = white_with_black_square(64, 20);
        let first = compute_mask(&image, &params(1.5, 100)).unwrap();
        let second = compute_mask(&image, &params(1.5, 100)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mask_shape_matches_image() {
        for (w, h) in [(1, 1), (7, 3), (40, 90), (120, 33)] {
            let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 30, 240])));
            let mask = compute_mask(&image, &MaskParams::default()).unwrap();
            assert_eq!(mask.dimensions(), (w, h));
            assert_eq!(mask.as_slice().len(), (w * h) as usize);
        }
    }

    #[test]
    fn test_small_bright_specks_are_kept() {
        // dark subject with a 4x4 glare spot in the middle
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 30, |x, y| {
            if (13..17).contains(&x) && (13..17).contains(&y) {
                Rgb([255, 255, 255])
            } else {
                Rgb([10, 10, 10])
            }
        }));

        let raw = compute_mask(&image, &params(0.0, 0)).unwrap();
        assert_eq!(raw.erased_count(), 16);

        let cleaned = compute_mask(&image, &params(0.0, 20)).unwrap();
        assert_eq!(cleaned.erased_count(), 0);

        let exact = compute_mask(&image, &params(0.0, 16)).unwrap();
        assert_eq!(exact.erased_count(), 16);
    }

    #[test]
    fn test_float_and_alpha_inputs() {
        let rgba = RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0]));
        let mask = compute_mask(&DynamicImage::ImageRgba8(rgba), &params(0.0, 0)).unwrap();
        assert_eq!(mask.erased_count(), 100);

        let float = DynamicImage::ImageRgb32F(image::Rgb32FImage::from_pixel(
            10,
            10,
            Rgb([0.1, 0.1, 0.1]),
        ));
        let mask = compute_mask(&float, &params(1.0, 0)).unwrap();
        assert_eq!(mask.erased_count(), 0);
    }

    #[test]
    fn test_empty_image_rejected() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        let result = compute_mask(&image, &MaskParams::default());
        assert!(matches!(result, Err(EraseError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let bad = MaskParams {
            lum_threshold: 2.0,
            ..MaskParams::default()
        };
        assert!(matches!(
            compute_mask(&image, &bad),
            Err(EraseError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_gaussian_kernel_is_normalized() {
        for sigma in [0.3, 1.0, 2.5] {
            let kernel = gaussian_kernel(sigma, usize::MAX);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            assert_eq!(kernel.len() % 2, 1);
        }
    }

    #[test]
    fn test_gaussian_blur_preserves_constant_plane() {
        let plane = Array2::from_elem((12, 9), 0.5_f32);
        let blurred = gaussian_blur(&plane, 2.0);
        assert!(blurred.iter().all(|&v| (v - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_capped_kernel_matches_full_kernel() {
        let plane = Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f32 / 20.0);
        let sigma = 3.0;
        assert_eq!(gaussian_kernel(sigma, 4).len(), 9);

        let blurred = gaussian_blur(&plane, sigma);

        let full = gaussian_kernel(sigma, usize::MAX);
        assert_eq!(full.len(), 25);
        let mut horizontal = Array2::<f32>::zeros(plane.raw_dim());
        for (src, dst) in plane.rows().into_iter().zip(horizontal.rows_mut()) {
            convolve_lane(src, dst, &full);
        }
        let mut expected = Array2::<f32>::zeros(plane.raw_dim());
        for (src, dst) in horizontal.columns().into_iter().zip(expected.columns_mut()) {
            convolve_lane(src, dst, &full);
        }

        for (a, b) in blurred.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_huge_sigma_stays_bounded() {
        let kernel = gaussian_kernel(1e30, 7);
        assert_eq!(kernel.len(), 15);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        let plane = Array2::from_elem((8, 8), 0.75_f32);
        let blurred = gaussian_blur(&plane, 1e30);
        assert!(blurred.iter().all(|&v| (v - 0.75).abs() < 1e-5));

        let image = white_with_black_square(8, 4);
        let mask = compute_mask(&image, &params(1e30, 0)).unwrap();
        assert_eq!(mask.dimensions(), (8, 8));
    }

    #[test]
    fn test_remove_small_regions_uses_four_connectivity() {
        // two diagonal pixels are separate regions of size 1
        #[rustfmt::skip]
        let mut mask = vec![
            true,  false, false,
            false, true,  false,
            false, false, false,
        ];
        remove_small_regions(&mut mask, 3, 3, 2);
        assert!(mask.iter().all(|&v| !v));

        #[rustfmt::skip]
        let mut mask = vec![
            true,  true,  false,
            false, true,  false,
            false, false, true,
        ];
        remove_small_regions(&mut mask, 3, 3, 2);
        assert_eq!(mask.iter().filter(|&&v| v).count(), 3);
        assert!(!mask[8]);
    }

    #[test]
    fn test_mask_length_checked() {
        assert!(ErasureMask::new(2, 2, vec![true]).is_err());
        assert!(ErasureMask::new(2, 1, vec![true, false]).is_ok());
    }
}
