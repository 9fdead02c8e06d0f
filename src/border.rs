//! White border classification
//!
//! Decides whether an image sits on a white background by looking at a
//! fixed-width frame along its edges. Used by the orchestrator as an admission
//! filter before erasure.

use crate::{
    config::{BorderParams, BorderTest},
    error::{EraseError, Result},
    mask::grayscale,
};
use image::DynamicImage;
use ndarray::{s, Array2, ArrayView2};
use serde::Serialize;

/// Outcome of a border test with the numbers behind it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BorderVerdict {
    /// Variant that produced this verdict
    pub test: BorderTest,
    /// Strip means in top, right, bottom, left order for the margin scan;
    /// a single frame mean for the border region test
    pub means: Vec<f32>,
    /// Number of means at or above the threshold
    pub passing: usize,
    /// Whether the image counts as white-bordered
    pub passed: bool,
}

/// Whether an image has a white border
///
/// # Errors
/// - `InvalidInput` if `thickness` is zero or twice the thickness exceeds
///   the image width or height
pub fn is_white_bordered(image: &DynamicImage, params: &BorderParams) -> Result<bool> {
    classify(image, params).map(|verdict| verdict.passed)
}

/// Run the configured border test and return the full verdict
pub fn classify(image: &DynamicImage, params: &BorderParams) -> Result<BorderVerdict> {
    check_thickness(image.width(), image.height(), params.thickness)?;
    let lum = grayscale(image)?;
    Ok(classify_luminance(&lum, params))
}

/// Border test over a precomputed luminosity plane of shape (height, width)
///
/// The thickness must already be known to fit the plane.
#[must_use]
pub fn classify_luminance(lum: &Array2<f32>, params: &BorderParams) -> BorderVerdict {
    match params.test {
        BorderTest::MarginScan => margin_scan(lum, params),
        BorderTest::BorderRegion => border_region(lum, params),
    }
}

fn check_thickness(width: u32, height: u32, thickness: u32) -> Result<()> {
    if thickness == 0 {
        return Err(EraseError::invalid_input("Border thickness must be positive"));
    }
    let doubled = u64::from(thickness) * 2;
    if doubled > u64::from(width) || doubled > u64::from(height) {
        return Err(EraseError::invalid_input(format!(
            "Border thickness {} does not fit a {}x{} image",
            thickness, width, height
        )));
    }
    Ok(())
}

/// Four full-edge strips; corner pixels belong to two strips
fn margin_scan(lum: &Array2<f32>, params: &BorderParams) -> BorderVerdict {
    let (height, width) = lum.dim();
    let t = params.thickness as usize;

    let means = vec![
        mean(lum.slice(s![..t, ..])),
        mean(lum.slice(s![.., width - t..])),
        mean(lum.slice(s![height - t.., ..])),
        mean(lum.slice(s![.., ..t])),
    ];
    let passing = means
        .iter()
        .filter(|&&m| m >= params.lum_threshold)
        .count();

    BorderVerdict {
        test: BorderTest::MarginScan,
        passed: passing >= usize::from(params.min_passing_sides),
        means,
        passing,
    }
}

/// One mean over everything outside the inner rectangle inset by `thickness`
fn border_region(lum: &Array2<f32>, params: &BorderParams) -> BorderVerdict {
    let (height, width) = lum.dim();
    let t = params.thickness as usize;

    let inner = lum.slice(s![t..height - t, t..width - t]);
    let frame_sum = sum(lum.view()) - sum(inner);
    let frame_len = lum.len() - inner.len();
    let frame_mean = if frame_len == 0 {
        0.0
    } else {
        (frame_sum / frame_len as f64) as f32
    };

    let passed = frame_mean >= params.lum_threshold;
    BorderVerdict {
        test: BorderTest::BorderRegion,
        means: vec![frame_mean],
        passing: usize::from(passed),
        passed,
    }
}

fn sum(view: ArrayView2<'_, f32>) -> f64 {
    view.iter().map(|&v| f64::from(v)).sum()
}

fn mean(view: ArrayView2<'_, f32>) -> f32 {
    if view.is_empty() {
        return 0.0;
    }
    (sum(view) / view.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn params(thickness: u32, sides: u8, threshold: f32, test: BorderTest) -> BorderParams {
        BorderParams {
            lum_threshold: threshold,
            thickness,
            min_passing_sides: sides,
            test,
        }
    }

    fn centered_square(size: u32, square: u32) -> DynamicImage {
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

    /// White image with the left `dark` columns black
    fn dark_left_edge(size: u32, dark: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, _| {
            if x < dark {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }))
    }

    #[test]
    fn test_centered_square_passes_all_sides() {
        let image = centered_square(100, 50);
        let verdict = classify(&image, &params(10, 4, 0.95, BorderTest::MarginScan)).unwrap();

        assert_eq!(verdict.means.len(), 4);
        assert_eq!(verdict.passing, 4);
        assert!(verdict.passed);
        assert!(verdict.means.iter().all(|&m| m > 0.99));
    }

    #[test]
    fn test_one_dark_side_counts_against_sides() {
        let image = dark_left_edge(100, 10);

        let verdict = classify(&image, &params(10, 3, 0.95, BorderTest::MarginScan)).unwrap();
        assert_eq!(verdict.passing, 3);
        assert!(verdict.passed);
        assert!(verdict.means[3] < 0.01);

        let strict = params(10, 4, 0.95, BorderTest::MarginScan);
        assert!(!is_white_bordered(&image, &strict).unwrap());
    }

    #[test]
    fn test_corners_are_double_counted() {
        // a black 10x10 top-left corner darkens both the top and left strips
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(100, 100, |x, y| {
            if x < 10 && y < 10 {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        }));
        let verdict = classify(&image, &params(10, 0, 0.95, BorderTest::MarginScan)).unwrap();

        assert!((verdict.means[0] - 0.9).abs() < 1e-3);
        assert!((verdict.means[3] - 0.9).abs() < 1e-3);
        assert!(verdict.means[1] > 0.99);
        assert!(verdict.means[2] > 0.99);
        assert_eq!(verdict.passing, 2);
    }

    #[test]
    fn test_zero_sides_always_passes() {
        let black = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
        assert!(is_white_bordered(&black, &params(5, 0, 0.95, BorderTest::MarginScan)).unwrap());
        assert!(!is_white_bordered(&black, &params(5, 1, 0.95, BorderTest::MarginScan)).unwrap());
    }

    #[test]
    fn test_border_region_mean() {
        let image = dark_left_edge(100, 10);
        let verdict = classify(&image, &params(10, 4, 0.5, BorderTest::BorderRegion)).unwrap();

        // frame = 100*100 - 80*80 = 3600 pixels, 1000 of them black
        let expected = 2600.0 / 3600.0;
        assert_eq!(verdict.means.len(), 1);
        assert!((verdict.means[0] - expected).abs() < 1e-3);
        assert!(verdict.passed);

        let strict = params(10, 0, 0.95, BorderTest::BorderRegion);
        assert!(!is_white_bordered(&image, &strict).unwrap());
    }

    #[test]
    fn test_border_region_ignores_interior() {
        let image = centered_square(100, 80);
        let verdict = classify(&image, &params(10, 4, 0.99, BorderTest::BorderRegion)).unwrap();
        assert!(verdict.passed);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let images = [
            centered_square(60, 30),
            dark_left_edge(60, 8),
            dark_left_edge(60, 30),
        ];
        let thresholds = [0.0, 0.2, 0.5, 0.8, 0.9, 0.95, 1.0];

        for image in &images {
            for test in [BorderTest::MarginScan, BorderTest::BorderRegion] {
                let results: Vec<bool> = thresholds
                    .iter()
                    .map(|&t| is_white_bordered(image, &params(6, 3, t, test)).unwrap())
                    .collect();
                // once failing at some threshold, every higher threshold fails too
                for pair in results.windows(2) {
                    assert!(pair[0] || !pair[1], "{test}: {results:?}");
                }
            }
        }
    }

    #[test]
    fn test_thickness_errors() {
        let image = centered_square(40, 10);

        let zero = params(0, 3, 0.95, BorderTest::MarginScan);
        assert!(matches!(
            is_white_bordered(&image, &zero),
            Err(EraseError::InvalidInput(_))
        ));

        let too_thick = params(21, 3, 0.95, BorderTest::MarginScan);
        assert!(matches!(
            classify(&image, &too_thick),
            Err(EraseError::InvalidInput(_))
        ));

        // exactly half the size is the largest allowed thickness
        let half = params(20, 3, 0.95, BorderTest::BorderRegion);
        assert!(classify(&image, &half).is_ok());
    }

    #[test]
    fn test_non_square_thickness_limit() {
        let wide = DynamicImage::ImageRgb8(RgbImage::from_pixel(100, 10, Rgb([255, 255, 255])));
        assert!(is_white_bordered(&wide, &params(5, 4, 0.95, BorderTest::MarginScan)).unwrap());
        assert!(is_white_bordered(&wide, &params(6, 4, 0.95, BorderTest::MarginScan)).is_err());
    }
}
