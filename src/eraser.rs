//! Background erasure and boundary marking

use crate::{
    config::MaskParams,
    error::{EraseError, Result},
    mask::{compute_mask, ErasureMask},
};
use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel, Primitive};
use tracing::{debug, instrument};

/// Apply a mask to an image
///
/// With `mark_bounds_only == false` the result is RGBA at the source bit depth
/// and every background pixel is transparent black. With `mark_bounds_only ==
/// true` the foreground pixels that touch the background are painted pure red
/// and the channel count is kept (grayscale is promoted to RGB).
///
/// # Errors
/// - `InvalidInput` if the mask and image dimensions differ
pub fn erase(image: &DynamicImage, mask: &ErasureMask, mark_bounds_only: bool) -> Result<DynamicImage> {
    if image.dimensions() != mask.dimensions() {
        let (mw, mh) = mask.dimensions();
        return Err(EraseError::invalid_input(format!(
            "Mask is {}x{} but image is {}x{}",
            mw,
            mh,
            image.width(),
            image.height()
        )));
    }

    if mark_bounds_only {
        Ok(mark_boundaries(image, mask))
    } else {
        Ok(clear_background(image, mask))
    }
}

/// Compute the luminosity mask of an image and apply it
#[instrument(skip(image, params), fields(width = image.width(), height = image.height()))]
pub fn erase_white_background(
    image: &DynamicImage,
    params: &MaskParams,
    mark_bounds_only: bool,
) -> Result<DynamicImage> {
    let mask = compute_mask(image, params)?;
    debug!(
        erased = mask.erased_count(),
        kept = mask.kept_count(),
        "Computed background mask"
    );
    erase(image, &mask, mark_bounds_only)
}

/// Whether (x, y) is a foreground pixel with a background 4-neighbour
#[must_use]
pub fn is_boundary(mask: &ErasureMask, x: u32, y: u32) -> bool {
    let (width, height) = mask.dimensions();
    if x >= width || y >= height || mask.is_erased(x, y) {
        return false;
    }
    (x > 0 && mask.is_erased(x - 1, y))
        || (y > 0 && mask.is_erased(x, y - 1))
        || mask.is_erased(x + 1, y)
        || mask.is_erased(x, y + 1)
}

fn clear_background(image: &DynamicImage, mask: &ErasureMask) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => {
            let mut rgba = image.to_rgba16();
            zero_masked(&mut rgba, mask);
            DynamicImage::ImageRgba16(rgba)
        },
        DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
            let mut rgba = image.to_rgba32f();
            zero_masked(&mut rgba, mask);
            DynamicImage::ImageRgba32F(rgba)
        },
        _ => {
            let mut rgba = image.to_rgba8();
            zero_masked(&mut rgba, mask);
            DynamicImage::ImageRgba8(rgba)
        },
    }
}

fn mark_boundaries(image: &DynamicImage, mask: &ErasureMask) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(buffer) => {
            let mut out = buffer.clone();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgb8(out)
        },
        DynamicImage::ImageRgba8(buffer) => {
            let mut out = buffer.clone();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgba8(out)
        },
        DynamicImage::ImageLumaA8(_) => {
            let mut out = image.to_rgba8();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgba8(out)
        },
        DynamicImage::ImageRgb16(buffer) => {
            let mut out = buffer.clone();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgb16(out)
        },
        DynamicImage::ImageRgba16(buffer) => {
            let mut out = buffer.clone();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgba16(out)
        },
        DynamicImage::ImageLuma16(_) => {
            let mut out = image.to_rgb16();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgb16(out)
        },
        DynamicImage::ImageLumaA16(_) => {
            let mut out = image.to_rgba16();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgba16(out)
        },
        DynamicImage::ImageRgb32F(buffer) => {
            let mut out = buffer.clone();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgb32F(out)
        },
        DynamicImage::ImageRgba32F(buffer) => {
            let mut out = buffer.clone();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgba32F(out)
        },
        _ => {
            let mut out = image.to_rgb8();
            paint_boundary(&mut out, mask);
            DynamicImage::ImageRgb8(out)
        },
    }
}

fn zero_masked<P: Pixel>(buffer: &mut ImageBuffer<P, Vec<P::Subpixel>>, mask: &ErasureMask) {
    let zero = <P::Subpixel as Primitive>::DEFAULT_MIN_VALUE;
    for (x, y, pixel) in buffer.enumerate_pixels_mut() {
        if mask.is_erased(x, y) {
            for channel in pixel.channels_mut() {
                *channel = zero;
            }
        }
    }
}

fn paint_boundary<P: Pixel>(buffer: &mut ImageBuffer<P, Vec<P::Subpixel>>, mask: &ErasureMask) {
    let min = <P::Subpixel as Primitive>::DEFAULT_MIN_VALUE;
    let max = <P::Subpixel as Primitive>::DEFAULT_MAX_VALUE;
    for (x, y, pixel) in buffer.enumerate_pixels_mut() {
        if is_boundary(mask, x, y) {
            // red, and opaque when there is an alpha channel
            for (i, channel) in pixel.channels_mut().iter_mut().enumerate() {
                *channel = if i == 0 || i == 3 { max } else { min };
            }
        }
    }
}
