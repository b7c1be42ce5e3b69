use image::{imageops, Rgba, RgbaImage};

use crate::binarization::BinaryMask;
use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::pixel_source::{Bounds, PixelSource};
use crate::tracker::{trace_mask, ContourSet};

/// Opaque red used for every contour vertex
pub const CONTOUR_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BACKGROUND_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Plot every recorded vertex on a white canvas the size of `bounds`.
///
/// Only the vertices are drawn, no connecting lines. Points outside `bounds`
/// are skipped. Plotting is idempotent per pixel so contour order does not
/// matter.
pub fn render_contours(contours: &ContourSet, bounds: Bounds) -> RgbaImage {
    let mut canvas = RgbaImage::from_pixel(bounds.width(), bounds.height(), BACKGROUND_COLOR);

    for (_, points) in contours.iter() {
        for p in points {
            if bounds.contains(p.x, p.y) {
                canvas.put_pixel(
                    (p.x - bounds.min_x) as u32,
                    (p.y - bounds.min_y) as u32,
                    CONTOUR_COLOR,
                );
            }
        }
    }

    canvas
}

/// Trace `mask` and render the contour overlay
pub fn trace_contours<S: PixelSource + ?Sized>(mask: &S, cancel: &CancelToken) -> Result<RgbaImage> {
    let contours = trace_mask(mask, cancel)?;
    Ok(render_contours(&contours, mask.bounds()))
}

/// Binary mask as RGBA with its first `rows` rows replaced by `overlay`
pub fn compose_scan_preview(mask: &BinaryMask, overlay: &RgbaImage, rows: u32) -> RgbaImage {
    let bounds = mask.bounds();
    let mut base = RgbaImage::from_fn(bounds.width(), bounds.height(), |x, y| {
        let v = mask.as_gray().get_pixel(x, y)[0];
        Rgba([v, v, v, 255])
    });

    let rows = rows.min(bounds.height()).min(overlay.height());
    let cols = bounds.width().min(overlay.width());
    if rows > 0 && cols > 0 {
        let scanned = imageops::crop_imm(overlay, 0, 0, cols, rows).to_image();
        imageops::replace(&mut base, &scanned, 0, 0);
    }

    base
}
