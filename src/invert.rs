use image::{Pixel, RgbaImage};

use crate::cancel::CancelToken;
use crate::errors::Result;
use crate::pixel_source::PixelSource;

/// Colour negative of `source`: RGB becomes `255 - c`, alpha is kept.
///
/// Works on straight-alpha colour, not premultiplied values. Opaque pixels
/// come out the same either way; a translucent pixel such as `(10, 20, 30, 40)`
/// becomes `(245, 235, 225, 40)` here, where a premultiplied negative would
/// saturate red at 254. The difference is deliberate: the result stays a valid
/// straight-alpha image for the luma pass.
pub fn invert<S: PixelSource + ?Sized>(source: &S, cancel: &CancelToken) -> Result<RgbaImage> {
    let bounds = source.bounds();
    let mut out = RgbaImage::new(bounds.width(), bounds.height());

    for y in bounds.min_y..bounds.max_y {
        cancel.check()?;
        for x in bounds.min_x..bounds.max_x {
            let mut pixel = source.rgba_at(x, y);
            pixel.invert();
            out.put_pixel((x - bounds.min_x) as u32, (y - bounds.min_y) as u32, pixel);
        }
    }

    cancel.check()?;
    Ok(out)
}
