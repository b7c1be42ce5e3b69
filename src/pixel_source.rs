use std::ops::Deref;

use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel, Rgba};

/// Integer bounding rectangle, half-open: `min` inclusive, `max` exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Bounds of a `width × height` image anchored at the origin
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Total number of pixels covered
    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// Read-only view over a 2D pixel grid.
///
/// Coordinates passed to `rgba_at` always lie inside `bounds()`.
pub trait PixelSource {
    fn bounds(&self) -> Bounds;

    /// Straight-alpha 8-bit colour at `(x, y)`
    fn rgba_at(&self, x: i32, y: i32) -> Rgba<u8>;

    /// 8-bit grayscale intensity at `(x, y)`
    #[inline]
    fn luma_at(&self, x: i32, y: i32) -> u8 {
        luma(self.rgba_at(x, y))
    }
}

/// Standard luma weighting over 16-bit premultiplied channels.
///
/// Weights are 0.299/0.587/0.114 in 16.16 fixed point; transparent pixels
/// collapse towards black.
#[inline]
pub fn luma(pixel: Rgba<u8>) -> u8 {
    let [r, g, b, a] = pixel.0;
    let a = a as u32;
    let premul = |c: u8| (c as u32 * 0x101) * a / 0xff;
    let y = (19595 * premul(r) + 38470 * premul(g) + 7471 * premul(b) + (1 << 15)) >> 24;
    y as u8
}

impl<P, C> PixelSource for ImageBuffer<P, C>
where
    P: Pixel<Subpixel = u8>,
    C: Deref<Target = [u8]>,
{
    fn bounds(&self) -> Bounds {
        Bounds::from_dimensions(self.width(), self.height())
    }

    #[inline]
    fn rgba_at(&self, x: i32, y: i32) -> Rgba<u8> {
        self.get_pixel(x as u32, y as u32).to_rgba()
    }
}

impl PixelSource for DynamicImage {
    fn bounds(&self) -> Bounds {
        Bounds::from_dimensions(self.width(), self.height())
    }

    #[inline]
    fn rgba_at(&self, x: i32, y: i32) -> Rgba<u8> {
        self.get_pixel(x as u32, y as u32)
    }
}
