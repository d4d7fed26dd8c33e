use std::fmt;

use image::{ImageBuffer, Rgb, RgbImage};

use crate::{rect::Rect, Resolution};

/// An 8-bit sRGB image without alpha channel.
///
/// Pixels are stored as interleaved `rrrrrrrr gggggggg bbbbbbbb` triples, row by row.
#[derive(Clone, PartialEq)]
pub struct Image {
    pub(crate) buf: RgbImage,
}

impl Image {
    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates an image of the given size, with every pixel set to `rgb`.
    pub fn filled(res: impl Into<Resolution>, rgb: [u8; 3]) -> Self {
        let res = res.into();
        Self {
            buf: ImageBuffer::from_pixel(res.width(), res.height(), Rgb(rgb)),
        }
    }

    pub(crate) fn from_buffer(buf: RgbImage) -> Self {
        Self { buf }
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    ///
    /// The rectangle will be positioned at `(0, 0)` and have the width and height of the image.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width() as f32, self.height() as f32)
    }

    /// Gets the color at the given pixel coordinates, or [`None`] if they are out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x < self.width() && y < self.height() {
            Some(self.buf[(x, y)].0)
        } else {
            None
        }
    }

    /// Sets the color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        self.buf[(x, y)] = Rgb(rgb);
    }

    /// Returns a horizontally mirrored copy of `self`.
    pub fn flip_horizontal(&self) -> Image {
        Image {
            buf: image::imageops::flip_horizontal(&self.buf),
        }
    }

    pub fn flip_horizontal_in_place(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Samples the area covered by `rect` into a new image of resolution `res`.
    ///
    /// `rect` may lie partially or completely outside of `self`. Pixels sampled from outside of the
    /// image are black. Sampling uses the nearest source pixel, so the aspect ratio of `rect` is
    /// stretched to that of `res` if they differ.
    pub fn crop_resize(&self, rect: Rect, res: impl Into<Resolution>) -> Image {
        let res = res.into();
        let (w, h) = (res.width(), res.height());
        let mut out = Image::new(w, h);
        if w == 0 || h == 0 {
            return out;
        }

        let scale_x = rect.width() / w as f32;
        let scale_y = rect.height() / h as f32;
        for (x, y, pix) in out.buf.enumerate_pixels_mut() {
            let src_x = (rect.x() + (x as f32 + 0.5) * scale_x).floor();
            let src_y = (rect.y() + (y as f32 + 0.5) * scale_y).floor();
            if src_x < 0.0 || src_y < 0.0 {
                continue;
            }
            if let Some(rgb) = self.get(src_x as u32, src_y as u32) {
                pix.0 = rgb;
            }
        }

        out
    }

    /// Returns the raw interleaved RGB pixel data.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}
