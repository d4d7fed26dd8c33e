//! Types for representing image resolutions.

use std::fmt;

use crate::rect::Rect;

/// Resolution (`width x height`) of an image or network input.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width of this [`Resolution`].
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this [`Resolution`].
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Computes the [`AspectRatio`] of this [`Resolution`].
    ///
    /// If `self` has a width or height of 0, `None` is returned.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(self.width(), self.height())
    }

    /// Computes the smallest centered [`Rect`] with the given aspect ratio that fully contains an
    /// image of this resolution.
    ///
    /// The result extends past the image bounds on the shorter axis (letterboxing or
    /// pillarboxing). If `self` is empty, a rectangle covering `self` is returned unchanged.
    pub fn cover_aspect_ratio(&self, ratio: AspectRatio) -> Rect {
        let full = Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32);
        if self.aspect_ratio().is_none() {
            return full;
        }

        let rect = full.grow_to_fit_aspect(ratio);
        log::trace!("cover aspect ratio {} for resolution {} -> {:?}", ratio, self, rect);
        rect
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Ratio of a width to a height of an image.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct AspectRatio {
    // Invariant: `width` and `height` are nonzero and as small as possible (ie. their GCD is 1).
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// 1:1 aspect ratio.
    ///
    /// Common for CNN inputs.
    pub const SQUARE: Self = Self {
        width: 1,
        height: 1,
    };

    /// Creates the aspect ratio representing `width:height`.
    ///
    /// If either `width` or `height` is `0`, returns `None`.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let gcd = gcd(width, height);
        Some(Self {
            width: width / gcd,
            height: height / gcd,
        })
    }

    /// Returns the `f32` corresponding to this ratio.
    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl fmt::Debug for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b > 0 {
        let t = b;
        b = a % b;
        a = t;
    }

    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(6, 9), 3);
        assert_eq!(gcd(7, 13), 1);
        assert_eq!(640 / gcd(640, 480), 4);
        assert_eq!(480 / gcd(640, 480), 3);

        // degenerate case where one of the arguments is 0 - the other one will be returned
        assert_eq!(gcd(0, 7), 7);
        assert_eq!(gcd(7, 0), 7);
    }

    #[test]
    fn test_aspect_ratio() {
        let ratio1 = AspectRatio::new(640, 480).unwrap();
        let ratio2 = AspectRatio::new(320, 240).unwrap();
        assert_eq!(ratio1, ratio2);
        assert_eq!(ratio1.to_string(), "4:3");
        assert_eq!(AspectRatio::new(0, 480), None);
    }

    #[test]
    fn test_cover_aspect_ratio() {
        // Landscape frames get letterboxed above and below.
        assert_eq!(
            Resolution::new(16, 8).cover_aspect_ratio(AspectRatio::SQUARE),
            Rect::from_top_left(0.0, -4.0, 16.0, 16.0)
        );
        // Portrait frames get pillarboxed.
        assert_eq!(
            Resolution::new(8, 16).cover_aspect_ratio(AspectRatio::SQUARE),
            Rect::from_top_left(-4.0, 0.0, 16.0, 16.0)
        );
        assert_eq!(
            Resolution::new(8, 8).cover_aspect_ratio(AspectRatio::SQUARE),
            Rect::from_top_left(0.0, 0.0, 8.0, 8.0)
        );
    }
}
