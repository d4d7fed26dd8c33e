//! Axis-aligned rectangles.
//!
//! These describe regions of interest in frames: the area a hand was last seen in, and the area
//! that gets sampled into a network input.

use std::fmt;

use crate::AspectRatio;

/// An axis-aligned rectangle with `f32` coordinates.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: [f32; 2],
    size: [f32; 2],
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: [x_center, y_center],
            size: [width, height],
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Computes the bounding rectangle that encompasses `points`.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let [x, y] = iter.next()?;
        let (mut min, mut max) = ([x, y], [x, y]);
        for [x, y] in iter {
            min = [min[0].min(x), min[1].min(y)];
            max = [max[0].max(x), max[1].max(y)];
        }

        Some(Self::from_top_left(
            min[0],
            min[1],
            max[0] - min[0],
            max[1] - min[1],
        ))
    }

    /// Grows this rectangle by adding a margin relative to width and height.
    ///
    /// `amount` is the relative amount of the rectangles width and height to add to each side.
    #[must_use]
    pub fn grow_rel(&self, amount: f32) -> Self {
        let [w, h] = self.size;
        Rect {
            size: [w + 2.0 * w * amount, h + 2.0 * h * amount],
            ..*self
        }
    }

    /// Symmetrically extends one dimension of `self` so that the resulting rectangle has the given
    /// aspect ratio.
    #[must_use]
    pub fn grow_to_fit_aspect(&self, target_aspect: AspectRatio) -> Self {
        let mut res = *self;
        let target_width = self.height() * target_aspect.as_f32();
        if target_width >= self.width() {
            res.size[0] = target_width;
        } else {
            res.size[1] = self.width() / target_aspect.as_f32();
        }

        res
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.center[0] - self.size[0] * 0.5
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.center[1] - self.size[1] * 0.5
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size[0]
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size[0] * self.size[1]
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.center[0], self.center[1], self.size[0], self.size[1]
        )
    }
}
