//! Axis-aligned rectangles in integer pixel space.

use std::fmt;

/// An axis-aligned rectangle given by its edges, in `(row, col)` space.
///
/// Edges are stored as given. The platform rejects rectangles with
/// `top > bottom` or `left > right`; check [`Rectangle::is_ordered`] before
/// emitting one.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    pub top: i64,
    pub left: i64,
    pub bottom: i64,
    pub right: i64,
}

impl Rectangle {
    #[inline]
    pub fn new(top: i64, left: i64, bottom: i64, right: i64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Converts a COCO `[x, y, width, height]` box.
    ///
    /// Each edge is computed in floating point and then truncated toward zero:
    /// `top = y`, `left = x`, `bottom = y + h`, `right = x + w`.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            top: y as i64,
            left: x as i64,
            bottom: (y + height) as i64,
            right: (x + width) as i64,
        }
    }

    /// Number of pixel columns covered, edges inclusive.
    #[inline]
    pub fn width(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Number of pixel rows covered, edges inclusive.
    #[inline]
    pub fn height(&self) -> i64 {
        self.bottom - self.top + 1
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Returns true if `top <= bottom` and `left <= right`.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.top <= self.bottom && self.left <= self.right
    }
}

impl fmt::Debug for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rectangle")
            .field("top", &self.top)
            .field("left", &self.left)
            .field("bottom", &self.bottom)
            .field("right", &self.right)
            .finish()
    }
}
