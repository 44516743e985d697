//! Integer pixel locations in `(row, col)` order.

use std::fmt;

/// A vertex in image space: `row` is the y axis, `col` the x axis.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointLocation {
    pub row: i64,
    pub col: i64,
}

impl PointLocation {
    #[inline]
    pub fn new(row: i64, col: i64) -> Self {
        Self { row, col }
    }

    /// Builds a vertex from COCO `(x, y)` pixel coordinates.
    ///
    /// The axes are swapped and each value is truncated toward zero.
    #[inline]
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self {
            row: y as i64,
            col: x as i64,
        }
    }
}

impl fmt::Debug for PointLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(row={}, col={})", self.row, self.col)
    }
}
