//! Geometry types produced by the converter.
//!
//! All shapes live in integer pixel space and use `(row, col)` ordering,
//! which is what the annotation platform expects. COCO input is `(x, y)`;
//! the swap happens once, when contours are read
//! ([`Polygon::from_flat_xy`]) or boxes are converted
//! ([`Rectangle::from_xywh`]).

mod point;
mod polygon;
mod rectangle;

pub use point::PointLocation;
pub use polygon::{FlatCoordsError, Polygon};
pub use rectangle::Rectangle;

use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub height: u32,
    pub width: u32,
}

impl ImageSize {
    #[inline]
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }
}

/// A shape attached to a label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Geometry {
    Polygon(Polygon),
    Rectangle(Rectangle),
}

impl Geometry {
    /// Platform name of the geometry type.
    pub fn geometry_type(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "polygon",
            Geometry::Rectangle(_) => "rectangle",
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Geometry::Polygon(polygon) => Some(polygon),
            Geometry::Rectangle(_) => None,
        }
    }

    pub fn as_rectangle(&self) -> Option<&Rectangle> {
        match self {
            Geometry::Rectangle(rect) => Some(rect),
            Geometry::Polygon(_) => None,
        }
    }
}

impl From<Polygon> for Geometry {
    fn from(polygon: Polygon) -> Self {
        Geometry::Polygon(polygon)
    }
}

impl From<Rectangle> for Geometry {
    fn from(rect: Rectangle) -> Self {
        Geometry::Rectangle(rect)
    }
}
