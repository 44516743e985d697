//! Polygon geometry with integer vertices.

use thiserror::Error;

use super::point::PointLocation;

/// Why a flat coordinate sequence could not be read as a contour.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlatCoordsError {
    #[error("odd number of coordinates ({0})")]
    OddLength(usize),

    #[error("non-finite coordinate at index {0}")]
    NonFinite(usize),

    #[error("coordinate {value} at index {index} does not fit a pixel index")]
    OutOfRange { index: usize, value: f64 },
}

/// Largest coordinate magnitude accepted; `f64 as i64` saturates beyond it.
const MAX_COORD: f64 = i64::MAX as f64;

/// A polygon given by its exterior ring and optional holes.
///
/// Construction does not check the vertex count; the converter decides which
/// polygons are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polygon {
    pub exterior: Vec<PointLocation>,
    pub interior: Vec<Vec<PointLocation>>,
}

impl Polygon {
    pub fn new(exterior: Vec<PointLocation>) -> Self {
        Self {
            exterior,
            interior: Vec::new(),
        }
    }

    /// Reads a COCO contour `[x1, y1, x2, y2, ...]`.
    ///
    /// Pairs are consumed in order and swapped to `(row=y, col=x)`.
    pub fn from_flat_xy(coords: &[f64]) -> Result<Self, FlatCoordsError> {
        if coords.len() % 2 != 0 {
            return Err(FlatCoordsError::OddLength(coords.len()));
        }
        if let Some(idx) = coords.iter().position(|v| !v.is_finite()) {
            return Err(FlatCoordsError::NonFinite(idx));
        }
        if let Some(index) = coords.iter().position(|v| v.abs() >= MAX_COORD) {
            return Err(FlatCoordsError::OutOfRange {
                index,
                value: coords[index],
            });
        }

        let exterior = coords
            .chunks_exact(2)
            .map(|pair| PointLocation::from_xy(pair[0], pair[1]))
            .collect();
        Ok(Self::new(exterior))
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.exterior.len()
    }

    /// Area of the exterior minus the area of the holes.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.interior.iter().map(|ring| ring_area(ring)).sum();
        ring_area(&self.exterior) - holes
    }
}

/// Gauss (shoelace) area of a closed ring; 0 for fewer than three vertices.
///
/// Exact in i128 for pixel-scale rings. Rings whose doubled area does not fit
/// i128 are summed in f64 instead.
fn ring_area(ring: &[PointLocation]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let n = ring.len();
    let edge = |i: usize| (ring[i], ring[(i + n - 1) % n]);

    let exact = (0..n).try_fold(0i128, |acc, i| {
        let (cur, prev) = edge(i);
        let term = (cur.row as i128 * prev.col as i128)
            .checked_sub(cur.col as i128 * prev.row as i128)?;
        acc.checked_add(term)
    });

    match exact {
        Some(twice) => twice.unsigned_abs() as f64 / 2.0,
        None => {
            let twice: f64 = (0..n)
                .map(|i| {
                    let (cur, prev) = edge(i);
                    cur.row as f64 * prev.col as f64 - cur.col as f64 * prev.row as f64
                })
                .sum();
            twice.abs() / 2.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_xy_swaps_pairs() {
        let poly = Polygon::from_flat_xy(&[5.0, 10.0, 7.0, 12.0, 9.0, 10.0]).unwrap();
        assert_eq!(poly.vertex_count(), 3);
        assert_eq!(poly.exterior[0], PointLocation::new(10, 5));
        assert_eq!(poly.exterior[1], PointLocation::new(12, 7));
    }

    #[test]
    fn from_flat_xy_rejects_odd_length() {
        assert_eq!(
            Polygon::from_flat_xy(&[1.0, 2.0, 3.0]),
            Err(FlatCoordsError::OddLength(3))
        );
    }

    #[test]
    fn from_flat_xy_rejects_nan() {
        assert_eq!(
            Polygon::from_flat_xy(&[1.0, 2.0, f64::NAN, 3.0]),
            Err(FlatCoordsError::NonFinite(2))
        );
    }

    #[test]
    fn from_flat_xy_rejects_huge_coordinates() {
        let err = Polygon::from_flat_xy(&[-1e300, -1e300, 1e300, -1e300, 1e300, 1e300])
            .expect_err("should fail");
        assert!(matches!(err, FlatCoordsError::OutOfRange { index: 0, .. }));
    }

    #[test]
    fn area_of_near_limit_square_does_not_overflow() {
        // each shoelace term is 2 * 9e18^2, four of them exceed i128
        let a = 9.0e18;
        let poly = Polygon::from_flat_xy(&[-a, -a, a, -a, a, a, -a, a]).unwrap();
        let expected = 4.0 * a * a;
        assert!((poly.area() - expected).abs() / expected < 1e-9);
    }

    #[test]
    fn square_area() {
        // 10x10 axis-aligned square
        let poly = Polygon::from_flat_xy(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]).unwrap();
        assert_eq!(poly.area(), 100.0);
    }

    #[test]
    fn area_ignores_winding_order() {
        let cw = Polygon::from_flat_xy(&[0.0, 0.0, 0.0, 6.0, 8.0, 0.0]).unwrap();
        let ccw = Polygon::from_flat_xy(&[0.0, 0.0, 8.0, 0.0, 0.0, 6.0]).unwrap();
        assert_eq!(cw.area(), 24.0);
        assert_eq!(ccw.area(), 24.0);
    }

    #[test]
    fn area_uses_truncated_vertices() {
        // 7.9 truncates to 7: triangle with legs 7 and 8 -> 28
        let poly = Polygon::from_flat_xy(&[0.0, 0.0, 7.9, 0.0, 0.0, 8.2]).unwrap();
        assert_eq!(poly.area(), 28.0);
    }

    #[test]
    fn holes_are_subtracted() {
        let mut poly =
            Polygon::from_flat_xy(&[0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0]).unwrap();
        poly.interior.push(
            Polygon::from_flat_xy(&[2.0, 2.0, 4.0, 2.0, 4.0, 4.0, 2.0, 4.0])
                .unwrap()
                .exterior,
        );
        assert_eq!(poly.area(), 96.0);
    }

    #[test]
    fn degenerate_rings_have_zero_area() {
        let line = Polygon::from_flat_xy(&[0.0, 0.0, 5.0, 5.0]).unwrap();
        assert_eq!(line.area(), 0.0);
        let collinear = Polygon::from_flat_xy(&[0.0, 0.0, 5.0, 5.0, 10.0, 10.0]).unwrap();
        assert_eq!(collinear.area(), 0.0);
    }
}
