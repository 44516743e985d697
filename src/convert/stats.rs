//! Counters collected while converting a split.

use serde::Serialize;
use std::fmt;

/// What the converter produced and what it filtered out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Images converted.
    pub images: usize,
    /// Raw COCO annotations visited.
    pub annotations: usize,
    /// Polygon labels kept.
    pub polygons: usize,
    /// Rectangle labels emitted.
    pub rectangles: usize,
    /// Contours dropped for having too few vertices.
    pub dropped_few_vertices: usize,
    /// Polygons dropped for having too small an area.
    pub dropped_small_area: usize,
    /// RLE masks that produced no polygon.
    pub skipped_rle: usize,
}

impl ConversionStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total labels emitted.
    pub fn labels(&self) -> usize {
        self.polygons + self.rectangles
    }

    /// Contours that did not become polygon labels.
    pub fn dropped(&self) -> usize {
        self.dropped_few_vertices + self.dropped_small_area
    }

    /// Adds another set of counters to this one.
    pub fn merge(&mut self, other: &ConversionStats) {
        self.images += other.images;
        self.annotations += other.annotations;
        self.polygons += other.polygons;
        self.rectangles += other.rectangles;
        self.dropped_few_vertices += other.dropped_few_vertices;
        self.dropped_small_area += other.dropped_small_area;
        self.skipped_rle += other.skipped_rle;
    }
}

impl fmt::Display for ConversionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "  {} images, {} annotations -> {} labels ({} polygons, {} rectangles)",
            self.images,
            self.annotations,
            self.labels(),
            self.polygons,
            self.rectangles
        )?;

        if self.dropped() > 0 {
            writeln!(
                f,
                "  dropped {} contour(s): {} with too few vertices, {} too small",
                self.dropped(),
                self.dropped_few_vertices,
                self.dropped_small_area
            )?;
        }
        if self.skipped_rle > 0 {
            writeln!(f, "  skipped {} RLE mask(s)", self.skipped_rle)?;
        }

        Ok(())
    }
}
