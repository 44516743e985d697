//! COCO to platform annotation conversion.
//!
//! For every image file the converter looks up the size recorded in the
//! split's JSON, tags the image with the video id taken from its file name,
//! and turns each raw annotation into labels:
//!
//! - one polygon per contour, kept only if it has enough vertices and a
//!   large enough area ([`ContourFilter`]);
//! - one rectangle from the COCO bbox, always emitted by default.
//!
//! The threshold values come from [`ConversionSettings`].

mod stats;

pub use stats::ConversionStats;

use log::{debug, warn};

use crate::coco::{RawAnnotation, Segmentation, SplitIndex};
use crate::error::TrashcanError;
use crate::geometry::{Polygon, Rectangle};
use crate::settings::{ClassTable, ConversionSettings, Settings};
use crate::sly::{Annotation, Label, Tag, TagValue};

/// Turns the raw annotations of one image into a platform annotation.
pub trait GeometryConverter {
    fn convert_image(
        &self,
        index: &SplitIndex,
        file_name: &str,
        stats: &mut ConversionStats,
    ) -> Result<Annotation, TrashcanError>;
}

/// Result of running a contour through the filter.
#[derive(Clone, Debug, PartialEq)]
pub enum ContourOutcome {
    Kept(Polygon),
    TooFewVertices(usize),
    TooSmall(f64),
}

/// Vertex and area thresholds for polygon labels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContourFilter {
    pub min_vertices: usize,
    /// Exclusive: a polygon must have an area strictly greater than this.
    pub min_area: f64,
}

impl Default for ContourFilter {
    fn default() -> Self {
        Self::from(&ConversionSettings::default())
    }
}

impl From<&ConversionSettings> for ContourFilter {
    fn from(settings: &ConversionSettings) -> Self {
        Self {
            min_vertices: settings.min_polygon_vertices,
            min_area: settings.min_polygon_area,
        }
    }
}

impl ContourFilter {
    pub fn apply(&self, polygon: Polygon) -> ContourOutcome {
        if polygon.vertex_count() < self.min_vertices {
            return ContourOutcome::TooFewVertices(polygon.vertex_count());
        }
        let area = polygon.area();
        if area > self.min_area {
            ContourOutcome::Kept(polygon)
        } else {
            ContourOutcome::TooSmall(area)
        }
    }
}

/// Parses the video id from the second `_`-delimited token of a file name.
///
/// `vid_000123_frame0000045.jpg` yields `123`.
pub fn parse_video_id(file_name: &str) -> Result<i64, TrashcanError> {
    let token = file_name
        .split('_')
        .nth(1)
        .ok_or_else(|| TrashcanError::InvalidVideoTag {
            file_name: file_name.to_string(),
            message: "expected at least two '_'-separated parts".to_string(),
        })?;

    token
        .trim()
        .parse::<i64>()
        .map_err(|source| TrashcanError::InvalidVideoTag {
            file_name: file_name.to_string(),
            message: format!("'{token}' is not an integer: {source}"),
        })
}

/// The TrashCan converter: class table lookup, contour filtering and the
/// video id tag.
#[derive(Clone, Debug)]
pub struct TrashcanConverter<'a> {
    classes: &'a ClassTable,
    video_tag: &'a str,
    filter: ContourFilter,
    emit_rectangles: bool,
}

impl<'a> TrashcanConverter<'a> {
    pub fn new(
        classes: &'a ClassTable,
        video_tag: &'a str,
        conversion: &ConversionSettings,
    ) -> Self {
        Self {
            classes,
            video_tag,
            filter: ContourFilter::from(conversion),
            emit_rectangles: conversion.emit_rectangles,
        }
    }

    pub fn from_settings(settings: &'a Settings) -> Self {
        Self::new(&settings.classes, &settings.video_tag, &settings.conversion)
    }

    /// Labels produced by a single raw annotation: kept polygons first, then
    /// the bbox rectangle.
    pub fn labels_for(
        &self,
        raw: &RawAnnotation,
        class_name: &str,
        file_name: &str,
        stats: &mut ConversionStats,
    ) -> Result<Vec<Label>, TrashcanError> {
        let mut labels = Vec::new();

        match &raw.segmentation {
            Segmentation::Polygons(contours) => {
                for coords in contours {
                    let polygon = Polygon::from_flat_xy(coords).map_err(|source| {
                        TrashcanError::MalformedSegmentation {
                            file_name: file_name.to_string(),
                            message: source.to_string(),
                        }
                    })?;

                    match self.filter.apply(polygon) {
                        ContourOutcome::Kept(polygon) => {
                            labels.push(Label::new(polygon, class_name));
                            stats.polygons += 1;
                        }
                        ContourOutcome::TooFewVertices(n) => {
                            debug!("{file_name}: dropping {class_name} contour with {n} vertices");
                            stats.dropped_few_vertices += 1;
                        }
                        ContourOutcome::TooSmall(area) => {
                            debug!("{file_name}: dropping {class_name} polygon with area {area}");
                            stats.dropped_small_area += 1;
                        }
                    }
                }
            }
            Segmentation::Rle(_) => {
                warn!("{file_name}: {class_name} has an RLE mask; only its bbox is converted");
                stats.skipped_rle += 1;
            }
        }

        if self.emit_rectangles {
            let [x, y, w, h] = raw.bbox;
            let malformed = || TrashcanError::MalformedBBox {
                file_name: file_name.to_string(),
                bbox: raw.bbox,
            };
            if !raw.bbox.iter().all(|v| v.is_finite()) {
                return Err(malformed());
            }
            // Negative width or height would invert the edges.
            let rect = Rectangle::from_xywh(x, y, w, h);
            if !rect.is_ordered() {
                return Err(malformed());
            }
            labels.push(Label::new(rect, class_name));
            stats.rectangles += 1;
        }

        stats.annotations += 1;
        Ok(labels)
    }
}

impl GeometryConverter for TrashcanConverter<'_> {
    fn convert_image(
        &self,
        index: &SplitIndex,
        file_name: &str,
        stats: &mut ConversionStats,
    ) -> Result<Annotation, TrashcanError> {
        let size = index
            .image_size(file_name)
            .ok_or_else(|| TrashcanError::MissingImageInfo {
                file_name: file_name.to_string(),
            })?;
        let video_id = parse_video_id(file_name)?;

        let mut annotation = Annotation::new(size);
        annotation
            .img_tags
            .push(Tag::new(self.video_tag, TagValue::Integer(video_id)));

        for raw in index.annotations_for(file_name) {
            let class_name =
                self.classes
                    .name(raw.category_id)
                    .ok_or_else(|| TrashcanError::UnknownCategory {
                        category_id: raw.category_id.as_u64(),
                        file_name: file_name.to_string(),
                    })?;
            let labels = self.labels_for(raw, class_name, file_name, stats)?;
            annotation.labels.extend(labels);
        }

        stats.images += 1;
        Ok(annotation)
    }
}
