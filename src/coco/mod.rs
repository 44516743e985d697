//! COCO-style annotation files and the per-split lookup index.
//!
//! TrashCan ships one COCO JSON file per split. Only the fields the
//! conversion needs are modelled; everything else in the file is ignored.
//!
//! # Segmentation
//!
//! A segmentation is either a list of polygon contours, each a flat
//! `[x1, y1, x2, y2, ...]` sequence in pixel coordinates, or an RLE mask
//! object (`{"counts": ..., "size": [h, w]}`). Polygons are converted into
//! platform geometry; RLE masks are carried through so the converter can
//! account for them.

mod ids;

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use ids::{AnnotationId, CategoryId, ImageId};

use crate::error::TrashcanError;
use crate::geometry::ImageSize;

// ============================================================================
// COCO Schema Types
// ============================================================================

/// Top-level structure of a split's annotation file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoFile {
    pub images: Vec<CocoImage>,

    pub annotations: Vec<CocoAnnotation>,

    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

/// One entry of the `images` array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: ImageId,
    pub file_name: String,
    pub height: u32,
    pub width: u32,
}

/// One entry of the `categories` array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: CategoryId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

/// One entry of the `annotations` array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CocoAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AnnotationId>,

    pub image_id: ImageId,

    pub category_id: CategoryId,

    pub segmentation: Segmentation,

    /// `[x, y, width, height]` with `(x, y)` the top-left corner.
    pub bbox: [f64; 4],
}

/// Instance segmentation of a single annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One flat `[x1, y1, x2, y2, ...]` sequence per contour.
    Polygons(Vec<Vec<f64>>),
    /// Run-length encoded mask.
    Rle(RleMask),
}

/// COCO RLE mask; `counts` is either a list of run lengths or the compressed
/// string form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RleMask {
    pub counts: serde_json::Value,
    pub size: [u32; 2],
}

// ============================================================================
// Reading
// ============================================================================

/// Reads a COCO annotation file.
///
/// # Errors
/// Returns an error if the file cannot be read or a required key is missing.
pub fn read_coco_file(path: &Path) -> Result<CocoFile, TrashcanError> {
    let file = File::open(path).map_err(|source| TrashcanError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).map_err(|source| TrashcanError::CocoJsonParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a COCO annotation document from a string.
pub fn from_coco_str(json: &str) -> Result<CocoFile, serde_json::Error> {
    serde_json::from_str(json)
}

/// Parses a COCO annotation document from raw bytes.
pub fn from_coco_slice(bytes: &[u8]) -> Result<CocoFile, serde_json::Error> {
    serde_json::from_slice(bytes)
}

// ============================================================================
// Split index
// ============================================================================

/// An annotation stripped of its image reference, stored under the owning
/// image's file name.
#[derive(Clone, Debug, PartialEq)]
pub struct RawAnnotation {
    pub id: Option<AnnotationId>,
    pub category_id: CategoryId,
    pub segmentation: Segmentation,
    pub bbox: [f64; 4],
}

/// Lookup tables built once per split and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct SplitIndex {
    image_names: HashMap<ImageId, String>,
    image_sizes: HashMap<String, ImageSize>,
    annotations: HashMap<String, Vec<RawAnnotation>>,
    annotation_count: usize,
}

impl SplitIndex {
    /// Builds the index from a parsed annotation file.
    ///
    /// Fails on the first annotation whose `image_id` is not listed under
    /// `images`.
    pub fn build(coco: CocoFile) -> Result<Self, TrashcanError> {
        let mut index = SplitIndex {
            image_names: HashMap::with_capacity(coco.images.len()),
            image_sizes: HashMap::with_capacity(coco.images.len()),
            annotations: HashMap::new(),
            annotation_count: 0,
        };

        for image in coco.images {
            index.image_sizes.insert(
                image.file_name.clone(),
                ImageSize::new(image.height, image.width),
            );
            index.image_names.insert(image.id, image.file_name);
        }

        for (position, ann) in coco.annotations.into_iter().enumerate() {
            let file_name = index.image_names.get(&ann.image_id).ok_or_else(|| {
                TrashcanError::UnknownImageRef {
                    annotation: ann
                        .id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| format!("#{position}")),
                    image_id: ann.image_id.as_u64(),
                }
            })?;

            index
                .annotations
                .entry(file_name.clone())
                .or_default()
                .push(RawAnnotation {
                    id: ann.id,
                    category_id: ann.category_id,
                    segmentation: ann.segmentation,
                    bbox: ann.bbox,
                });
            index.annotation_count += 1;
        }

        Ok(index)
    }

    /// Reads and indexes a split's annotation file.
    pub fn from_path(path: &Path) -> Result<Self, TrashcanError> {
        Self::build(read_coco_file(path)?)
    }

    /// Parses and indexes an annotation document held in memory.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TrashcanError> {
        let coco = from_coco_slice(bytes).map_err(|source| TrashcanError::CocoJsonParse {
            path: PathBuf::from("<memory>"),
            source,
        })?;
        Self::build(coco)
    }

    /// File name registered for an image id.
    pub fn image_name(&self, id: ImageId) -> Option<&str> {
        self.image_names.get(&id).map(String::as_str)
    }

    /// `(height, width)` recorded for an image file.
    pub fn image_size(&self, file_name: &str) -> Option<ImageSize> {
        self.image_sizes.get(file_name).copied()
    }

    /// Annotations owned by an image file; empty when it has none.
    pub fn annotations_for(&self, file_name: &str) -> &[RawAnnotation] {
        self.annotations
            .get(file_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains_image(&self, file_name: &str) -> bool {
        self.image_sizes.contains_key(file_name)
    }

    /// Number of distinct image file names.
    pub fn image_count(&self) -> usize {
        self.image_sizes.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.annotation_count
    }
}
