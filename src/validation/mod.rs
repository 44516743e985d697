//! Pre-flight validation of a split.
//!
//! The conversion itself stops at the first problem. Validation walks the
//! whole split instead and collects every issue, so a broken dataset can be
//! fixed in one pass before anything is uploaded:
//! - structural integrity (unique ids, valid references, known categories)
//! - image files on disk vs. entries in the annotation file
//! - geometry (well-formed contours, finite and in-bounds boxes)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::coco::{CocoAnnotation, CocoFile, ImageId, Segmentation};
use crate::convert::parse_video_id;
use crate::geometry::{ImageSize, Polygon, Rectangle};
use crate::settings::ClassTable;

/// Validates a parsed split against its image directory listing and the
/// class table.
pub fn validate_split(
    coco: &CocoFile,
    image_files: &[String],
    classes: &ClassTable,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_images(coco, image_files, &mut report);
    validate_categories(coco, classes, &mut report);

    let sizes: HashMap<ImageId, ImageSize> = coco
        .images
        .iter()
        .map(|img| (img.id, ImageSize::new(img.height, img.width)))
        .collect();

    for (position, ann) in coco.annotations.iter().enumerate() {
        validate_annotation(position, ann, &sizes, classes, &mut report);
    }

    report
}

fn validate_images(coco: &CocoFile, image_files: &[String], report: &mut ValidationReport) {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();
    let mut seen_names: HashSet<&str> = HashSet::new();
    let on_disk: HashSet<&str> = image_files.iter().map(String::as_str).collect();

    for (idx, image) in coco.images.iter().enumerate() {
        let id = image.id.as_u64();

        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateImageId,
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    id, first_idx
                ),
                IssueContext::Image { id },
            ));
        } else {
            seen_ids.insert(image.id, idx);
        }

        if !seen_names.insert(image.file_name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::DuplicateFileName,
                format!(
                    "File name '{}' is listed more than once; the last entry wins",
                    image.file_name
                ),
                IssueContext::Image { id },
            ));
        }

        if image.width == 0 || image.height == 0 {
            report.add(ValidationIssue::error(
                IssueCode::InvalidImageDimensions,
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
                IssueContext::Image { id },
            ));
        }

        if let Err(err) = parse_video_id(&image.file_name) {
            report.add(ValidationIssue::error(
                IssueCode::InvalidVideoTag,
                err.to_string(),
                IssueContext::Image { id },
            ));
        }

        if !on_disk.contains(image.file_name.as_str()) {
            report.add(ValidationIssue::warning(
                IssueCode::ImageFileMissing,
                format!("'{}' is not in the image directory", image.file_name),
                IssueContext::Image { id },
            ));
        }
    }

    for name in image_files {
        if !seen_names.contains(name.as_str()) {
            report.add(ValidationIssue::error(
                IssueCode::ImageNotInAnnotations,
                "Image file has no entry in the annotation file",
                IssueContext::ImageFile { name: name.clone() },
            ));
        }
    }
}

fn validate_categories(coco: &CocoFile, classes: &ClassTable, report: &mut ValidationReport) {
    for category in &coco.categories {
        let id = category.id.as_u64();
        match classes.name(category.id) {
            Some(expected) if expected != category.name => {
                report.add(ValidationIssue::warning(
                    IssueCode::CategoryNameMismatch,
                    format!(
                        "Annotation file names it '{}', class table uses '{}'",
                        category.name, expected
                    ),
                    IssueContext::Category { id },
                ));
            }
            Some(_) => {}
            None => {
                report.add(ValidationIssue::warning(
                    IssueCode::UnknownCategory,
                    format!("Declared category '{}' is not in the class table", category.name),
                    IssueContext::Category { id },
                ));
            }
        }
    }
}

fn validate_annotation(
    position: usize,
    ann: &CocoAnnotation,
    sizes: &HashMap<ImageId, ImageSize>,
    classes: &ClassTable,
    report: &mut ValidationReport,
) {
    let context = || IssueContext::Annotation {
        id: ann
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("#{position}")),
    };

    let size = sizes.get(&ann.image_id);
    if size.is_none() {
        report.add(ValidationIssue::error(
            IssueCode::MissingImageRef,
            format!("References non-existent image {}", ann.image_id),
            context(),
        ));
    }

    if !classes.contains(ann.category_id) {
        report.add(ValidationIssue::error(
            IssueCode::UnknownCategory,
            format!("Category {} is not in the class table", ann.category_id),
            context(),
        ));
    }

    match &ann.segmentation {
        Segmentation::Polygons(contours) => {
            for (idx, coords) in contours.iter().enumerate() {
                if let Err(err) = Polygon::from_flat_xy(coords) {
                    report.add(ValidationIssue::error(
                        IssueCode::MalformedContour,
                        format!("Contour {}: {}", idx, err),
                        context(),
                    ));
                }
            }
        }
        Segmentation::Rle(_) => {
            report.add(ValidationIssue::warning(
                IssueCode::RleSegmentation,
                "RLE mask; only the bbox will be converted",
                context(),
            ));
        }
    }

    let [x, y, w, h] = ann.bbox;
    if !ann.bbox.iter().all(|v| v.is_finite()) {
        report.add(ValidationIssue::error(
            IssueCode::BBoxNotFinite,
            format!("Non-finite bbox ({}, {}, {}, {})", x, y, w, h),
            context(),
        ));
        return;
    }

    if !Rectangle::from_xywh(x, y, w, h).is_ordered() {
        report.add(ValidationIssue::error(
            IssueCode::InvertedBBox,
            format!("Negative size {:.2}x{:.2} inverts the rectangle", w, h),
            context(),
        ));
    } else if w <= 0.0 || h <= 0.0 {
        report.add(ValidationIssue::warning(
            IssueCode::InvalidBBoxArea,
            format!("Zero or negative size: {:.2}x{:.2}", w, h),
            context(),
        ));
    }

    if let Some(size) = size {
        let (width, height) = (size.width as f64, size.height as f64);
        let tolerance = 0.5;

        if x < -tolerance || y < -tolerance || x + w > width + tolerance || y + h > height + tolerance
        {
            report.add(ValidationIssue::warning(
                IssueCode::BBoxOutOfBounds,
                format!(
                    "Bbox ({:.1}, {:.1}, {:.1}, {:.1}) extends outside image bounds (0, 0, {}, {})",
                    x,
                    y,
                    x + w,
                    y + h,
                    size.width,
                    size.height
                ),
                context(),
            ));
        }
    }
}
