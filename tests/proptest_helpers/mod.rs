#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use serde_json::{json, Value};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Shoelace area over integer vertices given as flat `[x0, y0, x1, y1, ...]`.
pub fn int_area(coords: &[f64]) -> f64 {
    let points: Vec<(i64, i64)> = coords
        .chunks_exact(2)
        .map(|pair| (pair[0] as i64, pair[1] as i64))
        .collect();
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: i128 = (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 as i128 * y2 as i128 - x2 as i128 * y1 as i128
        })
        .sum();
    (twice.abs() as f64) / 2.0
}

/// Quarter-pixel coordinate in `[0, max)`; exact in binary and in JSON.
fn arb_coord(max: u32) -> impl Strategy<Value = f64> {
    (0..max * 4).prop_map(|v| v as f64 / 4.0)
}

/// A flat contour of 0..=8 vertices inside a 200x200 frame.
pub fn arb_contour() -> BoxedStrategy<Vec<f64>> {
    prop::collection::vec((arb_coord(200), arb_coord(200)), 0..=8)
        .prop_map(|points| points.into_iter().flat_map(|(x, y)| [x, y]).collect())
        .boxed()
}

/// A COCO bbox `[x, y, w, h]` inside a 200x200 frame.
pub fn arb_bbox() -> BoxedStrategy<[f64; 4]> {
    (arb_coord(150), arb_coord(150), arb_coord(50), arb_coord(50))
        .prop_map(|(x, y, w, h)| [x, y, w, h])
        .boxed()
}

#[derive(Clone, Debug)]
pub struct ArbAnnotation {
    pub image: usize,
    pub category_id: u64,
    pub contours: Vec<Vec<f64>>,
    pub bbox: [f64; 4],
}

/// Annotations spread over `image_count` images, categories from the
/// built-in table.
pub fn arb_annotations(image_count: usize, max_annotations: usize) -> BoxedStrategy<Vec<ArbAnnotation>> {
    let annotation = (
        0..image_count,
        1u64..=22,
        prop::collection::vec(arb_contour(), 0..3),
        arb_bbox(),
    )
        .prop_map(|(image, category_id, contours, bbox)| ArbAnnotation {
            image,
            category_id,
            contours,
            bbox,
        });
    prop::collection::vec(annotation, 0..=max_annotations).boxed()
}

pub fn image_name(idx: usize) -> String {
    format!("vid_{:06}_frame{:07}.jpg", idx + 1, idx)
}

/// COCO document for `image_count` 200x200 images and the given annotations.
pub fn coco_document(image_count: usize, annotations: &[ArbAnnotation]) -> Value {
    let images: Vec<Value> = (0..image_count)
        .map(|idx| {
            json!({"id": idx as u64 + 1, "file_name": image_name(idx), "height": 200, "width": 200})
        })
        .collect();
    let annotations: Vec<Value> = annotations
        .iter()
        .enumerate()
        .map(|(idx, ann)| {
            json!({
                "id": idx as u64 + 1,
                "image_id": ann.image as u64 + 1,
                "category_id": ann.category_id,
                "segmentation": ann.contours,
                "bbox": ann.bbox,
            })
        })
        .collect();
    json!({"images": images, "annotations": annotations})
}

/// Polygons the converter should keep under the built-in thresholds.
pub fn expected_polygons(annotations: &[ArbAnnotation]) -> usize {
    annotations
        .iter()
        .flat_map(|ann| &ann.contours)
        .filter(|coords| coords.len() / 2 >= 3 && int_area(coords) > 30.0)
        .count()
}
