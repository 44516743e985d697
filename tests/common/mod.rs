#![allow(dead_code)]

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use trashcan::settings::{Settings, SplitSpec};

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// Two frames from two videos, three annotations:
/// - a 20x20 square (kept) on frame 1;
/// - a triangle of area 8 (dropped) on frame 1;
/// - a 2-vertex contour (dropped) plus a triangle of area 200 (kept) on frame 2.
///
/// Converts to 2 polygons and 3 rectangles.
pub fn sample_coco() -> Value {
    json!({
        "info": {"description": "fixture"},
        "images": [
            {"id": 1, "file_name": "vid_000001_frame0000001.bmp", "height": 48, "width": 64},
            {"id": 2, "file_name": "vid_000002_frame0000007.bmp", "height": 48, "width": 64}
        ],
        "categories": [
            {"id": 1, "name": "rov", "supercategory": "rov"},
            {"id": 2, "name": "plant", "supercategory": "plant"},
            {"id": 9, "name": "trash etc", "supercategory": "trash"}
        ],
        "annotations": [
            {"id": 1, "image_id": 1, "category_id": 1, "iscrowd": 0, "area": 400.0,
             "segmentation": [[10, 10, 30, 10, 30, 30, 10, 30]], "bbox": [10, 10, 20, 20]},
            {"id": 2, "image_id": 1, "category_id": 9, "iscrowd": 0, "area": 8.0,
             "segmentation": [[0, 0, 4, 0, 0, 4]], "bbox": [0, 0, 4, 4]},
            {"id": 3, "image_id": 2, "category_id": 2, "iscrowd": 0, "area": 200.0,
             "segmentation": [[1, 1, 2, 2], [20, 20, 40, 20, 40, 40]], "bbox": [1.5, 1.5, 38.9, 38.9]}
        ]
    })
}

pub const SAMPLE_IMAGES: usize = 2;
pub const SAMPLE_ANNOTATIONS: usize = 3;
pub const SAMPLE_POLYGONS: usize = 2;

/// Writes a split: the annotation file plus a BMP for every listed image.
pub fn write_split(root: &Path, split: &SplitSpec, coco: &Value) {
    let ann_path = root.join(&split.annotations);
    if let Some(parent) = ann_path.parent() {
        fs::create_dir_all(parent).expect("create annotation dir");
    }
    fs::write(&ann_path, serde_json::to_vec_pretty(coco).expect("encode coco"))
        .expect("write annotation file");

    let images_dir = root.join(&split.images);
    fs::create_dir_all(&images_dir).expect("create image dir");
    for image in coco["images"].as_array().into_iter().flatten() {
        let name = image["file_name"].as_str().expect("file_name");
        let width = image["width"].as_u64().expect("width") as u32;
        let height = image["height"].as_u64().expect("height") as u32;
        write_bmp(&images_dir.join(name), width, height);
    }
}

/// Settings with a single `train` split at `v/train` + `v/train.json`.
pub fn single_split_settings() -> Settings {
    let mut settings = Settings::trashcan();
    settings.project_name = "TrashCan fixture".to_string();
    settings.splits = vec![SplitSpec::new("train", "v/train", "v/train.json")];
    settings
}

/// Writes [`sample_coco`] for every split of the built-in layout.
pub fn write_trashcan_layout(root: &Path) {
    for split in &Settings::trashcan().splits {
        write_split(root, split, &sample_coco());
    }
}
