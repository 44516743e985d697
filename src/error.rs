use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for trashcan operations.
#[derive(Debug, Error)]
pub enum TrashcanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write JSON to {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse settings from {path}: {source}")]
    SettingsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Annotation {annotation} references image {image_id}, which is not listed in 'images'")]
    UnknownImageRef { annotation: String, image_id: u64 },

    #[error("Image '{file_name}' has no entry in the annotation file")]
    MissingImageInfo { file_name: String },

    #[error("Category {category_id} (image '{file_name}') is not in the class table")]
    UnknownCategory { category_id: u64, file_name: String },

    #[error("Cannot read video id from '{file_name}': {message}")]
    InvalidVideoTag { file_name: String, message: String },

    #[error("Malformed segmentation on image '{file_name}': {message}")]
    MalformedSegmentation { file_name: String, message: String },

    #[error("Malformed bbox on image '{file_name}': {bbox:?}")]
    MalformedBBox { file_name: String, bbox: [f64; 4] },

    #[error("Split '{split}' not found under {root}: expected {images} and {annotations}")]
    SplitNotFound {
        split: String,
        root: PathBuf,
        images: PathBuf,
        annotations: PathBuf,
    },

    #[error("Upload client returned {got} image id(s) for a batch of {expected}")]
    UploadCountMismatch { expected: usize, got: usize },

    #[error("Image id {0} was not returned by an earlier upload")]
    UnknownUploadedImage(u64),

    #[error("Platform API call '{method}' failed: {message}")]
    Api { method: String, message: String },

    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("Failed to unpack {path}: {message}")]
    Unpack { path: PathBuf, message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Unsupported output: {0}")]
    UnsupportedOutput(String),
}
