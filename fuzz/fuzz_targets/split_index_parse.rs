//! Fuzz target for split indexing.
//!
//! Feeds arbitrary bytes to the annotation indexer and, when they index,
//! converts every listed image with the built-in settings.
//!
//! Run with:
//!   cargo +nightly fuzz run split_index_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use trashcan::coco::{from_coco_slice, SplitIndex};
use trashcan::convert::{ConversionStats, GeometryConverter, TrashcanConverter};
use trashcan::Settings;

fuzz_target!(|data: &[u8]| {
    // 10MB is generous for one split's annotation file.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(coco) = from_coco_slice(data) else {
        return;
    };
    let names: Vec<String> = coco.images.iter().map(|img| img.file_name.clone()).collect();
    let Ok(index) = SplitIndex::build(coco) else {
        return;
    };

    let settings = Settings::trashcan();
    let converter = TrashcanConverter::from_settings(&settings);
    let mut stats = ConversionStats::new();
    for name in &names {
        let _ = converter.convert_image(&index, name, &mut stats);
    }
});
