//! End-to-end conversion: locate splits, convert, upload.
//!
//! One linear pass per split. Every split is located before the project is
//! created, so a dataset root missing a split fails without touching the
//! target. Any later failure aborts the run; nothing is resumed.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::coco::SplitIndex;
use crate::convert::{ConversionStats, GeometryConverter, TrashcanConverter};
use crate::error::TrashcanError;
use crate::progress::create_progress_bar;
use crate::settings::Settings;
use crate::sly::{ObjClass, ProjectMeta, ShapeKind, TagMeta, TagValueType};
use crate::source::{list_images, locate_splits, SplitPaths};
use crate::upload::{ProjectInfo, UploadClient};

/// Result of a split's upload.
#[derive(Clone, Debug, Serialize)]
pub struct SplitSummary {
    pub name: String,
    pub dataset_id: u64,
    pub images: usize,
    pub stats: ConversionStats,
}

/// Result of a whole run.
#[derive(Clone, Debug, Serialize)]
pub struct UploadSummary {
    pub project: ProjectInfo,
    pub splits: Vec<SplitSummary>,
}

impl UploadSummary {
    pub fn image_count(&self) -> usize {
        self.splits.iter().map(|split| split.images).sum()
    }

    /// Counters summed over all splits.
    pub fn total_stats(&self) -> ConversionStats {
        let mut total = ConversionStats::new();
        for split in &self.splits {
            total.merge(&split.stats);
        }
        total
    }
}

impl fmt::Display for UploadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Project '{}' (id {}): {} image(s) in {} dataset(s)",
            self.project.name,
            self.project.id,
            self.image_count(),
            self.splits.len()
        )?;
        for split in &self.splits {
            writeln!(f, "{} (id {}):", split.name, split.dataset_id)?;
            write!(f, "{}", split.stats)?;
        }
        Ok(())
    }
}

/// Project schema: one any-shape class per table entry plus the video tag.
pub fn build_project_meta(settings: &Settings) -> ProjectMeta {
    let obj_classes = settings
        .classes
        .iter()
        .map(|(_, name)| ObjClass::new(name, ShapeKind::AnyGeometry, settings.class_color(name)))
        .collect();
    let tag_metas = vec![TagMeta::new(
        settings.video_tag.clone(),
        TagValueType::AnyNumber,
    )];
    ProjectMeta::new(obj_classes, tag_metas)
}

/// Converts the dataset under `root` and sends it to `client`.
pub fn convert_and_upload<C: UploadClient + ?Sized>(
    client: &mut C,
    settings: &Settings,
    workspace_id: u64,
    root: &Path,
    show_progress: bool,
) -> Result<UploadSummary, TrashcanError> {
    settings.validate()?;
    let splits = locate_splits(root, &settings.splits)?;

    let meta = build_project_meta(settings);
    let project = client.create_project(workspace_id, &settings.project_name)?;
    client.update_project_meta(project.id, &meta)?;
    info!("Project '{}' ready (id {})", project.name, project.id);

    let converter = TrashcanConverter::from_settings(settings);
    let mut summaries = Vec::with_capacity(splits.len());
    for split in &splits {
        let summary = upload_split(
            client,
            &converter,
            project.id,
            split,
            settings.upload.batch_size,
            show_progress,
        )?;
        summaries.push(summary);
    }

    Ok(UploadSummary {
        project,
        splits: summaries,
    })
}

fn upload_split<C, G>(
    client: &mut C,
    converter: &G,
    project_id: u64,
    split: &SplitPaths,
    batch_size: usize,
    show_progress: bool,
) -> Result<SplitSummary, TrashcanError>
where
    C: UploadClient + ?Sized,
    G: GeometryConverter,
{
    let index = SplitIndex::from_path(&split.annotations)?;
    let names = list_images(&split.images_dir)?;
    info!(
        "{}: {} image file(s), {} annotation(s) in {}",
        split.name,
        names.len(),
        index.annotation_count(),
        split.annotations.display()
    );

    let dataset = client.create_dataset(project_id, &split.name)?;
    let pb = create_progress_bar(names.len() as u64, &split.name, show_progress);
    let mut stats = ConversionStats::new();

    for batch in names.chunks(batch_size.max(1)) {
        let annotations = batch
            .iter()
            .map(|name| converter.convert_image(&index, name, &mut stats))
            .collect::<Result<Vec<_>, _>>()?;
        let paths: Vec<PathBuf> = batch
            .iter()
            .map(|name| split.images_dir.join(name))
            .collect();

        let image_ids = client.upload_images(dataset.id, batch, &paths)?;
        if image_ids.len() != batch.len() {
            return Err(TrashcanError::UploadCountMismatch {
                expected: batch.len(),
                got: image_ids.len(),
            });
        }
        client.upload_annotations(&image_ids, &annotations)?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    info!(
        "{}: uploaded {} image(s) with {} label(s) to dataset '{}'",
        split.name,
        names.len(),
        stats.labels(),
        dataset.name
    );
    Ok(SplitSummary {
        name: dataset.name,
        dataset_id: dataset.id,
        images: names.len(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_has_every_class_and_the_video_tag() {
        let settings = Settings::trashcan();
        let meta = build_project_meta(&settings);

        assert_eq!(meta.obj_classes.len(), settings.classes.len());
        assert!(meta
            .obj_classes
            .iter()
            .all(|class| class.shape == ShapeKind::AnyGeometry));
        assert_eq!(meta.obj_class("rov").map(|c| c.color), Some([230, 25, 75]));

        let tag = meta.tag_meta("video id").expect("video tag");
        assert_eq!(tag.value_type, TagValueType::AnyNumber);
    }

    #[test]
    fn unknown_class_color_falls_back() {
        let mut settings = Settings::trashcan();
        settings.class2color.remove("rov");
        let meta = build_project_meta(&settings);
        assert_eq!(
            meta.obj_class("rov").map(|c| c.color),
            Some(crate::settings::DEFAULT_CLASS_COLOR)
        );
    }
}
