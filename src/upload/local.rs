//! Project directory writer.
//!
//! Lays a project out the way the platform exports it:
//!
//! ```text
//! <out>/<project>/meta.json
//! <out>/<project>/<dataset>/img/<image>
//! <out>/<project>/<dataset>/ann/<image>.json
//! ```

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{free_name, DatasetInfo, ProjectInfo, UploadClient};
use crate::error::TrashcanError;
use crate::sly::{Annotation, ProjectMeta};

/// [`UploadClient`] that writes a project directory under `out_dir`.
///
/// Ids are handed out sequentially from 1 and only live as long as the
/// writer. The workspace id is ignored.
pub struct ProjectDirWriter {
    out_dir: PathBuf,
    next_id: u64,
    projects: HashMap<u64, PathBuf>,
    datasets: HashMap<u64, PathBuf>,
    /// Image id -> annotation file path.
    images: HashMap<u64, PathBuf>,
}

impl ProjectDirWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            next_id: 1,
            projects: HashMap::new(),
            datasets: HashMap::new(),
            images: HashMap::new(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Directory of a project created by this writer.
    pub fn project_dir(&self, project_id: u64) -> Option<&Path> {
        self.projects.get(&project_id).map(PathBuf::as_path)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn lookup<'a>(
        map: &'a HashMap<u64, PathBuf>,
        id: u64,
        what: &str,
    ) -> Result<&'a PathBuf, TrashcanError> {
        map.get(&id).ok_or_else(|| TrashcanError::Api {
            method: format!("local.{what}"),
            message: format!("no {what} with id {id}"),
        })
    }
}

fn write_json(path: &Path, value: &Value) -> Result<(), TrashcanError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|source| {
        TrashcanError::JsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

impl UploadClient for ProjectDirWriter {
    fn create_project(
        &mut self,
        _workspace_id: u64,
        name: &str,
    ) -> Result<ProjectInfo, TrashcanError> {
        fs::create_dir_all(&self.out_dir)?;
        let out_dir = self.out_dir.clone();
        let name = free_name(name, |candidate| Ok(out_dir.join(candidate).exists()))?;

        let dir = self.out_dir.join(&name);
        fs::create_dir_all(&dir)?;

        let id = self.allocate_id();
        self.projects.insert(id, dir);
        Ok(ProjectInfo { id, name })
    }

    fn update_project_meta(
        &mut self,
        project_id: u64,
        meta: &ProjectMeta,
    ) -> Result<(), TrashcanError> {
        let dir = Self::lookup(&self.projects, project_id, "project")?;
        write_json(&dir.join("meta.json"), &meta.to_json())
    }

    fn create_dataset(
        &mut self,
        project_id: u64,
        name: &str,
    ) -> Result<DatasetInfo, TrashcanError> {
        let project_dir = Self::lookup(&self.projects, project_id, "project")?.clone();
        let name = free_name(name, |candidate| Ok(project_dir.join(candidate).exists()))?;

        let dir = project_dir.join(&name);
        fs::create_dir_all(dir.join("img"))?;
        fs::create_dir_all(dir.join("ann"))?;

        let id = self.allocate_id();
        self.datasets.insert(id, dir);
        Ok(DatasetInfo { id, name })
    }

    fn upload_images(
        &mut self,
        dataset_id: u64,
        names: &[String],
        paths: &[PathBuf],
    ) -> Result<Vec<u64>, TrashcanError> {
        let dataset_dir = Self::lookup(&self.datasets, dataset_id, "dataset")?.clone();

        let mut ids = Vec::with_capacity(names.len());
        for (name, path) in names.iter().zip(paths) {
            fs::copy(path, dataset_dir.join("img").join(name))?;
            let id = self.allocate_id();
            self.images
                .insert(id, dataset_dir.join("ann").join(format!("{name}.json")));
            ids.push(id);
        }
        Ok(ids)
    }

    fn upload_annotations(
        &mut self,
        image_ids: &[u64],
        annotations: &[Annotation],
    ) -> Result<(), TrashcanError> {
        for (id, annotation) in image_ids.iter().zip(annotations) {
            let ann_path = self
                .images
                .get(id)
                .ok_or(TrashcanError::UnknownUploadedImage(*id))?;
            write_json(ann_path, &annotation.to_json())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ImageSize, Rectangle};
    use crate::sly::{Label, ObjClass, ShapeKind};

    #[test]
    fn writes_project_layout() {
        let src = tempfile::tempdir().unwrap();
        let image = src.path().join("vid_1_1.jpg");
        fs::write(&image, b"jpeg bytes").unwrap();

        let out = tempfile::tempdir().unwrap();
        let mut writer = ProjectDirWriter::new(out.path());

        let project = writer.create_project(0, "TrashCan").unwrap();
        let meta = ProjectMeta::new(
            vec![ObjClass::new("rov", ShapeKind::AnyGeometry, [1, 2, 3])],
            Vec::new(),
        );
        writer.update_project_meta(project.id, &meta).unwrap();
        let dataset = writer.create_dataset(project.id, "instance train").unwrap();

        let ids = writer
            .upload_images(dataset.id, &["vid_1_1.jpg".to_string()], &[image])
            .unwrap();
        assert_eq!(ids.len(), 1);

        let mut ann = Annotation::new(ImageSize::new(10, 20));
        ann.labels.push(Label::new(Rectangle::new(0, 0, 5, 5), "rov"));
        writer.upload_annotations(&ids, &[ann]).unwrap();

        let root = out.path().join("TrashCan");
        assert_eq!(writer.project_dir(project.id), Some(root.as_path()));
        assert!(root.join("meta.json").is_file());
        assert_eq!(
            fs::read(root.join("instance train/img/vid_1_1.jpg")).unwrap(),
            b"jpeg bytes"
        );

        let written: Value = serde_json::from_slice(
            &fs::read(root.join("instance train/ann/vid_1_1.jpg.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(written["size"]["width"], 20);
        assert_eq!(written["objects"][0]["classTitle"], "rov");
    }

    #[test]
    fn existing_names_get_suffix() {
        let out = tempfile::tempdir().unwrap();
        fs::create_dir_all(out.path().join("TrashCan")).unwrap();

        let mut writer = ProjectDirWriter::new(out.path());
        let project = writer.create_project(0, "TrashCan").unwrap();
        assert_eq!(project.name, "TrashCan_001");

        let first = writer.create_dataset(project.id, "train").unwrap();
        let second = writer.create_dataset(project.id, "train").unwrap();
        assert_eq!(first.name, "train");
        assert_eq!(second.name, "train_001");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let out = tempfile::tempdir().unwrap();
        let mut writer = ProjectDirWriter::new(out.path());

        assert!(writer.create_dataset(42, "train").is_err());
        let ann = Annotation::new(ImageSize::new(1, 1));
        assert!(matches!(
            writer.upload_annotations(&[7], &[ann]),
            Err(TrashcanError::UnknownUploadedImage(7))
        ));
    }
}
