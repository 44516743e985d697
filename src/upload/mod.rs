//! Upload targets.
//!
//! The pipeline talks to an [`UploadClient`]. Two implementations ship with
//! the crate:
//! - [`ProjectDirWriter`] materialises a project directory on disk;
//! - [`SuperviselyApi`] talks to a platform instance over HTTP (feature
//!   `remote`).

#[cfg(feature = "remote")]
mod api;
mod local;

#[cfg(feature = "remote")]
pub use api::SuperviselyApi;
pub use local::ProjectDirWriter;

use std::path::PathBuf;

use serde::Serialize;

use crate::error::TrashcanError;
use crate::sly::{Annotation, ProjectMeta};

/// A project created on the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub id: u64,
    pub name: String,
}

/// A dataset created inside a project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatasetInfo {
    pub id: u64,
    pub name: String,
}

/// Destination of a converted project.
///
/// Project and dataset creation never fail on a name clash: the target
/// picks a free name (see [`free_name`]) and reports it back.
pub trait UploadClient {
    fn create_project(&mut self, workspace_id: u64, name: &str)
        -> Result<ProjectInfo, TrashcanError>;

    fn update_project_meta(
        &mut self,
        project_id: u64,
        meta: &ProjectMeta,
    ) -> Result<(), TrashcanError>;

    fn create_dataset(&mut self, project_id: u64, name: &str)
        -> Result<DatasetInfo, TrashcanError>;

    /// Uploads one batch of images and returns their ids in input order.
    fn upload_images(
        &mut self,
        dataset_id: u64,
        names: &[String],
        paths: &[PathBuf],
    ) -> Result<Vec<u64>, TrashcanError>;

    /// Attaches annotations to previously uploaded images, pairwise.
    fn upload_annotations(
        &mut self,
        image_ids: &[u64],
        annotations: &[Annotation],
    ) -> Result<(), TrashcanError>;
}

/// Returns `name` if it is free, otherwise the first of `name_001`,
/// `name_002`, ... that is.
pub fn free_name<F>(name: &str, mut is_taken: F) -> Result<String, TrashcanError>
where
    F: FnMut(&str) -> Result<bool, TrashcanError>,
{
    if !is_taken(name)? {
        return Ok(name.to_string());
    }

    let mut idx: u32 = 1;
    loop {
        let candidate = format!("{name}_{idx:03}");
        if !is_taken(&candidate)? {
            log::warn!("Name '{}' is taken, using '{}'", name, candidate);
            return Ok(candidate);
        }
        idx += 1;
    }
}
