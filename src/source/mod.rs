//! Dataset locator.
//!
//! Resolves each configured split to an image directory and an annotation
//! file on disk. The dataset root may be the directory that directly holds
//! the split folders, or one level above it, which is how archives that wrap
//! their content in a single top-level folder unpack.

#[cfg(feature = "remote")]
pub mod download;

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::TrashcanError;
use crate::settings::SplitSpec;

/// A split resolved to concrete paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPaths {
    pub name: String,
    pub images_dir: PathBuf,
    pub annotations: PathBuf,
}

/// Resolves every split under `root`, in configuration order.
pub fn locate_splits(root: &Path, splits: &[SplitSpec]) -> Result<Vec<SplitPaths>, TrashcanError> {
    let bases = candidate_bases(root)?;
    splits
        .iter()
        .map(|split| locate_split(root, &bases, split))
        .collect()
}

fn locate_split(
    root: &Path,
    bases: &[PathBuf],
    split: &SplitSpec,
) -> Result<SplitPaths, TrashcanError> {
    for base in bases {
        let images_dir = base.join(&split.images);
        let annotations = base.join(&split.annotations);
        if images_dir.is_dir() && annotations.is_file() {
            return Ok(SplitPaths {
                name: split.name.clone(),
                images_dir,
                annotations,
            });
        }
    }

    Err(TrashcanError::SplitNotFound {
        split: split.name.clone(),
        root: root.to_path_buf(),
        images: split.images.clone(),
        annotations: split.annotations.clone(),
    })
}

/// `root` first, then its immediate subdirectories in name order.
fn candidate_bases(root: &Path) -> Result<Vec<PathBuf>, TrashcanError> {
    let mut children = Vec::new();
    if root.is_dir() {
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|err| TrashcanError::Io(err.into()))?;
            if entry.file_type().is_dir() {
                children.push(entry.into_path());
            }
        }
    }

    let mut bases = Vec::with_capacity(children.len() + 1);
    bases.push(root.to_path_buf());
    bases.extend(children);
    Ok(bases)
}

/// Lists the files directly inside `dir`, sorted by name.
///
/// Subdirectories and their content are ignored.
pub fn list_images(dir: &Path) -> Result<Vec<String>, TrashcanError> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| TrashcanError::Io(err.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        } else {
            log::warn!("skipping non UTF-8 file name {:?}", entry.path());
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    fn spec() -> SplitSpec {
        SplitSpec::new("train", "v/train", "v/train.json")
    }

    #[test]
    fn split_directly_under_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("v/train/a_1_1.jpg"));
        touch(&dir.path().join("v/train.json"));

        let found = locate_splits(dir.path(), &[spec()]).expect("locate");
        assert_eq!(found[0].name, "train");
        assert_eq!(found[0].images_dir, dir.path().join("v/train"));
        assert_eq!(found[0].annotations, dir.path().join("v/train.json"));
    }

    #[test]
    fn split_one_level_down() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("aaa_unrelated")).unwrap();
        touch(&dir.path().join("dataset/v/train/a_1_1.jpg"));
        touch(&dir.path().join("dataset/v/train.json"));

        let found = locate_splits(dir.path(), &[spec()]).expect("locate");
        assert_eq!(found[0].images_dir, dir.path().join("dataset/v/train"));
    }

    #[test]
    fn missing_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("v/train/a_1_1.jpg"));

        let err = locate_splits(dir.path(), &[spec()]).expect_err("should fail");
        assert!(matches!(err, TrashcanError::SplitNotFound { .. }));
        assert!(err.to_string().contains("train"));
    }

    #[test]
    fn list_images_is_flat_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b_2_1.jpg"));
        touch(&dir.path().join("a_1_1.jpg"));
        touch(&dir.path().join("nested/c_3_1.jpg"));

        let names = list_images(dir.path()).expect("list");
        assert_eq!(names, vec!["a_1_1.jpg".to_string(), "b_2_1.jpg".to_string()]);
    }

    #[test]
    fn list_images_of_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_images(&dir.path().join("nope")).is_err());
    }
}
