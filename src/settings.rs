//! Dataset settings.
//!
//! Everything the pipeline needs to know about the dataset lives in one
//! immutable [`Settings`] value: descriptive metadata shown on the platform,
//! the class table, the split layout on disk, the conversion thresholds and
//! the upload batch size. [`Settings::trashcan`] returns the built-in values
//! for TrashCan 1.0; a YAML file may override any subset of them.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::coco::CategoryId;
use crate::error::TrashcanError;

/// Color used for classes missing from `class2color`.
pub const DEFAULT_CLASS_COLOR: [u8; 3] = [128, 128, 128];

/// Immutable configuration consumed by the pipeline entry points.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub project_name: String,
    pub project_name_full: Option<String>,
    pub hide_dataset: bool,
    pub license: LicenseInfo,
    pub applications: Vec<String>,
    pub category: Option<String>,
    pub cv_tasks: Vec<String>,
    pub annotation_types: Vec<String>,
    /// Release date as `YYYY-MM-DD`.
    pub release_date: Option<String>,
    pub homepage_url: Option<String>,
    pub preview_image_id: Option<u64>,
    pub github_url: Option<String>,
    pub download_original_url: Option<DownloadSource>,
    pub class2color: BTreeMap<String, [u8; 3]>,
    pub paper: Option<String>,
    pub authors: Vec<String>,
    pub authors_contacts: Vec<String>,
    pub organization_name: Option<String>,
    pub organization_url: Option<String>,

    /// Category id to class name.
    pub classes: ClassTable,
    /// Name of the per-image tag holding the video id.
    pub video_tag: String,
    pub splits: Vec<SplitSpec>,
    pub conversion: ConversionSettings,
    pub upload: UploadSettings,
}

/// License block shown with the published dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Where the original archive(s) can be fetched from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DownloadSource {
    /// One archive; the local file name comes from the URL path.
    Single(String),
    /// Local file name to URL.
    Named(BTreeMap<String, String>),
}

/// One named partition of the dataset, relative to the dataset root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSpec {
    /// Dataset name on the platform.
    pub name: String,
    /// Directory holding the split's images.
    pub images: PathBuf,
    /// COCO-style annotation file.
    pub annotations: PathBuf,
}

impl SplitSpec {
    pub fn new(
        name: impl Into<String>,
        images: impl Into<PathBuf>,
        annotations: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            images: images.into(),
            annotations: annotations.into(),
        }
    }
}

/// Geometry filtering thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionSettings {
    /// Polygons with an area at or below this value are dropped.
    pub min_polygon_area: f64,
    /// Contours with fewer vertices are dropped.
    pub min_polygon_vertices: usize,
    /// Emit the bbox rectangle for every annotation.
    pub emit_rectangles: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            min_polygon_area: 30.0,
            min_polygon_vertices: 3,
            emit_rectangles: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub batch_size: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self { batch_size: 30 }
    }
}

/// Category id to class name mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassTable(BTreeMap<u64, String>);

impl ClassTable {
    pub fn new(entries: impl IntoIterator<Item = (u64, String)>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// The 22 TrashCan 1.0 categories.
    pub fn trashcan() -> Self {
        const NAMES: [&str; 22] = [
            "rov",
            "plant",
            "animal fish",
            "animal starfish",
            "animal shells",
            "animal crab",
            "animal eel",
            "animal etc",
            "trash etc",
            "trash fabric",
            "trash fishing gear",
            "trash metal",
            "trash paper",
            "trash plastic",
            "trash rubber",
            "trash wood",
            "trash unknown instance",
            "trash branch",
            "trash wreckage",
            "trash tarp",
            "trash rope",
            "trash net",
        ];
        Self::new(
            NAMES
                .iter()
                .enumerate()
                .map(|(idx, name)| (idx as u64 + 1, name.to_string())),
        )
    }

    /// Returns the class name for a category id.
    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.0.get(&id.as_u64()).map(String::as_str)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.0.contains_key(&id.as_u64())
    }

    /// Iterates `(id, name)` in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &str)> {
        self.0
            .iter()
            .map(|(id, name)| (CategoryId::new(*id), name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::trashcan()
    }
}

impl Settings {
    /// Built-in settings for TrashCan 1.0.
    pub fn trashcan() -> Self {
        let class2color = [
            ("rov", [230, 25, 75]),
            ("plant", [60, 180, 75]),
            ("animal fish", [255, 225, 25]),
            ("animal starfish", [0, 130, 200]),
            ("animal shells", [245, 130, 48]),
            ("animal crab", [145, 30, 180]),
            ("animal eel", [70, 240, 240]),
            ("animal etc", [240, 50, 230]),
            ("trash etc", [210, 245, 60]),
            ("trash fabric", [250, 190, 212]),
            ("trash fishing gear", [0, 128, 128]),
            ("trash metal", [220, 190, 255]),
            ("trash paper", [170, 110, 40]),
            ("trash plastic", [255, 250, 200]),
            ("trash rubber", [128, 0, 0]),
            ("trash wood", [170, 255, 195]),
            ("trash unknown instance", [128, 128, 0]),
            ("trash branch", [255, 215, 180]),
            ("trash wreckage", [0, 0, 128]),
            ("trash tarp", [200, 54, 128]),
            ("trash rope", [40, 200, 0]),
            ("trash net", [235, 155, 40]),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color))
        .collect();

        let split = |name: &str, version: &str, part: &str| {
            SplitSpec::new(
                name,
                format!("{version}/{part}"),
                format!("{version}/instances_{part}_trashcan.json"),
            )
        };

        Self {
            project_name: "TrashCan 1.0".to_string(),
            project_name_full: Some(
                "TrashCan 1.0: An Instance-Segmentation Labeled Dataset of Trash Observations"
                    .to_string(),
            ),
            hide_dataset: false,
            license: LicenseInfo {
                name: "Custom".to_string(),
                source_url: Some(
                    "https://conservancy.umn.edu/bitstream/handle/11299/214865/LICENSE.txt?sequence=2&isAllowed=y"
                        .to_string(),
                ),
            },
            applications: vec![
                "Waste Recycling".to_string(),
                "Marine".to_string(),
                "Robotics".to_string(),
            ],
            category: Some("Environmental".to_string()),
            cv_tasks: vec![
                "instance segmentation".to_string(),
                "semantic segmentation".to_string(),
                "object detection".to_string(),
            ],
            annotation_types: vec![
                "instance segmentation".to_string(),
                "object detection".to_string(),
            ],
            release_date: Some("2020-07-23".to_string()),
            homepage_url: Some("https://conservancy.umn.edu/handle/11299/214865".to_string()),
            preview_image_id: Some(14431163),
            github_url: Some("https://github.com/dataset-ninja/trash-can".to_string()),
            download_original_url: Some(DownloadSource::Single(
                "https://conservancy.umn.edu/bitstream/handle/11299/214865/dataset.zip?sequence=12&isAllowed=y"
                    .to_string(),
            )),
            class2color,
            paper: Some("https://arxiv.org/pdf/2007.08097".to_string()),
            authors: vec![
                "Hong Jungseok".to_string(),
                "Fulton Michael".to_string(),
                "Sattar Junaed".to_string(),
            ],
            authors_contacts: vec![
                "jungseok@umn.edu".to_string(),
                "fulto081@umn.edu".to_string(),
                "junaed@umn.edu".to_string(),
            ],
            organization_name: Some("University of Minnesota Twin Cities, USA".to_string()),
            organization_url: Some("https://twin-cities.umn.edu/".to_string()),
            classes: ClassTable::trashcan(),
            video_tag: "video id".to_string(),
            splits: vec![
                split("materials train", "material_version", "train"),
                split("materials val", "material_version", "val"),
                split("instance train", "instance_version", "train"),
                split("instance val", "instance_version", "val"),
            ],
            conversion: ConversionSettings::default(),
            upload: UploadSettings::default(),
        }
    }

    /// Reads settings from a YAML file. Fields the file omits keep their
    /// built-in TrashCan values.
    pub fn from_yaml_path(path: &Path) -> Result<Self, TrashcanError> {
        let file = File::open(path).map_err(|source| TrashcanError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);

        let settings: Settings =
            serde_yaml::from_reader(reader).map_err(|source| TrashcanError::SettingsParse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TrashcanError> {
        let settings: Settings =
            serde_yaml::from_str(yaml).map_err(|source| TrashcanError::SettingsParse {
                path: PathBuf::from("<string>"),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads the settings file when one is given, the built-in values otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, TrashcanError> {
        match path {
            Some(path) => Self::from_yaml_path(path),
            None => Ok(Self::trashcan()),
        }
    }

    /// Checks the values the pipeline depends on.
    pub fn validate(&self) -> Result<(), TrashcanError> {
        self.check_names()?;
        if self.upload.batch_size == 0 {
            return Err(TrashcanError::InvalidSettings(
                "upload.batch_size must be at least 1".to_string(),
            ));
        }
        if self.classes.is_empty() {
            return Err(TrashcanError::InvalidSettings(
                "class table is empty".to_string(),
            ));
        }
        if self.video_tag.trim().is_empty() {
            return Err(TrashcanError::InvalidSettings(
                "video_tag must not be empty".to_string(),
            ));
        }
        let mut names = BTreeSet::new();
        for split in &self.splits {
            if !names.insert(split.name.as_str()) {
                return Err(TrashcanError::InvalidSettings(format!(
                    "duplicate split name '{}'",
                    split.name
                )));
            }
        }
        Ok(())
    }

    /// Fields required before anything is uploaded.
    pub fn check_names(&self) -> Result<(), TrashcanError> {
        if self.project_name.trim().is_empty() {
            return Err(TrashcanError::InvalidSettings(
                "project_name must be set before uploading".to_string(),
            ));
        }
        Ok(())
    }

    /// Full display name, falling back to the short project name.
    pub fn full_name(&self) -> &str {
        self.project_name_full
            .as_deref()
            .unwrap_or(&self.project_name)
    }

    /// Year component of `release_date`.
    pub fn release_year(&self) -> Result<Option<u16>, TrashcanError> {
        let Some(date) = self.release_date.as_deref() else {
            return Ok(None);
        };
        let year = date.split('-').next().unwrap_or_default();
        year.trim().parse::<u16>().map(Some).map_err(|_| {
            TrashcanError::InvalidSettings(format!(
                "release_date '{date}' does not start with a year"
            ))
        })
    }

    /// Names of the fields that must be filled once the dataset is published.
    pub fn missing_release_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.license.name.trim().is_empty() {
            missing.push("license");
        }
        if self.applications.is_empty() {
            missing.push("applications");
        }
        if self.category.is_none() {
            missing.push("category");
        }
        if self.cv_tasks.is_empty() {
            missing.push("cv_tasks");
        }
        if self.annotation_types.is_empty() {
            missing.push("annotation_types");
        }
        if !matches!(self.release_year(), Ok(Some(_))) {
            missing.push("release_year");
        }
        if self.homepage_url.is_none() {
            missing.push("homepage_url");
        }
        if self.preview_image_id.is_none() {
            missing.push("preview_image_id");
        }
        if self.github_url.is_none() {
            missing.push("github_url");
        }
        missing
    }

    /// Color for a class name, with a neutral fallback.
    pub fn class_color(&self, name: &str) -> [u8; 3] {
        self.class2color
            .get(name)
            .copied()
            .unwrap_or(DEFAULT_CLASS_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trashcan_defaults_are_valid() {
        let settings = Settings::trashcan();
        settings.validate().expect("built-in settings validate");
        assert_eq!(settings.classes.len(), 22);
        assert_eq!(settings.splits.len(), 4);
        assert_eq!(settings.upload.batch_size, 30);
        assert_eq!(settings.conversion.min_polygon_area, 30.0);
        assert!(settings.missing_release_fields().is_empty());
    }

    #[test]
    fn missing_settings_file_names_the_path() {
        let err = Settings::from_yaml_path(Path::new("absent-settings.yaml"))
            .expect_err("should fail");
        assert!(matches!(err, TrashcanError::FileRead { .. }));
        assert!(err.to_string().contains("absent-settings.yaml"));
    }

    #[test]
    fn class_table_lookup() {
        let classes = ClassTable::trashcan();
        assert_eq!(classes.name(CategoryId::new(1)), Some("rov"));
        assert_eq!(classes.name(CategoryId::new(22)), Some("trash net"));
        assert_eq!(classes.name(CategoryId::new(23)), None);
        assert_eq!(classes.name(CategoryId::new(0)), None);
    }

    #[test]
    fn every_class_has_a_color() {
        let settings = Settings::trashcan();
        for (_, name) in settings.classes.iter() {
            assert!(
                settings.class2color.contains_key(name),
                "missing color for {name}"
            );
        }
        assert_eq!(settings.class_color("nope"), DEFAULT_CLASS_COLOR);
    }

    #[test]
    fn default_split_layout() {
        let settings = Settings::trashcan();
        let first = &settings.splits[0];
        assert_eq!(first.name, "materials train");
        assert_eq!(first.images, PathBuf::from("material_version/train"));
        assert_eq!(
            first.annotations,
            PathBuf::from("material_version/instances_train_trashcan.json")
        );
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = r#"
project_name: "Trash subset"
conversion:
  min_polygon_area: 10
upload:
  batch_size: 5
splits:
  - name: train
    images: imgs
    annotations: train.json
"#;
        let settings = Settings::from_yaml_str(yaml).expect("parse yaml");
        assert_eq!(settings.project_name, "Trash subset");
        assert_eq!(settings.conversion.min_polygon_area, 10.0);
        assert_eq!(settings.conversion.min_polygon_vertices, 3);
        assert!(settings.conversion.emit_rectangles);
        assert_eq!(settings.upload.batch_size, 5);
        assert_eq!(settings.splits.len(), 1);
        assert_eq!(settings.classes.len(), 22);
    }

    #[test]
    fn yaml_class_table_uses_integer_keys() {
        let yaml = "classes:\n  1: bottle\n  7: can\n";
        let settings = Settings::from_yaml_str(yaml).expect("parse yaml");
        assert_eq!(settings.classes.len(), 2);
        assert_eq!(settings.classes.name(CategoryId::new(7)), Some("can"));
    }

    #[test]
    fn download_source_accepts_string_or_map() {
        let single = Settings::from_yaml_str("download_original_url: https://x.org/a.zip\n")
            .expect("single");
        assert_eq!(
            single.download_original_url,
            Some(DownloadSource::Single("https://x.org/a.zip".to_string()))
        );

        let named = Settings::from_yaml_str(
            "download_original_url:\n  a.zip: https://x.org/a.zip\n  b.zip: https://x.org/b.zip\n",
        )
        .expect("named");
        match named.download_original_url {
            Some(DownloadSource::Named(map)) => assert_eq!(map.len(), 2),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = Settings::from_yaml_str("upload:\n  batch_size: 0\n").expect_err("should fail");
        assert!(matches!(err, TrashcanError::InvalidSettings(_)));
    }

    #[test]
    fn empty_project_name_is_rejected() {
        let err = Settings::from_yaml_str("project_name: ''\n").expect_err("should fail");
        assert!(err.to_string().contains("project_name"));
    }

    #[test]
    fn duplicate_split_names_are_rejected() {
        let yaml = r#"
splits:
  - {name: a, images: x, annotations: x.json}
  - {name: a, images: y, annotations: y.json}
"#;
        assert!(Settings::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn release_year_from_date() {
        let mut settings = Settings::trashcan();
        assert_eq!(settings.release_year().unwrap(), Some(2020));

        settings.release_date = None;
        assert_eq!(settings.release_year().unwrap(), None);
        assert!(settings.missing_release_fields().contains(&"release_year"));

        settings.release_date = Some("soon".to_string());
        assert!(settings.release_year().is_err());
    }

    #[test]
    fn missing_release_fields_lists_gaps() {
        let mut settings = Settings::trashcan();
        settings.preview_image_id = None;
        settings.github_url = None;
        assert_eq!(
            settings.missing_release_fields(),
            vec!["preview_image_id", "github_url"]
        );
    }

    #[test]
    fn full_name_falls_back_to_project_name() {
        let mut settings = Settings::trashcan();
        settings.project_name_full = None;
        assert_eq!(settings.full_name(), "TrashCan 1.0");
    }
}
