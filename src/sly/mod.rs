//! Supervisely project model.
//!
//! These types mirror the small part of the platform's object model the
//! converter produces: classes and tag metas (the project schema) and
//! per-image annotations made of labels and tags. They render to the JSON
//! the platform stores in `meta.json` and in per-image annotation files.
//!
//! # Coordinates
//!
//! Geometry is kept in `(row, col)` order in memory. The JSON form stores
//! points as `[x, y]`, i.e. `[col, row]`.

use serde_json::{json, Value};

use crate::geometry::{Geometry, ImageSize, PointLocation, Polygon, Rectangle};

/// Shape a class accepts. TrashCan classes carry both polygons and
/// rectangles, so they use [`ShapeKind::AnyGeometry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeKind {
    AnyGeometry,
    Polygon,
    Rectangle,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::AnyGeometry => "any",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Rectangle => "rectangle",
        }
    }
}

/// An object class of the project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjClass {
    pub name: String,
    pub shape: ShapeKind,
    pub color: [u8; 3],
}

impl ObjClass {
    pub fn new(name: impl Into<String>, shape: ShapeKind, color: [u8; 3]) -> Self {
        Self {
            name: name.into(),
            shape,
            color,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "title": self.name,
            "shape": self.shape.name(),
            "color": hex_color(self.color),
            "geometry_config": {},
            "hotkey": "",
        })
    }
}

/// Value type accepted by a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagValueType {
    None,
    AnyNumber,
    AnyString,
}

impl TagValueType {
    pub fn name(&self) -> &'static str {
        match self {
            TagValueType::None => "none",
            TagValueType::AnyNumber => "any_number",
            TagValueType::AnyString => "any_string",
        }
    }
}

/// Declaration of a tag in the project schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagMeta {
    pub name: String,
    pub value_type: TagValueType,
    pub color: [u8; 3],
}

impl TagMeta {
    pub fn new(name: impl Into<String>, value_type: TagValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            color: [143, 15, 176],
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "value_type": self.value_type.name(),
            "color": hex_color(self.color),
        })
    }
}

/// Project schema: classes plus tag metas.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectMeta {
    pub obj_classes: Vec<ObjClass>,
    pub tag_metas: Vec<TagMeta>,
}

impl ProjectMeta {
    pub fn new(obj_classes: Vec<ObjClass>, tag_metas: Vec<TagMeta>) -> Self {
        Self {
            obj_classes,
            tag_metas,
        }
    }

    pub fn obj_class(&self, name: &str) -> Option<&ObjClass> {
        self.obj_classes.iter().find(|class| class.name == name)
    }

    pub fn tag_meta(&self, name: &str) -> Option<&TagMeta> {
        self.tag_metas.iter().find(|meta| meta.name == name)
    }

    /// JSON form stored as the project's `meta.json`.
    pub fn to_json(&self) -> Value {
        json!({
            "classes": self.obj_classes.iter().map(ObjClass::to_json).collect::<Vec<_>>(),
            "tags": self.tag_metas.iter().map(TagMeta::to_json).collect::<Vec<_>>(),
            "projectType": "images",
        })
    }
}

/// Value attached to an image tag.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    None,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl TagValue {
    fn to_json(&self) -> Value {
        match self {
            TagValue::None => Value::Null,
            TagValue::Integer(v) => json!(v),
            TagValue::Float(v) => json!(v),
            TagValue::Text(v) => json!(v),
        }
    }
}

/// A tag instance on an image.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    pub name: String,
    pub value: TagValue,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: TagValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "value": self.value.to_json(),
        })
    }
}

/// A class-tagged geometry on an image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Label {
    pub geometry: Geometry,
    pub class_name: String,
}

impl Label {
    pub fn new(geometry: impl Into<Geometry>, class_name: impl Into<String>) -> Self {
        Self {
            geometry: geometry.into(),
            class_name: class_name.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "classTitle": self.class_name,
            "description": "",
            "tags": [],
            "geometryType": self.geometry.geometry_type(),
            "points": points_json(&self.geometry),
        })
    }
}

/// Everything attached to one image.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub img_size: ImageSize,
    pub labels: Vec<Label>,
    pub img_tags: Vec<Tag>,
}

impl Annotation {
    pub fn new(img_size: ImageSize) -> Self {
        Self {
            img_size,
            labels: Vec::new(),
            img_tags: Vec::new(),
        }
    }

    pub fn polygon_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|label| matches!(label.geometry, Geometry::Polygon(_)))
            .count()
    }

    pub fn rectangle_count(&self) -> usize {
        self.labels
            .iter()
            .filter(|label| matches!(label.geometry, Geometry::Rectangle(_)))
            .count()
    }

    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.img_tags.iter().find(|tag| tag.name == name)
    }

    /// JSON form of a per-image annotation file.
    pub fn to_json(&self) -> Value {
        json!({
            "description": "",
            "size": {
                "height": self.img_size.height,
                "width": self.img_size.width,
            },
            "tags": self.img_tags.iter().map(Tag::to_json).collect::<Vec<_>>(),
            "objects": self.labels.iter().map(Label::to_json).collect::<Vec<_>>(),
        })
    }
}

fn points_json(geometry: &Geometry) -> Value {
    match geometry {
        Geometry::Polygon(Polygon { exterior, interior }) => json!({
            "exterior": ring_json(exterior),
            "interior": interior.iter().map(|ring| ring_json(ring)).collect::<Vec<_>>(),
        }),
        Geometry::Rectangle(Rectangle {
            top,
            left,
            bottom,
            right,
        }) => json!({
            "exterior": [[left, top], [right, bottom]],
            "interior": [],
        }),
    }
}

fn ring_json(ring: &[PointLocation]) -> Vec<[i64; 2]> {
    ring.iter().map(|p| [p.col, p.row]).collect()
}

fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}
