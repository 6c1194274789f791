use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ProjectId = i64;
pub type AreaId = i64;
pub type BoundaryId = i64;
pub type LayerId = i64;
pub type AnnotationId = i64;

/// Free-form style payload. Only allow-listed keys survive sanitising (see `style`).
pub type Style = BTreeMap<String, serde_json::Value>;

/// A `[lat, lon]` pair, serialised as a two element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn lat(&self) -> f64 {
        self.0
    }

    pub fn lon(&self) -> f64 {
        self.1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultView {
    pub center: LatLon,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub center: LatLon,
    pub zoom: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub center: LatLon,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

fn default_zoom() -> u8 {
    13
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaKind {
    Master,
    Suburb,
    Individual,
}

impl AreaKind {
    /// Label used when this area's boundary is rejected.
    pub fn label(&self) -> &'static str {
        match self {
            AreaKind::Individual => "Individual map",
            AreaKind::Master | AreaKind::Suburb => "Suburb",
        }
    }

    /// Label of the area kind expected to contain this one.
    pub fn container_label(&self) -> &'static str {
        match self {
            AreaKind::Individual => "suburb",
            AreaKind::Master | AreaKind::Suburb => "master map",
        }
    }
}

impl fmt::Display for AreaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AreaKind::Master => "master",
            AreaKind::Suburb => "suburb",
            AreaKind::Individual => "individual",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: AreaId,
    pub project_id: ProjectId,
    pub parent_id: Option<AreaId>,
    pub name: String,
    pub kind: AreaKind,
    pub boundary_id: Option<BoundaryId>,
    pub default_view: Option<DefaultView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewArea {
    pub project_id: ProjectId,
    pub parent_id: Option<AreaId>,
    pub name: String,
    pub kind: AreaKind,
    pub default_view: Option<DefaultView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub id: BoundaryId,
    pub area_id: AreaId,
    pub coordinates: Vec<LatLon>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBoundary {
    pub area_id: AreaId,
    pub coordinates: Vec<LatLon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Annotation,
    Custom,
}

/// Where a layer came from. Inherited copies point back at the ancestor layer they were
/// materialised from; the reference is lookup-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum LayerOrigin {
    Own,
    Inherited { origin: LayerId },
}

impl LayerOrigin {
    pub fn origin_id(&self) -> Option<LayerId> {
        match self {
            LayerOrigin::Own => None,
            LayerOrigin::Inherited { origin } => Some(*origin),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub area_id: AreaId,
    pub origin: LayerOrigin,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
    pub z_index: i32,
    pub editable: bool,
    pub config: Style,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Layer {
    pub fn is_inherited(&self) -> bool {
        matches!(self.origin, LayerOrigin::Inherited { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLayer {
    pub area_id: AreaId,
    pub origin: LayerOrigin,
    pub name: String,
    pub kind: LayerKind,
    pub visible: bool,
    pub z_index: i32,
    pub editable: bool,
    pub config: Style,
}

impl NewLayer {
    /// A user-authored layer. Always editable.
    pub fn own(
        area_id: AreaId,
        name: String,
        kind: LayerKind,
        visible: bool,
        z_index: i32,
        config: Style,
    ) -> Self {
        Self {
            area_id,
            origin: LayerOrigin::Own,
            name,
            kind,
            visible,
            z_index,
            editable: true,
            config,
        }
    }

    /// A read-only copy of `ancestor` owned by `area_id`.
    pub fn inherited_from(ancestor: &Layer, area_id: AreaId) -> Self {
        Self {
            area_id,
            origin: LayerOrigin::Inherited { origin: ancestor.id },
            name: ancestor.name.clone(),
            kind: ancestor.kind,
            visible: ancestor.visible,
            z_index: ancestor.z_index,
            editable: false,
            config: ancestor.config.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Marker,
    Line,
    Polygon,
    Text,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnotationKind::Marker => "marker",
            AnnotationKind::Line => "line",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Markers and text sit on a single point; lines and polygons carry a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationCoordinates {
    Point(LatLon),
    Path(Vec<LatLon>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: AnnotationId,
    pub layer_id: LayerId,
    pub kind: AnnotationKind,
    pub coordinates: AnnotationCoordinates,
    pub style: Style,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAnnotation {
    pub layer_id: LayerId,
    pub kind: AnnotationKind,
    pub coordinates: AnnotationCoordinates,
    #[serde(default)]
    pub style: Style,
    pub content: Option<String>,
}
