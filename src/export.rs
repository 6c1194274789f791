use crate::error::CoreResult;
use crate::geometry::to_closed_lon_lat_ring;
use crate::service::MapService;
use crate::store::MapStore;
use crate::types::{Area, Boundary, ProjectId};
use anyhow::{Context, Result};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// One Polygon feature per area boundary in the project, in area creation order.
pub fn project_boundaries<S: MapStore>(
    service: &MapService<S>,
    project_id: ProjectId,
) -> CoreResult<FeatureCollection> {
    let project = service.get_project(project_id)?;
    let areas = service.list_areas(project.id, None)?;

    let mut features = Vec::new();
    for area in &areas {
        if let Some(boundary) = service.store().get_boundary(area.id)? {
            features.push(boundary_feature(&boundary, area));
        }
    }

    let mut foreign_members = JsonObject::new();
    foreign_members.insert(
        "project".to_string(),
        json!({ "id": project.id, "name": project.name }),
    );

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(foreign_members),
    })
}

pub fn boundary_feature(boundary: &Boundary, area: &Area) -> Feature {
    let ring: Vec<Vec<f64>> = to_closed_lon_lat_ring(&boundary.coordinates)
        .into_iter()
        .map(|position| position.to_vec())
        .collect();

    let mut properties = JsonObject::new();
    properties.insert("boundary_id".to_string(), json!(boundary.id));
    properties.insert("area_id".to_string(), json!(area.id));
    properties.insert("area_name".to_string(), json!(area.name));
    properties.insert("area_kind".to_string(), json!(area.kind));
    properties.insert("parent_id".to_string(), json!(area.parent_id));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
        id: Some(Id::Number(boundary.id.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Writes `collection` to `dir/project_<id>.geojson`, creating `dir` if needed.
pub fn write_collection(
    dir: &Path,
    project_id: ProjectId,
    collection: &FeatureCollection,
) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory: {:?}", dir))?;
    let path = dir.join(format!("project_{}.geojson", project_id));
    let json = serde_json::to_string_pretty(collection).context("Failed to serialise GeoJSON")?;
    fs::write(&path, json).with_context(|| format!("Failed to write export: {:?}", path))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{AreaKind, LatLon, NewArea, NewBoundary, NewProject};
    use crate::validator::ContainmentMode;
    use geojson::GeoJson;

    fn service_with_boundary() -> (MapService<MemoryStore>, ProjectId) {
        let service = MapService::new(MemoryStore::new(), ContainmentMode::Vertices);
        let project = service
            .create_project(NewProject {
                name: "Cork".into(),
                description: String::new(),
                center: LatLon(51.9, -8.47),
                zoom: 13,
            })
            .unwrap();
        let master = service
            .create_area(NewArea {
                project_id: project.id,
                parent_id: None,
                name: "Cork".into(),
                kind: AreaKind::Master,
                default_view: None,
            })
            .unwrap();
        service
            .create_area(NewArea {
                project_id: project.id,
                parent_id: Some(master.id),
                name: "No boundary".into(),
                kind: AreaKind::Suburb,
                default_view: None,
            })
            .unwrap();
        service
            .create_boundary(NewBoundary {
                area_id: master.id,
                coordinates: vec![LatLon(1.0, 2.0), LatLon(3.0, 4.0), LatLon(5.0, 6.0)],
            })
            .unwrap();
        (service, project.id)
    }

    #[test]
    fn features_use_closed_lon_lat_rings() {
        let (service, project_id) = service_with_boundary();
        let collection = project_boundaries(&service, project_id).unwrap();

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        let Some(Geometry { value: Value::Polygon(rings), .. }) = &feature.geometry else {
            panic!("expected polygon geometry");
        };
        assert_eq!(
            rings[0],
            vec![vec![2.0, 1.0], vec![4.0, 3.0], vec![6.0, 5.0], vec![2.0, 1.0]]
        );
        assert_eq!(feature.property("area_kind"), Some(&json!("master")));
    }

    #[test]
    fn written_file_parses_back() {
        let (service, project_id) = service_with_boundary();
        let collection = project_boundaries(&service, project_id).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = write_collection(dir.path(), project_id, &collection).unwrap();
        let parsed: GeoJson = fs::read_to_string(&path).unwrap().parse().unwrap();
        assert!(matches!(parsed, GeoJson::FeatureCollection(fc) if fc.features.len() == 1));
    }

    #[test]
    fn unknown_project_is_not_found() {
        let (service, _) = service_with_boundary();
        assert!(project_boundaries(&service, 42).is_err());
    }
}
