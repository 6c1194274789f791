use crate::error::StoreError;
use crate::types::{
    Annotation, AnnotationId, Area, AreaId, AreaKind, Boundary, BoundaryId, LatLon, Layer, LayerId,
    NewAnnotation, NewArea, NewBoundary, NewLayer, NewProject, Project, ProjectId,
};
use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub type StoreResult<T> = Result<T, StoreError>;

/// The slice of persistence the boundary validator and layer resolver depend on.
pub trait HierarchyStore {
    fn get_area(&self, id: AreaId) -> StoreResult<Option<Area>>;

    fn get_boundary(&self, area_id: AreaId) -> StoreResult<Option<Boundary>>;

    /// Layers authored directly on `area_id`, inherited copies excluded.
    fn list_own_layers(&self, area_id: AreaId) -> StoreResult<Vec<Layer>>;

    fn find_inherited_copy(&self, area_id: AreaId, origin: LayerId) -> StoreResult<Option<Layer>>;

    fn create_layer(&self, layer: NewLayer) -> StoreResult<Layer>;

    fn get_parent(&self, area: &Area) -> StoreResult<Option<Area>> {
        match area.parent_id {
            Some(parent_id) => self.get_area(parent_id),
            None => Ok(None),
        }
    }
}

/// Full record access used by the service layer.
pub trait MapStore: HierarchyStore + Send + Sync {
    fn create_project(&self, project: NewProject) -> StoreResult<Project>;
    fn get_project(&self, id: ProjectId) -> StoreResult<Option<Project>>;
    fn list_projects(&self) -> StoreResult<Vec<Project>>;
    fn save_project(&self, project: Project) -> StoreResult<Project>;
    /// Removes the project and, transitively, every area it owns.
    fn delete_project(&self, id: ProjectId) -> StoreResult<bool>;

    fn create_area(&self, area: NewArea) -> StoreResult<Area>;
    fn list_areas(&self, project_id: ProjectId) -> StoreResult<Vec<Area>>;
    fn save_area(&self, area: Area) -> StoreResult<Area>;
    /// Removes the area, its descendants, their boundaries, layers and annotations.
    fn delete_area(&self, id: AreaId) -> StoreResult<bool>;

    fn create_boundary(&self, boundary: NewBoundary) -> StoreResult<Boundary>;
    fn get_boundary_by_id(&self, id: BoundaryId) -> StoreResult<Option<Boundary>>;
    fn replace_boundary(&self, id: BoundaryId, coordinates: Vec<LatLon>) -> StoreResult<Boundary>;
    fn delete_boundary(&self, id: BoundaryId) -> StoreResult<bool>;

    fn get_layer(&self, id: LayerId) -> StoreResult<Option<Layer>>;
    fn save_layer(&self, layer: Layer) -> StoreResult<Layer>;
    /// Removes the layer and its annotations. Inherited copies elsewhere are left alone.
    fn delete_layer(&self, id: LayerId) -> StoreResult<bool>;

    fn create_annotation(&self, annotation: NewAnnotation) -> StoreResult<Annotation>;
    fn get_annotation(&self, id: AnnotationId) -> StoreResult<Option<Annotation>>;
    fn list_annotations(&self, layer_id: LayerId) -> StoreResult<Vec<Annotation>>;
    fn save_annotation(&self, annotation: Annotation) -> StoreResult<Annotation>;
    fn delete_annotation(&self, id: AnnotationId) -> StoreResult<bool>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counters {
    project: i64,
    area: i64,
    boundary: i64,
    layer: i64,
    annotation: i64,
}

fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    counters: Counters,
    projects: BTreeMap<ProjectId, Project>,
    areas: BTreeMap<AreaId, Area>,
    boundaries: BTreeMap<BoundaryId, Boundary>,
    layers: BTreeMap<LayerId, Layer>,
    annotations: BTreeMap<AnnotationId, Annotation>,
}

impl StoreState {
    fn remove_areas(&mut self, root: AreaId) -> bool {
        if !self.areas.contains_key(&root) {
            return false;
        }

        // Collect the subtree first; parent links only point upward.
        let mut doomed = BTreeSet::from([root]);
        loop {
            let before = doomed.len();
            for area in self.areas.values() {
                if area.parent_id.is_some_and(|p| doomed.contains(&p)) {
                    doomed.insert(area.id);
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        let layers: BTreeSet<LayerId> = self
            .layers
            .values()
            .filter(|l| doomed.contains(&l.area_id))
            .map(|l| l.id)
            .collect();

        self.annotations.retain(|_, a| !layers.contains(&a.layer_id));
        self.layers.retain(|id, _| !layers.contains(id));
        self.boundaries.retain(|_, b| !doomed.contains(&b.area_id));
        self.areas.retain(|id, _| !doomed.contains(id));

        tracing::debug!(
            area = root,
            areas = doomed.len(),
            layers = layers.len(),
            "removed area subtree"
        );
        true
    }
}

fn write_snapshot(path: &Path, state: &StoreState) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(state).context("Failed to serialise store")?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {:?}", dir))?;
    }
    // Replace via rename so a failed write leaves the previous snapshot intact.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write snapshot: {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace snapshot: {:?}", path))?;
    Ok(())
}

/// Mutex-guarded in-process store.
///
/// A store opened with [`MemoryStore::open`] is backed by a JSON snapshot that is rewritten
/// after every successful mutation, while the lock is still held.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_snapshot(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
        let state: StoreState = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {:?}", path))?;
        tracing::info!(
            path = ?path,
            projects = state.projects.len(),
            areas = state.areas.len(),
            layers = state.layers.len(),
            "loaded snapshot"
        );
        Ok(Self {
            state: Mutex::new(state),
            snapshot: None,
        })
    }

    /// Loads `path` when it exists, otherwise starts empty. Every later mutation is written
    /// back to `path`.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let mut store = if path.exists() {
            Self::load_snapshot(path)?
        } else {
            tracing::info!(path = ?path, "no snapshot found, starting empty");
            Self::new()
        };
        store.snapshot = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn save_snapshot(&self, path: &Path) -> anyhow::Result<()> {
        let state = self.lock()?;
        write_snapshot(path, &state)?;
        tracing::info!(path = ?path, "saved snapshot");
        Ok(())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Persists `state` to the backing snapshot, if any. Called with the lock held.
    fn commit(&self, state: &StoreState) -> StoreResult<()> {
        if let Some(path) = &self.snapshot {
            write_snapshot(path, state)?;
            tracing::trace!(path = ?path, "committed snapshot");
        }
        Ok(())
    }
}

impl HierarchyStore for MemoryStore {
    fn get_area(&self, id: AreaId) -> StoreResult<Option<Area>> {
        Ok(self.lock()?.areas.get(&id).cloned())
    }

    fn get_boundary(&self, area_id: AreaId) -> StoreResult<Option<Boundary>> {
        let state = self.lock()?;
        Ok(state.boundaries.values().find(|b| b.area_id == area_id).cloned())
    }

    fn list_own_layers(&self, area_id: AreaId) -> StoreResult<Vec<Layer>> {
        let state = self.lock()?;
        let mut layers: Vec<Layer> = state
            .layers
            .values()
            .filter(|l| l.area_id == area_id && !l.is_inherited())
            .cloned()
            .collect();
        layers.sort_by_key(|l| (l.z_index, l.created_at, l.id));
        Ok(layers)
    }

    fn find_inherited_copy(&self, area_id: AreaId, origin: LayerId) -> StoreResult<Option<Layer>> {
        let state = self.lock()?;
        Ok(state
            .layers
            .values()
            .find(|l| l.area_id == area_id && l.origin.origin_id() == Some(origin))
            .cloned())
    }

    fn create_layer(&self, layer: NewLayer) -> StoreResult<Layer> {
        let mut state = self.lock()?;

        if !state.areas.contains_key(&layer.area_id) {
            return Err(StoreError::Missing {
                entity: "area",
                id: layer.area_id,
            });
        }

        // One inherited copy per (area, origin).
        if let Some(origin) = layer.origin.origin_id() {
            if state
                .layers
                .values()
                .any(|l| l.area_id == layer.area_id && l.origin.origin_id() == Some(origin))
            {
                return Err(StoreError::Conflict(format!(
                    "area {} already holds a copy of layer {}",
                    layer.area_id, origin
                )));
            }
        }

        let now = Utc::now();
        let id = bump(&mut state.counters.layer);
        let created = Layer {
            id,
            area_id: layer.area_id,
            origin: layer.origin,
            name: layer.name,
            kind: layer.kind,
            visible: layer.visible,
            z_index: layer.z_index,
            editable: layer.editable,
            config: layer.config,
            created_at: now,
            updated_at: now,
        };
        state.layers.insert(id, created.clone());
        self.commit(&state)?;
        Ok(created)
    }
}

impl MapStore for MemoryStore {
    fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let id = bump(&mut state.counters.project);
        let created = Project {
            id,
            name: project.name,
            description: project.description,
            center: project.center,
            zoom: project.zoom,
            created_at: now,
            updated_at: now,
        };
        state.projects.insert(id, created.clone());
        self.commit(&state)?;
        Ok(created)
    }

    fn get_project(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.lock()?.projects.get(&id).cloned())
    }

    fn list_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(self.lock()?.projects.values().cloned().collect())
    }

    fn save_project(&self, mut project: Project) -> StoreResult<Project> {
        let mut state = self.lock()?;
        let slot = state.projects.get_mut(&project.id).ok_or(StoreError::Missing {
            entity: "project",
            id: project.id,
        })?;
        project.updated_at = Utc::now();
        *slot = project.clone();
        self.commit(&state)?;
        Ok(project)
    }

    fn delete_project(&self, id: ProjectId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if state.projects.remove(&id).is_none() {
            return Ok(false);
        }
        let roots: Vec<AreaId> = state
            .areas
            .values()
            .filter(|a| a.project_id == id)
            .map(|a| a.id)
            .collect();
        for root in roots {
            state.remove_areas(root);
        }
        self.commit(&state)?;
        Ok(true)
    }

    fn create_area(&self, area: NewArea) -> StoreResult<Area> {
        let mut state = self.lock()?;
        if !state.projects.contains_key(&area.project_id) {
            return Err(StoreError::Missing {
                entity: "project",
                id: area.project_id,
            });
        }
        if area.kind == AreaKind::Master
            && state
                .areas
                .values()
                .any(|a| a.project_id == area.project_id && a.kind == AreaKind::Master)
        {
            return Err(StoreError::Conflict(format!(
                "project {} already has a master area",
                area.project_id
            )));
        }
        let now = Utc::now();
        let id = bump(&mut state.counters.area);
        let created = Area {
            id,
            project_id: area.project_id,
            parent_id: area.parent_id,
            name: area.name,
            kind: area.kind,
            boundary_id: None,
            default_view: area.default_view,
            created_at: now,
            updated_at: now,
        };
        state.areas.insert(id, created.clone());
        self.commit(&state)?;
        Ok(created)
    }

    fn list_areas(&self, project_id: ProjectId) -> StoreResult<Vec<Area>> {
        let state = self.lock()?;
        Ok(state
            .areas
            .values()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect())
    }

    fn save_area(&self, mut area: Area) -> StoreResult<Area> {
        let mut state = self.lock()?;
        if !state.areas.contains_key(&area.id) {
            return Err(StoreError::Missing {
                entity: "area",
                id: area.id,
            });
        }

        // Walk up from the new parent; reaching the area itself means a cycle.
        let mut seen = BTreeSet::new();
        let mut cursor = area.parent_id;
        while let Some(ancestor) = cursor {
            if ancestor == area.id {
                return Err(StoreError::Conflict(format!(
                    "area {} cannot be its own ancestor",
                    area.id
                )));
            }
            if !seen.insert(ancestor) {
                break;
            }
            cursor = state.areas.get(&ancestor).and_then(|a| a.parent_id);
        }

        area.updated_at = Utc::now();
        state.areas.insert(area.id, area.clone());
        self.commit(&state)?;
        Ok(area)
    }

    fn delete_area(&self, id: AreaId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if !state.remove_areas(id) {
            return Ok(false);
        }
        self.commit(&state)?;
        Ok(true)
    }

    fn create_boundary(&self, boundary: NewBoundary) -> StoreResult<Boundary> {
        let mut state = self.lock()?;
        if !state.areas.contains_key(&boundary.area_id) {
            return Err(StoreError::Missing {
                entity: "area",
                id: boundary.area_id,
            });
        }
        if state.boundaries.values().any(|b| b.area_id == boundary.area_id) {
            return Err(StoreError::Conflict(format!(
                "area {} already has a boundary",
                boundary.area_id
            )));
        }

        let now = Utc::now();
        let id = bump(&mut state.counters.boundary);
        let created = Boundary {
            id,
            area_id: boundary.area_id,
            coordinates: boundary.coordinates,
            created_at: now,
            updated_at: now,
        };
        state.boundaries.insert(id, created.clone());
        if let Some(area) = state.areas.get_mut(&created.area_id) {
            area.boundary_id = Some(id);
        }
        self.commit(&state)?;
        Ok(created)
    }

    fn get_boundary_by_id(&self, id: BoundaryId) -> StoreResult<Option<Boundary>> {
        Ok(self.lock()?.boundaries.get(&id).cloned())
    }

    fn replace_boundary(&self, id: BoundaryId, coordinates: Vec<LatLon>) -> StoreResult<Boundary> {
        let mut state = self.lock()?;
        let boundary = state
            .boundaries
            .get_mut(&id)
            .ok_or(StoreError::Missing { entity: "boundary", id })?;
        boundary.coordinates = coordinates;
        boundary.updated_at = Utc::now();
        let updated = boundary.clone();
        self.commit(&state)?;
        Ok(updated)
    }

    fn delete_boundary(&self, id: BoundaryId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        let Some(removed) = state.boundaries.remove(&id) else {
            return Ok(false);
        };
        if let Some(area) = state.areas.get_mut(&removed.area_id) {
            area.boundary_id = None;
        }
        self.commit(&state)?;
        Ok(true)
    }

    fn get_layer(&self, id: LayerId) -> StoreResult<Option<Layer>> {
        Ok(self.lock()?.layers.get(&id).cloned())
    }

    fn save_layer(&self, mut layer: Layer) -> StoreResult<Layer> {
        let mut state = self.lock()?;
        let slot = state.layers.get_mut(&layer.id).ok_or(StoreError::Missing {
            entity: "layer",
            id: layer.id,
        })?;
        layer.updated_at = Utc::now();
        *slot = layer.clone();
        self.commit(&state)?;
        Ok(layer)
    }

    fn delete_layer(&self, id: LayerId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if state.layers.remove(&id).is_none() {
            return Ok(false);
        }
        state.annotations.retain(|_, a| a.layer_id != id);
        self.commit(&state)?;
        Ok(true)
    }

    fn create_annotation(&self, annotation: NewAnnotation) -> StoreResult<Annotation> {
        let mut state = self.lock()?;
        if !state.layers.contains_key(&annotation.layer_id) {
            return Err(StoreError::Missing {
                entity: "layer",
                id: annotation.layer_id,
            });
        }
        let now = Utc::now();
        let id = bump(&mut state.counters.annotation);
        let created = Annotation {
            id,
            layer_id: annotation.layer_id,
            kind: annotation.kind,
            coordinates: annotation.coordinates,
            style: annotation.style,
            content: annotation.content,
            created_at: now,
            updated_at: now,
        };
        state.annotations.insert(id, created.clone());
        self.commit(&state)?;
        Ok(created)
    }

    fn get_annotation(&self, id: AnnotationId) -> StoreResult<Option<Annotation>> {
        Ok(self.lock()?.annotations.get(&id).cloned())
    }

    fn list_annotations(&self, layer_id: LayerId) -> StoreResult<Vec<Annotation>> {
        let state = self.lock()?;
        Ok(state
            .annotations
            .values()
            .filter(|a| a.layer_id == layer_id)
            .cloned()
            .collect())
    }

    fn save_annotation(&self, mut annotation: Annotation) -> StoreResult<Annotation> {
        let mut state = self.lock()?;
        let slot = state.annotations.get_mut(&annotation.id).ok_or(StoreError::Missing {
            entity: "annotation",
            id: annotation.id,
        })?;
        annotation.updated_at = Utc::now();
        *slot = annotation.clone();
        self.commit(&state)?;
        Ok(annotation)
    }

    fn delete_annotation(&self, id: AnnotationId) -> StoreResult<bool> {
        let mut state = self.lock()?;
        if state.annotations.remove(&id).is_none() {
            return Ok(false);
        }
        self.commit(&state)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnotationCoordinates, AnnotationKind, LayerKind, Style};

    fn seeded() -> (MemoryStore, Project, Area, Area) {
        let store = MemoryStore::new();
        let project = store
            .create_project(NewProject {
                name: "City".into(),
                description: String::new(),
                center: LatLon(53.3, -6.2),
                zoom: 13,
            })
            .unwrap();
        let master = store
            .create_area(NewArea {
                project_id: project.id,
                parent_id: None,
                name: "Master".into(),
                kind: AreaKind::Master,
                default_view: None,
            })
            .unwrap();
        let suburb = store
            .create_area(NewArea {
                project_id: project.id,
                parent_id: Some(master.id),
                name: "North".into(),
                kind: AreaKind::Suburb,
                default_view: None,
            })
            .unwrap();
        (store, project, master, suburb)
    }

    fn own_layer(store: &MemoryStore, area: AreaId, name: &str, z: i32) -> Layer {
        let layer = NewLayer::own(area, name.into(), LayerKind::Annotation, true, z, Style::new());
        store.create_layer(layer).unwrap()
    }

    #[test]
    fn second_inherited_copy_conflicts() {
        let (store, _, master, suburb) = seeded();
        let origin = own_layer(&store, master.id, "roads", 0);

        store.create_layer(NewLayer::inherited_from(&origin, suburb.id)).unwrap();
        let err = store
            .create_layer(NewLayer::inherited_from(&origin, suburb.id))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn own_layers_exclude_inherited_copies() {
        let (store, _, master, suburb) = seeded();
        let origin = own_layer(&store, master.id, "roads", 0);
        store.create_layer(NewLayer::inherited_from(&origin, suburb.id)).unwrap();
        own_layer(&store, suburb.id, "parks", 3);

        let own = store.list_own_layers(suburb.id).unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].name, "parks");
        assert!(store.find_inherited_copy(suburb.id, origin.id).unwrap().is_some());
    }

    #[test]
    fn deleting_area_cascades_to_subtree() {
        let (store, project, master, suburb) = seeded();
        let street = store
            .create_area(NewArea {
                project_id: project.id,
                parent_id: Some(suburb.id),
                name: "Street".into(),
                kind: AreaKind::Individual,
                default_view: None,
            })
            .unwrap();
        let boundary = store
            .create_boundary(NewBoundary {
                area_id: suburb.id,
                coordinates: vec![LatLon(0.0, 0.0), LatLon(0.0, 1.0), LatLon(1.0, 1.0)],
            })
            .unwrap();
        let layer = own_layer(&store, street.id, "notes", 0);
        let note = store
            .create_annotation(NewAnnotation {
                layer_id: layer.id,
                kind: AnnotationKind::Marker,
                coordinates: AnnotationCoordinates::Point(LatLon(0.5, 0.5)),
                style: Style::new(),
                content: None,
            })
            .unwrap();

        assert!(store.delete_area(suburb.id).unwrap());

        assert!(store.get_area(suburb.id).unwrap().is_none());
        assert!(store.get_area(street.id).unwrap().is_none());
        assert!(store.get_boundary_by_id(boundary.id).unwrap().is_none());
        assert!(store.get_layer(layer.id).unwrap().is_none());
        assert!(store.get_annotation(note.id).unwrap().is_none());
        assert!(store.get_area(master.id).unwrap().is_some());
        assert!(!store.delete_area(suburb.id).unwrap());
    }

    #[test]
    fn deleting_project_removes_its_areas() {
        let (store, project, master, _) = seeded();
        assert!(store.delete_project(project.id).unwrap());
        assert!(store.get_area(master.id).unwrap().is_none());
        assert!(store.list_areas(project.id).unwrap().is_empty());
    }

    #[test]
    fn boundary_is_linked_to_area() {
        let (store, _, master, _) = seeded();
        let boundary = store
            .create_boundary(NewBoundary {
                area_id: master.id,
                coordinates: vec![LatLon(0.0, 0.0), LatLon(0.0, 1.0), LatLon(1.0, 1.0)],
            })
            .unwrap();
        assert_eq!(store.get_area(master.id).unwrap().unwrap().boundary_id, Some(boundary.id));

        assert!(store.delete_boundary(boundary.id).unwrap());
        assert_eq!(store.get_area(master.id).unwrap().unwrap().boundary_id, None);
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let (store, project, master, _) = seeded();
        own_layer(&store, master.id, "roads", 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("maps.json");
        store.save_snapshot(&path).unwrap();

        let reloaded = MemoryStore::open(&path).unwrap();
        assert_eq!(reloaded.list_areas(project.id).unwrap().len(), 2);
        assert_eq!(reloaded.list_own_layers(master.id).unwrap().len(), 1);

        // Counters survive, so new ids never collide with loaded ones.
        let next = own_layer(&reloaded, master.id, "rail", 2);
        assert_eq!(next.id, 2);
    }

    #[test]
    fn second_master_conflicts() {
        let (store, project, _, _) = seeded();
        let err = store
            .create_area(NewArea {
                project_id: project.id,
                parent_id: None,
                name: "Another".into(),
                kind: AreaKind::Master,
                default_view: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.list_areas(project.id).unwrap().len(), 2);
    }

    #[test]
    fn saving_a_cyclic_parent_conflicts() {
        let (store, _, master, suburb) = seeded();
        let mut looped = master.clone();
        looped.parent_id = Some(suburb.id);

        let err = store.save_area(looped).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.get_area(master.id).unwrap().unwrap().parent_id, None);
    }

    #[test]
    fn opened_store_persists_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps.json");

        let master_id = {
            let store = MemoryStore::open(&path).unwrap();
            let project = store
                .create_project(NewProject {
                    name: "City".into(),
                    description: String::new(),
                    center: LatLon(53.3, -6.2),
                    zoom: 13,
                })
                .unwrap();
            let master = store
                .create_area(NewArea {
                    project_id: project.id,
                    parent_id: None,
                    name: "Master".into(),
                    kind: AreaKind::Master,
                    default_view: None,
                })
                .unwrap();
            own_layer(&store, master.id, "roads", 0);
            // Dropped without calling save_snapshot.
            master.id
        };

        let reloaded = MemoryStore::open(&path).unwrap();
        assert_eq!(reloaded.get_area(master_id).unwrap().unwrap().name, "Master");
        assert_eq!(reloaded.list_own_layers(master_id).unwrap().len(), 1);
        assert!(!path.with_extension("json.tmp").exists());

        assert!(reloaded.delete_area(master_id).unwrap());
        let again = MemoryStore::open(&path).unwrap();
        assert!(again.get_area(master_id).unwrap().is_none());
    }
}
