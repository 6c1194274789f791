use crate::error::{CoreError, CoreResult, Mutation, Rejection};
use crate::guard::guard_mutation;
use crate::hierarchy::{self, HierarchyView};
use crate::resolver::LayerResolver;
use crate::store::MapStore;
use crate::style::{sanitize_layer_config, sanitize_style};
use crate::types::{
    Annotation, AnnotationCoordinates, AnnotationId, AnnotationKind, Area, AreaId, Boundary,
    BoundaryId, DefaultView, LatLon, Layer, LayerId, LayerKind, NewAnnotation, NewArea, NewBoundary,
    NewLayer, NewProject, Project, ProjectId, Style,
};
use crate::validator::{check_point_count, BoundaryValidator, ContainmentMode};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub center: Option<LatLon>,
    pub zoom: Option<u8>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AreaUpdate {
    pub name: Option<String>,
    pub parent_id: Option<AreaId>,
    pub default_view: Option<DefaultView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerRequest {
    pub area_id: AreaId,
    pub name: String,
    pub kind: LayerKind,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub config: Style,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerUpdate {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub z_index: Option<i32>,
    pub config: Option<Style>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LayerOrder {
    pub id: LayerId,
    pub z_index: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationUpdate {
    pub coordinates: Option<AnnotationCoordinates>,
    pub style: Option<Style>,
    pub content: Option<String>,
}

/// Entry point for every operation the HTTP layer exposes.
pub struct MapService<S> {
    store: S,
    containment: ContainmentMode,
}

impl<S: MapStore> MapService<S> {
    pub fn new(store: S, containment: ContainmentMode) -> Self {
        Self { store, containment }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // Projects

    pub fn create_project(&self, project: NewProject) -> CoreResult<Project> {
        check_name(&project.name)?;
        let created = self.store.create_project(project)?;
        tracing::info!(project = created.id, "created project");
        Ok(created)
    }

    pub fn get_project(&self, id: ProjectId) -> CoreResult<Project> {
        self.store
            .get_project(id)?
            .ok_or_else(|| CoreError::not_found("project", id))
    }

    pub fn list_projects(&self) -> CoreResult<Vec<Project>> {
        Ok(self.store.list_projects()?)
    }

    pub fn update_project(&self, id: ProjectId, update: ProjectUpdate) -> CoreResult<Project> {
        let mut project = self.get_project(id)?;
        if let Some(name) = update.name {
            check_name(&name)?;
            project.name = name;
        }
        if let Some(description) = update.description {
            project.description = description;
        }
        if let Some(center) = update.center {
            project.center = center;
        }
        if let Some(zoom) = update.zoom {
            project.zoom = zoom;
        }
        Ok(self.store.save_project(project)?)
    }

    pub fn delete_project(&self, id: ProjectId) -> CoreResult<()> {
        if !self.store.delete_project(id)? {
            return Err(CoreError::not_found("project", id));
        }
        tracing::info!(project = id, "deleted project");
        Ok(())
    }

    // Areas

    pub fn create_area(&self, area: NewArea) -> CoreResult<Area> {
        check_name(&area.name)?;
        hierarchy::check_new_area(&self.store, &area)?;
        let created = self.store.create_area(area)?;
        tracing::info!(
            area = created.id,
            kind = %created.kind,
            parent = ?created.parent_id,
            "created area"
        );
        Ok(created)
    }

    pub fn get_area(&self, id: AreaId) -> CoreResult<Area> {
        self.store.get_area(id)?.ok_or_else(|| CoreError::not_found("area", id))
    }

    /// Areas of a project in creation order, optionally only the direct children of `parent_id`.
    pub fn list_areas(
        &self,
        project_id: ProjectId,
        parent_id: Option<AreaId>,
    ) -> CoreResult<Vec<Area>> {
        self.get_project(project_id)?;
        let mut areas = self.store.list_areas(project_id)?;
        if let Some(parent_id) = parent_id {
            areas.retain(|a| a.parent_id == Some(parent_id));
        }
        areas.sort_by_key(|a| (a.created_at, a.id));
        Ok(areas)
    }

    pub fn hierarchy(&self, project_id: ProjectId) -> CoreResult<HierarchyView> {
        Ok(HierarchyView::from_areas(self.list_areas(project_id, None)?))
    }

    pub fn update_area(&self, id: AreaId, update: AreaUpdate) -> CoreResult<Area> {
        let mut area = self.get_area(id)?;
        if let Some(name) = update.name {
            check_name(&name)?;
            area.name = name;
        }
        if let Some(parent_id) = update.parent_id {
            if area.parent_id != Some(parent_id) {
                hierarchy::check_reparent(&self.store, &area, parent_id)?;
                area.parent_id = Some(parent_id);
            }
        }
        if let Some(view) = update.default_view {
            area.default_view = Some(view);
        }
        Ok(self.store.save_area(area)?)
    }

    pub fn delete_area(&self, id: AreaId) -> CoreResult<()> {
        if !self.store.delete_area(id)? {
            return Err(CoreError::not_found("area", id));
        }
        tracing::info!(area = id, "deleted area and its subtree");
        Ok(())
    }

    // Boundaries

    /// Creates the boundary of an area after checking it nests inside the parent's boundary.
    pub fn create_boundary(&self, boundary: NewBoundary) -> CoreResult<Boundary> {
        let area = self.get_area(boundary.area_id)?;
        check_point_count(&boundary.coordinates)?;
        if self.store.get_boundary(area.id)?.is_some() {
            return Err(Rejection::BoundaryExists { area: area.id }.into());
        }

        BoundaryValidator::new(&self.store, self.containment)
            .validate(&boundary.coordinates, &area)?;

        let created = self.store.create_boundary(boundary)?;
        tracing::info!(
            boundary = created.id,
            area = area.id,
            points = created.coordinates.len(),
            "created boundary"
        );
        Ok(created)
    }

    pub fn boundary_for_area(&self, area_id: AreaId) -> CoreResult<Boundary> {
        self.get_area(area_id)?;
        self.store
            .get_boundary(area_id)?
            .ok_or_else(|| CoreError::not_found("boundary", area_id))
    }

    /// Replaces all coordinates. Nesting is only checked when a boundary is first created.
    pub fn update_boundary(
        &self,
        id: BoundaryId,
        coordinates: Vec<LatLon>,
    ) -> CoreResult<Boundary> {
        check_point_count(&coordinates)?;
        if self.store.get_boundary_by_id(id)?.is_none() {
            return Err(CoreError::not_found("boundary", id));
        }
        Ok(self.store.replace_boundary(id, coordinates)?)
    }

    pub fn delete_boundary(&self, id: BoundaryId) -> CoreResult<()> {
        if !self.store.delete_boundary(id)? {
            return Err(CoreError::not_found("boundary", id));
        }
        Ok(())
    }

    // Layers

    pub fn create_layer(&self, request: LayerRequest) -> CoreResult<Layer> {
        self.get_area(request.area_id)?;
        check_name(&request.name)?;
        let config = sanitize_layer_config(&request.config)?;
        let layer = NewLayer::own(
            request.area_id,
            request.name,
            request.kind,
            request.visible,
            request.z_index,
            config,
        );
        Ok(self.store.create_layer(layer)?)
    }

    pub fn get_layer(&self, id: LayerId) -> CoreResult<Layer> {
        self.store.get_layer(id)?.ok_or_else(|| CoreError::not_found("layer", id))
    }

    /// Everything drawn for `area_id`, bottom to top.
    pub fn layer_stack(&self, area_id: AreaId) -> CoreResult<Vec<Layer>> {
        LayerResolver::new(&self.store).resolve(area_id)
    }

    pub fn update_layer(&self, id: LayerId, update: LayerUpdate) -> CoreResult<Layer> {
        let mut layer = self.get_layer(id)?;
        guard_mutation(&layer, Mutation::UpdateLayer)?;

        if let Some(name) = update.name {
            check_name(&name)?;
            layer.name = name;
        }
        if let Some(visible) = update.visible {
            layer.visible = visible;
        }
        if let Some(z_index) = update.z_index {
            layer.z_index = z_index;
        }
        if let Some(config) = update.config {
            layer.config = sanitize_layer_config(&config)?;
        }
        Ok(self.store.save_layer(layer)?)
    }

    pub fn delete_layer(&self, id: LayerId) -> CoreResult<()> {
        let layer = self.get_layer(id)?;
        guard_mutation(&layer, Mutation::DeleteLayer)?;
        self.store.delete_layer(id)?;
        Ok(())
    }

    /// Applies a batch of z-index changes. Every layer is checked before any is written.
    pub fn reorder_layers(&self, order: &[LayerOrder]) -> CoreResult<Vec<Layer>> {
        let mut layers = Vec::with_capacity(order.len());
        for entry in order {
            let layer = self.get_layer(entry.id)?;
            guard_mutation(&layer, Mutation::UpdateLayer)?;
            layers.push((layer, entry.z_index));
        }

        layers
            .into_iter()
            .map(|(mut layer, z_index)| {
                layer.z_index = z_index;
                Ok(self.store.save_layer(layer)?)
            })
            .collect()
    }

    // Annotations

    pub fn create_annotation(&self, annotation: NewAnnotation) -> CoreResult<Annotation> {
        let layer = self.get_layer(annotation.layer_id)?;
        guard_mutation(&layer, Mutation::CreateAnnotation)?;
        check_coordinates(annotation.kind, &annotation.coordinates)?;

        let style = sanitize_style(&annotation.style)?;
        Ok(self.store.create_annotation(NewAnnotation { style, ..annotation })?)
    }

    pub fn get_annotation(&self, id: AnnotationId) -> CoreResult<Annotation> {
        self.store
            .get_annotation(id)?
            .ok_or_else(|| CoreError::not_found("annotation", id))
    }

    pub fn list_annotations(&self, layer_id: LayerId) -> CoreResult<Vec<Annotation>> {
        self.get_layer(layer_id)?;
        let mut annotations = self.store.list_annotations(layer_id)?;
        annotations.sort_by_key(|a| (a.created_at, a.id));
        Ok(annotations)
    }

    pub fn update_annotation(
        &self,
        id: AnnotationId,
        update: AnnotationUpdate,
    ) -> CoreResult<Annotation> {
        let mut annotation = self.get_annotation(id)?;
        let layer = self.get_layer(annotation.layer_id)?;
        guard_mutation(&layer, Mutation::UpdateAnnotation)?;

        if let Some(coordinates) = update.coordinates {
            check_coordinates(annotation.kind, &coordinates)?;
            annotation.coordinates = coordinates;
        }
        if let Some(style) = update.style {
            annotation.style = sanitize_style(&style)?;
        }
        if let Some(content) = update.content {
            annotation.content = Some(content);
        }
        Ok(self.store.save_annotation(annotation)?)
    }

    pub fn delete_annotation(&self, id: AnnotationId) -> CoreResult<()> {
        let annotation = self.get_annotation(id)?;
        let layer = self.get_layer(annotation.layer_id)?;
        guard_mutation(&layer, Mutation::DeleteAnnotation)?;
        self.store.delete_annotation(id)?;
        Ok(())
    }
}

fn check_name(name: &str) -> Result<(), Rejection> {
    if name.trim().is_empty() {
        return Err(Rejection::EmptyName);
    }
    Ok(())
}

fn check_coordinates(
    kind: AnnotationKind,
    coordinates: &AnnotationCoordinates,
) -> Result<(), Rejection> {
    let fits = match (kind, coordinates) {
        (AnnotationKind::Marker | AnnotationKind::Text, AnnotationCoordinates::Point(_)) => true,
        (AnnotationKind::Line, AnnotationCoordinates::Path(path)) => path.len() >= 2,
        (AnnotationKind::Polygon, AnnotationCoordinates::Path(path)) => path.len() >= 3,
        _ => false,
    };
    if !fits {
        return Err(Rejection::CoordinatesMismatch { kind });
    }
    Ok(())
}
