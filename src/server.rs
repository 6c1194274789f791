use crate::config::AppConfig;
use crate::error::{CoreError, Rejection, StoreError};
use crate::export;
use crate::hierarchy::HierarchyView;
use crate::service::{
    AnnotationUpdate, AreaUpdate, LayerOrder, LayerRequest, LayerUpdate, MapService, ProjectUpdate,
};
use crate::store::MemoryStore;
use crate::types::{
    Annotation, AnnotationId, Area, AreaId, Boundary, BoundaryId, LatLon, Layer, LayerId,
    NewAnnotation, NewArea, NewBoundary, NewProject, Project, ProjectId,
};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub struct AppState {
    pub service: MapService<MemoryStore>,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

/// Maps core errors onto HTTP status codes.
#[derive(Debug)]
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::Rejected(Rejection::NotFound { .. }) => StatusCode::NOT_FOUND,
            CoreError::Rejected(Rejection::ReadOnlyLayer { .. }) => StatusCode::FORBIDDEN,
            CoreError::Rejected(_) => StatusCode::BAD_REQUEST,
            CoreError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            CoreError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize)]
pub struct AreaQuery {
    project_id: ProjectId,
    parent_id: Option<AreaId>,
}

#[derive(Deserialize)]
pub struct AnnotationQuery {
    layer_id: LayerId,
}

#[derive(Deserialize)]
pub struct BoundaryCoordinates {
    coordinates: Vec<LatLon>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    message: &'static str,
}

const DELETED: Json<Deleted> = Json(Deleted { message: "deleted" });

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/projects/:id/hierarchy", get(project_hierarchy))
        .route("/api/projects/:id/export", get(export_project))
        .route("/api/areas", get(list_areas).post(create_area))
        .route("/api/areas/:id", get(get_area).put(update_area).delete(delete_area))
        .route("/api/areas/:id/layers", get(layer_stack))
        .route("/api/areas/:id/boundary", get(area_boundary))
        .route("/api/boundaries", post(create_boundary))
        .route("/api/boundaries/:id", put(update_boundary).delete(delete_boundary))
        .route("/api/layers", post(create_layer))
        .route("/api/layers/reorder", post(reorder_layers))
        .route("/api/layers/:id", get(get_layer).put(update_layer).delete(delete_layer))
        .route("/api/annotations", get(list_annotations).post(create_annotation))
        .route(
            "/api/annotations/:id",
            get(get_annotation).put(update_annotation).delete(delete_annotation),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, service: MapService<MemoryStore>) -> Result<()> {
    let addr = config.socket_addr()?;
    let state = Arc::new(AppState {
        service,
        config: config.clone(),
    });

    let app = router(state);

    tracing::info!("Starting server on http://{}", addr);
    if let Some(path) = &config.storage.snapshot {
        tracing::info!("Writing every change to {:?}", path);
    }
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

// Projects

async fn list_projects(State(state): State<SharedState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.service.list_projects()?))
}

async fn create_project(
    State(state): State<SharedState>,
    Json(project): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    Ok((StatusCode::CREATED, Json(state.service.create_project(project)?)))
}

async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.service.get_project(id)?))
}

async fn update_project(
    State(state): State<SharedState>,
    Path(id): Path<ProjectId>,
    Json(update): Json<ProjectUpdate>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.service.update_project(id, update)?))
}

async fn delete_project(
    State(state): State<SharedState>,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Deleted>> {
    state.service.delete_project(id)?;
    Ok(DELETED)
}

async fn project_hierarchy(
    State(state): State<SharedState>,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<HierarchyView>> {
    Ok(Json(state.service.hierarchy(id)?))
}

async fn export_project(
    State(state): State<SharedState>,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<FeatureCollection>> {
    Ok(Json(export::project_boundaries(&state.service, id)?))
}

// Areas

async fn list_areas(
    State(state): State<SharedState>,
    Query(query): Query<AreaQuery>,
) -> ApiResult<Json<Vec<Area>>> {
    Ok(Json(state.service.list_areas(query.project_id, query.parent_id)?))
}

async fn create_area(
    State(state): State<SharedState>,
    Json(area): Json<NewArea>,
) -> ApiResult<(StatusCode, Json<Area>)> {
    Ok((StatusCode::CREATED, Json(state.service.create_area(area)?)))
}

async fn get_area(
    State(state): State<SharedState>,
    Path(id): Path<AreaId>,
) -> ApiResult<Json<Area>> {
    Ok(Json(state.service.get_area(id)?))
}

async fn update_area(
    State(state): State<SharedState>,
    Path(id): Path<AreaId>,
    Json(update): Json<AreaUpdate>,
) -> ApiResult<Json<Area>> {
    Ok(Json(state.service.update_area(id, update)?))
}

async fn delete_area(
    State(state): State<SharedState>,
    Path(id): Path<AreaId>,
) -> ApiResult<Json<Deleted>> {
    state.service.delete_area(id)?;
    Ok(DELETED)
}

async fn layer_stack(
    State(state): State<SharedState>,
    Path(id): Path<AreaId>,
) -> ApiResult<Json<Vec<Layer>>> {
    Ok(Json(state.service.layer_stack(id)?))
}

async fn area_boundary(
    State(state): State<SharedState>,
    Path(id): Path<AreaId>,
) -> ApiResult<Json<Boundary>> {
    Ok(Json(state.service.boundary_for_area(id)?))
}

// Boundaries

async fn create_boundary(
    State(state): State<SharedState>,
    Json(boundary): Json<NewBoundary>,
) -> ApiResult<(StatusCode, Json<Boundary>)> {
    Ok((StatusCode::CREATED, Json(state.service.create_boundary(boundary)?)))
}

async fn update_boundary(
    State(state): State<SharedState>,
    Path(id): Path<BoundaryId>,
    Json(body): Json<BoundaryCoordinates>,
) -> ApiResult<Json<Boundary>> {
    Ok(Json(state.service.update_boundary(id, body.coordinates)?))
}

async fn delete_boundary(
    State(state): State<SharedState>,
    Path(id): Path<BoundaryId>,
) -> ApiResult<Json<Deleted>> {
    state.service.delete_boundary(id)?;
    Ok(DELETED)
}

// Layers

async fn create_layer(
    State(state): State<SharedState>,
    Json(request): Json<LayerRequest>,
) -> ApiResult<(StatusCode, Json<Layer>)> {
    Ok((StatusCode::CREATED, Json(state.service.create_layer(request)?)))
}

async fn get_layer(
    State(state): State<SharedState>,
    Path(id): Path<LayerId>,
) -> ApiResult<Json<Layer>> {
    Ok(Json(state.service.get_layer(id)?))
}

async fn update_layer(
    State(state): State<SharedState>,
    Path(id): Path<LayerId>,
    Json(update): Json<LayerUpdate>,
) -> ApiResult<Json<Layer>> {
    Ok(Json(state.service.update_layer(id, update)?))
}

async fn delete_layer(
    State(state): State<SharedState>,
    Path(id): Path<LayerId>,
) -> ApiResult<Json<Deleted>> {
    state.service.delete_layer(id)?;
    Ok(DELETED)
}

async fn reorder_layers(
    State(state): State<SharedState>,
    Json(order): Json<Vec<LayerOrder>>,
) -> ApiResult<Json<Vec<Layer>>> {
    Ok(Json(state.service.reorder_layers(&order)?))
}

// Annotations

async fn list_annotations(
    State(state): State<SharedState>,
    Query(query): Query<AnnotationQuery>,
) -> ApiResult<Json<Vec<Annotation>>> {
    Ok(Json(state.service.list_annotations(query.layer_id)?))
}

async fn create_annotation(
    State(state): State<SharedState>,
    Json(annotation): Json<NewAnnotation>,
) -> ApiResult<(StatusCode, Json<Annotation>)> {
    Ok((StatusCode::CREATED, Json(state.service.create_annotation(annotation)?)))
}

async fn get_annotation(
    State(state): State<SharedState>,
    Path(id): Path<AnnotationId>,
) -> ApiResult<Json<Annotation>> {
    Ok(Json(state.service.get_annotation(id)?))
}

async fn update_annotation(
    State(state): State<SharedState>,
    Path(id): Path<AnnotationId>,
    Json(update): Json<AnnotationUpdate>,
) -> ApiResult<Json<Annotation>> {
    Ok(Json(state.service.update_annotation(id, update)?))
}

async fn delete_annotation(
    State(state): State<SharedState>,
    Path(id): Path<AnnotationId>,
) -> ApiResult<Json<Deleted>> {
    state.service.delete_annotation(id)?;
    Ok(DELETED)
}
