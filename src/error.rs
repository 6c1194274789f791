use crate::types::{AnnotationKind, AreaId, AreaKind, LayerId, ProjectId};
use thiserror::Error;

/// A request the core refuses. Reported to the caller as-is, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Boundary must have at least 3 coordinate pairs, got {count}")]
    TooFewPoints { count: usize },

    #[error(
        "{} boundary must be completely within the {} boundary",
        .kind.label(),
        .kind.container_label()
    )]
    OutsideParent { kind: AreaKind },

    #[error("Area {area} already has a boundary")]
    BoundaryExists { area: AreaId },

    #[error("Cannot {action} on layer {layer}: inherited layers are read-only")]
    ReadOnlyLayer { layer: LayerId, action: Mutation },

    #[error("A master area cannot have a parent")]
    MasterWithParent,

    #[error("A {kind} area must have a parent area")]
    MissingParent { kind: AreaKind },

    #[error("Project {project} already has a master area")]
    DuplicateMaster { project: ProjectId },

    #[error("Parent area {parent} belongs to a different project")]
    ParentInOtherProject { parent: AreaId },

    #[error("Setting parent of area {area} to {parent} would create a cycle")]
    CyclicParent { area: AreaId, parent: AreaId },

    #[error("Invalid style value for '{key}': {reason}")]
    InvalidStyle { key: String, reason: &'static str },

    #[error("Coordinates do not match annotation type {kind}")]
    CoordinatesMismatch { kind: AnnotationKind },

    #[error("Name must not be empty")]
    EmptyName,
}

/// The mutation a guard check was performed for; only used to word rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    UpdateLayer,
    DeleteLayer,
    CreateAnnotation,
    UpdateAnnotation,
    DeleteAnnotation,
}

impl std::fmt::Display for Mutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            Mutation::UpdateLayer => "update layer",
            Mutation::DeleteLayer => "delete layer",
            Mutation::CreateAnnotation => "create annotation",
            Mutation::UpdateAnnotation => "update annotation",
            Mutation::DeleteAnnotation => "delete annotation",
        };
        f.write_str(verb)
    }
}

/// Failures raised by the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: i64 },

    #[error("store lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        CoreError::Rejected(Rejection::NotFound { entity, id })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
