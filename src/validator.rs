use crate::error::{CoreResult, Rejection};
use crate::geometry;
use crate::store::HierarchyStore;
use crate::types::{Area, LatLon};
use serde::Deserialize;

pub const MIN_BOUNDARY_POINTS: usize = 3;

/// How strictly a child boundary must sit inside its parent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainmentMode {
    /// Every vertex inside the parent ring. Edges bulging out between two contained vertices
    /// are not caught.
    #[default]
    Vertices,
    /// Whole polygon inside the parent polygon, edges included.
    Polygon,
}

pub struct BoundaryValidator<'a, S: ?Sized> {
    store: &'a S,
    mode: ContainmentMode,
}

impl<'a, S: HierarchyStore + ?Sized> BoundaryValidator<'a, S> {
    pub fn new(store: &'a S, mode: ContainmentMode) -> Self {
        Self { store, mode }
    }

    /// Accepts `candidate` as the boundary of `area` when it nests inside the parent's boundary.
    /// Areas without a parent, or whose parent has no boundary, always pass.
    pub fn validate(&self, candidate: &[LatLon], area: &Area) -> CoreResult<()> {
        let Some(parent) = self.store.get_parent(area)? else {
            return Ok(());
        };
        let Some(parent_boundary) = self.store.get_boundary(parent.id)? else {
            return Ok(());
        };

        let outer = &parent_boundary.coordinates;
        let contained = match self.mode {
            ContainmentMode::Vertices => geometry::vertices_within(candidate, outer),
            ContainmentMode::Polygon => geometry::polygon_within(candidate, outer),
        };

        if !contained {
            tracing::info!(
                area = area.id,
                parent = parent.id,
                mode = ?self.mode,
                "boundary outside parent"
            );
            return Err(Rejection::OutsideParent { kind: area.kind }.into());
        }

        Ok(())
    }
}

/// Rejects rings with fewer than three vertices.
pub fn check_point_count(coordinates: &[LatLon]) -> Result<(), Rejection> {
    if coordinates.len() < MIN_BOUNDARY_POINTS {
        return Err(Rejection::TooFewPoints {
            count: coordinates.len(),
        });
    }
    Ok(())
}
