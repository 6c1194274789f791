use crate::error::{CoreError, CoreResult, Rejection};
use crate::store::{HierarchyStore, MapStore};
use crate::types::{Area, AreaId, AreaKind, NewArea};
use serde::Serialize;
use std::collections::HashSet;

/// A project's areas grouped by kind.
#[derive(Debug, Default, Clone, Serialize)]
pub struct HierarchyView {
    pub master: Option<Area>,
    pub suburbs: Vec<Area>,
    pub individuals: Vec<Area>,
}

impl HierarchyView {
    pub fn from_areas(areas: Vec<Area>) -> Self {
        let mut view = HierarchyView::default();
        for area in areas {
            match area.kind {
                AreaKind::Master => view.master = Some(area),
                AreaKind::Suburb => view.suburbs.push(area),
                AreaKind::Individual => view.individuals.push(area),
            }
        }
        view
    }
}

/// Ancestors of `area`, nearest first. Errors if the parent chain loops back on itself.
pub fn ancestors<S: HierarchyStore + ?Sized>(store: &S, area: &Area) -> CoreResult<Vec<Area>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::from([area.id]);
    let mut current = store.get_parent(area)?;

    while let Some(parent) = current {
        if !seen.insert(parent.id) {
            return Err(Rejection::CyclicParent {
                area: area.id,
                parent: parent.id,
            }
            .into());
        }
        current = store.get_parent(&parent)?;
        chain.push(parent);
    }

    Ok(chain)
}

/// Checks the kind/parent invariants for an area about to be created.
pub fn check_new_area<S: MapStore + ?Sized>(store: &S, area: &NewArea) -> CoreResult<()> {
    if store.get_project(area.project_id)?.is_none() {
        return Err(CoreError::not_found("project", area.project_id));
    }

    match (area.kind, area.parent_id) {
        (AreaKind::Master, Some(_)) => Err(Rejection::MasterWithParent.into()),
        (AreaKind::Master, None) => {
            let areas = store.list_areas(area.project_id)?;
            if areas.iter().any(|a| a.kind == AreaKind::Master) {
                return Err(Rejection::DuplicateMaster {
                    project: area.project_id,
                }
                .into());
            }
            Ok(())
        }
        (kind, None) => Err(Rejection::MissingParent { kind }.into()),
        (_, Some(parent_id)) => {
            let parent = store
                .get_area(parent_id)?
                .ok_or_else(|| CoreError::not_found("area", parent_id))?;
            if parent.project_id != area.project_id {
                return Err(Rejection::ParentInOtherProject { parent: parent_id }.into());
            }
            Ok(())
        }
    }
}

/// Checks that moving `area` under `new_parent` keeps the tree rooted and acyclic.
pub fn check_reparent<S: MapStore + ?Sized>(
    store: &S,
    area: &Area,
    new_parent: AreaId,
) -> CoreResult<()> {
    if area.kind == AreaKind::Master {
        return Err(Rejection::MasterWithParent.into());
    }

    let parent = store
        .get_area(new_parent)?
        .ok_or_else(|| CoreError::not_found("area", new_parent))?;
    if parent.project_id != area.project_id {
        return Err(Rejection::ParentInOtherProject { parent: new_parent }.into());
    }

    let cycle = Rejection::CyclicParent {
        area: area.id,
        parent: new_parent,
    };
    if parent.id == area.id {
        return Err(cycle.into());
    }
    if ancestors(store, &parent)?.iter().any(|a| a.id == area.id) {
        return Err(cycle.into());
    }

    Ok(())
}
