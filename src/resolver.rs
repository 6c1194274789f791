//! Layer inheritance.
//!
//! An area sees its own layers plus a read-only copy of every layer visible on its parent.
//! Copies are materialised the first time an area's stack is resolved and reused from then on.
//! They are snapshots: later edits to the ancestor layer do not flow into an existing copy.

use crate::error::{CoreError, CoreResult, Rejection, StoreError};
use crate::store::HierarchyStore;
use crate::types::{Area, AreaId, Layer, NewLayer};
use std::collections::HashSet;

pub struct LayerResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: HierarchyStore + ?Sized> LayerResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Full z-ordered stack for `area_id`: own layers and inherited copies, sorted by
    /// z-index with creation order breaking ties. Any store failure aborts the whole
    /// resolution.
    pub fn resolve(&self, area_id: AreaId) -> CoreResult<Vec<Layer>> {
        let area = self
            .store
            .get_area(area_id)?
            .ok_or_else(|| CoreError::not_found("area", area_id))?;
        self.resolve_area(&area, &mut HashSet::new())
    }

    fn resolve_area(&self, area: &Area, visiting: &mut HashSet<AreaId>) -> CoreResult<Vec<Layer>> {
        if !visiting.insert(area.id) {
            return Err(Rejection::CyclicParent {
                area: area.id,
                parent: area.parent_id.unwrap_or(area.id),
            }
            .into());
        }

        let mut stack = self.store.list_own_layers(area.id)?;

        if let Some(parent) = self.store.get_parent(area)? {
            let parent_stack = self.resolve_area(&parent, visiting)?;
            for ancestor_layer in &parent_stack {
                stack.push(self.inherited_copy(area.id, ancestor_layer)?);
            }
        } else if let Some(parent_id) = area.parent_id {
            return Err(CoreError::not_found("area", parent_id));
        }

        sort_stack(&mut stack);
        Ok(stack)
    }

    fn inherited_copy(&self, area_id: AreaId, ancestor_layer: &Layer) -> CoreResult<Layer> {
        if let Some(existing) = self.store.find_inherited_copy(area_id, ancestor_layer.id)? {
            return Ok(existing);
        }

        match self.store.create_layer(NewLayer::inherited_from(ancestor_layer, area_id)) {
            Ok(created) => {
                tracing::debug!(
                    area = area_id,
                    origin = ancestor_layer.id,
                    layer = created.id,
                    "materialised inherited layer"
                );
                Ok(created)
            }
            // Someone else materialised the same copy between our lookup and insert.
            Err(StoreError::Conflict(reason)) => {
                tracing::debug!(
                    area = area_id,
                    origin = ancestor_layer.id,
                    %reason,
                    "inherited layer raced, re-reading"
                );
                self.store
                    .find_inherited_copy(area_id, ancestor_layer.id)?
                    .ok_or_else(|| StoreError::Conflict(reason).into())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Orders by z-index, then creation time, then id.
pub fn sort_stack(layers: &mut [Layer]) {
    layers.sort_by(|a, b| (a.z_index, a.created_at, a.id).cmp(&(b.z_index, b.created_at, b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MapStore, MemoryStore, StoreResult};
    use crate::types::{
        AreaKind, Boundary, LatLon, LayerId, LayerKind, LayerOrigin, NewArea, NewProject, Style,
    };
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Tree {
        store: MemoryStore,
        master: Area,
        suburb: Area,
        street: Area,
    }

    fn tree() -> Tree {
        let store = MemoryStore::new();
        let project = store
            .create_project(NewProject {
                name: "p".into(),
                description: String::new(),
                center: LatLon(0.0, 0.0),
                zoom: 13,
            })
            .unwrap();
        let area = |parent_id: Option<AreaId>, kind: AreaKind| {
            store
                .create_area(NewArea {
                    project_id: project.id,
                    parent_id,
                    name: format!("{kind}"),
                    kind,
                    default_view: None,
                })
                .unwrap()
        };
        let master = area(None, AreaKind::Master);
        let suburb = area(Some(master.id), AreaKind::Suburb);
        let street = area(Some(suburb.id), AreaKind::Individual);
        Tree {
            store,
            master,
            suburb,
            street,
        }
    }

    fn add_layer(store: &MemoryStore, area: AreaId, name: &str, z: i32) -> Layer {
        let layer = NewLayer::own(area, name.into(), LayerKind::Custom, true, z, Style::new());
        store.create_layer(layer).unwrap()
    }

    fn names(layers: &[Layer]) -> Vec<&str> {
        layers.iter().map(|l| l.name.as_str()).collect()
    }

    #[test]
    fn master_stack_is_sorted_by_z() {
        let t = tree();
        add_layer(&t.store, t.master.id, "top", 1);
        add_layer(&t.store, t.master.id, "bottom", 0);

        let stack = LayerResolver::new(&t.store).resolve(t.master.id).unwrap();
        assert_eq!(names(&stack), vec!["bottom", "top"]);
    }

    #[test]
    fn equal_z_keeps_creation_order() {
        let t = tree();
        add_layer(&t.store, t.master.id, "first", 0);
        add_layer(&t.store, t.master.id, "second", 0);

        let stack = LayerResolver::new(&t.store).resolve(t.master.id).unwrap();
        assert_eq!(names(&stack), vec!["first", "second"]);
    }

    #[test]
    fn child_gets_one_read_only_copy_per_ancestor_layer() {
        let t = tree();
        let roads = add_layer(&t.store, t.master.id, "roads", 0);
        add_layer(&t.store, t.suburb.id, "parks", 1);

        let stack = LayerResolver::new(&t.store).resolve(t.suburb.id).unwrap();
        assert_eq!(names(&stack), vec!["roads", "parks"]);

        let copy = &stack[0];
        assert_eq!(copy.area_id, t.suburb.id);
        assert_eq!(copy.origin, LayerOrigin::Inherited { origin: roads.id });
        assert!(!copy.editable);
        assert!(stack[1].editable);
    }

    #[test]
    fn resolving_twice_does_not_duplicate_copies() {
        let t = tree();
        let roads = add_layer(&t.store, t.master.id, "roads", 0);
        let rail = add_layer(&t.store, t.master.id, "rail", 2);
        let resolver = LayerResolver::new(&t.store);

        let first = resolver.resolve(t.suburb.id).unwrap();
        let second = resolver.resolve(t.suburb.id).unwrap();

        assert_eq!(first, second);
        let copy_of = |origin: LayerId| {
            t.store.find_inherited_copy(t.suburb.id, origin).unwrap().unwrap().id
        };
        assert_eq!(first[0].id, copy_of(roads.id));
        assert_eq!(first[1].id, copy_of(rail.id));
        // Two originals plus two copies, nothing more.
        assert_eq!(t.store.get_layer(rail.id + 3).unwrap(), None);
    }

    #[test]
    fn grandchild_inherits_through_suburb() {
        let t = tree();
        let roads = add_layer(&t.store, t.master.id, "roads", 0);
        add_layer(&t.store, t.suburb.id, "parks", 1);
        add_layer(&t.store, t.street.id, "notes", 2);

        let stack = LayerResolver::new(&t.store).resolve(t.street.id).unwrap();
        assert_eq!(names(&stack), vec!["roads", "parks", "notes"]);

        // The street's copy of roads points at the suburb's copy, not at the master layer.
        let suburb_roads = t.store.find_inherited_copy(t.suburb.id, roads.id).unwrap().unwrap();
        assert_eq!(stack[0].origin, LayerOrigin::Inherited { origin: suburb_roads.id });
        assert!(stack.iter().filter(|l| l.is_inherited()).all(|l| !l.editable));
    }

    #[test]
    fn copies_are_snapshots_of_the_ancestor_layer() {
        let t = tree();
        let mut roads = add_layer(&t.store, t.master.id, "roads", 0);
        let resolver = LayerResolver::new(&t.store);
        resolver.resolve(t.suburb.id).unwrap();

        roads.name = "highways".into();
        roads.visible = false;
        t.store.save_layer(roads).unwrap();

        let stack = resolver.resolve(t.suburb.id).unwrap();
        assert_eq!(stack[0].name, "roads");
        assert!(stack[0].visible);
    }

    #[test]
    fn deep_chains_resolve() {
        let t = tree();
        add_layer(&t.store, t.master.id, "base", 0);
        let mut parent = t.street.clone();
        for depth in 0..6 {
            parent = t
                .store
                .create_area(NewArea {
                    project_id: t.master.project_id,
                    parent_id: Some(parent.id),
                    name: format!("level {depth}"),
                    kind: AreaKind::Individual,
                    default_view: None,
                })
                .unwrap();
        }

        let stack = LayerResolver::new(&t.store).resolve(parent.id).unwrap();
        assert_eq!(names(&stack), vec!["base"]);
    }

    /// Delegates to a memory store but fails listing layers for one area, and can fake a
    /// lost insert race.
    struct FlakyStore {
        inner: MemoryStore,
        broken_area: Option<AreaId>,
        race_next_insert: AtomicBool,
    }

    impl HierarchyStore for FlakyStore {
        fn get_area(&self, id: AreaId) -> StoreResult<Option<Area>> {
            self.inner.get_area(id)
        }

        fn get_boundary(&self, area_id: AreaId) -> StoreResult<Option<Boundary>> {
            self.inner.get_boundary(area_id)
        }

        fn list_own_layers(&self, area_id: AreaId) -> StoreResult<Vec<Layer>> {
            if Some(area_id) == self.broken_area {
                return Err(StoreError::Other(anyhow::anyhow!("disk on fire")));
            }
            self.inner.list_own_layers(area_id)
        }

        fn find_inherited_copy(
            &self,
            area_id: AreaId,
            origin: LayerId,
        ) -> StoreResult<Option<Layer>> {
            self.inner.find_inherited_copy(area_id, origin)
        }

        fn create_layer(&self, layer: NewLayer) -> StoreResult<Layer> {
            if self.race_next_insert.swap(false, Ordering::SeqCst) {
                // Another caller wins the insert; ours hits the uniqueness constraint.
                self.inner.create_layer(layer.clone())?;
                return Err(StoreError::Conflict("duplicate inherited layer".into()));
            }
            self.inner.create_layer(layer)
        }
    }

    #[test]
    fn ancestor_failure_aborts_resolution() {
        let t = tree();
        add_layer(&t.store, t.master.id, "roads", 0);
        let flaky = FlakyStore {
            broken_area: Some(t.master.id),
            inner: t.store,
            race_next_insert: AtomicBool::new(false),
        };

        let err = LayerResolver::new(&flaky).resolve(t.street.id).unwrap_err();
        assert!(matches!(err, CoreError::Store(StoreError::Other(_))));
        // Nothing was materialised on the way down.
        assert!(flaky.inner.find_inherited_copy(t.suburb.id, 1).unwrap().is_none());
    }

    #[test]
    fn lost_insert_race_reuses_winner() {
        let t = tree();
        add_layer(&t.store, t.master.id, "roads", 0);
        let flaky = FlakyStore {
            broken_area: None,
            inner: t.store,
            race_next_insert: AtomicBool::new(true),
        };

        let stack = LayerResolver::new(&flaky).resolve(t.suburb.id).unwrap();
        assert_eq!(names(&stack), vec!["roads"]);
        let again = LayerResolver::new(&flaky).resolve(t.suburb.id).unwrap();
        assert_eq!(stack, again);
    }

    #[test]
    fn unknown_area_is_not_found() {
        let t = tree();
        let err = LayerResolver::new(&t.store).resolve(999).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Rejected(Rejection::NotFound { entity: "area", id: 999 })
        ));
    }
}
