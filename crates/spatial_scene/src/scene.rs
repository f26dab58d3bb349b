//! Scene: owner of entities and of the graph that indexes them
//!
//! The graph only stores snapshots keyed by [`EntityId`]; the scene keeps
//! the entities themselves and decides what to do when a graph refuses
//! or evicts one. Such entities are parked, not dropped: they still answer
//! queries (by brute force) and are retried whenever they move.

use std::collections::HashMap;

use log::{debug, warn};

use crate::bounds::Shape;
use crate::entity::{Component, Entity, EntityId};
use crate::foundation::math::{Mat4, Vec3};
use crate::graph::{Placement, SpatialGraph};

/// Entities plus the spatial graph indexing them
#[derive(Debug)]
pub struct Scene {
    next_entity_id: u32,
    entities: HashMap<EntityId, Entity>,
    graph: Box<dyn SpatialGraph>,
    unplaced: Vec<EntityId>,
}

impl Scene {
    /// Create an empty scene around `graph`
    pub fn new(graph: Box<dyn SpatialGraph>) -> Self {
        Self {
            next_entity_id: 0,
            entities: HashMap::new(),
            graph,
            unplaced: Vec::new(),
        }
    }

    fn allocate(&mut self, transform: Mat4, components: Vec<Component>) -> Entity {
        let id = EntityId::new(self.next_entity_id);
        self.next_entity_id += 1;
        let mut entity = Entity::new(id).with_transform(transform);
        entity.components = components;
        entity
    }

    /// Create an entity and index it from the root
    pub fn spawn(&mut self, transform: Mat4, components: Vec<Component>) -> EntityId {
        let entity = self.allocate(transform, components);
        let id = entity.id();
        let placed = self.graph.insert(&entity);
        self.entities.insert(id, entity);
        if !placed {
            self.park(id);
        }
        self.reclaim_evicted();
        id
    }

    /// Create an entity nested under `parent`'s graph node
    ///
    /// In a flat graph this makes `transform` relative to the parent. Other
    /// graphs place it in the parent's subtree if it fits, else from the
    /// root. Returns `None` if `parent` is not indexed by the graph.
    pub fn spawn_child(&mut self, parent: EntityId, transform: Mat4, components: Vec<Component>) -> Option<EntityId> {
        let node = self.graph.node_of(parent)?;
        let entity = self.allocate(transform, components);
        let id = entity.id();
        let placed = self.graph.insert_into(node, &entity) || self.graph.insert(&entity);
        self.entities.insert(id, entity);
        if !placed {
            self.park(id);
        }
        self.reclaim_evicted();
        Some(id)
    }

    /// Remove an entity from the scene and the graph
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.reclaim_evicted();
        let entity = self.entities.remove(&id)?;
        if !self.graph.remove(id) {
            self.unplaced.retain(|parked| *parked != id);
        }
        self.reclaim_evicted();
        Some(entity)
    }

    /// Move an entity and re-index it
    ///
    /// Returns whether the graph accepted the entity at its new transform.
    pub fn set_transform(&mut self, id: EntityId, transform: Mat4) -> bool {
        self.reclaim_evicted();
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        entity.transform = transform;

        let was_parked = self.unplaced.contains(&id);
        let placed = if was_parked {
            self.graph.insert(entity)
        } else {
            self.graph.update(entity)
        };

        match (was_parked, placed) {
            (true, true) => {
                self.unplaced.retain(|parked| *parked != id);
                debug!("Scene: {:?} re-entered the graph", id);
            }
            (false, false) => self.park(id),
            _ => {}
        }
        self.reclaim_evicted();
        placed
    }

    /// Move an entity to `position`, keeping rotation and scale
    pub fn set_position(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some(mut transform) = self.entities.get(&id).map(|entity| entity.transform) else {
            return false;
        };
        transform.m14 = position.x;
        transform.m24 = position.y;
        transform.m34 = position.z;
        self.set_transform(id, transform)
    }

    /// Try to index every parked entity again, returning how many made it
    pub fn retry_unplaced(&mut self) -> usize {
        self.reclaim_evicted();
        let parked = std::mem::take(&mut self.unplaced);
        let mut placed = 0;
        for id in parked {
            match self.entities.get(&id) {
                Some(entity) if self.graph.insert(entity) => placed += 1,
                Some(_) => self.unplaced.push(id),
                None => {}
            }
        }
        self.reclaim_evicted();
        placed
    }

    /// Park every entity the graph evicted on its own
    ///
    /// Runs after every scene operation. Call it directly after changing
    /// the graph through [`Self::graph_mut`]. Returns how many were parked.
    pub fn reclaim_evicted(&mut self) -> usize {
        let mut parked = 0;
        for id in self.graph.take_evicted() {
            if self.entities.contains_key(&id) && !self.unplaced.contains(&id) {
                self.park(id);
                parked += 1;
            }
        }
        parked
    }

    fn park(&mut self, id: EntityId) {
        warn!("Scene: graph rejected {:?}, keeping it outside the graph", id);
        self.unplaced.push(id);
    }

    /// Entities intersecting `shape` centred at `position`
    pub fn entities_within_bounds(&self, shape: &Shape, position: Vec3) -> Vec<&Entity> {
        let indexed = self.graph.entities_within_bounds(shape, position);
        let parked = self.unplaced.iter().copied().filter(|id| {
            self.entities.get(id).is_some_and(|entity| {
                let placement = Placement::of(entity);
                placement.overlaps(placement.transform(), shape, position, Shape::intersects)
            })
        });

        indexed
            .into_iter()
            .chain(parked)
            .filter_map(|id| self.entities.get(&id))
            .collect()
    }

    /// World transform of an entity as the graph sees it
    ///
    /// Parked entities report their own transform.
    pub fn world_transform(&self, id: EntityId) -> Option<Mat4> {
        self.graph
            .world_transform(id)
            .or_else(|| self.entities.get(&id).map(|entity| entity.transform))
    }

    /// Look up an entity
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Number of entities owned by the scene
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the scene owns no entity
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities the graph refused
    pub fn unplaced(&self) -> &[EntityId] {
        &self.unplaced
    }

    /// The graph indexing this scene
    pub fn graph(&self) -> &dyn SpatialGraph {
        self.graph.as_ref()
    }

    /// Mutable access to the graph, e.g. to move or link nodes
    pub fn graph_mut(&mut self) -> &mut dyn SpatialGraph {
        self.graph.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Plane;
    use crate::config::{CollapsePolicy, GraphConfig, GraphKind, PartitionConfig};
    use crate::foundation::math::{translation, translation_of};
    use crate::graph::{FlatGraph, GraphFactory, Octree, Quadtree};
    use approx::assert_relative_eq;

    fn bounded(radius: f32) -> Vec<Component> {
        vec![Component::bounded(Shape::Sphere(radius))]
    }

    fn ids(entities: Vec<&Entity>) -> Vec<EntityId> {
        let mut ids: Vec<_> = entities.into_iter().map(Entity::id).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_spawn_and_query() {
        let mut scene = Scene::new(Box::new(Octree::new(50.0, PartitionConfig::default())));
        let near = scene.spawn(translation(Vec3::new(1.0, 0.0, 0.0)), bounded(0.5));
        let far = scene.spawn(translation(Vec3::new(40.0, 0.0, 0.0)), bounded(0.5));

        assert_eq!(scene.len(), 2);
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Sphere(2.0), Vec3::zeros())), vec![near]);
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Cube(50.0), Vec3::zeros())), vec![near, far]);
    }

    #[test]
    fn test_rejected_entity_is_parked_not_lost() {
        crate::foundation::logging::init();
        let mut scene = Scene::new(Box::new(Octree::new(10.0, PartitionConfig::default())));
        let outside = scene.spawn(translation(Vec3::new(100.0, 0.0, 0.0)), bounded(1.0));

        assert_eq!(scene.unplaced(), &[outside]);
        assert_eq!(scene.graph().entity_count(), 0);
        assert_eq!(
            ids(scene.entities_within_bounds(&Shape::Sphere(2.0), Vec3::new(100.0, 0.0, 0.0))),
            vec![outside]
        );

        // Moving it back inside re-indexes it
        assert!(scene.set_position(outside, Vec3::new(5.0, 0.0, 0.0)));
        assert!(scene.unplaced().is_empty());
        assert_eq!(scene.graph().entity_count(), 1);

        // And moving it out again parks it again
        assert!(!scene.set_position(outside, Vec3::new(-100.0, 0.0, 0.0)));
        assert_eq!(scene.unplaced(), &[outside]);
        assert_eq!(scene.world_transform(outside).map(|m| translation_of(&m)), Some(Vec3::new(-100.0, 0.0, 0.0)));
    }

    #[test]
    fn test_retry_after_growing_graph_is_not_needed_for_flat() {
        let mut scene = Scene::new(Box::new(FlatGraph::new()));
        scene.spawn(translation(Vec3::new(1e6, 0.0, 0.0)), bounded(1.0));
        assert!(scene.unplaced().is_empty());
        assert_eq!(scene.retry_unplaced(), 0);
    }

    #[test]
    fn test_retry_unplaced() {
        let mut scene = Scene::new(Box::new(Quadtree::new(10.0, Plane::XY, PartitionConfig::default())));
        let id = scene.spawn(translation(Vec3::new(20.0, 0.0, 0.0)), bounded(1.0));
        assert_eq!(scene.retry_unplaced(), 0);
        assert_eq!(scene.unplaced(), &[id]);

        // Shift the whole tree so the entity falls inside the root square
        let root = scene.graph().root();
        scene
            .graph_mut()
            .set_transform(root, translation(Vec3::new(15.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(scene.retry_unplaced(), 1);
        assert!(scene.unplaced().is_empty());
    }

    #[test]
    fn test_entities_lost_in_a_collapse_are_parked() {
        let config = PartitionConfig {
            max_entities_per_node: 2,
            collapse: CollapsePolicy::Discard,
            ..PartitionConfig::default()
        };
        let mut scene = Scene::new(Box::new(Octree::new(10.0, config)));
        let tiny = || vec![Component::bounded(Shape::Cube(0.01))];
        let a = scene.spawn(translation(Vec3::new(-5.0, -5.0, -5.0)), tiny());
        let b = scene.spawn(translation(Vec3::new(5.0, 5.0, 5.0)), tiny());
        let c = scene.spawn(translation(Vec3::new(-5.0, 5.0, 5.0)), tiny());

        // The collapse pulls `a` up and throws away the octant holding `c`
        scene.despawn(b);
        assert_eq!(scene.unplaced(), &[c]);
        assert_eq!(scene.graph().entity_count(), 1);
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Cube(10.0), Vec3::zeros())), vec![a, c]);

        assert_eq!(scene.retry_unplaced(), 1);
        assert!(scene.unplaced().is_empty());
        assert_eq!(scene.graph().entity_count(), 2);
    }

    #[test]
    fn test_moving_the_partition_parks_entities_left_behind() {
        let mut scene = Scene::new(Box::new(Octree::new(10.0, PartitionConfig::default())));
        let left = scene.spawn(translation(Vec3::new(-5.0, 0.0, 0.0)), bounded(0.5));
        let right = scene.spawn(translation(Vec3::new(8.0, 0.0, 0.0)), bounded(0.5));

        let root = scene.graph().root();
        scene
            .graph_mut()
            .set_transform(root, translation(Vec3::new(15.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(scene.reclaim_evicted(), 1);
        assert_eq!(scene.unplaced(), &[left]);
        assert_eq!(scene.reclaim_evicted(), 0);
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Sphere(1.0), Vec3::new(8.0, 0.0, 0.0))), vec![right]);
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Sphere(1.0), Vec3::new(-5.0, 0.0, 0.0))), vec![left]);
    }

    #[test]
    fn test_despawn() {
        let mut scene = Scene::new(GraphFactory::default().build());
        let a = scene.spawn(Mat4::identity(), bounded(1.0));
        let b = scene.spawn(Mat4::identity(), vec![Component::unbounded()]);

        let removed = scene.despawn(a).unwrap();
        assert_eq!(removed.id(), a);
        assert!(scene.despawn(a).is_none());
        assert_eq!(scene.len(), 1);
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Point, Vec3::zeros())), vec![b]);
    }

    #[test]
    fn test_hierarchy_in_flat_scene() {
        let mut scene = Scene::new(GraphFactory::new(GraphConfig::default()).build());
        let ship = scene.spawn(translation(Vec3::new(10.0, 0.0, 0.0)), bounded(2.0));
        let turret = scene
            .spawn_child(ship, translation(Vec3::new(0.0, 1.0, 0.0)), bounded(0.5))
            .unwrap();

        assert_relative_eq!(translation_of(&scene.world_transform(turret).unwrap()), Vec3::new(10.0, 1.0, 0.0));

        scene.set_position(ship, Vec3::new(-10.0, 0.0, 0.0));
        assert_relative_eq!(translation_of(&scene.world_transform(turret).unwrap()), Vec3::new(-10.0, 1.0, 0.0));
        let hits = ids(scene.entities_within_bounds(&Shape::Sphere(0.1), Vec3::new(-10.0, 1.0, 0.0)));
        assert_eq!(hits, vec![ship, turret]);
        assert!(scene.spawn_child(EntityId::new(999), Mat4::identity(), Vec::new()).is_none());
    }

    #[test]
    fn test_spawn_child_falls_back_to_root_in_partitions() {
        let config = GraphConfig {
            half_edge: 16.0,
            kind: GraphKind::Octree,
            partition: PartitionConfig {
                max_entities_per_node: 1,
                ..PartitionConfig::default()
            },
        };
        let mut scene = Scene::new(GraphFactory::new(config).build());
        let a = scene.spawn(translation(Vec3::new(8.0, 8.0, 8.0)), bounded(0.5));
        let _b = scene.spawn(translation(Vec3::new(-8.0, -8.0, -8.0)), bounded(0.5));

        // The parent's octant cannot hold an entity on the far side
        let child = scene
            .spawn_child(a, translation(Vec3::new(-8.0, 8.0, -8.0)), bounded(0.5))
            .unwrap();
        assert!(scene.unplaced().is_empty());
        assert_eq!(ids(scene.entities_within_bounds(&Shape::Sphere(1.0), Vec3::new(-8.0, 8.0, -8.0))), vec![child]);
    }
}
