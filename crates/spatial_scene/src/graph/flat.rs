//! Flat scene graph (no spatial optimization)
//!
//! Every inserted entity gets a node of its own, created as a child of the
//! node it was inserted into. The node's local transform is the entity's
//! transform, so nesting entities under each other builds a transform
//! hierarchy and moving a node moves everything below it. Queries visit
//! every node.

use log::{trace, warn};

use super::node::{NodeArena, NodeId};
use super::placement::Placement;
use super::SpatialGraph;
use crate::bounds::Shape;
use crate::entity::{Entity, EntityId};
use crate::foundation::math::{Mat4, Vec3};

/// Hierarchy of one node per entity
#[derive(Debug, Clone)]
pub struct FlatGraph {
    arena: NodeArena,
}

impl FlatGraph {
    /// Create an empty graph with an identity root
    pub fn new() -> Self {
        Self {
            arena: NodeArena::new(None, Mat4::identity()),
        }
    }
}

impl Default for FlatGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialGraph for FlatGraph {
    fn arena(&self) -> &NodeArena {
        &self.arena
    }

    fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    fn insert_into(&mut self, node: NodeId, entity: &Entity) -> bool {
        let Some(child) = self.arena.add_child(node, entity.transform, None) else {
            warn!("FlatGraph: cannot insert {:?} under unknown node {:?}", entity.id(), node);
            return false;
        };
        self.arena[child].entities.push(Placement::of(entity));
        trace!("FlatGraph: {:?} placed in new node {:?}", entity.id(), child);
        true
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        let Some(node) = self.arena.find_entity(entity) else {
            return false;
        };
        self.arena[node].entities.retain(|placement| placement.entity() != entity);

        // Nodes still parenting other entities stay behind as empty groups
        if self.arena[node].is_leaf() && self.arena[node].entities.is_empty() {
            self.arena.remove_subtree(node);
        }
        true
    }

    fn update(&mut self, entity: &Entity) -> bool {
        let Some(node) = self.arena.find_entity(entity.id()) else {
            return self.insert(entity);
        };
        for placement in &mut self.arena[node].entities {
            if placement.entity() == entity.id() {
                *placement = Placement::of(entity);
            }
        }
        self.arena.set_transform(node, entity.transform).is_ok()
    }

    fn entities_within_bounds(&self, shape: &Shape, position: Vec3) -> Vec<EntityId> {
        let mut results = Vec::new();
        for id in self.arena.subtree(self.arena.root()) {
            let node = &self.arena[id];
            results.extend(
                node.entities()
                    .iter()
                    .filter(|placement| {
                        placement.overlaps(node.absolute_transform(), shape, position, Shape::intersects)
                    })
                    .map(Placement::entity),
            );
        }
        results
    }

    fn world_transform(&self, entity: EntityId) -> Option<Mat4> {
        self.arena
            .find_entity(entity)
            .and_then(|node| self.arena.absolute_transform(node))
    }

    fn clear(&mut self) {
        self.arena.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Component;
    use crate::foundation::math::{translation, translation_of};
    use approx::assert_relative_eq;

    fn ball(id: u32, position: Vec3) -> Entity {
        Entity::new(EntityId::new(id))
            .at(position)
            .with_component(Component::bounded(Shape::Sphere(0.5)))
    }

    #[test]
    fn test_one_node_per_entity() {
        let mut graph = FlatGraph::new();
        assert!(graph.insert(&ball(1, Vec3::zeros())));
        assert!(graph.insert(&ball(2, Vec3::zeros())));

        let root = graph.root();
        assert_eq!(graph.children(root).len(), 2);
        assert!(graph.entities(root).is_empty());
        assert_eq!(graph.entity_count(), 2);
    }

    #[test]
    fn test_query_filters_by_bounds() {
        let mut graph = FlatGraph::new();
        graph.insert(&ball(1, Vec3::new(-10.0, 0.0, 0.0)));
        graph.insert(&ball(2, Vec3::new(10.0, 0.0, 0.0)));
        graph.insert(&Entity::new(EntityId::new(3)).at(Vec3::new(500.0, 0.0, 0.0)));

        let mut found = graph.entities_within_bounds(&Shape::Cube(2.0), Vec3::new(10.0, 1.0, 0.0));
        found.sort();
        assert_eq!(found, vec![EntityId::new(2), EntityId::new(3)]);
    }

    #[test]
    fn test_nested_entities_follow_their_parent() {
        let mut graph = FlatGraph::new();
        let parent = ball(1, Vec3::new(5.0, 0.0, 0.0));
        graph.insert(&parent);
        let parent_node = graph.node_of(parent.id()).unwrap();
        assert!(graph.insert_into(parent_node, &ball(2, Vec3::new(0.0, 1.0, 0.0))));

        let child_world = graph.world_transform(EntityId::new(2)).unwrap();
        assert_relative_eq!(translation_of(&child_world), Vec3::new(5.0, 1.0, 0.0));

        // Moving the parent entity drags the child along
        graph.update(&parent.clone().at(Vec3::new(-5.0, 0.0, 0.0)));
        let child_world = graph.world_transform(EntityId::new(2)).unwrap();
        assert_relative_eq!(translation_of(&child_world), Vec3::new(-5.0, 1.0, 0.0));

        let found = graph.entities_within_radius(Vec3::new(-5.0, 1.0, 0.0), 0.1);
        assert!(found.contains(&EntityId::new(2)));
    }

    #[test]
    fn test_remove_keeps_grouping_node_for_children() {
        let mut graph = FlatGraph::new();
        graph.insert(&ball(1, Vec3::zeros()));
        let parent_node = graph.node_of(EntityId::new(1)).unwrap();
        graph.insert_into(parent_node, &ball(2, Vec3::zeros()));

        assert!(graph.remove(EntityId::new(1)));
        assert!(graph.arena().contains(parent_node));
        assert!(graph.entities(parent_node).is_empty());
        assert_eq!(graph.node_of(EntityId::new(2)).and_then(|node| graph.parent(node)), Some(parent_node));

        assert!(graph.remove(EntityId::new(2)));
        assert!(!graph.remove(EntityId::new(2)));
        assert_eq!(graph.entity_count(), 0);
    }

    #[test]
    fn test_moving_root_moves_everything() {
        let mut graph = FlatGraph::new();
        graph.insert(&ball(1, Vec3::new(1.0, 0.0, 0.0)));
        let root = graph.root();
        graph.set_transform(root, translation(Vec3::new(0.0, 0.0, 3.0))).unwrap();

        let world = graph.world_transform(EntityId::new(1)).unwrap();
        assert_relative_eq!(translation_of(&world), Vec3::new(1.0, 0.0, 3.0));
    }

    #[test]
    fn test_insert_under_stale_node_fails() {
        let mut graph = FlatGraph::new();
        graph.insert(&ball(1, Vec3::zeros()));
        let stale = graph.node_of(EntityId::new(1)).unwrap();
        graph.remove(EntityId::new(1));

        assert!(!graph.insert_into(stale, &ball(2, Vec3::zeros())));
        graph.clear();
        assert_eq!(graph.arena().len(), 1);
    }
}
