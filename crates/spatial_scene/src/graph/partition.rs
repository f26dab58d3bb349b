//! Bounded spatial partitioning shared by the quadtree and the octree
//!
//! A [`PartitionTree`] holds entities in nodes with a fixed bounding
//! square or cube. The [`Subdivision`] decides the geometry: how many
//! children a split produces, where they sit, and whether shape tests run
//! in 3D or on a projected plane.
//!
//! Per node the life cycle is:
//!
//! ```text
//! empty leaf -> filling leaf (1..=N direct) -> subdivided -> filling leaf
//!                        split on the N+1th insert    collapse once removals drain it
//! ```

use std::fmt;

use log::{debug, trace, warn};

use super::node::{NodeArena, NodeId};
use super::placement::Placement;
use super::{GraphError, SpatialGraph};
use crate::bounds::Shape;
use crate::config::{CollapsePolicy, PartitionConfig};
use crate::entity::{Entity, EntityId};
use crate::foundation::math::{translation, Mat4, Vec3};

/// Geometry of one kind of spatial split
pub trait Subdivision: Send + Sync + fmt::Debug {
    /// Bounding shape of a node with the given half-edge length
    fn node_shape(&self, half_edge: f32) -> Shape;

    /// Child centres relative to the parent centre, in child creation order
    fn child_offsets(&self, half_edge: f32) -> Vec<Vec3>;

    /// Overlap test; `offset` is `centre(b) - centre(a)`
    fn intersects(&self, a: &Shape, b: &Shape, offset: Vec3) -> bool;

    /// Containment test; `offset` is `centre(inner) - centre(outer)`
    fn contains(&self, outer: &Shape, inner: &Shape, offset: Vec3) -> bool;
}

/// Tree of bounded nodes that split when they fill up
#[derive(Debug, Clone)]
pub struct PartitionTree<S> {
    arena: NodeArena,
    subdivision: S,
    half_edge: f32,
    config: PartitionConfig,
    /// Entities dropped since the last `take_evicted`
    evicted: Vec<EntityId>,
}

impl<S: Subdivision> PartitionTree<S> {
    pub(crate) fn with_subdivision(subdivision: S, half_edge: f32, config: PartitionConfig) -> Self {
        let root_bounds = subdivision.node_shape(half_edge);
        Self {
            arena: NodeArena::new(Some(root_bounds), Mat4::identity()),
            subdivision,
            half_edge,
            config,
            evicted: Vec::new(),
        }
    }

    /// Partition configuration
    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Split geometry
    pub fn subdivision(&self) -> &S {
        &self.subdivision
    }

    /// Half-edge length of nodes at `depth`
    pub fn half_edge_at(&self, depth: u32) -> f32 {
        let mut half_edge = self.half_edge;
        for _ in 0..depth {
            half_edge *= 0.5;
        }
        half_edge
    }

    /// Check if `node` currently has children
    pub fn is_subdivided(&self, node: NodeId) -> bool {
        self.arena.get(node).is_some_and(|node| !node.is_leaf())
    }

    /// Split a leaf into children and push its entities down where they fit
    ///
    /// Returns `false` when the node is unknown or already subdivided.
    pub fn subdivide(&mut self, node: NodeId) -> bool {
        let Some((depth, bounds)) = self
            .arena
            .get(node)
            .filter(|n| n.is_leaf())
            .and_then(|n| Some((n.depth(), *n.bounds()?)))
        else {
            return false;
        };

        let child_shape = bounds.scaled(0.5);
        for offset in self.subdivision.child_offsets(self.half_edge_at(depth)) {
            self.arena.add_child(node, translation(offset), Some(child_shape));
        }
        debug!(
            "Subdivided node {:?} at depth {} into {} children",
            node,
            depth,
            self.arena[node].children().len()
        );

        // Redistribute existing entities to children
        for placement in std::mem::take(&mut self.arena[node].entities) {
            if placement.is_unbounded() {
                self.arena[node].entities.push(placement);
            } else if let Err(placement) = self.route_to_children(node, placement) {
                self.arena[node].entities.push(placement);
            }
        }
        true
    }

    fn accepts(&self, node: NodeId, placement: &Placement) -> bool {
        let node = &self.arena[node];
        let Some(bounds) = node.bounds() else {
            return true;
        };
        placement.overlaps(placement.transform(), bounds, node.centre(), |a, b, offset| {
            self.subdivision.intersects(a, b, offset)
        })
    }

    fn encloses(&self, node: NodeId, placement: &Placement) -> bool {
        let node = &self.arena[node];
        let Some(bounds) = node.bounds() else {
            return false;
        };
        placement.enclosed_by(placement.transform(), bounds, node.centre(), |outer, inner, offset| {
            self.subdivision.contains(outer, inner, offset)
        })
    }

    fn should_subdivide(&self, node: NodeId) -> bool {
        let node = &self.arena[node];
        node.is_leaf()
            && node.entities().len() >= self.config.max_entities_per_node
            && node.depth() < self.config.max_depth
    }

    /// Store a placement already known to belong in `node`'s subtree
    fn settle(&mut self, node: NodeId, placement: Placement) {
        if placement.is_unbounded() {
            self.arena[node].entities.push(placement);
            return;
        }

        let placement = match self.route_to_children(node, placement) {
            Ok(()) => return,
            Err(placement) => placement,
        };

        if self.should_subdivide(node) {
            self.subdivide(node);
            if let Err(placement) = self.route_to_children(node, placement) {
                self.arena[node].entities.push(placement);
            }
            return;
        }

        trace!("Placed {:?} in node {:?}", placement.entity(), node);
        self.arena[node].entities.push(placement);
    }

    /// Hand the placement to the first child that fully contains it
    fn route_to_children(&mut self, node: NodeId, placement: Placement) -> Result<(), Placement> {
        let children = self.arena[node].children().to_vec();
        match children.into_iter().find(|child| self.encloses(*child, &placement)) {
            Some(child) => {
                self.settle(child, placement);
                Ok(())
            }
            None => Err(placement),
        }
    }

    fn remove_from(&mut self, node: NodeId, entity: EntityId) -> bool {
        let position = self.arena[node]
            .entities()
            .iter()
            .position(|placement| placement.entity() == entity);

        let removed = if let Some(index) = position {
            self.arena[node].entities.remove(index);
            true
        } else {
            let children = self.arena[node].children().to_vec();
            children.into_iter().any(|child| self.remove_from(child, entity))
        };

        if removed {
            self.rebalance(node);
        }
        removed
    }

    /// Collapse check run on every node along a removal path
    fn rebalance(&mut self, node: NodeId) {
        let threshold = self.config.max_entities_per_node;
        if self.arena[node].is_leaf() || self.arena[node].entities().len() >= threshold {
            return;
        }

        match self.config.collapse {
            CollapsePolicy::Migrate => {
                while self.arena[node].entities().len() < threshold {
                    let Some(placement) = self.pull_up(node) else {
                        break;
                    };
                    self.arena[node].entities.push(placement);
                }

                let direct = self.arena[node].entities().len();
                if self.arena.count_entities(node) == direct {
                    self.arena.discard_children(node);
                    debug!("Collapsed node {:?}, {} entities kept", node, direct);
                } else {
                    self.prune_empty_children(node);
                }
            }
            CollapsePolicy::Discard => {
                if let Some(placement) = self.pull_up(node) {
                    self.arena[node].entities.push(placement);
                }
                if self.arena[node].entities().len() < threshold {
                    let lost = self.arena.discard_children(node);
                    if lost.is_empty() {
                        debug!("Collapsed node {:?}", node);
                    } else {
                        warn!("Collapsed node {:?} and discarded {} entities", node, lost.len());
                        self.evict(lost);
                    }
                }
            }
        }
    }

    fn evict(&mut self, placements: impl IntoIterator<Item = Placement>) {
        for placement in placements {
            warn!("Evicted {:?} from the partition", placement.entity());
            self.evicted.push(placement.entity());
        }
    }

    /// Re-place every entity below `node` starting from the root
    ///
    /// Entities the root no longer reaches are evicted.
    fn resettle_subtree(&mut self, node: NodeId) {
        let mut displaced = Vec::new();
        for id in self.arena.subtree(node) {
            displaced.append(&mut self.arena[id].entities);
        }

        let root = self.arena.root();
        let mut rejected = Vec::new();
        for placement in displaced {
            if self.accepts(root, &placement) {
                self.settle(root, placement);
            } else {
                rejected.push(placement);
            }
        }
        self.evict(rejected);
    }

    /// Take one entity from the first child holding any, depth-first
    fn pull_up(&mut self, node: NodeId) -> Option<Placement> {
        let children = self.arena[node].children().to_vec();
        children.into_iter().find_map(|child| self.take_first(child))
    }

    fn take_first(&mut self, node: NodeId) -> Option<Placement> {
        if let Some(placement) = self.arena[node].entities.pop() {
            return Some(placement);
        }
        self.pull_up(node)
    }

    fn prune_empty_children(&mut self, node: NodeId) {
        for child in self.arena[node].children().to_vec() {
            if !self.arena[child].is_leaf() && self.arena.count_entities(child) == 0 {
                self.arena.discard_children(child);
            }
        }
    }

    fn collect(&self, node: NodeId, shape: &Shape, position: Vec3, results: &mut Vec<EntityId>) {
        let node = &self.arena[node];
        if let Some(bounds) = node.bounds() {
            if !self.subdivision.intersects(bounds, shape, position - node.centre()) {
                return; // Query doesn't reach this node
            }
        }

        results.extend(
            node.entities()
                .iter()
                .filter(|placement| {
                    placement.overlaps(placement.transform(), shape, position, |a, b, offset| {
                        self.subdivision.intersects(a, b, offset)
                    })
                })
                .map(Placement::entity),
        );

        for child in node.children() {
            self.collect(*child, shape, position, results);
        }
    }
}

impl<S: Subdivision> SpatialGraph for PartitionTree<S> {
    fn arena(&self) -> &NodeArena {
        &self.arena
    }

    fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    fn insert_into(&mut self, node: NodeId, entity: &Entity) -> bool {
        if !self.arena.contains(node) {
            warn!("Cannot insert {:?} under unknown node {:?}", entity.id(), node);
            return false;
        }

        let placement = Placement::of(entity);
        if !self.accepts(node, &placement) {
            debug!("{:?} lies outside node {:?}", entity.id(), node);
            return false;
        }
        self.settle(node, placement);
        true
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        let root = self.arena.root();
        self.remove_from(root, entity)
    }

    fn entities_within_bounds(&self, shape: &Shape, position: Vec3) -> Vec<EntityId> {
        let mut results = Vec::new();
        self.collect(self.arena.root(), shape, position, &mut results);
        results
    }

    fn world_transform(&self, entity: EntityId) -> Option<Mat4> {
        let node = self.arena.find_entity(entity)?;
        self.arena[node]
            .entities()
            .iter()
            .find(|placement| placement.entity() == entity)
            .map(|placement| *placement.transform())
    }

    fn clear(&mut self) {
        self.arena.reset();
        self.evicted.clear();
    }

    fn take_evicted(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.evicted)
    }

    /// Moves the node's bounds and re-places the entities they held
    fn set_transform(&mut self, node: NodeId, transform: Mat4) -> Result<(), GraphError> {
        self.arena.set_transform(node, transform)?;
        self.resettle_subtree(node);
        Ok(())
    }

    /// Partition nodes keep the parent their split gave them
    fn set_parent(&mut self, node: NodeId, parent: NodeId) -> Result<(), GraphError> {
        for id in [node, parent] {
            if !self.arena.contains(id) {
                return Err(GraphError::UnknownNode(id));
            }
        }
        Err(GraphError::FixedLayout(node))
    }
}
