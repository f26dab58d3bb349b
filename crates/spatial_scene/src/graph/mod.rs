//! Scene graph contract and its spatial partitioning variants
//!
//! Every variant stores its nodes in a [`NodeArena`] and implements
//! [`SpatialGraph`], so the scene can swap a flat hierarchy for a quadtree
//! or an octree without changing how it inserts, moves or queries
//! entities.
//!
//! | variant | node bounds | children per split |
//! |---|---|---|
//! | [`FlatGraph`] | none | one node per entity |
//! | [`Quadtree`] | square on a [`Plane`](crate::bounds::Plane) | 4 |
//! | [`Octree`] | cube | 8 |
//!
//! Graphs are single-threaded data structures. They are `Send + Sync`, so an
//! embedder that queries from several threads can wrap one in a
//! `std::sync::RwLock` and serialize mutations behind the write lock.

mod flat;
mod node;
mod octree;
mod partition;
mod placement;
mod quadtree;


use std::fmt;

pub use flat::FlatGraph;
pub use node::{GraphNode, NodeArena, NodeId};
pub use octree::{Octants, Octree};
pub use partition::{PartitionTree, Subdivision};
pub use placement::Placement;
pub use quadtree::{Quadrants, Quadtree};

use crate::bounds::Shape;
use crate::config::{GraphConfig, GraphKind};
use crate::entity::{Entity, EntityId};
use crate::foundation::math::{Mat4, Vec3};

/// Structural graph errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// The id does not resolve to a live node
    #[error("Unknown graph node: {0:?}")]
    UnknownNode(NodeId),

    /// The node would end up as its own ancestor
    #[error("Re-parenting {node:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Node being moved
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },

    /// The node's place is decided by spatial subdivision
    #[error("Graph node {0:?} cannot be re-parented inside a spatial partition")]
    FixedLayout(NodeId),
}

/// Trait implemented by every scene graph variant
///
/// An `insert` returning `false` is the only out-of-bounds signal; the
/// caller decides whether to try another node, the root, or keep the
/// entity aside.
pub trait SpatialGraph: Send + Sync + fmt::Debug {
    /// Node storage
    fn arena(&self) -> &NodeArena;

    /// Mutable node storage
    fn arena_mut(&mut self) -> &mut NodeArena;

    /// Place an entity in `node` or one of its descendants
    fn insert_into(&mut self, node: NodeId, entity: &Entity) -> bool;

    /// Remove an entity from wherever it is stored
    fn remove(&mut self, entity: EntityId) -> bool;

    /// Re-place an entity after its transform or bounds changed
    ///
    /// Returns the outcome of the re-insert.
    fn update(&mut self, entity: &Entity) -> bool {
        self.remove(entity.id());
        self.insert(entity)
    }

    /// Entities whose bounds intersect `shape` centred at `position`
    ///
    /// Unbounded entities are included whenever the node holding them is
    /// reached by the query.
    fn entities_within_bounds(&self, shape: &Shape, position: Vec3) -> Vec<EntityId>;

    /// World transform the graph currently assigns to `entity`
    fn world_transform(&self, entity: EntityId) -> Option<Mat4>;

    /// Drop every entity and every node except the root
    fn clear(&mut self);

    /// Entities the graph dropped on its own since the last call
    ///
    /// A collapse under [`CollapsePolicy::Discard`](crate::config::CollapsePolicy::Discard)
    /// or a node moved away from its entities can leave entities outside
    /// the graph. The owner decides what to do with them.
    fn take_evicted(&mut self) -> Vec<EntityId> {
        Vec::new()
    }

    /// Place an entity starting at the root
    fn insert(&mut self, entity: &Entity) -> bool {
        let root = self.root();
        self.insert_into(root, entity)
    }

    /// Root node id
    fn root(&self) -> NodeId {
        self.arena().root()
    }

    /// Entities intersecting a sphere
    fn entities_within_radius(&self, centre: Vec3, radius: f32) -> Vec<EntityId> {
        self.entities_within_bounds(&Shape::Sphere(radius), centre)
    }

    /// Total number of entities stored
    fn entity_count(&self) -> usize {
        self.arena().count_entities(self.root())
    }

    /// Node that stores `entity` directly
    fn node_of(&self, entity: EntityId) -> Option<NodeId> {
        self.arena().find_entity(entity)
    }

    /// Child nodes of `node`, empty for unknown ids
    fn children(&self, node: NodeId) -> &[NodeId] {
        self.arena().get(node).map(GraphNode::children).unwrap_or_default()
    }

    /// Entities stored directly in `node`
    fn entities(&self, node: NodeId) -> Vec<EntityId> {
        self.arena()
            .get(node)
            .map(|node| node.entities().iter().map(Placement::entity).collect())
            .unwrap_or_default()
    }

    /// Parent of `node`
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.arena().get(node).and_then(GraphNode::parent)
    }

    /// Local transform of `node`
    fn transform(&self, node: NodeId) -> Option<Mat4> {
        self.arena().get(node).map(|node| *node.transform())
    }

    /// Transform of `node` composed through every ancestor
    fn absolute_transform(&self, node: NodeId) -> Option<Mat4> {
        self.arena().absolute_transform(node)
    }

    /// Replace the local transform of `node`
    fn set_transform(&mut self, node: NodeId, transform: Mat4) -> Result<(), GraphError> {
        self.arena_mut().set_transform(node, transform)
    }

    /// Move `node` under `parent`
    fn set_parent(&mut self, node: NodeId, parent: NodeId) -> Result<(), GraphError> {
        self.arena_mut().set_parent(node, parent)
    }

    /// Add a non-hierarchical link from `from` to `to`
    fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.arena_mut().connect(from, to)
    }

    /// Remove the link from `from` to `to`
    fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<bool, GraphError> {
        self.arena_mut().disconnect(from, to)
    }

    /// Links going out of `node`
    fn connections(&self, node: NodeId) -> &[NodeId] {
        self.arena().get(node).map(GraphNode::connections).unwrap_or_default()
    }
}

/// Builds graphs from a [`GraphConfig`]
///
/// Owned by whoever assembles the scene and passed where graphs are needed.
#[derive(Debug, Clone, Default)]
pub struct GraphFactory {
    config: GraphConfig,
}

impl GraphFactory {
    /// Factory producing graphs described by `config`
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Configuration used by [`Self::build`]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Build an empty graph
    pub fn build(&self) -> Box<dyn SpatialGraph> {
        let config = &self.config;
        log::debug!("Building {:?} graph (half edge {})", config.kind, config.half_edge);
        match config.kind {
            GraphKind::Flat => Box::new(FlatGraph::new()),
            GraphKind::Quadtree { plane } => {
                Box::new(Quadtree::new(config.half_edge, plane, config.partition.clone()))
            }
            GraphKind::Octree => Box::new(Octree::new(config.half_edge, config.partition.clone())),
        }
    }
}
