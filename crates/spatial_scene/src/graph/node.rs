//! Node arena shared by every graph variant
//!
//! Nodes live in a slot map and refer to each other by [`NodeId`]. A node
//! owns its children exclusively; the parent link and the connection list
//! are plain ids, so neither can dangle: a removed node's id simply stops
//! resolving.

use slotmap::SlotMap;

use super::placement::Placement;
use super::GraphError;
use crate::bounds::Shape;
use crate::entity::EntityId;
use crate::foundation::math::{compose, translation_of, Mat4, Vec3};

slotmap::new_key_type! {
    /// Handle to a node inside a [`NodeArena`]
    pub struct NodeId;
}

/// Single node in a scene graph
#[derive(Debug, Clone)]
pub struct GraphNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub(crate) entities: Vec<Placement>,
    transform: Mat4,
    /// Cached `parent.absolute * transform`
    absolute: Mat4,
    bounds: Option<Shape>,
    depth: u32,
    connections: Vec<NodeId>,
}

impl GraphNode {
    fn new(parent: Option<NodeId>, transform: Mat4, absolute: Mat4, bounds: Option<Shape>, depth: u32) -> Self {
        Self {
            parent,
            children: Vec::new(),
            entities: Vec::new(),
            transform,
            absolute,
            bounds,
            depth,
            connections: Vec::new(),
        }
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in creation order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Entities stored directly in this node
    pub fn entities(&self) -> &[Placement] {
        &self.entities
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// Transform composed through every ancestor
    pub fn absolute_transform(&self) -> &Mat4 {
        &self.absolute
    }

    /// Bounding volume, `None` when the node does not enforce bounds
    pub fn bounds(&self) -> Option<&Shape> {
        self.bounds.as_ref()
    }

    /// Depth in the tree (0 = root)
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Non-hierarchical links to other nodes
    pub fn connections(&self) -> &[NodeId] {
        &self.connections
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// World-space centre of the node's bounding volume
    pub fn centre(&self) -> Vec3 {
        translation_of(&self.absolute)
    }
}

/// Arena owning every node of one graph
#[derive(Debug, Clone)]
pub struct NodeArena {
    nodes: SlotMap<NodeId, GraphNode>,
    root: NodeId,
}

impl NodeArena {
    /// Create an arena holding a single root node
    pub fn new(root_bounds: Option<Shape>, root_transform: Mat4) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(GraphNode::new(None, root_transform, root_transform, root_bounds, 0));
        Self { nodes, root }
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Check if `id` still refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// An arena always holds its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new child under `parent`
    pub(crate) fn add_child(&mut self, parent: NodeId, transform: Mat4, bounds: Option<Shape>) -> Option<NodeId> {
        let (absolute, depth) = {
            let parent_node = self.nodes.get(parent)?;
            (parent_node.absolute * transform, parent_node.depth + 1)
        };
        let child = self
            .nodes
            .insert(GraphNode::new(Some(parent), transform, absolute, bounds, depth));
        self.nodes[parent].children.push(child);
        Some(child)
    }

    /// Detach and destroy `id` with its whole subtree, returning the entities it held
    ///
    /// The root cannot be removed; asking for it returns nothing.
    pub(crate) fn remove_subtree(&mut self, id: NodeId) -> Vec<Placement> {
        if id == self.root || !self.contains(id) {
            return Vec::new();
        }
        if let Some(parent) = self.nodes[id].parent {
            self.nodes[parent].children.retain(|child| *child != id);
        }
        let doomed = self.subtree(id);
        let mut orphaned = Vec::new();
        for node in &doomed {
            if let Some(removed) = self.nodes.remove(*node) {
                orphaned.extend(removed.entities);
            }
        }
        for node in self.nodes.values_mut() {
            node.connections.retain(|target| !doomed.contains(target));
        }
        orphaned
    }

    /// Destroy every child of `id`, returning the entities they held
    pub(crate) fn discard_children(&mut self, id: NodeId) -> Vec<Placement> {
        let children = self.nodes.get(id).map(|node| node.children.clone()).unwrap_or_default();
        children
            .into_iter()
            .flat_map(|child| self.remove_subtree(child))
            .collect()
    }

    /// Drop every node but the root and empty the root
    pub(crate) fn reset(&mut self) {
        let root = self.root;
        self.nodes.retain(|id, _| id == root);
        let root_node = &mut self.nodes[root];
        root_node.children.clear();
        root_node.entities.clear();
        root_node.connections.clear();
    }

    /// Cached absolute transform of `id`
    pub fn absolute_transform(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(id).map(|node| node.absolute)
    }

    /// Absolute transform recomputed by walking the parent chain
    pub fn compose_absolute(&self, id: NodeId) -> Option<Mat4> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.nodes.get(current)?;
            chain.push(node.transform);
            cursor = node.parent;
        }
        Some(compose(chain.iter().rev()))
    }

    /// Replace the local transform of `id` and refresh its subtree
    pub fn set_transform(&mut self, id: NodeId, transform: Mat4) -> Result<(), GraphError> {
        self.nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?.transform = transform;
        self.refresh(id);
        Ok(())
    }

    /// Move `id` (with its subtree) under `parent`
    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) -> Result<(), GraphError> {
        if !self.contains(id) {
            return Err(GraphError::UnknownNode(id));
        }
        if !self.contains(parent) {
            return Err(GraphError::UnknownNode(parent));
        }
        if self.subtree(id).contains(&parent) {
            return Err(GraphError::Cycle { node: id, parent });
        }

        if let Some(old_parent) = self.nodes[id].parent {
            self.nodes[old_parent].children.retain(|child| *child != id);
        }
        self.nodes[parent].children.push(id);
        self.nodes[id].parent = Some(parent);
        self.refresh(id);
        Ok(())
    }

    /// Recompute cached absolute transforms and depths below and including `id`
    fn refresh(&mut self, id: NodeId) {
        let (parent_absolute, parent_depth) = match self.nodes[id].parent {
            Some(parent) => (self.nodes[parent].absolute, Some(self.nodes[parent].depth)),
            None => (Mat4::identity(), None),
        };
        let node = &mut self.nodes[id];
        node.absolute = parent_absolute * node.transform;
        node.depth = parent_depth.map_or(0, |depth| depth + 1);

        for child in node.children.clone() {
            self.refresh(child);
        }
    }

    /// Link `from` to `to`; duplicate links are ignored
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if !self.contains(to) {
            return Err(GraphError::UnknownNode(to));
        }
        let node = self.nodes.get_mut(from).ok_or(GraphError::UnknownNode(from))?;
        if !node.connections.contains(&to) {
            node.connections.push(to);
        }
        Ok(())
    }

    /// Remove the link from `from` to `to`, returning whether it existed
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) -> Result<bool, GraphError> {
        let node = self.nodes.get_mut(from).ok_or(GraphError::UnknownNode(from))?;
        let before = node.connections.len();
        node.connections.retain(|target| *target != to);
        Ok(node.connections.len() != before)
    }

    /// `id` and all its descendants in pre-order, children in creation order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// First node (pre-order from the root) that stores `entity` directly
    pub fn find_entity(&self, entity: EntityId) -> Option<NodeId> {
        self.subtree(self.root).into_iter().find(|id| {
            self.nodes[*id]
                .entities
                .iter()
                .any(|placement| placement.entity() == entity)
        })
    }

    /// Count entities in `id` and all its descendants
    pub fn count_entities(&self, id: NodeId) -> usize {
        self.subtree(id)
            .into_iter()
            .map(|node| self.nodes[node].entities.len())
            .sum()
    }

    /// Nodes at `depth` below the root, in pre-order
    pub fn nodes_at_depth(&self, depth: u32) -> Vec<NodeId> {
        self.subtree(self.root)
            .into_iter()
            .filter(|node| self.nodes[*node].depth == depth)
            .collect()
    }
}

impl std::ops::Index<NodeId> for NodeArena {
    type Output = GraphNode;

    fn index(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut GraphNode {
        &mut self.nodes[id]
    }
}
