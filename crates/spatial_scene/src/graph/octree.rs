//! Octree spatial partitioning structure
//!
//! Divides 3D space into hierarchical cubes. Each node subdivides into 8
//! octants when it holds more entities than the configured threshold.

use super::partition::{PartitionTree, Subdivision};
use crate::bounds::Shape;
use crate::config::PartitionConfig;
use crate::foundation::math::Vec3;

/// Octant split: 8 cubes of half the parent's half-edge
///
/// Octant layout (bit 0 = X sign, bit 1 = Y sign, bit 2 = Z sign):
/// - 0: -X, -Y, -Z
/// - 1: +X, -Y, -Z
/// - 2: -X, +Y, -Z
/// - 3: +X, +Y, -Z
/// - 4: -X, -Y, +Z
/// - 5: +X, -Y, +Z
/// - 6: -X, +Y, +Z
/// - 7: +X, +Y, +Z
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Octants;

impl Subdivision for Octants {
    fn node_shape(&self, half_edge: f32) -> Shape {
        Shape::Cube(half_edge)
    }

    fn child_offsets(&self, half_edge: f32) -> Vec<Vec3> {
        let quarter = half_edge * 0.5;
        let sign = |octant: usize, bit: usize| if octant & bit != 0 { quarter } else { -quarter };
        (0..8)
            .map(|octant| Vec3::new(sign(octant, 1), sign(octant, 2), sign(octant, 4)))
            .collect()
    }

    fn intersects(&self, a: &Shape, b: &Shape, offset: Vec3) -> bool {
        a.intersects(b, offset)
    }

    fn contains(&self, outer: &Shape, inner: &Shape, offset: Vec3) -> bool {
        outer.contains(inner, offset)
    }
}

/// Cube-bounded 3D partition
pub type Octree = PartitionTree<Octants>;

impl PartitionTree<Octants> {
    /// Create an empty octree whose root cube is centred on the origin
    pub fn new(half_edge: f32, config: PartitionConfig) -> Self {
        Self::with_subdivision(Octants, half_edge, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollapsePolicy;
    use crate::entity::{Component, Entity, EntityId};
    use crate::graph::SpatialGraph;
    use approx::assert_relative_eq;

    fn config(max_entities_per_node: usize) -> PartitionConfig {
        PartitionConfig {
            max_entities_per_node,
            max_depth: 6,
            collapse: CollapsePolicy::Migrate,
        }
    }

    fn marker(id: u32, position: Vec3) -> Entity {
        Entity::new(EntityId::new(id))
            .at(position)
            .with_component(Component::bounded(Shape::Cube(0.1)))
    }

    #[test]
    fn test_octant_offsets() {
        let offsets = Octants.child_offsets(10.0);
        assert_eq!(offsets.len(), 8);
        assert_relative_eq!(offsets[0], Vec3::new(-5.0, -5.0, -5.0));
        assert_relative_eq!(offsets[3], Vec3::new(5.0, 5.0, -5.0));
        assert_relative_eq!(offsets[7], Vec3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn test_octree_basic_insertion() {
        let mut octree = Octree::new(100.0, PartitionConfig::default());

        assert!(octree.insert(&marker(1, Vec3::zeros())));
        assert_eq!(octree.entity_count(), 1);
        assert!(!octree.insert(&marker(2, Vec3::new(150.0, 0.0, 0.0))));
        assert_eq!(octree.entity_count(), 1);
    }

    #[test]
    fn test_children_are_half_sized_and_positioned() {
        let mut octree = Octree::new(8.0, config(1));
        octree.insert(&marker(1, Vec3::new(4.0, 4.0, 4.0)));
        octree.insert(&marker(2, Vec3::new(-4.0, -4.0, -4.0)));

        let root = octree.root();
        let children = octree.children(root).to_vec();
        assert_eq!(children.len(), 8);

        let last = &octree.arena()[children[7]];
        assert_eq!(last.bounds(), Some(&Shape::Cube(4.0)));
        assert_relative_eq!(last.centre(), Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(octree.entities(children[7]), vec![EntityId::new(1)]);
        assert_eq!(octree.entities(children[0]), vec![EntityId::new(2)]);
    }

    #[test]
    fn test_straddling_entity_stays_in_parent() {
        let mut octree = Octree::new(10.0, config(1));
        octree.insert(&marker(1, Vec3::new(5.0, 5.0, 5.0)));
        let straddler = Entity::new(EntityId::new(2))
            .with_component(Component::bounded(Shape::Sphere(2.0)));
        octree.insert(&straddler);

        let root = octree.root();
        assert!(octree.is_subdivided(root));
        assert_eq!(octree.entities(root), vec![EntityId::new(2)]);
    }

    #[test]
    fn test_radius_query() {
        let mut octree = Octree::new(100.0, config(2));
        octree.insert(&marker(1, Vec3::new(0.0, 0.0, 0.0)));
        octree.insert(&marker(2, Vec3::new(5.0, 0.0, 0.0)));
        octree.insert(&marker(3, Vec3::new(50.0, 0.0, 0.0)));

        let mut results = octree.entities_within_radius(Vec3::zeros(), 10.0);
        results.sort();
        assert_eq!(results, vec![EntityId::new(1), EntityId::new(2)]);
    }

    #[test]
    fn test_coincident_entities_stop_at_max_depth() {
        let mut octree = Octree::new(100.0, config(1));
        for id in 0..10 {
            assert!(octree.insert(&marker(id, Vec3::new(1.0, 1.0, 1.0))));
        }

        assert_eq!(octree.entity_count(), 10);
        assert!(octree.arena().nodes_at_depth(7).is_empty());
        assert!(!octree.arena().nodes_at_depth(6).is_empty());
        assert_eq!(octree.entities_within_radius(Vec3::new(1.0, 1.0, 1.0), 0.5).len(), 10);
    }
}
