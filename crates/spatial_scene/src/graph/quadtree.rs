//! Quadtree spatial partitioning structure
//!
//! Squares on one cardinal plane, usable inside a 3D scene: positions and
//! shapes are projected onto the plane before every bounds test, so the
//! off-plane coordinate never affects placement or queries.

use super::partition::{PartitionTree, Subdivision};
use crate::bounds::{Plane, Shape};
use crate::config::PartitionConfig;
use crate::foundation::math::{Vec2, Vec3};

/// Quadrant split on a plane: 4 squares of half the parent's half-edge
///
/// Quadrant order: bit 0 = first in-plane axis sign, bit 1 = second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quadrants {
    plane: Plane,
}

impl Quadrants {
    /// Quadrants on `plane`
    pub fn new(plane: Plane) -> Self {
        Self { plane }
    }

    /// Plane the partition lives on
    pub fn plane(&self) -> Plane {
        self.plane
    }
}

impl Subdivision for Quadrants {
    fn node_shape(&self, half_edge: f32) -> Shape {
        Shape::Square(half_edge)
    }

    fn child_offsets(&self, half_edge: f32) -> Vec<Vec3> {
        let quarter = half_edge * 0.5;
        let sign = |quadrant: usize, bit: usize| if quadrant & bit != 0 { quarter } else { -quarter };
        (0..4)
            .map(|quadrant| self.plane.unproject(Vec2::new(sign(quadrant, 1), sign(quadrant, 2))))
            .collect()
    }

    fn intersects(&self, a: &Shape, b: &Shape, offset: Vec3) -> bool {
        self.plane.intersects(a, b, offset)
    }

    fn contains(&self, outer: &Shape, inner: &Shape, offset: Vec3) -> bool {
        self.plane.contains(outer, inner, offset)
    }
}

/// Square-bounded partition on a cardinal plane
pub type Quadtree = PartitionTree<Quadrants>;

impl PartitionTree<Quadrants> {
    /// Create an empty quadtree whose root square is centred on the origin
    pub fn new(half_edge: f32, plane: Plane, config: PartitionConfig) -> Self {
        Self::with_subdivision(Quadrants::new(plane), half_edge, config)
    }

    /// Plane the partition lives on
    pub fn plane(&self) -> Plane {
        self.subdivision().plane()
    }
}
