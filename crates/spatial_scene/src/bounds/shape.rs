//! User-facing bounding shapes and cardinal planes

use serde::{Deserialize, Serialize};

use super::primitives::{Footprint, Volume};
use crate::foundation::math::{Vec2, Vec3};

/// Bounding shape attached to a component or used as a node's capacity
///
/// Flat shapes used in a 3D test are treated as their solid counterpart
/// (a square as a cube, a circle as a sphere), which keeps 3D tests
/// conservative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Zero-sized shape
    Point,
    /// Circle given by its radius
    Circle(f32),
    /// Square given by its half-edge length
    Square(f32),
    /// Sphere given by its radius
    Sphere(f32),
    /// Cube given by its half-edge length
    Cube(f32),
    /// Axis-aligned box given by its half extents
    Box(Vec3),
}

impl Shape {
    /// The solid this shape occupies in 3D
    pub fn volume(&self) -> Volume {
        match *self {
            Self::Point => Volume::Aabb(Vec3::zeros()),
            Self::Circle(radius) | Self::Sphere(radius) => Volume::Ball(radius),
            Self::Square(half) | Self::Cube(half) => Volume::Aabb(Vec3::repeat(half)),
            Self::Box(half_extents) => Volume::Aabb(half_extents),
        }
    }

    /// 3D overlap test; `offset` is `centre(other) - centre(self)`
    pub fn intersects(&self, other: &Self, offset: Vec3) -> bool {
        self.volume().intersects(&other.volume(), offset)
    }

    /// 3D containment test; `offset` is `centre(inner) - centre(self)`
    pub fn contains(&self, inner: &Self, offset: Vec3) -> bool {
        self.volume().contains(&inner.volume(), offset)
    }

    /// Same kind of shape with every dimension multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        match *self {
            Self::Point => Self::Point,
            Self::Circle(radius) => Self::Circle(radius * factor),
            Self::Square(half) => Self::Square(half * factor),
            Self::Sphere(radius) => Self::Sphere(radius * factor),
            Self::Cube(half) => Self::Cube(half * factor),
            Self::Box(half_extents) => Self::Box(half_extents * factor),
        }
    }
}

/// Axis-aligned plane a planar partition lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Plane {
    /// Drops Z
    #[default]
    XY,
    /// Drops Y
    XZ,
    /// Drops X
    YZ,
}

impl Plane {
    /// Drop the coordinate perpendicular to this plane
    pub fn project(&self, v: Vec3) -> Vec2 {
        match self {
            Self::XY => Vec2::new(v.x, v.y),
            Self::XZ => Vec2::new(v.x, v.z),
            Self::YZ => Vec2::new(v.y, v.z),
        }
    }

    /// Lift an in-plane vector back to 3D with a zero off-plane coordinate
    pub fn unproject(&self, v: Vec2) -> Vec3 {
        match self {
            Self::XY => Vec3::new(v.x, v.y, 0.0),
            Self::XZ => Vec3::new(v.x, 0.0, v.y),
            Self::YZ => Vec3::new(0.0, v.x, v.y),
        }
    }

    /// The area `shape` covers once projected onto this plane
    pub fn footprint(&self, shape: &Shape) -> Footprint {
        match *shape {
            Shape::Point => Footprint::Rect(Vec2::zeros()),
            Shape::Circle(radius) | Shape::Sphere(radius) => Footprint::Disc(radius),
            Shape::Square(half) | Shape::Cube(half) => Footprint::Rect(Vec2::repeat(half)),
            Shape::Box(half_extents) => Footprint::Rect(self.project(half_extents)),
        }
    }

    /// 2D overlap test after projecting both shapes and the offset
    pub fn intersects(&self, a: &Shape, b: &Shape, offset: Vec3) -> bool {
        self.footprint(a).intersects(&self.footprint(b), self.project(offset))
    }

    /// 2D containment test after projecting both shapes and the offset
    pub fn contains(&self, outer: &Shape, inner: &Shape, offset: Vec3) -> bool {
        self.footprint(outer).contains(&self.footprint(inner), self.project(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_drops_perpendicular_axis() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Plane::XY.project(v), Vec2::new(1.0, 2.0));
        assert_eq!(Plane::XZ.project(v), Vec2::new(1.0, 3.0));
        assert_eq!(Plane::YZ.project(v), Vec2::new(2.0, 3.0));
        assert_eq!(Plane::XZ.unproject(Vec2::new(1.0, 3.0)), Vec3::new(1.0, 0.0, 3.0));
    }

    #[test]
    fn test_planar_test_ignores_height() {
        let square = Shape::Square(1.0);
        let circle = Shape::Circle(0.5);

        // Far apart in Y, which the XZ plane discards
        assert!(Plane::XZ.intersects(&square, &circle, Vec3::new(0.5, 100.0, 0.5)));
        assert!(!square.intersects(&circle, Vec3::new(0.5, 100.0, 0.5)));
    }

    #[test]
    fn test_box_footprint_uses_in_plane_extents() {
        let slab = Shape::Box(Vec3::new(4.0, 0.5, 1.0));
        assert_eq!(Plane::XY.footprint(&slab), Footprint::Rect(Vec2::new(4.0, 0.5)));
        assert_eq!(Plane::YZ.footprint(&slab), Footprint::Rect(Vec2::new(0.5, 1.0)));
    }

    #[test]
    fn test_point_is_contained_at_boundary() {
        assert!(Shape::Cube(1.0).contains(&Shape::Point, Vec3::new(1.0, -1.0, 1.0)));
        assert!(!Shape::Cube(1.0).contains(&Shape::Point, Vec3::new(1.01, 0.0, 0.0)));
    }

    #[test]
    fn test_scaled() {
        assert_eq!(Shape::Cube(10.0).scaled(0.5), Shape::Cube(5.0));
        assert_eq!(Shape::Point.scaled(3.0), Shape::Point);
    }
}
