//! Entity placement records
//!
//! A graph never owns entities. On insert it copies what it needs to
//! answer spatial questions later (id, transform, bounded components), the
//! same way a broad phase caches position and radius per entity.

use crate::bounds::Shape;
use crate::entity::{Entity, EntityId};
use crate::foundation::math::{translation_of, Mat4, Vec3};

/// What a graph node remembers about one entity
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    entity: EntityId,
    transform: Mat4,
    parts: Vec<(Shape, Mat4)>,
}

impl Placement {
    /// Snapshot an entity's spatial data
    pub fn of(entity: &Entity) -> Self {
        Self {
            entity: entity.id(),
            transform: entity.transform,
            parts: entity.bounded_components().collect(),
        }
    }

    /// Entity this record stands for
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Entity transform at the time of the snapshot
    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    /// No bounded component at all
    pub fn is_unbounded(&self) -> bool {
        self.parts.is_empty()
    }

    /// Bounding shapes with their world-space centres under `frame`
    pub fn world_parts<'a>(&'a self, frame: &'a Mat4) -> impl Iterator<Item = (Shape, Vec3)> + 'a {
        self.parts
            .iter()
            .map(move |(shape, local)| (*shape, translation_of(&(frame * local))))
    }

    /// Check if any part overlaps `query` at `position`; unbounded records always do
    ///
    /// `test(a, b, offset)` receives `offset = centre(b) - centre(a)`.
    pub(crate) fn overlaps(
        &self,
        frame: &Mat4,
        query: &Shape,
        position: Vec3,
        test: impl Fn(&Shape, &Shape, Vec3) -> bool,
    ) -> bool {
        self.is_unbounded()
            || self
                .world_parts(frame)
                .any(|(shape, centre)| test(&shape, query, position - centre))
    }

    /// Check if every part lies inside `outer` centred at `outer_centre`
    ///
    /// Unbounded records are never enclosed by anything.
    pub(crate) fn enclosed_by(
        &self,
        frame: &Mat4,
        outer: &Shape,
        outer_centre: Vec3,
        test: impl Fn(&Shape, &Shape, Vec3) -> bool,
    ) -> bool {
        !self.is_unbounded()
            && self
                .world_parts(frame)
                .all(|(shape, centre)| test(outer, &shape, centre - outer_centre))
    }
}
