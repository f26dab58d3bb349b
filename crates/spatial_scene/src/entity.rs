//! Entities as seen by the scene graph
//!
//! The graph only needs two things from an entity: its transform and the
//! bounding shapes of its components. Everything else an engine attaches
//! to an entity is invisible here.

use crate::bounds::Shape;
use crate::foundation::math::{translation, Mat4, Vec3};

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Create an entity identifier from a raw value
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw identifier
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Component data relevant to spatial partitioning
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Bounding shape, `None` for components with no spatial extent
    pub bounds: Option<Shape>,

    /// Transform relative to the owning entity
    pub transform: Mat4,
}

impl Component {
    /// Component with a bounding shape centred on the entity
    pub fn bounded(shape: Shape) -> Self {
        Self {
            bounds: Some(shape),
            transform: Mat4::identity(),
        }
    }

    /// Component with no bounding shape
    pub fn unbounded() -> Self {
        Self {
            bounds: None,
            transform: Mat4::identity(),
        }
    }

    /// Offset this component from the entity origin
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.transform = translation(offset);
        self
    }
}

/// Entity: a transform plus a list of components
///
/// `transform` is the world transform for spatial partitions. In a flat
/// hierarchy it is relative to the parent entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,

    /// Entity transform
    pub transform: Mat4,

    /// Components in attachment order
    pub components: Vec<Component>,
}

impl Entity {
    /// Create an entity at the origin with no components
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            transform: Mat4::identity(),
            components: Vec::new(),
        }
    }

    /// Get the entity identifier
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Builder: set the transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Builder: place the entity at `position`
    pub fn at(self, position: Vec3) -> Self {
        self.with_transform(translation(position))
    }

    /// Builder: attach a component
    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    /// Iterate over the bounding shapes and their component transforms
    pub fn bounded_components(&self) -> impl Iterator<Item = (Shape, Mat4)> + '_ {
        self.components
            .iter()
            .filter_map(|component| component.bounds.map(|shape| (shape, component.transform)))
    }
}
