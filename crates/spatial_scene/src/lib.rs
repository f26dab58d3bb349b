//! # Spatial Scene
//!
//! Scene graphs that double as spatial indexes.
//!
//! ## Features
//!
//! - **Flat Graph**: One node per entity, arbitrary parenting, brute-force queries
//! - **Quadtree**: Planar partition on XY, XZ or YZ
//! - **Octree**: Volumetric partition with configurable split threshold and depth
//! - **Node Hierarchy**: Cached absolute transforms and free-form node connections
//! - **Scene**: Entity ownership with graceful handling of out-of-bounds entities
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spatial_scene::prelude::*;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = GraphConfig::load_from_file("scene.toml")?;
//!     let mut scene = Scene::new(GraphFactory::new(config).build());
//!
//!     let ship = scene.spawn(
//!         Transform::from_position(Vec3::new(1.0, 0.0, 0.0)).to_matrix(),
//!         vec![Component::bounded(Shape::Sphere(0.5))],
//!     );
//!     for entity in scene.entities_within_bounds(&Shape::Sphere(2.0), Vec3::zeros()) {
//!         println!("{:?} is near the origin", entity.id());
//!     }
//!     scene.despawn(ship);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::cast_precision_loss)]

pub mod foundation;
pub mod bounds;
pub mod entity;
pub mod graph;
pub mod config;
pub mod scene;

pub use scene::Scene;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        Scene,
        foundation::math::{Vec3, Mat4, Transform},
        bounds::{Shape, Plane},
        entity::{Entity, EntityId, Component},
        graph::{SpatialGraph, GraphFactory, GraphError, NodeId, FlatGraph, Quadtree, Octree},
        config::{Config, ConfigError, GraphConfig, GraphKind, PartitionConfig, CollapsePolicy},
    };
}
