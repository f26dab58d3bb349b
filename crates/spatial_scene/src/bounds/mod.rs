//! Bounding shapes for spatial partitioning
//!
//! Node capacity and entity extents are both described by a [`Shape`].
//! Shapes carry no position: every test takes the offset between the two
//! shape centres, so the same shape can be reused at any place in the graph.
//!
//! # Module Organization
//!
//! - [`primitives`] - 3D volumes (AABB, ball) and 2D footprints (rect, disc)
//! - [`shape`] - The user-facing [`Shape`] and the cardinal [`Plane`]s

pub mod primitives;
pub mod shape;

pub use primitives::{Footprint, Volume};
pub use shape::{Plane, Shape};
