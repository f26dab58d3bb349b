//! Primitive bounding volumes and their overlap tests
//!
//! Every primitive is centred on its local origin. Tests take
//! `offset = centre(other) - centre(self)`, and touching counts as overlap.

use nalgebra::SVector;

use crate::foundation::math::{Vec2, Vec3};

/// Solid 3D bounding volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    /// Axis-aligned box given by its half extents
    Aabb(Vec3),
    /// Ball given by its radius
    Ball(f32),
}

/// Flat 2D bounding area, used by planar partitions
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Footprint {
    /// Axis-aligned rectangle given by its half extents
    Rect(Vec2),
    /// Disc given by its radius
    Disc(f32),
}

impl Volume {
    /// Check if `other`, placed at `offset` from this volume, overlaps it
    pub fn intersects(&self, other: &Self, offset: Vec3) -> bool {
        match (self, other) {
            (Self::Aabb(a), Self::Aabb(b)) => boxes_overlap(a, b, &offset),
            (Self::Aabb(half), Self::Ball(radius)) | (Self::Ball(radius), Self::Aabb(half)) => {
                box_ball_overlap(half, *radius, &offset)
            }
            (Self::Ball(a), Self::Ball(b)) => balls_overlap(*a, *b, &offset),
        }
    }

    /// Check if `inner`, placed at `offset` from this volume, lies entirely inside it
    pub fn contains(&self, inner: &Self, offset: Vec3) -> bool {
        match (self, inner) {
            (Self::Aabb(outer), Self::Aabb(inner)) => box_contains_box(outer, inner, &offset),
            (Self::Aabb(outer), Self::Ball(radius)) => box_contains_ball(outer, *radius, &offset),
            (Self::Ball(radius), Self::Aabb(half)) => ball_contains_box(*radius, half, &offset),
            (Self::Ball(outer), Self::Ball(inner)) => ball_contains_ball(*outer, *inner, &offset),
        }
    }
}

impl Footprint {
    /// Check if `other`, placed at `offset` from this footprint, overlaps it
    pub fn intersects(&self, other: &Self, offset: Vec2) -> bool {
        match (self, other) {
            (Self::Rect(a), Self::Rect(b)) => boxes_overlap(a, b, &offset),
            (Self::Rect(half), Self::Disc(radius)) | (Self::Disc(radius), Self::Rect(half)) => {
                box_ball_overlap(half, *radius, &offset)
            }
            (Self::Disc(a), Self::Disc(b)) => balls_overlap(*a, *b, &offset),
        }
    }

    /// Check if `inner`, placed at `offset` from this footprint, lies entirely inside it
    pub fn contains(&self, inner: &Self, offset: Vec2) -> bool {
        match (self, inner) {
            (Self::Rect(outer), Self::Rect(inner)) => box_contains_box(outer, inner, &offset),
            (Self::Rect(outer), Self::Disc(radius)) => box_contains_ball(outer, *radius, &offset),
            (Self::Disc(radius), Self::Rect(half)) => ball_contains_box(*radius, half, &offset),
            (Self::Disc(outer), Self::Disc(inner)) => ball_contains_ball(*outer, *inner, &offset),
        }
    }
}

fn boxes_overlap<const D: usize>(a: &SVector<f32, D>, b: &SVector<f32, D>, offset: &SVector<f32, D>) -> bool {
    offset
        .iter()
        .zip(a.iter().zip(b.iter()))
        .all(|(o, (a, b))| o.abs() <= a + b)
}

// Distance from the box surface to the ball centre, same clamp as a radius query
fn box_ball_overlap<const D: usize>(half: &SVector<f32, D>, radius: f32, offset: &SVector<f32, D>) -> bool {
    let outside = offset.zip_map(half, |o, h| (o.abs() - h).max(0.0));
    outside.norm_squared() <= radius * radius
}

fn balls_overlap<const D: usize>(a: f32, b: f32, offset: &SVector<f32, D>) -> bool {
    let radius_sum = a + b;
    offset.norm_squared() <= radius_sum * radius_sum
}

fn box_contains_box<const D: usize>(outer: &SVector<f32, D>, inner: &SVector<f32, D>, offset: &SVector<f32, D>) -> bool {
    offset
        .iter()
        .zip(outer.iter().zip(inner.iter()))
        .all(|(o, (outer, inner))| o.abs() + inner <= *outer)
}

fn box_contains_ball<const D: usize>(outer: &SVector<f32, D>, radius: f32, offset: &SVector<f32, D>) -> bool {
    offset
        .iter()
        .zip(outer.iter())
        .all(|(o, outer)| o.abs() + radius <= *outer)
}

// The farthest corner decides
fn ball_contains_box<const D: usize>(radius: f32, half: &SVector<f32, D>, offset: &SVector<f32, D>) -> bool {
    (offset.abs() + half).norm() <= radius
}

fn ball_contains_ball<const D: usize>(outer: f32, inner: f32, offset: &SVector<f32, D>) -> bool {
    offset.norm() + inner <= outer
}
