//! SDF scene for gaze raycasts
//!
//! Puzzle pieces are simple signed-distance primitives. Raycasts sphere-trace
//! the union of all active pieces and report the nearest surface point.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::sensor::{GazeRay, RayHit, SceneQuery};

/// Sphere-tracing step limit
pub const MAX_MARCH_STEPS: usize = 128;
/// Distance treated as a surface hit (meters)
pub const HIT_EPSILON: f32 = 1e-3;
/// Rays that travel this far without a hit are misses (meters)
pub const MAX_RAY_DISTANCE: f32 = 100.0;

/// Signed distance to a sphere
#[inline]
pub fn sd_sphere(p: Vec3, center: Vec3, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Signed distance to an axis-aligned box
#[inline]
pub fn sd_box(p: Vec3, center: Vec3, half_extents: Vec3) -> f32 {
    let q = (p - center).abs() - half_extents;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

/// Shape of a puzzle piece
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Cube { half_extent: f32 },
}

/// A named piece in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub center: Vec3,
    pub shape: Shape,
    /// Inactive objects are invisible to raycasts
    pub active: bool,
}

impl SceneObject {
    pub fn distance(&self, p: Vec3) -> f32 {
        match self.shape {
            Shape::Sphere { radius } => sd_sphere(p, self.center, radius),
            Shape::Cube { half_extent } => sd_box(p, self.center, Vec3::splat(half_extent)),
        }
    }
}

/// Collection of scene objects
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SdfScene {
    pub objects: Vec<SceneObject>,
}

impl SdfScene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Distance to the nearest active object and its index
    fn nearest(&self, p: Vec3) -> Option<(f32, usize)> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.active)
            .map(|(i, o)| (o.distance(p), i))
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Sphere-trace along `ray`; returns (distance along ray, object index)
    pub fn march(&self, ray: &GazeRay) -> Option<(f32, usize)> {
        let dir = ray.direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let mut t = 0.0;
        for _ in 0..MAX_MARCH_STEPS {
            let p = ray.origin + dir * t;
            let (d, index) = self.nearest(p)?;

            if d < HIT_EPSILON {
                return Some((t, index));
            }

            // Step by distance to surface
            t += d;
            if t >= MAX_RAY_DISTANCE {
                break;
            }
        }

        None
    }
}

impl SceneQuery for SdfScene {
    fn raycast(&self, ray: &GazeRay) -> Option<RayHit> {
        let (t, index) = self.march(ray)?;
        Some(RayHit {
            point: ray.at(t),
            object_name: self.objects[index].name.clone(),
        })
    }
}
