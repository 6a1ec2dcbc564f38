//! Eye-tracker and scene collaborators
//!
//! The recorder only sees these traits. Real hardware and engine scenes live
//! behind them; `platform::simulated` provides deterministic stand-ins.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A gaze ray in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub is_valid: bool,
}

impl GazeRay {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            is_valid: true,
        }
    }

    /// Tracker lost the eyes this frame
    pub fn invalid() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::ZERO,
            is_valid: false,
        }
    }

    /// Point at distance `t` along the (normalized) direction
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction.normalize_or_zero() * t
    }
}

/// One frame of eye-tracking data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeTrackingData {
    pub gaze_ray: GazeRay,
    pub is_left_eye_blinking: bool,
    pub is_right_eye_blinking: bool,
}

impl Default for EyeTrackingData {
    fn default() -> Self {
        Self {
            gaze_ray: GazeRay::invalid(),
            is_left_eye_blinking: false,
            is_right_eye_blinking: false,
        }
    }
}

/// Nearest scene hit along a gaze ray
#[derive(Debug, Clone, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub object_name: String,
}

/// Per-frame eye-tracking source
pub trait GazeSensor {
    fn read(&mut self) -> EyeTrackingData;
}

/// Scene raycast
pub trait SceneQuery {
    /// Nearest hit along `ray`, or `None`
    fn raycast(&self, ray: &GazeRay) -> Option<RayHit>;
}

/// A scene with nothing in it
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScene;

impl SceneQuery for EmptyScene {
    fn raycast(&self, _ray: &GazeRay) -> Option<RayHit> {
        None
    }
}
