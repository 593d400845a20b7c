//! AlignedObservation / TrackedFrame - Synchronizer output
//!
//! The fused stereo + inertial tuple handed to the tracking engine, and the
//! stamped result forwarded to sinks afterwards.

use serde::{Deserialize, Serialize};

use crate::{Frame, ImuSample, Vector3};

/// Stereo pair plus the inertial samples covering its capture instant
///
/// Built for exactly one tracking call and dropped afterwards.
#[derive(Debug, Clone)]
pub struct AlignedObservation {
    /// Left camera frame
    pub left: Frame,

    /// Right camera frame
    pub right: Frame,

    /// Observation time (the left frame's timestamp)
    pub timestamp: f64,

    /// Every buffered IMU sample with timestamp <= `timestamp`, in arrival order
    pub imu_window: Vec<ImuSample>,
}

impl AlignedObservation {
    /// Signed stereo offset (left - right), seconds
    pub fn stereo_offset(&self) -> f64 {
        self.left.timestamp - self.right.timestamp
    }
}

/// Unit quaternion (w, x, y, z)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };
}

/// Rigid camera pose estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation (m)
    pub translation: Vector3,

    /// Orientation
    pub rotation: Quaternion,
}

/// A landmark currently tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Engine-assigned identifier
    pub id: u64,

    /// World position (m)
    pub position: Vector3,
}

/// Tracking engine result
///
/// `pose == None` means the engine lost track or has not initialised; the
/// synchronizer passes it through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingOutput {
    pub pose: Option<Pose>,
    pub tracked_landmarks: Vec<Landmark>,
}

/// Tracking result stamped for downstream consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedFrame {
    /// Dispatch sequence number (monotonically increasing, starts at 1)
    pub frame_id: u64,

    /// Observation time (seconds)
    pub timestamp: f64,

    /// Signed stereo offset of the pair that produced it (left - right)
    pub stereo_offset: f64,

    /// Number of IMU samples in the window
    pub imu_samples: usize,

    /// Parent frame of the pose (e.g. "map")
    pub map_frame_id: String,

    /// Child frame of the pose (e.g. "pose")
    pub pose_frame_id: String,

    /// Engine output, unmodified
    pub output: TrackingOutput,
}
