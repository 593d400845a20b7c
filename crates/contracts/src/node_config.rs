//! Node configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::ImageFormat;

/// Default stereo alignment tolerance (seconds)
pub const DEFAULT_MAX_TIME_DIFF: f64 = 0.01;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Synchronizer tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Coordinate frame names stamped on results
    #[serde(default)]
    pub frames: FrameIds,

    /// Mock stereo-inertial rig
    #[serde(default)]
    pub source: SourceConfig,
}

/// Synchronizer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum |left - right| timestamp gap for a stereo pair (seconds)
    pub max_time_diff: f64,

    /// Consumer sleep when nothing can be dispatched (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_time_diff: DEFAULT_MAX_TIME_DIFF,
            poll_interval_ms: 1,
        }
    }
}

impl SyncConfig {
    /// Idle sleep as a `Duration`
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

/// Coordinate frame identifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameIds {
    /// Parent (world) frame
    pub map_frame_id: String,
    /// Child (camera body) frame
    pub pose_frame_id: String,
}

impl Default for FrameIds {
    fn default() -> Self {
        Self {
            map_frame_id: "map".to_string(),
            pose_frame_id: "pose".to_string(),
        }
    }
}

/// Mock stereo-inertial rig configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Camera rate, both sides (Hz)
    pub camera_hz: f64,

    /// IMU rate (Hz)
    pub imu_hz: f64,

    /// Fixed right-camera delay relative to the left (seconds)
    pub stereo_skew_s: f64,

    /// Uniform timestamp jitter amplitude (seconds)
    pub jitter_s: f64,

    /// Frame width (pixels)
    pub image_width: u32,

    /// Frame height (pixels)
    pub image_height: u32,

    /// Pixel encoding produced by the rig
    pub image_format: ImageFormat,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            camera_hz: 20.0,
            imu_hz: 200.0,
            stereo_skew_s: 0.002,
            jitter_s: 0.0005,
            image_width: 64,
            image_height: 48,
            image_format: ImageFormat::Mono8,
        }
    }
}
