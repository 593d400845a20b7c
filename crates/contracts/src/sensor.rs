//! Raw sensor records - producer output
//!
//! Camera frames and inertial samples as delivered by the transport layer.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Anything carrying a capture timestamp (seconds, f64).
///
/// Buffers order and compare items exclusively through this trait.
pub trait Timestamped {
    /// Capture time in seconds on the sensor's monotonic clock
    fn timestamp(&self) -> f64;
}

/// Which camera of the stereo rig a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoSide {
    Left,
    Right,
}

impl StereoSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            StereoSide::Left => "left",
            StereoSide::Right => "right",
        }
    }
}

impl std::fmt::Display for StereoSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera frame
///
/// Ownership moves from the producer into the side's slot; the slot keeps
/// at most one unconsumed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Capture timestamp (seconds)
    pub timestamp: f64,

    /// Optional sequence number from the driver (diagnostics only)
    pub sequence: Option<u64>,

    /// Undecoded pixel buffer
    pub image: ImageData,
}

impl Frame {
    pub fn new(timestamp: f64, image: ImageData) -> Self {
        Self {
            timestamp,
            sequence: None,
            image,
        }
    }
}

impl Timestamped for Frame {
    #[inline]
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Raw image as received from the camera driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,

    /// Pixel layout of `data`
    pub format: ImageFormat,

    /// Pixel bytes, row-major, tightly packed (zero-copy)
    pub data: Bytes,
}

impl ImageData {
    /// Expected byte length for the declared geometry and format
    ///
    /// `None` when the declared geometry does not fit in `usize`.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.format.channels())
    }
}

/// Pixel encodings accepted at the decode boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    #[default]
    Mono8,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
}

impl ImageFormat {
    /// Bytes per pixel
    pub fn channels(&self) -> usize {
        match self {
            ImageFormat::Mono8 => 1,
            ImageFormat::Rgb8 | ImageFormat::Bgr8 => 3,
            ImageFormat::Rgba8 | ImageFormat::Bgra8 => 4,
        }
    }
}

/// Inertial sample
///
/// Immutable once created; the IMU queue owns every unconsumed sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    /// Capture timestamp (seconds)
    pub timestamp: f64,

    /// Accelerometer (m/s²)
    pub linear_acceleration: Vector3,

    /// Gyroscope (rad/s)
    pub angular_velocity: Vector3,
}

impl ImuSample {
    pub fn new(timestamp: f64, linear_acceleration: Vector3, angular_velocity: Vector3) -> Self {
        Self {
            timestamp,
            linear_acceleration,
            angular_velocity,
        }
    }
}

impl Timestamped for ImuSample {
    #[inline]
    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}
