//! IMU dead-reckoning reference tracker.
//!
//! Stands in for a visual-inertial engine when running the pipeline without
//! one: integrates each IMU window (gyro → orientation, gravity-compensated
//! accel → velocity → position) and ignores the images.

use contracts::{GrayImage, ImuSample, Pose, Quaternion, TrackingEngine, TrackingOutput};
use nalgebra::{UnitQuaternion, Vector3};
use tracing::trace;

/// Standard gravity (m/s²)
const GRAVITY: f64 = 9.81;

/// Strapdown integrator over consecutive IMU windows
#[derive(Debug, Clone)]
pub struct ImuDeadReckoning {
    orientation: UnitQuaternion<f64>,
    velocity: Vector3<f64>,
    position: Vector3<f64>,
    gravity: Vector3<f64>,
    last_sample_t: Option<f64>,
    samples_integrated: u64,
}

impl Default for ImuDeadReckoning {
    fn default() -> Self {
        Self::new()
    }
}

impl ImuDeadReckoning {
    pub fn new() -> Self {
        Self {
            orientation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            position: Vector3::zeros(),
            gravity: Vector3::new(0.0, 0.0, -GRAVITY),
            last_sample_t: None,
            samples_integrated: 0,
        }
    }

    /// Number of samples folded into the state so far
    pub fn samples_integrated(&self) -> u64 {
        self.samples_integrated
    }

    fn integrate(&mut self, sample: &ImuSample) {
        let dt = match self.last_sample_t {
            Some(last) => (sample.timestamp - last).max(0.0),
            None => 0.0,
        };
        self.last_sample_t = Some(sample.timestamp);
        self.samples_integrated += 1;

        if dt == 0.0 {
            return;
        }

        let gyro = to_na(&sample.angular_velocity);
        let specific_force = to_na(&sample.linear_acceleration);

        self.orientation *= UnitQuaternion::from_scaled_axis(gyro * dt);
        let accel_world = self.orientation * specific_force + self.gravity;

        self.position += self.velocity * dt + accel_world * (0.5 * dt * dt);
        self.velocity += accel_world * dt;
    }

    fn pose(&self) -> Pose {
        let q = self.orientation.quaternion();
        Pose {
            translation: contracts::Vector3::new(self.position.x, self.position.y, self.position.z),
            rotation: Quaternion {
                w: q.w,
                x: q.i,
                y: q.j,
                z: q.k,
            },
        }
    }
}

impl TrackingEngine for ImuDeadReckoning {
    fn track(
        &mut self,
        _left: &GrayImage,
        _right: &GrayImage,
        timestamp: f64,
        imu_window: &[ImuSample],
    ) -> TrackingOutput {
        for sample in imu_window {
            self.integrate(sample);
        }
        trace!(
            timestamp,
            window = imu_window.len(),
            total = self.samples_integrated,
            "dead-reckoning step"
        );

        // No pose until at least one sample has been seen
        let pose = self.last_sample_t.map(|_| self.pose());
        TrackingOutput {
            pose,
            tracked_landmarks: Vec::new(),
        }
    }
}

#[inline]
fn to_na(v: &contracts::Vector3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}
