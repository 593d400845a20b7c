//! Collaborator traits on either side of the synchronizer
//!
//! - `TrackingEngine`: the pose estimator invoked once per aligned observation
//! - `PoseSink`: whatever consumes the stamped results (publishers, logs, tests)

use image::GrayImage;

use crate::{ContractError, ImuSample, TrackedFrame, TrackingOutput};

/// Visual-inertial tracking engine
///
/// Called synchronously from the synchronizer thread, one observation at a
/// time. The synchronizer holds no buffer lock during the call.
pub trait TrackingEngine: Send {
    /// Track one stereo pair
    ///
    /// # Arguments
    /// * `left` / `right` - decoded 8-bit grayscale images
    /// * `timestamp` - observation time (seconds)
    /// * `imu_window` - inertial samples up to `timestamp`, oldest first
    fn track(
        &mut self,
        left: &GrayImage,
        right: &GrayImage,
        timestamp: f64,
        imu_window: &[ImuSample],
    ) -> TrackingOutput;
}

impl<T: TrackingEngine + ?Sized> TrackingEngine for Box<T> {
    fn track(
        &mut self,
        left: &GrayImage,
        right: &GrayImage,
        timestamp: f64,
        imu_window: &[ImuSample],
    ) -> TrackingOutput {
        (**self).track(left, right, timestamp, imu_window)
    }
}

/// Downstream consumer of tracking results
pub trait PoseSink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver one stamped result
    ///
    /// # Errors
    /// Returns a write error; the synchronizer logs it and keeps running.
    fn publish(&mut self, frame: &TrackedFrame) -> Result<(), ContractError>;

    /// Flush and release resources
    fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}

impl<T: PoseSink + ?Sized> PoseSink for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn publish(&mut self, frame: &TrackedFrame) -> Result<(), ContractError> {
        (**self).publish(frame)
    }

    fn close(&mut self) -> Result<(), ContractError> {
        (**self).close()
    }
}
