//! LogSink - logs tracking results via tracing

use contracts::{ContractError, PoseSink, TrackedFrame};
use tracing::{info, instrument};

/// Sink that logs one summary line per tracked frame
pub struct LogSink {
    name: String,
    /// Log every n-th frame only (1 = all)
    every: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            every: 1,
        }
    }

    /// Thin the log to every `n`-th frame
    pub fn every(mut self, n: u64) -> Self {
        self.every = n.max(1);
        self
    }

    fn should_log(&self, frame: &TrackedFrame) -> bool {
        frame.frame_id % self.every == 0
    }
}

impl PoseSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_publish",
        skip(self, frame),
        fields(sink = %self.name, frame_id = frame.frame_id)
    )]
    fn publish(&mut self, frame: &TrackedFrame) -> Result<(), ContractError> {
        if !self.should_log(frame) {
            return Ok(());
        }

        match &frame.output.pose {
            Some(pose) => info!(
                sink = %self.name,
                frame_id = frame.frame_id,
                timestamp = frame.timestamp,
                imu_samples = frame.imu_samples,
                frame = %frame.pose_frame_id,
                parent = %frame.map_frame_id,
                x = pose.translation.x,
                y = pose.translation.y,
                z = pose.translation.z,
                landmarks = frame.output.tracked_landmarks.len(),
                "pose"
            ),
            None => info!(
                sink = %self.name,
                frame_id = frame.frame_id,
                timestamp = frame.timestamp,
                imu_samples = frame.imu_samples,
                "tracking lost"
            ),
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
