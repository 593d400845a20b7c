//! Producer entry points

use std::sync::Arc;

use contracts::{Frame, ImuSample, StereoSide};
use sync_engine::SensorBuffers;
use tracing::{trace, warn};

use crate::config::{IngestionMetrics, MetricsSnapshot};

/// Producer-facing handle onto the shared buffers
///
/// Cheap to clone; hand one clone to each sensor callback. Every entry point
/// holds one buffer lock for a constant-time operation and returns.
#[derive(Debug, Clone)]
pub struct StreamIngest {
    buffers: Arc<SensorBuffers>,
    metrics: Arc<IngestionMetrics>,
}

impl StreamIngest {
    pub fn new(buffers: Arc<SensorBuffers>) -> Self {
        Self::with_metrics(buffers, Arc::new(IngestionMetrics::new()))
    }

    /// Share an existing metrics instance
    pub fn with_metrics(buffers: Arc<SensorBuffers>, metrics: Arc<IngestionMetrics>) -> Self {
        Self { buffers, metrics }
    }

    /// Left camera callback
    #[inline]
    pub fn ingest_left(&self, frame: Frame) {
        self.ingest_frame(StereoSide::Left, frame);
    }

    /// Right camera callback
    #[inline]
    pub fn ingest_right(&self, frame: Frame) {
        self.ingest_frame(StereoSide::Right, frame);
    }

    /// IMU callback
    ///
    /// Samples are expected in non-decreasing timestamp order. A violation is
    /// counted and logged; the sample is still queued in arrival order.
    /// Samples with a NaN or infinite timestamp are refused.
    pub fn ingest_imu(&self, sample: ImuSample) {
        let timestamp = sample.timestamp;
        if !timestamp.is_finite() {
            self.metrics.record_imu_rejected();
            metrics::counter!("stereo_sync_imu_rejected_total").increment(1);
            warn!(timestamp, "imu sample with non-finite timestamp rejected");
            return;
        }
        self.metrics.record_imu();
        metrics::counter!("stereo_sync_imu_samples_received_total").increment(1);

        if !self.buffers.imu.push(sample) {
            self.metrics.record_out_of_order();
            metrics::counter!("stereo_sync_imu_out_of_order_total").increment(1);
            warn!(timestamp, "imu sample older than its predecessor");
        }
    }

    fn ingest_frame(&self, side: StereoSide, frame: Frame) {
        let timestamp = frame.timestamp;
        // 无法与另一侧比较，不进入槽位
        if !timestamp.is_finite() {
            self.metrics.record_frame_rejected();
            metrics::counter!("stereo_sync_frames_rejected_total", "side" => side.as_str())
                .increment(1);
            warn!(%side, timestamp, "frame with non-finite timestamp rejected");
            return;
        }
        let slot = match side {
            StereoSide::Left => &self.buffers.left,
            StereoSide::Right => &self.buffers.right,
        };

        self.metrics.record_frame(side);
        metrics::counter!("stereo_sync_frames_received_total", "side" => side.as_str())
            .increment(1);

        if let Some(stale) = slot.put(frame) {
            self.metrics.record_superseded(side);
            metrics::counter!("stereo_sync_frames_superseded_total", "side" => side.as_str())
                .increment(1);
            trace!(
                %side,
                timestamp,
                superseded = stale.timestamp,
                "unconsumed frame replaced"
            );
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn buffers(&self) -> &Arc<SensorBuffers> {
        &self.buffers
    }
}
