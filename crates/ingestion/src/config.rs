//! Ingestion counters

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::StereoSide;

/// Ingestion metrics
///
/// Updated lock-free from producer contexts.
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Left frames received
    pub left_received: AtomicU64,

    /// Right frames received
    pub right_received: AtomicU64,

    /// IMU samples received
    pub imu_received: AtomicU64,

    /// Left frames replaced before consumption
    pub left_superseded: AtomicU64,

    /// Right frames replaced before consumption
    pub right_superseded: AtomicU64,

    /// IMU samples older than their predecessor
    pub imu_out_of_order: AtomicU64,

    /// Frames refused for a non-finite timestamp (not counted as received)
    pub frames_rejected: AtomicU64,

    /// IMU samples refused for a non-finite timestamp (not counted as received)
    pub imu_rejected: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame received
    pub fn record_frame(&self, side: StereoSide) {
        match side {
            StereoSide::Left => &self.left_received,
            StereoSide::Right => &self.right_received,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame evicted by a newer one
    pub fn record_superseded(&self, side: StereoSide) {
        match side {
            StereoSide::Left => &self.left_superseded,
            StereoSide::Right => &self.right_superseded,
        }
        .fetch_add(1, Ordering::Relaxed);
    }

    /// Record IMU sample received
    pub fn record_imu(&self) {
        self.imu_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record out-of-order IMU delivery
    pub fn record_out_of_order(&self) {
        self.imu_out_of_order.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame refused at the entry point
    pub fn record_frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an IMU sample refused at the entry point
    pub fn record_imu_rejected(&self) {
        self.imu_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            left_received: self.left_received.load(Ordering::Relaxed),
            right_received: self.right_received.load(Ordering::Relaxed),
            imu_received: self.imu_received.load(Ordering::Relaxed),
            left_superseded: self.left_superseded.load(Ordering::Relaxed),
            right_superseded: self.right_superseded.load(Ordering::Relaxed),
            imu_out_of_order: self.imu_out_of_order.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            imu_rejected: self.imu_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub left_received: u64,
    pub right_received: u64,
    pub imu_received: u64,
    pub left_superseded: u64,
    pub right_superseded: u64,
    pub imu_out_of_order: u64,
    pub frames_rejected: u64,
    pub imu_rejected: u64,
}

impl MetricsSnapshot {
    /// Frames received on both sides
    pub fn frames_received(&self) -> u64 {
        self.left_received + self.right_received
    }

    /// Frames evicted on both sides
    pub fn frames_superseded(&self) -> u64 {
        self.left_superseded + self.right_superseded
    }
}
