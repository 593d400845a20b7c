//! 分发结果指标收集模块
//!
//! 基于 TrackedFrame 收集和统计同步管线的运行指标。

use contracts::TrackedFrame;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Register help text for every metric the pipeline emits
pub fn describe_metrics() {
    describe_counter!("stereo_sync_frames_received_total", "Camera frames accepted per side");
    describe_counter!(
        "stereo_sync_frames_superseded_total",
        "Unconsumed frames overwritten by a newer one"
    );
    describe_counter!(
        "stereo_sync_frames_rejected_total",
        "Frames refused at ingest (non-finite timestamp)"
    );
    describe_counter!("stereo_sync_imu_samples_received_total", "IMU samples accepted");
    describe_counter!(
        "stereo_sync_imu_out_of_order_total",
        "IMU samples older than the queue tail"
    );
    describe_counter!(
        "stereo_sync_imu_rejected_total",
        "IMU samples refused at ingest (non-finite timestamp)"
    );
    describe_counter!(
        "stereo_sync_observations_total",
        "Observations handed to the tracking engine"
    );
    describe_counter!(
        "stereo_sync_deferrals_total",
        "Synchronizer iterations that did not dispatch"
    );
    describe_counter!("stereo_sync_decode_failures_total", "Frames dropped on decode failure");
    describe_counter!("stereo_sync_tracking_lost_total", "Engine results without a pose");
    describe_counter!("stereo_sync_results_without_pose_total", "Consumed results without a pose");
    describe_counter!("stereo_sync_sink_failures_total", "Sink publish failures");
    describe_gauge!("stereo_sync_buffer_depth", "Items buffered per stream");
    describe_gauge!("stereo_sync_last_frame_id", "Frame id of the latest result");
    describe_gauge!("stereo_sync_last_timestamp_s", "Capture time of the latest result");
    describe_histogram!("stereo_sync_imu_window_len", "IMU samples per observation");
    describe_histogram!(
        "stereo_sync_stereo_offset_ms",
        "Absolute left/right offset per observation"
    );
    describe_histogram!("stereo_sync_tracking_duration_ms", "Tracking engine call duration");
    describe_histogram!("stereo_sync_tracked_landmarks", "Landmarks tracked per result");
}

/// 从 TrackedFrame 记录指标
///
/// 在结果消费端（非同步线程）为每个结果调用。
pub fn record_tracked_frame(frame: &TrackedFrame) {
    gauge!("stereo_sync_last_frame_id").set(frame.frame_id as f64);
    gauge!("stereo_sync_last_timestamp_s").set(frame.timestamp);

    // 位姿
    match &frame.output.pose {
        Some(pose) => {
            gauge!("stereo_sync_pose_x_m").set(pose.translation.x);
            gauge!("stereo_sync_pose_y_m").set(pose.translation.y);
            gauge!("stereo_sync_pose_z_m").set(pose.translation.z);
        }
        None => counter!("stereo_sync_results_without_pose_total").increment(1),
    }

    histogram!("stereo_sync_tracked_landmarks").record(frame.output.tracked_landmarks.len() as f64);
}

/// 记录缓冲区深度
pub fn record_buffer_depths(left: usize, right: usize, imu: usize) {
    gauge!("stereo_sync_buffer_depth", "stream" => "left").set(left as f64);
    gauge!("stereo_sync_buffer_depth", "stream" => "right").set(right as f64);
    gauge!("stereo_sync_buffer_depth", "stream" => "imu").set(imu as f64);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchMetricsAggregator {
    /// 总结果数
    pub total_frames: u64,

    /// 无位姿的结果数
    pub frames_without_pose: u64,

    /// 时间戳未递增的结果数
    pub non_monotonic: u64,

    /// 帧号跳变次数 (frame_id 不连续)
    pub frame_id_gaps: u64,

    /// IMU 窗口长度统计
    pub imu_window: RunningStats,

    /// 双目时间差统计 (毫秒, 绝对值)
    pub stereo_offset_ms: RunningStats,

    /// 相邻结果时间间隔统计 (毫秒)
    pub interval_ms: RunningStats,

    last_timestamp: Option<f64>,
    last_frame_id: Option<u64>,
}

impl DispatchMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, frame: &TrackedFrame) {
        self.total_frames += 1;

        if frame.output.pose.is_none() {
            self.frames_without_pose += 1;
        }

        if let Some(last) = self.last_timestamp {
            if frame.timestamp > last {
                self.interval_ms.push((frame.timestamp - last) * 1000.0);
            } else {
                self.non_monotonic += 1;
            }
        }
        if let Some(last_id) = self.last_frame_id {
            if frame.frame_id != last_id + 1 {
                self.frame_id_gaps += 1;
            }
        }
        self.last_timestamp = Some(frame.timestamp);
        self.last_frame_id = Some(frame.frame_id);

        self.imu_window.push(frame.imu_samples as f64);
        self.stereo_offset_ms.push(frame.stereo_offset.abs() * 1000.0);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            total_frames: self.total_frames,
            frames_without_pose: self.frames_without_pose,
            non_monotonic: self.non_monotonic,
            frame_id_gaps: self.frame_id_gaps,
            lost_rate: if self.total_frames > 0 {
                self.frames_without_pose as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            imu_window: StatsSummary::from(&self.imu_window),
            stereo_offset_ms: StatsSummary::from(&self.stereo_offset_ms),
            interval_ms: StatsSummary::from(&self.interval_ms),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_frames: u64,
    pub frames_without_pose: u64,
    pub non_monotonic: u64,
    pub frame_id_gaps: u64,
    pub lost_rate: f64,
    pub imu_window: StatsSummary,
    pub stereo_offset_ms: StatsSummary,
    pub interval_ms: StatsSummary,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Results: {}", self.total_frames)?;
        writeln!(
            f,
            "Without pose: {} ({:.2}%)",
            self.frames_without_pose, self.lost_rate
        )?;
        if self.non_monotonic > 0 || self.frame_id_gaps > 0 {
            writeln!(
                f,
                "Ordering anomalies: {} non-monotonic, {} id gaps",
                self.non_monotonic, self.frame_id_gaps
            )?;
        }
        writeln!(f, "IMU window (samples): {}", self.imu_window)?;
        writeln!(f, "Stereo offset (ms): {}", self.stereo_offset_ms)?;
        writeln!(f, "Result interval (ms): {}", self.interval_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// 在线统计 (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
