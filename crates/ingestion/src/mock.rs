//! Mock 立体相机 + IMU 源
//!
//! 用于无硬件环境的测试。每个传感器一个 tokio 任务，按标称时钟节拍
//! 调用 [`StreamIngest`]，行为与真实驱动回调一致。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use contracts::{Frame, ImageData, ImuSample, SourceConfig, StereoSide, Vector3};
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::stream::StreamIngest;

/// Yaw rate reported by the mock gyro (rad/s)
const MOCK_YAW_RATE: f64 = 0.1;

/// Mock stereo rig
///
/// Left frames are stamped on the nominal camera grid, right frames are
/// offset by `stereo_skew_s`, both with uniform jitter of `±jitter_s`.
/// IMU samples are jitter-free so the queue stays ordered.
pub struct MockStereoRig {
    config: SourceConfig,
    running: Arc<AtomicBool>,
}

impl MockStereoRig {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 启动三个生产者任务
    ///
    /// Returns one handle per producer (left, right, imu); each resolves to
    /// the number of items it delivered once [`stop`](Self::stop) is called.
    pub fn start(&self, ingest: StreamIngest) -> Vec<JoinHandle<u64>> {
        self.running.store(true, Ordering::SeqCst);
        let origin = Instant::now();

        debug!(
            camera_hz = self.config.camera_hz,
            imu_hz = self.config.imu_hz,
            skew_s = self.config.stereo_skew_s,
            format = ?self.config.image_format,
            "mock stereo rig started"
        );

        let mut handles = Vec::with_capacity(3);
        for side in [StereoSide::Left, StereoSide::Right] {
            handles.push(tokio::spawn(run_camera(
                side,
                self.config.clone(),
                ingest.clone(),
                self.running.clone(),
                origin,
            )));
        }
        handles.push(tokio::spawn(run_imu(
            self.config.imu_hz,
            ingest,
            self.running.clone(),
            origin,
        )));
        handles
    }

    /// 停止所有生产者
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

async fn run_camera(
    side: StereoSide,
    config: SourceConfig,
    ingest: StreamIngest,
    running: Arc<AtomicBool>,
    origin: Instant,
) -> u64 {
    let period = 1.0 / config.camera_hz;
    let offset = match side {
        StereoSide::Left => 0.0,
        StereoSide::Right => config.stereo_skew_s,
    };
    let mut sequence: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let nominal = sequence as f64 * period + offset;
        tokio::time::sleep_until(origin + Duration::from_secs_f64(nominal)).await;
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let timestamp = (nominal + jitter(config.jitter_s)).max(0.0);
        let frame = Frame {
            timestamp,
            sequence: Some(sequence),
            image: synthetic_image(&config, sequence),
        };
        match side {
            StereoSide::Left => ingest.ingest_left(frame),
            StereoSide::Right => ingest.ingest_right(frame),
        }
        trace!(%side, sequence, timestamp, "mock frame delivered");
        sequence += 1;
    }

    debug!(%side, delivered = sequence, "mock camera stopped");
    sequence
}

async fn run_imu(
    imu_hz: f64,
    ingest: StreamIngest,
    running: Arc<AtomicBool>,
    origin: Instant,
) -> u64 {
    let period = 1.0 / imu_hz;
    let mut index: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let timestamp = index as f64 * period;
        tokio::time::sleep_until(origin + Duration::from_secs_f64(timestamp)).await;
        if !running.load(Ordering::Relaxed) {
            break;
        }

        // 静止 + 匀速偏航
        ingest.ingest_imu(ImuSample::new(
            timestamp,
            Vector3::new(0.0, 0.0, 9.81),
            Vector3::new(0.0, 0.0, MOCK_YAW_RATE),
        ));
        index += 1;
    }

    debug!(delivered = index, "mock imu stopped");
    index
}

fn jitter(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rand::rng().random_range(-amplitude..=amplitude)
    } else {
        0.0
    }
}

/// Moving gradient in the configured pixel format
fn synthetic_image(config: &SourceConfig, sequence: u64) -> ImageData {
    let mut image = ImageData {
        width: config.image_width,
        height: config.image_height,
        format: config.image_format,
        data: Bytes::new(),
    };
    let shift = (sequence % 256) as usize;
    let pixels: Vec<u8> = (0..image.expected_len().unwrap_or(0))
        .map(|i| ((i + shift) % 256) as u8)
        .collect();
    image.data = Bytes::from(pixels);
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ImageFormat;
    use sync_engine::SensorBuffers;

    fn fast_config() -> SourceConfig {
        SourceConfig {
            camera_hz: 200.0,
            imu_hz: 1000.0,
            stereo_skew_s: 0.001,
            jitter_s: 0.0001,
            image_width: 8,
            image_height: 4,
            image_format: ImageFormat::Bgr8,
        }
    }

    #[test]
    fn test_synthetic_image_matches_geometry() {
        let config = fast_config();
        let image = synthetic_image(&config, 3);

        assert_eq!(image.data.len(), 8 * 4 * 3);
        assert_eq!(image.data[0], 3);
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        assert_eq!(jitter(0.0), 0.0);
        let j = jitter(0.001);
        assert!((-0.001..=0.001).contains(&j));
    }

    #[tokio::test]
    async fn test_mock_rig_feeds_buffers() {
        let buffers = SensorBuffers::new();
        let ingest = StreamIngest::new(buffers.clone());
        let rig = MockStereoRig::new(fast_config());

        let handles = rig.start(ingest.clone());
        assert!(rig.is_running());
        tokio::time::sleep(Duration::from_millis(100)).await;
        rig.stop();

        let mut delivered = Vec::new();
        for handle in handles {
            delivered.push(handle.await.unwrap());
        }

        let snap = ingest.snapshot();
        assert_eq!(snap.left_received, delivered[0]);
        assert_eq!(snap.right_received, delivered[1]);
        assert_eq!(snap.imu_received, delivered[2]);
        assert!(snap.left_received > 0);
        assert!(snap.imu_received > snap.left_received);
        assert_eq!(snap.imu_out_of_order, 0);

        // Nothing consumed: only the newest frame per side survives
        assert_eq!(snap.left_superseded, snap.left_received - 1);
        assert_eq!(buffers.imu.len() as u64, snap.imu_received);
    }
}
