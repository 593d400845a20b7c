//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 同步语义场景测试 (对齐 / 等待 / IMU 覆盖)
//! - 多生产者并发下的不重复消费校验
//! - 模拟 e2e 测试（无需硬件）

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use contracts::{
        Frame, GrayImage, ImageData, ImageFormat, ImuSample, TrackingEngine, TrackingOutput,
        Vector3,
    };

    pub fn frame(t: f64) -> Frame {
        Frame::new(
            t,
            ImageData {
                width: 4,
                height: 2,
                format: ImageFormat::Mono8,
                data: Bytes::from(vec![7u8; 8]),
            },
        )
    }

    pub fn imu(t: f64) -> ImuSample {
        ImuSample::new(t, Vector3::new(0.0, 0.0, 9.81), Vector3::default())
    }

    /// One engine call as seen by the engine
    #[derive(Debug, Clone)]
    pub struct Call {
        pub timestamp: f64,
        pub imu: Vec<f64>,
    }

    /// Engine that records its inputs and returns an empty output
    #[derive(Clone, Default)]
    pub struct RecordingEngine {
        pub calls: Arc<Mutex<Vec<Call>>>,
    }

    impl RecordingEngine {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TrackingEngine for RecordingEngine {
        fn track(
            &mut self,
            _left: &GrayImage,
            _right: &GrayImage,
            timestamp: f64,
            imu_window: &[ImuSample],
        ) -> TrackingOutput {
            self.calls.lock().unwrap().push(Call {
                timestamp,
                imu: imu_window.iter().map(|s| s.timestamp).collect(),
            });
            TrackingOutput::default()
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use contracts::SyncConfig;
    use dispatcher::ChannelSink;
    use ingestion::StreamIngest;
    use sync_engine::{SensorBuffers, StepOutcome, Synchronizer};

    use crate::support::{frame, imu, RecordingEngine};

    fn setup(
        tol: f64,
    ) -> (
        StreamIngest,
        Synchronizer<RecordingEngine, ChannelSink>,
        RecordingEngine,
        tokio::sync::mpsc::Receiver<contracts::TrackedFrame>,
    ) {
        let buffers = SensorBuffers::new();
        let ingest = StreamIngest::new(buffers.clone());
        let engine = RecordingEngine::default();
        let (sink, rx) = ChannelSink::channel("results", 16);
        let config = SyncConfig {
            max_time_diff: tol,
            poll_interval_ms: 1,
        };
        let sync = Synchronizer::new(buffers, config, engine.clone(), sink);
        (ingest, sync, engine, rx)
    }

    /// Left/right pairs within tolerance dispatch one after another
    #[test]
    fn test_scenario_a_pairs_align() {
        let (ingest, mut sync, engine, mut rx) = setup(0.01);
        for t in [0.990, 0.995, 1.000, 1.002, 1.004, 1.005, 1.006] {
            ingest.ingest_imu(imu(t));
        }

        ingest.ingest_left(frame(1.000));
        ingest.ingest_right(frame(1.002));
        assert!(sync.step().is_dispatch());

        ingest.ingest_left(frame(1.005));
        ingest.ingest_right(frame(1.006));
        assert!(sync.step().is_dispatch());
        assert_eq!(sync.step(), StepOutcome::Idle);

        let calls = engine.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].timestamp, 1.000);
        assert_eq!(calls[0].imu, vec![0.990, 0.995, 1.000]);
        assert_eq!(calls[1].timestamp, 1.005);
        assert_eq!(calls[1].imu, vec![1.002, 1.004, 1.005]);

        // The sample past the last frame stays queued
        assert_eq!(ingest.buffers().imu.len(), 1);

        let ids: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|f| f.frame_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    /// A stale left frame waits for the right side; nothing is dispatched
    #[test]
    fn test_scenario_b_waits_for_matching_right() {
        let (ingest, mut sync, engine, _rx) = setup(0.01);
        ingest.ingest_imu(imu(2.1));
        ingest.ingest_left(frame(2.000));
        ingest.ingest_right(frame(2.050));

        for _ in 0..10 {
            assert!(matches!(sync.step(), StepOutcome::Misaligned { .. }));
        }
        assert!(engine.calls().is_empty());
        assert_eq!(ingest.buffers().depths(), (1, 1, 1));

        // Left superseded by a frame matching the waiting right frame
        ingest.ingest_left(frame(2.049));
        assert!(sync.step().is_dispatch());
        assert_eq!(engine.calls()[0].timestamp, 2.049);
        assert_eq!(sync.stats().misaligned, 10);
        assert_eq!(ingest.snapshot().left_superseded, 1);
    }

    /// Aligned frames wait until the IMU stream reaches their timestamp
    #[test]
    fn test_scenario_c_waits_for_imu_coverage() {
        let (ingest, mut sync, engine, _rx) = setup(0.01);
        for t in [0.7, 0.8, 0.9] {
            ingest.ingest_imu(imu(t));
        }
        ingest.ingest_left(frame(1.0));
        ingest.ingest_right(frame(1.0));

        assert!(matches!(
            sync.step(),
            StepOutcome::AwaitingImu { imu_back, .. } if imu_back == 0.9
        ));
        assert!(engine.calls().is_empty());

        ingest.ingest_imu(imu(0.99));
        assert!(matches!(sync.step(), StepOutcome::AwaitingImu { .. }));

        ingest.ingest_imu(imu(1.0));
        assert!(sync.step().is_dispatch());
        assert_eq!(engine.calls()[0].imu, vec![0.7, 0.8, 0.9, 0.99, 1.0]);
        assert!(ingest.buffers().imu.is_empty());
    }

    #[test]
    fn test_no_imu_means_idle() {
        let (ingest, mut sync, _engine, _rx) = setup(0.01);
        ingest.ingest_left(frame(1.0));
        ingest.ingest_right(frame(1.0));

        assert_eq!(sync.step(), StepOutcome::Idle);
        assert_eq!(ingest.buffers().depths(), (1, 1, 0));
    }
}

#[cfg(test)]
mod concurrency_tests {
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use contracts::SyncConfig;
    use dispatcher::{Dispatcher, LogSink};
    use ingestion::StreamIngest;
    use rand::Rng;
    use sync_engine::{SensorBuffers, Synchronizer};

    use crate::support::{frame, imu, RecordingEngine};

    const FRAMES: usize = 400;
    const IMU_PER_FRAME: usize = 5;

    /// Three producer threads race the synchronizer thread; every frame and
    /// sample is accounted for exactly once.
    #[test]
    fn test_concurrent_producers_no_double_consumption() {
        let buffers = SensorBuffers::new();
        let ingest = StreamIngest::new(buffers.clone());
        let engine = RecordingEngine::default();
        let sink = Dispatcher::builder().sink(LogSink::new("log").every(100)).build();

        let sync = Synchronizer::new(
            buffers.clone(),
            SyncConfig {
                max_time_diff: 0.004,
                poll_interval_ms: 1,
            },
            engine.clone(),
            sink,
        );
        let handle = sync.spawn(Arc::new(AtomicBool::new(false))).unwrap();

        let spawn_camera = |offset: f64, right: bool| {
            let ingest = ingest.clone();
            thread::spawn(move || {
                let mut rng = rand::rng();
                for i in 0..FRAMES {
                    let f = frame(i as f64 * 0.01 + offset);
                    if right {
                        ingest.ingest_right(f);
                    } else {
                        ingest.ingest_left(f);
                    }
                    if rng.random_bool(0.3) {
                        thread::sleep(Duration::from_micros(rng.random_range(50..400)));
                    }
                }
            })
        };
        let left = spawn_camera(0.0, false);
        let right = spawn_camera(0.001, true);
        let imu_thread = {
            let ingest = ingest.clone();
            thread::spawn(move || {
                for i in 0..FRAMES * IMU_PER_FRAME {
                    ingest.ingest_imu(imu(i as f64 * 0.002));
                    if i % 10 == 0 {
                        thread::sleep(Duration::from_micros(100));
                    }
                }
            })
        };
        for producer in [left, right, imu_thread] {
            producer.join().unwrap();
        }

        // Let the consumer settle on the final pair
        thread::sleep(Duration::from_millis(50));
        let sync = handle.stop().unwrap();
        let stats = sync.stats().clone();
        let snap = ingest.snapshot();
        let calls = engine.calls();

        // Frames: dispatched + evicted + still buffered == received.
        // Single-deep slots never drop stale frames while aligning, so every
        // eviction shows up in the slot's own counter.
        assert_eq!(stats.decode_failures, 0);
        assert_eq!(stats.stale_dropped, 0);
        assert_eq!(stats.dispatched as usize, calls.len());
        for (received, slot) in [
            (snap.left_received, &buffers.left),
            (snap.right_received, &buffers.right),
        ] {
            assert_eq!(
                received,
                stats.dispatched + slot.superseded_count() + slot.len() as u64
            );
        }

        // No frame dispatched twice, in capture order
        let stamps: Vec<f64> = calls.iter().map(|c| c.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]), "{stamps:?}");

        // IMU: every sample drained at most once, windows form an ordered prefix
        let drained: Vec<f64> = calls.iter().flat_map(|c| c.imu.iter().copied()).collect();
        let unique: HashSet<u64> = drained.iter().map(|t| t.to_bits()).collect();
        assert_eq!(unique.len(), drained.len());
        assert!(drained.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            snap.imu_received,
            stats.imu_samples_consumed + buffers.imu.len() as u64
        );
        assert_eq!(snap.imu_out_of_order, 0);

        // Every window respects coverage: nothing newer than its frame
        for call in &calls {
            assert!(call.imu.iter().all(|&t| t <= call.timestamp));
        }

        // The last pair is aligned and covered, so it must have gone out
        assert_eq!(stamps.last().copied(), Some((FRAMES - 1) as f64 * 0.01));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{ImageFormat, SourceConfig, SyncConfig};
    use dispatcher::{ChannelSink, Dispatcher, LogSink};
    use ingestion::{MockStereoRig, StreamIngest};
    use observability::DispatchMetricsAggregator;
    use sync_engine::{ImuDeadReckoning, SensorBuffers, Synchronizer};

    /// End-to-end test: MockStereoRig -> Synchronizer -> Dispatcher
    ///
    /// 验证完整的数据流：
    /// 1. MockStereoRig 生成双目帧和 IMU 数据
    /// 2. Synchronizer 对齐并调用跟踪器
    /// 3. Dispatcher 将 TrackedFrame 分发到 sinks
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_pipeline() {
        let buffers = SensorBuffers::new();
        let ingest = StreamIngest::new(buffers.clone());

        let (results, mut rx) = ChannelSink::channel("results", 128);
        let dispatcher = Dispatcher::builder()
            .sink(LogSink::new("log").every(10))
            .sink(results)
            .build();

        let sync = Synchronizer::new(
            buffers.clone(),
            SyncConfig::default(),
            ImuDeadReckoning::new(),
            dispatcher,
        );
        let handle = sync.spawn(Arc::new(AtomicBool::new(false))).unwrap();

        let rig = MockStereoRig::new(SourceConfig {
            camera_hz: 100.0,
            imu_hz: 1000.0,
            stereo_skew_s: 0.002,
            jitter_s: 0.0005,
            image_width: 16,
            image_height: 8,
            image_format: ImageFormat::Bgra8,
        });
        let producers = rig.start(ingest.clone());

        let target = 10u64;
        let mut aggregator = DispatchMetricsAggregator::new();
        let collected = tokio::time::timeout(Duration::from_secs(10), async {
            while let Some(frame) = rx.recv().await {
                aggregator.update(&frame);
                if aggregator.total_frames >= target {
                    break;
                }
            }
        })
        .await;
        assert!(collected.is_ok(), "timed out waiting for results");

        rig.stop();
        for producer in producers {
            producer.await.unwrap();
        }
        let sync = handle.stop().unwrap();

        let summary = aggregator.summary();
        assert_eq!(summary.total_frames, target);
        assert_eq!(summary.non_monotonic, 0);
        // Dead reckoning has a pose as soon as it has seen IMU data
        assert_eq!(summary.frames_without_pose, 0);
        assert!(summary.imu_window.mean > 0.0);
        assert!(summary.stereo_offset_ms.max <= 10.0);

        assert_eq!(sync.stats().decode_failures, 0);
        assert!(sync.stats().dispatched >= target);
        assert_eq!(sync.engine().samples_integrated(), sync.stats().imu_samples_consumed);
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use config_loader::ConfigLoader;
    use contracts::ImageFormat;
    use sync_engine::{SensorBuffers, Synchronizer};

    use crate::support::{frame, imu, RecordingEngine};

    #[test]
    fn test_config_file_drives_synchronizer() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[sync]
max_time_diff = 0.001

[frames]
map_frame_id = "world"
pose_frame_id = "body"

[source]
image_format = "rgb8"
"#
        )
        .unwrap();

        let node = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(node.source.image_format, ImageFormat::Rgb8);

        let buffers = SensorBuffers::new();
        let (sink, mut rx) = dispatcher::ChannelSink::channel("results", 4);
        let mut sync = Synchronizer::new(
            buffers.clone(),
            node.sync.clone(),
            RecordingEngine::default(),
            sink,
        )
        .with_frame_ids(node.frames.clone());

        buffers.imu.push(imu(1.0));
        // 2 ms apart: outside the 1 ms tolerance from the file
        buffers.left.put(frame(1.0));
        buffers.right.put(frame(1.002));
        assert!(!sync.step().is_dispatch());

        buffers.right.put(frame(1.0005));
        assert!(sync.step().is_dispatch());

        let tracked = rx.try_recv().unwrap();
        assert_eq!(tracked.map_frame_id, "world");
        assert_eq!(tracked.pose_frame_id, "body");
        assert!((tracked.stereo_offset + 0.0005).abs() < 1e-12);
    }
}
