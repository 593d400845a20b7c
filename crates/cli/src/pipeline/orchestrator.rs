//! Pipeline orchestrator - wires the mock rig, the synchronizer and the sinks.
//!
//! Producers run as tokio tasks, the synchronizer on its own OS thread, and
//! the result consumer (metrics + statistics) on the runtime.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use config_loader::NodeConfig;
use contracts::TrackedFrame;
use dispatcher::{ChannelSink, Dispatcher, LogSink};
use ingestion::{MockStereoRig, StreamIngest};
use observability::{record_buffer_depths, record_tracked_frame, DispatchMetricsAggregator};
use sync_engine::{ImuDeadReckoning, SensorBuffers, Synchronizer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{PipelineStats, StopReason};
use crate::error::CliError;

/// Interval between buffer depth samples
const DEPTH_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated node configuration
    pub node: NodeConfig,

    /// Maximum number of tracked frames (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Result channel capacity
    pub buffer_size: usize,

    /// Log every n-th result
    pub log_every: u64,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `shutdown` resolves, the frame limit or the timeout is hit
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let node = &self.config.node;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!(port, "Metrics endpoint available");
        }

        // Shared buffers + producer handle
        let buffers = SensorBuffers::new();
        let ingest = StreamIngest::new(buffers.clone());

        // Sinks
        let (results_sink, mut results_rx) = ChannelSink::channel("results", self.config.buffer_size);
        let dispatcher = Dispatcher::builder()
            .sink(LogSink::new("log").every(self.config.log_every))
            .sink(results_sink)
            .build();

        // Synchronizer thread
        let synchronizer = Synchronizer::new(
            buffers.clone(),
            node.sync.clone(),
            ImuDeadReckoning::new(),
            dispatcher,
        )
        .with_frame_ids(node.frames.clone());

        let stop_flag = Arc::new(AtomicBool::new(false));
        let sync_handle = synchronizer
            .spawn(stop_flag)
            .context("Failed to start synchronizer thread")?;
        info!("Synchronizer started");

        // Producers last, so nothing is buffered before the consumer runs
        let rig = MockStereoRig::new(node.source.clone());
        let producers = rig.start(ingest.clone());
        info!(max_frames = ?self.config.max_frames, "Pipeline running (MOCK mode)");

        let mut aggregator = DispatchMetricsAggregator::new();
        let stop_reason = self
            .consume(&mut results_rx, &buffers, &mut aggregator, shutdown)
            .await;

        // Shutdown: producers first, then the consumer thread
        info!(reason = %stop_reason, "Shutting down pipeline...");
        rig.stop();
        for producer in producers {
            if let Err(e) = producer.await {
                warn!(error = %e, "Producer task failed");
            }
        }

        let synchronizer = sync_handle
            .stop()
            .map_err(|_| CliError::pipeline_execution("synchronizer thread panicked"))?;

        // Results published between the consumer stopping and the thread exiting
        while let Ok(frame) = results_rx.try_recv() {
            aggregator.update(&frame);
        }

        let stats = PipelineStats {
            sync: synchronizer.stats().clone(),
            ingest: ingest.snapshot(),
            sinks: synchronizer.sink().metrics(),
            dispatch: aggregator.summary(),
            final_depths: buffers.depths(),
            duration: start_time.elapsed(),
            stop_reason,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }

    async fn consume(
        &self,
        results_rx: &mut mpsc::Receiver<TrackedFrame>,
        buffers: &SensorBuffers,
        aggregator: &mut DispatchMetricsAggregator,
        shutdown: impl Future<Output = ()>,
    ) -> StopReason {
        let timeout = self.config.timeout;
        let deadline = async move {
            match timeout {
                Some(t) => tokio::time::sleep(t).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut depth_tick = tokio::time::interval(DEPTH_SAMPLE_INTERVAL);

        loop {
            tokio::select! {
                maybe = results_rx.recv() => {
                    let Some(frame) = maybe else {
                        break StopReason::ResultsClosed;
                    };
                    record_tracked_frame(&frame);
                    aggregator.update(&frame);

                    if let Some(max) = self.config.max_frames {
                        if aggregator.total_frames >= max {
                            info!(frames = aggregator.total_frames, "Reached max frames limit");
                            break StopReason::MaxFrames;
                        }
                    }
                }
                _ = depth_tick.tick() => {
                    let (left, right, imu) = buffers.depths();
                    record_buffer_depths(left, right, imu);
                    debug!(left, right, imu, "buffer depths");
                }
                _ = &mut deadline => {
                    warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    break StopReason::Timeout;
                }
                _ = &mut shutdown => break StopReason::Signal,
            }
        }
    }
}
