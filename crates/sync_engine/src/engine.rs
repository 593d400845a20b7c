//! Synchronizer: the single consumer of the shared buffers.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use contracts::{
    AlignedObservation, ContractError, FrameIds, GrayImage, PoseSink, StereoSide, SyncConfig,
    TrackedFrame, TrackingEngine,
};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::alignment::{imu_covers, select_aligned_pair, settle, AlignDecision};
use crate::buffer::SensorBuffers;
use crate::decode::to_mono8;

/// Synchronizer state (stage reached by the latest step)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No candidate pair
    Idle,
    /// Comparing / discarding stale frames
    Aligning,
    /// Pair selected, IMU has not reached the frame time
    AwaitingImuCoverage,
    /// Frames taken, engine being invoked
    Dispatch,
}

/// Result of one synchronizer iteration
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A slot or the IMU queue is empty
    Idle,
    /// Stereo gap exceeds tolerance (or is not finite) and the stale side has nothing newer
    Misaligned { left_ts: f64, right_ts: f64 },
    /// Newest IMU sample is older than the frame
    AwaitingImu { frame_ts: f64, imu_back: f64 },
    /// A producer replaced a frame between inspection and removal
    Superseded,
    /// Frames that failed to decode and were discarded (one or both sides)
    DecodeFailed { sides: Vec<StereoSide> },
    /// Observation handed to the engine
    Dispatched {
        frame_id: u64,
        timestamp: f64,
        imu_samples: usize,
    },
}

impl StepOutcome {
    pub fn is_dispatch(&self) -> bool {
        matches!(self, StepOutcome::Dispatched { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            StepOutcome::Idle => "idle",
            StepOutcome::Misaligned { .. } => "misaligned",
            StepOutcome::AwaitingImu { .. } => "awaiting_imu",
            StepOutcome::Superseded => "superseded",
            StepOutcome::DecodeFailed { .. } => "decode_failed",
            StepOutcome::Dispatched { .. } => "dispatched",
        }
    }
}

/// Counters over the synchronizer's lifetime
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStats {
    /// Observations handed to the engine
    pub dispatched: u64,
    /// Iterations deferred for stereo misalignment
    pub misaligned: u64,
    /// Iterations deferred for IMU coverage
    pub awaiting_imu: u64,
    /// Iterations abandoned because a slot was overwritten mid-step
    pub superseded: u64,
    /// Frames discarded on decode failure
    pub decode_failures: u64,
    /// Stale frames discarded while aligning (needs slots deeper than one)
    pub stale_dropped: u64,
    /// IMU samples handed to the engine
    pub imu_samples_consumed: u64,
    /// Engine results without a pose
    pub tracking_lost: u64,
    /// Sink publish failures
    pub sink_errors: u64,
}

/// Multi-stream synchronizer
///
/// Owns the consumer side of `SensorBuffers`, the tracking engine and the
/// result sink. Run it on a dedicated thread with [`Synchronizer::spawn`] or
/// drive it manually with [`Synchronizer::step`].
pub struct Synchronizer<E, S> {
    buffers: Arc<SensorBuffers>,
    config: SyncConfig,
    frames: FrameIds,
    engine: E,
    sink: S,
    state: SyncState,
    frame_counter: u64,
    stats: SyncStats,
    /// Kind of the previous non-dispatch outcome (log de-duplication)
    last_deferral: Option<&'static str>,
}

impl<E, S> std::fmt::Debug for Synchronizer<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("frame_counter", &self.frame_counter)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<E: TrackingEngine, S: PoseSink> Synchronizer<E, S> {
    /// Create a synchronizer over the given buffers
    pub fn new(buffers: Arc<SensorBuffers>, config: SyncConfig, engine: E, sink: S) -> Self {
        Self {
            buffers,
            config,
            frames: FrameIds::default(),
            engine,
            sink,
            state: SyncState::Idle,
            frame_counter: 0,
            stats: SyncStats::default(),
            last_deferral: None,
        }
    }

    /// Coordinate frame names stamped on published results
    pub fn with_frame_ids(mut self, frames: FrameIds) -> Self {
        self.frames = frames;
        self
    }

    /// Stage reached by the latest step
    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Get frame counter
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Release the engine and sink
    pub fn into_parts(self) -> (E, S) {
        (self.engine, self.sink)
    }

    /// Run one iteration without sleeping
    pub fn step(&mut self) -> StepOutcome {
        let outcome = self.try_dispatch();
        if outcome.is_dispatch() {
            self.state = SyncState::Idle;
            self.last_deferral = None;
        } else {
            self.record_deferral(&outcome);
        }
        outcome
    }

    /// Loop until `shutdown` is raised, sleeping `poll_interval` whenever
    /// nothing was dispatched. Closes the sink on exit.
    #[instrument(name = "synchronizer_run", skip_all, fields(max_time_diff = self.config.max_time_diff))]
    pub fn run(&mut self, shutdown: &AtomicBool) -> SyncStats {
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "synchronizer started"
        );
        let idle_sleep = self.config.poll_interval();

        while !shutdown.load(Ordering::Acquire) {
            if !self.step().is_dispatch() {
                thread::sleep(idle_sleep);
            }
        }

        if let Err(e) = self.sink.close() {
            warn!(sink = %self.sink.name(), error = %e, "failed to close sink");
        }

        info!(
            dispatched = self.stats.dispatched,
            misaligned = self.stats.misaligned,
            awaiting_imu = self.stats.awaiting_imu,
            decode_failures = self.stats.decode_failures,
            "synchronizer stopped"
        );
        self.stats.clone()
    }

    fn try_dispatch(&mut self) -> StepOutcome {
        self.state = SyncState::Idle;
        let buffers = self.buffers.clone();

        let (Some(mut left_ts), Some(mut right_ts)) =
            (buffers.left.peek_timestamp(), buffers.right.peek_timestamp())
        else {
            return StepOutcome::Idle;
        };
        if buffers.imu.is_empty() {
            return StepOutcome::Idle;
        }

        self.state = SyncState::Aligning;
        loop {
            let decision = settle(
                select_aligned_pair(left_ts, right_ts, self.config.max_time_diff),
                buffers.left.len(),
                buffers.right.len(),
            );
            // Drop arms are only reached when the stale side holds more than
            // one frame; with one-deep slots `settle` turns them into WaitMore.
            match decision {
                AlignDecision::UseBoth => break,
                AlignDecision::WaitMore => return StepOutcome::Misaligned { left_ts, right_ts },
                AlignDecision::DropRight => {
                    drop(buffers.right.take());
                    self.stats.stale_dropped += 1;
                    match buffers.right.peek_timestamp() {
                        Some(ts) => right_ts = ts,
                        None => return StepOutcome::Idle,
                    }
                }
                AlignDecision::DropLeft => {
                    drop(buffers.left.take());
                    self.stats.stale_dropped += 1;
                    match buffers.left.peek_timestamp() {
                        Some(ts) => left_ts = ts,
                        None => return StepOutcome::Idle,
                    }
                }
            }
        }

        self.state = SyncState::AwaitingImuCoverage;
        let Some(imu_back) = buffers.imu.back_timestamp() else {
            return StepOutcome::Idle;
        };
        if !imu_covers(left_ts, imu_back) {
            return StepOutcome::AwaitingImu {
                frame_ts: left_ts,
                imu_back,
            };
        }

        self.state = SyncState::Dispatch;
        self.dispatch(&buffers, left_ts, right_ts)
    }

    #[instrument(
        name = "synchronizer_dispatch",
        level = "debug",
        skip(self, buffers)
    )]
    fn dispatch(&mut self, buffers: &SensorBuffers, left_ts: f64, right_ts: f64) -> StepOutcome {
        // Take exactly the frames that were aligned
        let Some(left) = buffers.left.take_if(|f| f.timestamp == left_ts) else {
            return StepOutcome::Superseded;
        };
        let Some(right) = buffers.right.take_if(|f| f.timestamp == right_ts) else {
            Self::put_back(buffers, StereoSide::Left, left);
            return StepOutcome::Superseded;
        };

        let (left_img, right_img) = match (
            to_mono8(StereoSide::Left, &left),
            to_mono8(StereoSide::Right, &right),
        ) {
            (Ok(l), Ok(r)) => (l, r),
            (Err(e), Ok(_)) => {
                self.report_decode_failure(&e, StereoSide::Left);
                Self::put_back(buffers, StereoSide::Right, right);
                return StepOutcome::DecodeFailed {
                    sides: vec![StereoSide::Left],
                };
            }
            (Ok(_), Err(e)) => {
                self.report_decode_failure(&e, StereoSide::Right);
                Self::put_back(buffers, StereoSide::Left, left);
                return StepOutcome::DecodeFailed {
                    sides: vec![StereoSide::Right],
                };
            }
            (Err(el), Err(er)) => {
                self.report_decode_failure(&el, StereoSide::Left);
                self.report_decode_failure(&er, StereoSide::Right);
                return StepOutcome::DecodeFailed {
                    sides: vec![StereoSide::Left, StereoSide::Right],
                };
            }
        };

        let imu_window = buffers.imu.drain_up_to(left_ts);
        let observation = AlignedObservation {
            left,
            right,
            timestamp: left_ts,
            imu_window,
        };

        self.invoke(observation, &left_img, &right_img)
    }

    fn invoke(
        &mut self,
        observation: AlignedObservation,
        left_img: &GrayImage,
        right_img: &GrayImage,
    ) -> StepOutcome {
        let started = Instant::now();
        let output = self.engine.track(
            left_img,
            right_img,
            observation.timestamp,
            &observation.imu_window,
        );
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.frame_counter += 1;
        let frame_id = self.frame_counter;
        let imu_samples = observation.imu_window.len();
        let stereo_offset = observation.stereo_offset();

        self.stats.dispatched += 1;
        self.stats.imu_samples_consumed += imu_samples as u64;
        if output.pose.is_none() {
            self.stats.tracking_lost += 1;
            metrics::counter!("stereo_sync_tracking_lost_total").increment(1);
        }

        metrics::counter!("stereo_sync_observations_total").increment(1);
        metrics::histogram!("stereo_sync_imu_window_len").record(imu_samples as f64);
        metrics::histogram!("stereo_sync_stereo_offset_ms").record(stereo_offset.abs() * 1000.0);
        metrics::histogram!("stereo_sync_tracking_duration_ms").record(elapsed_ms);

        debug!(
            frame_id,
            timestamp = observation.timestamp,
            stereo_offset,
            imu_samples,
            elapsed_ms,
            lost = output.pose.is_none(),
            "observation dispatched"
        );

        let tracked = TrackedFrame {
            frame_id,
            timestamp: observation.timestamp,
            stereo_offset,
            imu_samples,
            map_frame_id: self.frames.map_frame_id.clone(),
            pose_frame_id: self.frames.pose_frame_id.clone(),
            output,
        };
        // The observation ends here; only the stamped result travels on
        drop(observation);

        if let Err(e) = self.sink.publish(&tracked) {
            self.stats.sink_errors += 1;
            warn!(sink = %self.sink.name(), frame_id, error = %e, "failed to publish tracking result");
        }

        StepOutcome::Dispatched {
            frame_id,
            timestamp: tracked.timestamp,
            imu_samples,
        }
    }

    fn put_back(buffers: &SensorBuffers, side: StereoSide, frame: contracts::Frame) {
        let slot = match side {
            StereoSide::Left => &buffers.left,
            StereoSide::Right => &buffers.right,
        };
        if !slot.restore(frame) {
            trace!(%side, "newer frame arrived, restored frame dropped");
        }
    }

    fn report_decode_failure(&mut self, err: &ContractError, side: StereoSide) {
        self.stats.decode_failures += 1;
        metrics::counter!("stereo_sync_decode_failures_total", "side" => side.as_str())
            .increment(1);
        error!(%side, error = %err, "frame decode failed, frame dropped");
    }

    fn record_deferral(&mut self, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Misaligned { .. } => self.stats.misaligned += 1,
            StepOutcome::AwaitingImu { .. } => self.stats.awaiting_imu += 1,
            StepOutcome::Superseded => self.stats.superseded += 1,
            StepOutcome::Idle | StepOutcome::DecodeFailed { .. } => {}
            StepOutcome::Dispatched { .. } => return,
        }

        let label = outcome.label();
        if label != "idle" {
            metrics::counter!("stereo_sync_deferrals_total", "reason" => label).increment(1);
        }

        if mem::replace(&mut self.last_deferral, Some(label)) != Some(label) {
            debug!(reason = label, ?outcome, "synchronizer deferred");
        } else {
            trace!(reason = label, ?outcome, "synchronizer deferred");
        }
    }
}

impl<E, S> Synchronizer<E, S>
where
    E: TrackingEngine + 'static,
    S: PoseSink + 'static,
{
    /// Move the synchronizer onto a dedicated thread
    ///
    /// # Errors
    /// Thread creation failure.
    pub fn spawn(self, shutdown: Arc<AtomicBool>) -> std::io::Result<SynchronizerHandle<E, S>> {
        let flag = shutdown.clone();
        let handle = thread::Builder::new()
            .name("synchronizer".to_string())
            .spawn(move || {
                let mut sync = self;
                sync.run(&flag);
                sync
            })?;

        Ok(SynchronizerHandle { shutdown, handle })
    }
}

/// Handle to a synchronizer running on its own thread
#[derive(Debug)]
pub struct SynchronizerHandle<E, S> {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<Synchronizer<E, S>>,
}

impl<E, S> SynchronizerHandle<E, S> {
    /// Raise the shutdown flag without waiting
    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the loop and get the synchronizer back
    pub fn stop(self) -> thread::Result<Synchronizer<E, S>> {
        self.request_stop();
        self.handle.join()
    }
}
