//! Pipeline statistics and reporting.

use std::fmt;
use std::time::Duration;

use dispatcher::SinkSnapshot;
use ingestion::MetricsSnapshot;
use observability::DispatchSummary;
use sync_engine::SyncStats;

/// Why the run ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl+C / SIGTERM
    #[default]
    Signal,
    /// `--max-frames` reached
    MaxFrames,
    /// `--timeout` elapsed
    Timeout,
    /// Result channel closed by the synchronizer
    ResultsClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Signal => "signal",
            StopReason::MaxFrames => "max-frames",
            StopReason::Timeout => "timeout",
            StopReason::ResultsClosed => "results-closed",
        };
        f.write_str(s)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Synchronizer counters
    pub sync: SyncStats,

    /// Producer-side counters
    pub ingest: MetricsSnapshot,

    /// Per-sink delivery counters
    pub sinks: Vec<(String, SinkSnapshot)>,

    /// Result-side summary
    pub dispatch: DispatchSummary,

    /// Buffer depths (left, right, imu) at shutdown
    pub final_depths: (usize, usize, usize),

    /// Total duration of the pipeline run
    pub duration: Duration,

    pub stop_reason: StopReason,
}

impl PipelineStats {
    /// Tracked frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.sync.dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Left frames that never reached the engine (superseded or dropped)
    pub fn left_frames_unused(&self) -> u64 {
        self.ingest
            .left_received
            .saturating_sub(self.sync.dispatched)
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Stop reason: {}", self.stop_reason);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Tracked frames: {}", self.sync.dispatched);
        println!("   └─ FPS: {:.2}", self.fps());

        let ingest = &self.ingest;
        println!("\n📥 Ingestion");
        println!(
            "   ├─ Left / right frames: {} / {}",
            ingest.left_received, ingest.right_received
        );
        println!(
            "   ├─ Superseded (left / right): {} / {}",
            ingest.left_superseded, ingest.right_superseded
        );
        println!("   ├─ Left frames unused: {}", self.left_frames_unused());
        println!("   ├─ IMU samples: {}", ingest.imu_received);
        println!("   ├─ IMU out-of-order: {}", ingest.imu_out_of_order);
        println!(
            "   └─ Rejected (frames / IMU): {} / {}",
            ingest.frames_rejected, ingest.imu_rejected
        );

        let sync = &self.sync;
        println!("\n🔗 Synchronizer");
        println!("   ├─ Misaligned deferrals: {}", sync.misaligned);
        println!("   ├─ IMU coverage deferrals: {}", sync.awaiting_imu);
        println!("   ├─ Superseded mid-step: {}", sync.superseded);
        println!("   ├─ Decode failures: {}", sync.decode_failures);
        println!("   ├─ IMU samples consumed: {}", sync.imu_samples_consumed);
        println!("   ├─ Tracking lost: {}", sync.tracking_lost);
        println!("   ├─ Sink errors: {}", sync.sink_errors);
        let (left, right, imu) = self.final_depths;
        println!("   └─ Buffers at exit (L/R/IMU): {left} / {right} / {imu}");

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, snap)) in self.sinks.iter().enumerate() {
                let prefix = if i + 1 == self.sinks.len() { "└─" } else { "├─" };
                println!(
                    "   {prefix} {name}: {} published, {} failed",
                    snap.published, snap.failures
                );
            }
        }

        println!("\n📈 {}", self.dispatch);
    }
}
