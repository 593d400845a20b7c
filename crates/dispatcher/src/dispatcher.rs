//! Dispatcher - fan-out of tracking results to sinks

use std::sync::Arc;

use contracts::{ContractError, PoseSink, TrackedFrame};
use tracing::{debug, error, info, instrument};

use crate::metrics::{SinkMetrics, SinkSnapshot};

/// Name the dispatcher reports as a sink
pub const DISPATCHER_NAME: &str = "dispatcher";

struct SinkEntry {
    sink: Box<dyn PoseSink>,
    metrics: Arc<SinkMetrics>,
}

/// Builder for creating a Dispatcher
#[derive(Default)]
pub struct DispatcherBuilder {
    sinks: Vec<Box<dyn PoseSink>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn sink(mut self, sink: impl PoseSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Add an already boxed sink
    pub fn boxed(mut self, sink: Box<dyn PoseSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[instrument(name = "dispatcher_builder_build", skip(self), fields(sink_count = self.sinks.len()))]
    pub fn build(self) -> Dispatcher {
        let entries = self
            .sinks
            .into_iter()
            .map(|sink| SinkEntry {
                sink,
                metrics: Arc::new(SinkMetrics::new()),
            })
            .collect();
        Dispatcher {
            entries,
            frames: 0,
        }
    }
}

/// Fans every tracked frame out to all registered sinks
///
/// A failing sink never prevents delivery to the others. `publish` only
/// reports an error when no sink accepted the frame.
pub struct Dispatcher {
    entries: Vec<SinkEntry>,
    frames: u64,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Number of registered sinks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frames offered to the dispatcher so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, SinkSnapshot)> {
        self.entries
            .iter()
            .map(|e| (e.sink.name().to_string(), e.metrics.snapshot()))
            .collect()
    }

    /// Shared metrics handle of the named sink
    pub fn sink_metrics(&self, name: &str) -> Option<Arc<SinkMetrics>> {
        self.entries
            .iter()
            .find(|e| e.sink.name() == name)
            .map(|e| Arc::clone(&e.metrics))
    }
}

impl PoseSink for Dispatcher {
    fn name(&self) -> &str {
        DISPATCHER_NAME
    }

    fn publish(&mut self, frame: &TrackedFrame) -> Result<(), ContractError> {
        self.frames += 1;
        let mut failed = 0usize;

        for entry in &mut self.entries {
            match entry.sink.publish(frame) {
                Ok(()) => entry.metrics.inc_published(),
                Err(e) => {
                    failed += 1;
                    entry.metrics.inc_failures();
                    ::metrics::counter!(
                        "stereo_sync_sink_failures_total",
                        "sink" => entry.sink.name().to_string()
                    )
                    .increment(1);
                    debug!(
                        sink = %entry.sink.name(),
                        frame_id = frame.frame_id,
                        error = %e,
                        "Publish failed"
                    );
                }
            }
        }

        if self.frames.is_multiple_of(100) {
            debug!(frames = self.frames, "Dispatcher progress");
        }

        if failed > 0 && failed == self.entries.len() {
            return Err(ContractError::sink_write(
                DISPATCHER_NAME,
                format!("all {failed} sinks rejected frame {}", frame.frame_id),
            ));
        }
        Ok(())
    }

    #[instrument(name = "dispatcher_close", skip(self))]
    fn close(&mut self) -> Result<(), ContractError> {
        for entry in &mut self.entries {
            if let Err(e) = entry.sink.close() {
                error!(sink = %entry.sink.name(), error = %e, "Close failed on shutdown");
            }
        }
        info!(frames = self.frames, "Dispatcher shutdown complete");
        Ok(())
    }
}
