//! ChannelSink - hands results to an async consumer

use contracts::{ContractError, PoseSink, TrackedFrame};
use tokio::sync::mpsc;
use tracing::warn;

/// Forwards tracked frames into a bounded tokio channel
///
/// `publish` never blocks the synchronizer thread: a full queue drops the
/// frame and reports a write error, a dropped receiver reports the sink as
/// closed.
pub struct ChannelSink {
    name: String,
    tx: mpsc::Sender<TrackedFrame>,
    dropped: u64,
}

impl ChannelSink {
    pub fn new(name: impl Into<String>, tx: mpsc::Sender<TrackedFrame>) -> Self {
        Self {
            name: name.into(),
            tx,
            dropped: 0,
        }
    }

    /// Create the sink together with its receiving end
    pub fn channel(
        name: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<TrackedFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(name, tx), rx)
    }

    /// Frames dropped because the queue was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl PoseSink for ChannelSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&mut self, frame: &TrackedFrame) -> Result<(), ContractError> {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(f)) => {
                self.dropped += 1;
                warn!(sink = %self.name, frame_id = f.frame_id, "Queue full, frame dropped");
                Err(ContractError::sink_write(&self.name, "queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ContractError::SinkClosed {
                sink_name: self.name.clone(),
            }),
        }
    }
}
