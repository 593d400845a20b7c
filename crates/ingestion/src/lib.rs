//! # Ingestion
//!
//! Sensor callback side of the synchronizer.
//!
//! Responsibilities:
//! - Accept left / right frames and IMU samples from concurrent producers
//! - Store them in the shared [`SensorBuffers`](sync_engine::SensorBuffers)
//! - Count supersessions and out-of-order IMU deliveries
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::StreamIngest;
//! use sync_engine::SensorBuffers;
//!
//! let buffers = SensorBuffers::new();
//! let ingest = StreamIngest::new(buffers.clone());
//!
//! // From the camera driver thread
//! ingest.ingest_left(frame);
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockStereoRig;
//!
//! let rig = MockStereoRig::new(config.source.clone());
//! let handles = rig.start(ingest.clone());
//! ```

mod config;
mod mock;
mod stream;

pub use config::{IngestionMetrics, MetricsSnapshot};
pub use mock::MockStereoRig;
pub use stream::StreamIngest;
