//! # Sync Engine
//!
//! Stereo-inertial synchronization core.
//!
//! 负责：
//! - Latest-wins image slots and the ordered IMU queue (`SensorBuffers`)
//! - Stereo time alignment within `max_time_diff`
//! - IMU window extraction covering each stereo pair
//! - Invoking the tracking engine and forwarding results to a sink
//!
//! ## 使用示例
//!
//! ```ignore
//! use std::sync::{atomic::AtomicBool, Arc};
//! use sync_engine::{ImuDeadReckoning, SensorBuffers, Synchronizer, SyncConfig};
//!
//! let buffers = SensorBuffers::new();
//! let sync = Synchronizer::new(buffers.clone(), SyncConfig::default(), ImuDeadReckoning::new(), sink);
//! let handle = sync.spawn(Arc::new(AtomicBool::new(false)))?;
//!
//! // Producers write into `buffers` (see the `ingestion` crate)
//!
//! let sync = handle.stop().expect("synchronizer thread panicked");
//! println!("dispatched {}", sync.stats().dispatched);
//! ```

mod alignment;
mod buffer;
mod decode;
mod engine;
mod tracker;

// Re-exports
pub use alignment::{imu_covers, select_aligned_pair, settle, AlignDecision};
pub use buffer::{BoundedLatestSlot, OrderedQueue, SensorBuffers};
pub use decode::to_mono8;
pub use engine::{StepOutcome, SyncState, SyncStats, Synchronizer, SynchronizerHandle};
pub use tracker::ImuDeadReckoning;

// Re-export contracts types
pub use contracts::{AlignedObservation, FrameIds, SyncConfig, TrackedFrame, TrackingOutput};
