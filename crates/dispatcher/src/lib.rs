//! # Dispatcher
//!
//! 跟踪结果分发模块。
//!
//! 负责：
//! - 接收 `TrackedFrame`
//! - Fan-out 到多个 sinks
//! - 隔离失败的 sink，不影响其他 sink

pub mod dispatcher;
pub mod metrics;
pub mod sinks;

pub use contracts::{PoseSink, TrackedFrame};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DISPATCHER_NAME};
pub use metrics::{SinkMetrics, SinkSnapshot};
pub use sinks::{ChannelSink, LogSink};
