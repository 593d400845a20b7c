//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Every record carries its capture timestamp (seconds, f64) from the sensor clock
//! - Left, right and IMU clocks are assumed comparable; no offset estimation happens here

mod error;
mod node_config;
mod observation;
mod sensor;
mod tracking;

pub use error::*;
pub use node_config::*;
pub use observation::*;
pub use sensor::*;
pub use tracking::{PoseSink, TrackingEngine};

/// Re-exported so collaborators name the same image type
pub use image::GrayImage;
