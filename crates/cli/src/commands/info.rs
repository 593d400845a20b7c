//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::NodeConfig;
use serde::Serialize;
use tracing::info;

use super::load_node_config;
use crate::cli::InfoArgs;

/// Effective configuration plus derived figures
#[derive(Serialize)]
struct ConfigInfo<'a> {
    config: &'a NodeConfig,
    derived: Derived,
}

#[derive(Serialize)]
struct Derived {
    /// Nominal IMU samples per stereo pair
    imu_samples_per_frame: f64,
    /// Raw bytes per camera frame
    frame_bytes: usize,
    /// Stereo tolerance as a fraction of the camera period
    tolerance_ratio: f64,
}

impl Derived {
    fn from_config(node: &NodeConfig) -> Self {
        let source = &node.source;
        Self {
            imu_samples_per_frame: source.imu_hz / source.camera_hz,
            frame_bytes: source.image_width as usize
                * source.image_height as usize
                * source.image_format.channels(),
            tolerance_ratio: node.sync.max_time_diff * source.camera_hz,
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let node = load_node_config(args.config.as_deref())?;
    info!("Loaded configuration info");

    let derived = Derived::from_config(&node);
    if args.json {
        let info = ConfigInfo {
            config: &node,
            derived,
        };
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{json}");
    } else {
        print_config_info(&node, &derived);
    }

    Ok(())
}

fn print_config_info(node: &NodeConfig, derived: &Derived) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Stereo Sync Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Synchronizer");
    println!(
        "   ├─ Stereo tolerance: {:.3} ms ({:.1}% of camera period)",
        node.sync.max_time_diff * 1000.0,
        derived.tolerance_ratio * 100.0
    );
    println!("   └─ Poll interval: {} ms", node.sync.poll_interval_ms);

    println!("\n📐 Frames");
    println!("   ├─ Map: {}", node.frames.map_frame_id);
    println!("   └─ Pose: {}", node.frames.pose_frame_id);

    let source = &node.source;
    println!("\n📷 Mock Rig");
    println!("   ├─ Cameras: {} Hz, skew {:.3} ms", source.camera_hz, source.stereo_skew_s * 1000.0);
    println!("   ├─ Jitter: ±{:.3} ms", source.jitter_s * 1000.0);
    println!(
        "   ├─ Image: {}x{} {:?} ({} bytes)",
        source.image_width, source.image_height, source.image_format, derived.frame_bytes
    );
    println!(
        "   └─ IMU: {} Hz (~{:.1} samples per pair)",
        source.imu_hz, derived.imu_samples_per_frame
    );

    println!();
}
