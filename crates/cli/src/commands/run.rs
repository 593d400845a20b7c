//! `run` command implementation.

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, NodeConfig};
use std::time::Duration;
use tracing::{info, warn};

use super::load_node_config;
use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let mut node = load_node_config(args.config.as_deref())?;

    apply_overrides(&mut node, args);
    ConfigLoader::validate(&node).context("Invalid configuration after CLI overrides")?;

    info!(
        max_time_diff = node.sync.max_time_diff,
        camera_hz = node.source.camera_hz,
        imu_hz = node.source.imu_hz,
        map_frame = %node.frames.map_frame_id,
        pose_frame = %node.frames.pose_frame_id,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        println!("{}", ConfigLoader::to_toml(&node)?);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        node,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size.max(1),
        log_every: args.log_every,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting pipeline...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        tracked = stats.sync.dispatched,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        reason = %stats.stop_reason,
        "Pipeline finished"
    );
    stats.print_summary();

    Ok(())
}

/// CLI flags win over the file
fn apply_overrides(node: &mut NodeConfig, args: &RunArgs) {
    if let Some(tol) = args.max_time_diff {
        info!(max_time_diff = tol, "Overriding stereo tolerance from CLI");
        node.sync.max_time_diff = tol;
    }
    if let Some(hz) = args.camera_hz {
        info!(camera_hz = hz, "Overriding camera rate from CLI");
        node.source.camera_hz = hz;
    }
    if let Some(hz) = args.imu_hz {
        info!(imu_hz = hz, "Overriding IMU rate from CLI");
        node.source.imu_hz = hz;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}
