//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::NodeConfig;
use serde::Serialize;
use tracing::info;

use super::load_node_config;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    max_time_diff_ms: f64,
    poll_interval_ms: u64,
    map_frame_id: String,
    pose_frame_id: String,
    camera_hz: f64,
    imu_hz: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_node_config(Some(&args.config)) {
        Ok(node) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&node),
            summary: Some(ConfigSummary {
                max_time_diff_ms: node.sync.max_time_diff * 1000.0,
                poll_interval_ms: node.sync.poll_interval_ms,
                map_frame_id: node.frames.map_frame_id.clone(),
                pose_frame_id: node.frames.pose_frame_id.clone(),
                camera_hz: node.source.camera_hz,
                imu_hz: node.source.imu_hz,
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(node: &NodeConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let period = 1.0 / node.source.camera_hz;

    // 容差超过半个帧周期时，相邻帧也可能被配对
    if node.sync.max_time_diff >= period / 2.0 {
        warnings.push(format!(
            "sync.max_time_diff ({:.4}s) is at least half the camera period ({:.4}s)",
            node.sync.max_time_diff, period
        ));
    }

    if node.source.stereo_skew_s + node.source.jitter_s * 2.0 > node.sync.max_time_diff {
        warnings.push(
            "source skew plus jitter can exceed the stereo tolerance; some pairs will be deferred"
                .to_string(),
        );
    }

    if node.sync.poll_interval_ms as f64 / 1000.0 >= period {
        warnings.push("sync.poll_interval_ms is not shorter than the camera period".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
        return;
    }

    println!("✓ Configuration is valid: {}", result.config_path);
    if let Some(ref summary) = result.summary {
        println!("\n  Stereo tolerance: {:.3} ms", summary.max_time_diff_ms);
        println!("  Poll interval: {} ms", summary.poll_interval_ms);
        println!(
            "  Frames: {} -> {}",
            summary.map_frame_id, summary.pose_frame_id
        );
        println!(
            "  Mock rig: camera {} Hz, imu {} Hz",
            summary.camera_hz, summary.imu_hz
        );
    }

    if !result.warnings.is_empty() {
        println!("\n⚠ Warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_have_no_warnings() {
        assert!(collect_warnings(&NodeConfig::default()).is_empty());
    }

    #[test]
    fn test_wide_tolerance_warns() {
        let mut node = NodeConfig::default();
        node.sync.max_time_diff = 0.03;
        let warnings = collect_warnings(&node);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("half the camera period"));
    }

    #[test]
    fn test_validate_reports_error() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "frames": {{ "map_frame_id": "" }} }}"#).unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("frames.map_frame_id"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_validate_accepts_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[sync]\nmax_time_diff = 0.005").unwrap();

        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(result.valid);
        assert!((result.summary.unwrap().max_time_diff_ms - 5.0).abs() < 1e-9);
    }
}
