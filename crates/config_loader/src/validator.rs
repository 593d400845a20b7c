//! 配置校验模块
//!
//! 校验规则：
//! - max_time_diff 有限且 > 0
//! - poll_interval_ms 在 1..=1000
//! - map_frame_id / pose_frame_id 非空且不同
//! - camera_hz / imu_hz > 0，且 imu_hz >= camera_hz
//! - jitter_s / stereo_skew_s >= 0
//! - 图像尺寸非零

use contracts::{ContractError, FrameIds, NodeConfig, SourceConfig, SyncConfig};

/// Upper bound for the consumer idle sleep (ms)
pub const MAX_POLL_INTERVAL_MS: u64 = 1000;

/// 校验 NodeConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &NodeConfig) -> Result<(), ContractError> {
    validate_sync(&config.sync)?;
    validate_frames(&config.frames)?;
    validate_source(&config.source)?;
    Ok(())
}

/// 校验同步配置
fn validate_sync(sync: &SyncConfig) -> Result<(), ContractError> {
    if !sync.max_time_diff.is_finite() || sync.max_time_diff <= 0.0 {
        return Err(ContractError::config_validation(
            "sync.max_time_diff",
            format!("must be finite and > 0, got {}", sync.max_time_diff),
        ));
    }

    if !(1..=MAX_POLL_INTERVAL_MS).contains(&sync.poll_interval_ms) {
        return Err(ContractError::config_validation(
            "sync.poll_interval_ms",
            format!(
                "must be in 1..={MAX_POLL_INTERVAL_MS}, got {}",
                sync.poll_interval_ms
            ),
        ));
    }

    Ok(())
}

/// 校验坐标系名称
fn validate_frames(frames: &FrameIds) -> Result<(), ContractError> {
    for (field, value) in [
        ("frames.map_frame_id", &frames.map_frame_id),
        ("frames.pose_frame_id", &frames.pose_frame_id),
    ] {
        if value.trim().is_empty() {
            return Err(ContractError::config_validation(field, "cannot be empty"));
        }
    }

    if frames.map_frame_id == frames.pose_frame_id {
        return Err(ContractError::config_validation(
            "frames.pose_frame_id",
            format!("must differ from map_frame_id '{}'", frames.map_frame_id),
        ));
    }

    Ok(())
}

/// 校验 mock 源配置
fn validate_source(source: &SourceConfig) -> Result<(), ContractError> {
    for (field, hz) in [
        ("source.camera_hz", source.camera_hz),
        ("source.imu_hz", source.imu_hz),
    ] {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("rate must be > 0, got {hz}"),
            ));
        }
    }

    // 每帧至少需要一个 IMU 样本
    if source.imu_hz < source.camera_hz {
        return Err(ContractError::config_validation(
            "source.imu_hz",
            format!(
                "imu_hz ({}) must be >= camera_hz ({})",
                source.imu_hz, source.camera_hz
            ),
        ));
    }

    for (field, value) in [
        ("source.jitter_s", source.jitter_s),
        ("source.stereo_skew_s", source.stereo_skew_s),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("must be >= 0, got {value}"),
            ));
        }
    }

    if source.image_width == 0 || source.image_height == 0 {
        return Err(ContractError::config_validation(
            "source.image_width / source.image_height",
            format!(
                "image must be non-empty, got {}x{}",
                source.image_width, source.image_height
            ),
        ));
    }

    Ok(())
}
