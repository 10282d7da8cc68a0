// Runtime configuration: loop timing, geometry, gains
//
// Compiled defaults cover the reference platform; a JSON file can override
// any field at startup. Geometry is in meters, speeds in rad/s.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::motor::{Kinematics, MecanumKinematics};
use crate::motor::pid::PidGains;

/// Kinematics variant, selected at startup. Swerve bases would slot in here
/// as another variant with their own transform implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KinematicsKind {
    Mecanum4,
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// Control loop frequency. The loop is best-effort; all integration uses
    /// measured dt, never the nominal period.
    pub loop_hz: u64,
    /// Command age after which health reports CmdStale. The stale command
    /// keeps actuating; staleness is report-only.
    pub cmd_stale_after_ms: u64,

    pub kinematics: KinematicsKind,
    pub wheel_radius: f64,
    /// Longitudinal half-distance from base center to wheel contact point.
    pub half_span_x: f64,
    /// Lateral half-distance from base center to wheel contact point.
    pub half_span_y: f64,

    /// Encoder pulses per wheel revolution.
    pub encoder_resolution: u32,
    /// Setpoints beyond this magnitude are rejected by the motor controllers.
    pub max_wheel_speed: f64,
    pub pid: PidGains,

    /// Startup initialization retry budget and backoff.
    pub init_retries: u32,
    pub init_backoff_ms: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            loop_hz: 100,
            cmd_stale_after_ms: 250,
            kinematics: KinematicsKind::Mecanum4,
            wheel_radius: 0.075,
            half_span_x: 0.19,
            half_span_y: 0.16,
            encoder_resolution: 2048,
            max_wheel_speed: 30.0,
            pid: PidGains {
                kp: 0.2,
                ki: 0.05,
                kd: 0.01,
                integral_limit: 5.0,
            },
            init_retries: 5,
            init_backoff_ms: 200,
        }
    }
}

impl RobotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate().map_err(|reason| ConfigFileError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Wiring-time sanity checks; failures here must surface before the
    /// loop starts, never as a panic mid-flight.
    pub fn validate(&self) -> Result<(), String> {
        if self.loop_hz == 0 || self.loop_hz > 1000 {
            return Err(format!(
                "loop_hz must be within 1..=1000, got {}",
                self.loop_hz
            ));
        }
        Ok(())
    }

    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(1000 / self.loop_hz)
    }

    pub fn cmd_stale_after(&self) -> Duration {
        Duration::from_millis(self.cmd_stale_after_ms)
    }

    pub fn init_backoff(&self) -> Duration {
        Duration::from_millis(self.init_backoff_ms)
    }

    pub fn build_kinematics(&self) -> Box<dyn Kinematics> {
        match self.kinematics {
            KinematicsKind::Mecanum4 => Box::new(MecanumKinematics::new(
                self.wheel_radius,
                self.half_span_x,
                self.half_span_y,
            )),
        }
    }
}
