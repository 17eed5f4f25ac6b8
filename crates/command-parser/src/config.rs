//! Robot defaults supplied by the caller

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a named attachment motor comes to rest on `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBehavior {
    /// Let the motor spin freely (`stop()`).
    #[default]
    Coast,
    /// Passive brake (`brake()`).
    Brake,
    /// Actively hold position (`hold()`).
    Hold,
}

impl StopBehavior {
    /// Pybricks `Motor` method implementing this behavior.
    pub fn motor_method(&self) -> &'static str {
        match self {
            StopBehavior::Coast => "stop",
            StopBehavior::Brake => "brake",
            StopBehavior::Hold => "hold",
        }
    }
}

/// Motion defaults and hardware layout. Read-only to the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotDefaults {
    /// Straight speed in mm/s
    pub speed: f64,
    /// Straight acceleration in mm/s²
    pub acceleration: f64,
    /// Turn rate in deg/s
    pub turn_rate: f64,
    /// Turn acceleration in deg/s²
    pub turn_acceleration: f64,
    /// Attachment motor speed in deg/s
    pub motor_speed: f64,
    pub stop_behavior: StopBehavior,
    pub left_motor_port: String,
    pub right_motor_port: String,
    /// Wheel diameter in mm
    pub wheel_diameter: f64,
    /// Distance between wheel contact points in mm
    pub axle_track: f64,
    pub attachment1_port: Option<String>,
    pub attachment2_port: Option<String>,
}

impl Default for RobotDefaults {
    fn default() -> Self {
        Self {
            speed: 200.0,
            acceleration: 700.0,
            turn_rate: 150.0,
            turn_acceleration: 300.0,
            motor_speed: 200.0,
            stop_behavior: StopBehavior::Coast,
            left_motor_port: "A".to_string(),
            right_motor_port: "B".to_string(),
            wheel_diameter: 56.0,
            axle_track: 112.0,
            attachment1_port: None,
            attachment2_port: None,
        }
    }
}

/// Load defaults from a YAML file. Missing keys keep their default values.
pub fn load_defaults_file(path: impl AsRef<Path>) -> anyhow::Result<RobotDefaults> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading defaults: {}", path.display()))?;
    let defaults: RobotDefaults = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing yaml: {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded robot defaults");
    Ok(defaults)
}
