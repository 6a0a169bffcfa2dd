//! Configuration for Disha
//!
//! Loads configuration from a TOML file. Every key has a default, so an empty
//! file (or no file at all) gives the stock robot: HC-SR04 on BCM 23/24, pan
//! servo on BCM 17, L298N on BCM 4/5/6/13/19/9.
//!
//! ```toml
//! [device]
//! type = "mock"          # or "rpi"
//! name = "bench rover"
//!
//! [sensor]
//! echo_timeout_ms = 40
//! on_timeout = "hold"    # or "clear"
//!
//! [navigation]
//! obstacle_threshold_cm = 15.0
//! cruise_speed = 50
//! turn_speed = 50
//! ```

use crate::core::types::{Distance, Heading, SPEED_OF_SOUND_CM_S};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "mock")]
use crate::devices::mock::config::SimulationConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

/// Device selection and wiring
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Backend: "mock" or "rpi"
    #[serde(rename = "type", default = "default_device_type")]
    pub device_type: String,

    /// Human-readable name for logs
    #[serde(default = "default_device_name")]
    pub name: String,

    /// GPIO wiring (used by the "rpi" backend)
    #[serde(default)]
    pub pins: PinConfig,

    /// Simulated world (used by the "mock" backend)
    #[cfg(feature = "mock")]
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_device_type() -> String {
    "mock".to_string()
}
fn default_device_name() -> String {
    "Disha rover".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_type: default_device_type(),
            name: default_device_name(),
            pins: PinConfig::default(),
            #[cfg(feature = "mock")]
            simulation: SimulationConfig::default(),
        }
    }
}

/// BCM pin numbers
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PinConfig {
    /// Ultrasonic trigger output
    pub trigger: u8,
    /// Ultrasonic echo input
    pub echo: u8,
    /// Pan servo signal
    pub servo: u8,
    /// Left motor PWM enable (ENA)
    pub left_enable: u8,
    /// Left motor direction (IN1, IN2)
    pub left_forward: u8,
    pub left_reverse: u8,
    /// Right motor direction (IN3, IN4)
    pub right_forward: u8,
    pub right_reverse: u8,
    /// Right motor PWM enable (ENB)
    pub right_enable: u8,
    /// Motor PWM frequency
    pub motor_pwm_hz: f64,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            trigger: 23,
            echo: 24,
            servo: 17,
            left_enable: 4,
            left_forward: 5,
            left_reverse: 6,
            right_forward: 13,
            right_reverse: 19,
            right_enable: 9,
            motor_pwm_hz: 100.0,
        }
    }
}

/// What a missing echo counts as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Forward timeout: stop and retry. Side timeout: zero clearance.
    #[default]
    Hold,
    /// Timeout reads as open space (`max_range_cm`)
    Clear,
}

/// Ultrasonic ranging parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Trigger pulse width (microseconds)
    pub trigger_pulse_us: u64,
    /// Bound on each echo edge wait (milliseconds)
    pub echo_timeout_ms: u64,
    /// Speed of sound (cm/s)
    pub speed_of_sound_cm_s: f64,
    /// Reading substituted for a timeout under the `clear` policy
    pub max_range_cm: f64,
    pub on_timeout: TimeoutPolicy,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            trigger_pulse_us: 10,
            // HC-SR04 caps out around 400 cm, which is ~23 ms of echo
            echo_timeout_ms: 40,
            speed_of_sound_cm_s: SPEED_OF_SOUND_CM_S,
            max_range_cm: 400.0,
            on_timeout: TimeoutPolicy::Hold,
        }
    }
}

impl SensorConfig {
    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(self.trigger_pulse_us)
    }

    pub fn echo_timeout(&self) -> Duration {
        Duration::from_millis(self.echo_timeout_ms)
    }

    pub fn max_range(&self) -> Distance {
        Distance::from_cm(self.max_range_cm)
    }
}

/// Decision thresholds, speeds, headings, and timings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Readings below this stop the robot (cm)
    pub obstacle_threshold_cm: f64,
    /// Forward duty cycle (%)
    pub cruise_speed: u8,
    /// Turn-in-place duty cycle (%)
    pub turn_speed: u8,
    pub center_heading: Heading,
    pub left_heading: Heading,
    pub right_heading: Heading,
    /// Servo travel time after each aim (ms)
    pub settle_ms: u64,
    /// How long a turn is held (ms)
    pub turn_ms: u64,
    /// Pause after each stop (ms)
    pub pause_ms: u64,
    /// Delay between cruising iterations (ms)
    pub poll_ms: u64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            obstacle_threshold_cm: 15.0,
            cruise_speed: 50,
            turn_speed: 50,
            center_heading: Heading::CENTER,
            left_heading: Heading::LEFT_SCAN,
            right_heading: Heading::RIGHT_SCAN,
            settle_ms: 500,
            turn_ms: 1000,
            pause_ms: 500,
            poll_ms: 100,
        }
    }
}

impl NavigationConfig {
    pub fn obstacle_threshold(&self) -> Distance {
        Distance::from_cm(self.obstacle_threshold_cm)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn turn_hold(&self) -> Duration {
        Duration::from_millis(self.turn_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use disha::config::Config;
    ///
    /// let config = Config::load("disha.toml")?;
    /// # Ok::<(), disha::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the hardware or the decision logic cannot honor
    pub fn validate(&self) -> Result<()> {
        let nav = &self.navigation;
        if !nav.obstacle_threshold_cm.is_finite() || nav.obstacle_threshold_cm < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "obstacle_threshold_cm must be >= 0, got {}",
                nav.obstacle_threshold_cm
            )));
        }
        for (name, speed) in [("cruise_speed", nav.cruise_speed), ("turn_speed", nav.turn_speed)] {
            if speed > 100 {
                return Err(Error::InvalidParameter(format!(
                    "{} must be 0-100, got {}",
                    name, speed
                )));
            }
        }

        let sensor = &self.sensor;
        if sensor.echo_timeout_ms == 0 {
            return Err(Error::InvalidParameter(
                "echo_timeout_ms must be > 0".to_string(),
            ));
        }
        if !(sensor.speed_of_sound_cm_s > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "speed_of_sound_cm_s must be > 0, got {}",
                sensor.speed_of_sound_cm_s
            )));
        }
        if !(sensor.max_range_cm > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "max_range_cm must be > 0, got {}",
                sensor.max_range_cm
            )));
        }
        Ok(())
    }
}
