//! Mock device simulation configuration
//!
//! Defaults describe a small two-wheel rover (SG90 pan servo, HC-SR04,
//! TT gear motors) in an empty 3 m x 2 m pen:
//!
//! | Parameter | Default |
//! |-----------|---------|
//! | arena | 300 x 200 cm |
//! | start | (150, 100) cm facing +X |
//! | wheel_base_cm | 13.0 |
//! | max_wheel_speed_cm_s | 40.0 at 100% duty |
//! | robot_radius_cm | 9.0 |
//! | sensor_offset_cm | 7.0 ahead of center |
//! | max_range_cm | 400.0 |
//!
//! ```toml
//! [device.simulation]
//! start_x_cm = 40.0
//! start_heading_deg = 90.0
//! random_seed = 42        # 0 = random each run
//! speed_factor = 2.0
//!
//! [[device.simulation.obstacles]]
//! x_cm = 150.0
//! y_cm = 60.0
//! radius_cm = 12.0
//! ```

use serde::{Deserialize, Serialize};

/// Round obstacle (chair leg, bin, ...)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObstacleConfig {
    pub x_cm: f32,
    pub y_cm: f32,
    pub radius_cm: f32,
}

/// Simulated world and robot
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Arena extent along X (cm)
    #[serde(default = "default_arena_width")]
    pub arena_width_cm: f32,

    /// Arena extent along Y (cm)
    #[serde(default = "default_arena_height")]
    pub arena_height_cm: f32,

    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,

    /// Start position (cm)
    #[serde(default = "default_start_x")]
    pub start_x_cm: f32,
    #[serde(default = "default_start_y")]
    pub start_y_cm: f32,

    /// Start orientation, degrees CCW from +X
    #[serde(default)]
    pub start_heading_deg: f32,

    /// Distance between wheel contact points (cm)
    #[serde(default = "default_wheel_base")]
    pub wheel_base_cm: f32,

    /// Wheel surface speed at 100% duty (cm/s)
    #[serde(default = "default_max_wheel_speed")]
    pub max_wheel_speed_cm_s: f32,

    /// Collision radius (cm)
    #[serde(default = "default_robot_radius")]
    pub robot_radius_cm: f32,

    /// Sensor mount distance ahead of the wheel axis (cm)
    #[serde(default = "default_sensor_offset")]
    pub sensor_offset_cm: f32,

    /// Beyond this no echo comes back (cm)
    #[serde(default = "default_max_range")]
    pub max_range_cm: f32,

    /// Gaussian range noise (cm)
    #[serde(default = "default_range_stddev")]
    pub range_stddev_cm: f32,

    /// Probability a ping gets no echo at all (0.0-1.0)
    #[serde(default = "default_echo_dropout")]
    pub echo_dropout: f32,

    /// Simulated seconds per wall-clock second
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f32,

    /// Noise seed (0 = random)
    #[serde(default)]
    pub random_seed: u64,
}

fn default_arena_width() -> f32 {
    300.0
}
fn default_arena_height() -> f32 {
    200.0
}
fn default_start_x() -> f32 {
    150.0
}
fn default_start_y() -> f32 {
    100.0
}
fn default_wheel_base() -> f32 {
    13.0
}
fn default_max_wheel_speed() -> f32 {
    40.0
}
fn default_robot_radius() -> f32 {
    9.0
}
fn default_sensor_offset() -> f32 {
    7.0
}
fn default_max_range() -> f32 {
    400.0
}
fn default_range_stddev() -> f32 {
    0.3
}
fn default_echo_dropout() -> f32 {
    0.01
}
fn default_speed_factor() -> f32 {
    1.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            arena_width_cm: default_arena_width(),
            arena_height_cm: default_arena_height(),
            obstacles: Vec::new(),
            start_x_cm: default_start_x(),
            start_y_cm: default_start_y(),
            start_heading_deg: 0.0,
            wheel_base_cm: default_wheel_base(),
            max_wheel_speed_cm_s: default_max_wheel_speed(),
            robot_radius_cm: default_robot_radius(),
            sensor_offset_cm: default_sensor_offset(),
            max_range_cm: default_max_range(),
            range_stddev_cm: default_range_stddev(),
            echo_dropout: default_echo_dropout(),
            speed_factor: default_speed_factor(),
            random_seed: 0,
        }
    }
}
