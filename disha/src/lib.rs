//! Disha - ultrasonic obstacle avoidance for a differential-drive robot
//!
//! An HC-SR04 range sensor on a pan servo looks ahead while the robot drives
//! forward. When something comes closer than the configured threshold the
//! robot stops, looks left and right, and turns toward the side with more
//! room.
//!
//! ## Features
//!
//! - `mock` (default): simulated arena for hardware-free runs and tests
//! - `rpi`: Raspberry Pi GPIO backend (HC-SR04, SG90 servo, L298N)

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod motion;
pub mod navigation;
pub mod sensors;

// Re-export commonly used types
pub use config::Config;
pub use crate::core::cancel::CancelToken;
pub use error::{Error, Result};
pub use navigation::NavigationLoop;
