//! Hardware traits implemented by each device backend

use crate::core::types::{Heading, Level, WheelDrive};
use crate::error::Result;
use std::time::{Duration, Instant};

/// Ultrasonic sensor trigger/echo line pair
pub trait EchoPins: Send {
    /// Hold the trigger line high for `width`, then drive it low
    fn send_trigger(&mut self, width: Duration) -> Result<()>;

    /// Block until the echo line reads `level` or `timeout` elapses
    ///
    /// Returns the instant the level was observed, `None` on timeout.
    /// Implementations must never wait longer than `timeout`.
    fn wait_for_echo(&mut self, level: Level, timeout: Duration) -> Result<Option<Instant>>;
}

/// Pan servo output
pub trait ServoChannel: Send {
    /// Command the servo to `heading` (returns immediately)
    fn set_angle(&mut self, heading: Heading) -> Result<()>;

    /// Stop driving the servo (pulse output off)
    fn release(&mut self) -> Result<()>;
}

/// Two motor channels of a differential drive
pub trait MotorChannels: Send {
    /// Apply direction and duty to both wheels
    fn drive(&mut self, left: WheelDrive, right: WheelDrive) -> Result<()>;

    /// Zero the PWM outputs and drop all direction lines
    fn release(&mut self) -> Result<()>;
}

/// Owned driver handles for one robot, produced by a device backend
pub struct Hardware {
    pub echo: Box<dyn EchoPins>,
    pub servo: Box<dyn ServoChannel>,
    pub motors: Box<dyn MotorChannels>,
}
