//! Core data types shared by the sensor, actuators, and navigation loop.
//!
//! - [`Distance`]: echo-derived clearance in centimeters
//! - [`Heading`]: pan angle in degrees (90 = forward)
//! - [`MotionCommand`]: what the navigation loop asks the drive for
//! - [`WheelDrive`]: what one motor channel is actually told

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Speed of sound at ~20°C, cm/s
pub const SPEED_OF_SOUND_CM_S: f64 = 34_300.0;

/// Digital line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Echo line transition the range sensor waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoEdge {
    /// Echo line goes high (sound pulse left)
    Rising,
    /// Echo line goes low (echo returned)
    Falling,
}

impl EchoEdge {
    /// Line level that marks this edge as having happened
    pub fn target_level(self) -> Level {
        match self {
            EchoEdge::Rising => Level::High,
            EchoEdge::Falling => Level::Low,
        }
    }
}

impl fmt::Display for EchoEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoEdge::Rising => f.write_str("rising"),
            EchoEdge::Falling => f.write_str("falling"),
        }
    }
}

/// Measured clearance in centimeters, never negative.
///
/// Full precision is kept for comparisons; [`Distance::reported`] gives the
/// two-decimal value used in logs.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Distance(f64);

impl Distance {
    pub const ZERO: Distance = Distance(0.0);

    /// Create from centimeters (negative and NaN clamp to zero)
    pub fn from_cm(cm: f64) -> Self {
        if cm.is_nan() || cm < 0.0 {
            Self(0.0)
        } else {
            Self(cm)
        }
    }

    /// Convert an echo pulse width to distance (round trip, so halved)
    pub fn from_echo(pulse: Duration, speed_of_sound_cm_s: f64) -> Self {
        Self::from_cm(pulse.as_secs_f64() * speed_of_sound_cm_s / 2.0)
    }

    /// Full-precision centimeters
    #[inline]
    pub fn cm(self) -> f64 {
        self.0
    }

    /// Centimeters rounded to two decimals
    pub fn reported(self) -> f64 {
        (self.0 * 100.0).round() / 100.0
    }

    /// Clear path at this threshold (boundary counts as clear)
    #[inline]
    pub fn is_clear(self, threshold: Distance) -> bool {
        self.0 >= threshold.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} cm", self.0)
    }
}

/// Pan angle in degrees, `[0, 180]`. 90 points straight ahead; larger values
/// look left.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Heading(f32);

impl Heading {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 180.0;
    pub const CENTER: Heading = Heading(90.0);
    pub const LEFT_SCAN: Heading = Heading(150.0);
    pub const RIGHT_SCAN: Heading = Heading(30.0);

    /// Validate and wrap an angle
    pub fn new(degrees: f32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&degrees) {
            Ok(Self(degrees))
        } else {
            Err(Error::InvalidParameter(format!(
                "heading {} outside [{}, {}] degrees",
                degrees,
                Self::MIN,
                Self::MAX
            )))
        }
    }

    #[inline]
    pub fn degrees(self) -> f32 {
        self.0
    }

    /// Offset from center in radians, positive = left (CCW)
    pub fn offset_from_center_rad(self) -> f32 {
        (self.0 - Self::CENTER.0).to_radians()
    }
}

impl TryFrom<f32> for Heading {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self> {
        Heading::new(value)
    }
}

impl From<Heading> for f32 {
    fn from(h: Heading) -> f32 {
        h.0
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Turn direction chosen after a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDirection::Left => f.write_str("left"),
            TurnDirection::Right => f.write_str("right"),
        }
    }
}

/// Drive command with a duty-cycle percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    Forward(u8),
    Backward(u8),
    TurnLeft(u8),
    TurnRight(u8),
    Stop,
}

impl MotionCommand {
    /// Turn in place toward `direction`
    pub fn turn(direction: TurnDirection, speed: u8) -> Self {
        match direction {
            TurnDirection::Left => MotionCommand::TurnLeft(speed),
            TurnDirection::Right => MotionCommand::TurnRight(speed),
        }
    }

    /// Duty cycle, clamped to 100
    pub fn speed(self) -> u8 {
        match self {
            MotionCommand::Forward(s)
            | MotionCommand::Backward(s)
            | MotionCommand::TurnLeft(s)
            | MotionCommand::TurnRight(s) => s.min(100),
            MotionCommand::Stop => 0,
        }
    }
}

/// Side samples taken while halted in front of an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    pub left: Distance,
    pub right: Distance,
}

impl ScanResult {
    /// Side with more clearance. Equal clearance turns right.
    pub fn preferred_turn(&self) -> TurnDirection {
        if self.left > self.right {
            TurnDirection::Left
        } else {
            TurnDirection::Right
        }
    }
}

/// Direction pin pair state for one motor (L298N IN1/IN2 style)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Forward,
    Reverse,
    /// Both direction lines low
    Coast,
}

/// Signal for one motor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelDrive {
    pub direction: WheelDirection,
    /// Duty cycle percent, 0-100
    pub duty: u8,
}

impl WheelDrive {
    pub const OFF: WheelDrive = WheelDrive {
        direction: WheelDirection::Coast,
        duty: 0,
    };

    pub fn forward(duty: u8) -> Self {
        Self {
            direction: WheelDirection::Forward,
            duty: duty.min(100),
        }
    }

    pub fn reverse(duty: u8) -> Self {
        Self {
            direction: WheelDirection::Reverse,
            duty: duty.min(100),
        }
    }

    /// Duty in `-100..=100`, sign = direction
    pub fn signed_duty(self) -> i8 {
        let duty = self.duty.min(100) as i8;
        match self.direction {
            WheelDirection::Forward => duty,
            WheelDirection::Reverse => -duty,
            WheelDirection::Coast => 0,
        }
    }
}
