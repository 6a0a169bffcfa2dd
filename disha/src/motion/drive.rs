//! Differential drive actuator
//!
//! Maps a [`MotionCommand`] to per-wheel direction and duty:
//!
//! | Command   | Left    | Right   | Duty  |
//! |-----------|---------|---------|-------|
//! | Forward   | fwd     | fwd     | speed |
//! | Backward  | rev     | rev     | speed |
//! | TurnLeft  | rev     | fwd     | speed |
//! | TurnRight | fwd     | rev     | speed |
//! | Stop      | coast   | coast   | 0     |
//!
//! # Known Limitations
//!
//! There is no stop-before-reverse interlock. Going from `TurnLeft` straight
//! to `TurnRight` flips the direction lines while the PWM is still running;
//! callers that care must issue `Stop` in between (the navigation loop always
//! does).

use crate::core::driver::MotorChannels;
use crate::core::types::{MotionCommand, WheelDrive};
use crate::error::Result;

pub struct DriveActuator {
    motors: Box<dyn MotorChannels>,
    last: Option<MotionCommand>,
}

impl DriveActuator {
    pub fn new(motors: Box<dyn MotorChannels>) -> Self {
        Self { motors, last: None }
    }

    /// Wheel signals for a command, `(left, right)`
    pub fn wheel_signals(command: MotionCommand) -> (WheelDrive, WheelDrive) {
        let speed = command.speed();
        match command {
            MotionCommand::Forward(_) => (WheelDrive::forward(speed), WheelDrive::forward(speed)),
            MotionCommand::Backward(_) => (WheelDrive::reverse(speed), WheelDrive::reverse(speed)),
            MotionCommand::TurnLeft(_) => (WheelDrive::reverse(speed), WheelDrive::forward(speed)),
            MotionCommand::TurnRight(_) => (WheelDrive::forward(speed), WheelDrive::reverse(speed)),
            MotionCommand::Stop => (WheelDrive::OFF, WheelDrive::OFF),
        }
    }

    pub fn apply(&mut self, command: MotionCommand) -> Result<()> {
        let (left, right) = Self::wheel_signals(command);
        if self.last != Some(command) {
            log::debug!(
                "Drive {:?}: left {:+}%, right {:+}%",
                command,
                left.signed_duty(),
                right.signed_duty()
            );
        }
        self.motors.drive(left, right)?;
        self.last = Some(command);
        Ok(())
    }

    /// Last command successfully applied
    pub fn last_command(&self) -> Option<MotionCommand> {
        self.last
    }

    /// Hand the motor channels back (PWM off, direction lines low)
    pub fn release(&mut self) -> Result<()> {
        self.motors.release()
    }
}
