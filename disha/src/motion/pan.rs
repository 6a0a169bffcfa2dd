//! Sensor pan mechanism
//!
//! The servo gives no position feedback, so every aim waits a fixed settle
//! time before the next reading is trusted. The wait goes through the
//! cancellation token and ends early on shutdown.

use crate::core::cancel::CancelToken;
use crate::core::driver::ServoChannel;
use crate::core::types::Heading;
use crate::error::Result;
use std::time::Duration;

pub struct PanMechanism {
    servo: Box<dyn ServoChannel>,
    settle: Duration,
    cancel: CancelToken,
    heading: Option<Heading>,
}

impl PanMechanism {
    pub fn new(servo: Box<dyn ServoChannel>, settle: Duration, cancel: CancelToken) -> Self {
        Self {
            servo,
            settle,
            cancel,
            heading: None,
        }
    }

    /// Point the sensor at `heading` and wait for the servo to get there
    pub fn aim(&mut self, heading: Heading) -> Result<()> {
        self.servo.set_angle(heading)?;
        self.heading = Some(heading);
        log::trace!("Pan -> {}", heading);
        self.cancel.sleep(self.settle)
    }

    /// Last commanded heading, `None` before the first aim or after `park`
    pub fn heading(&self) -> Option<Heading> {
        self.heading
    }

    /// Center without waiting, then stop driving the servo
    ///
    /// Both steps are attempted; the first failure is returned.
    pub fn park(&mut self) -> Result<()> {
        let centered = self.servo.set_angle(Heading::CENTER);
        let released = self.servo.release();
        self.heading = None;
        centered.and(released)
    }
}
