//! Ultrasonic range sensor (HC-SR04 protocol)
//!
//! ```text
//! trigger  __|‾‾10us‾‾|____________________________________
//! echo     ____________________|‾‾‾‾‾ pulse width ‾‾‾‾‾|____
//!                              ^ rising               ^ falling
//! ```
//!
//! Distance is the pulse width times the speed of sound, halved for the round
//! trip. Each edge wait is bounded by the echo timeout; a missing edge is
//! reported as [`Error::SensorTimeout`] instead of blocking forever.

use crate::config::SensorConfig;
use crate::core::driver::EchoPins;
use crate::core::types::{Distance, EchoEdge};
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Range sensor on an owned trigger/echo pin pair
pub struct RangeSensor {
    pins: Box<dyn EchoPins>,
    trigger_pulse: Duration,
    echo_timeout: Duration,
    speed_of_sound_cm_s: f64,
}

impl RangeSensor {
    pub fn new(pins: Box<dyn EchoPins>, config: &SensorConfig) -> Self {
        Self {
            pins,
            trigger_pulse: config.trigger_pulse(),
            echo_timeout: config.echo_timeout(),
            speed_of_sound_cm_s: config.speed_of_sound_cm_s,
        }
    }

    /// Fire one ping and time its echo
    pub fn measure(&mut self) -> Result<Distance> {
        self.pins.send_trigger(self.trigger_pulse)?;

        let rise = self.wait_edge(EchoEdge::Rising)?;
        let fall = self.wait_edge(EchoEdge::Falling)?;

        let pulse = fall.saturating_duration_since(rise);
        let distance = Distance::from_echo(pulse, self.speed_of_sound_cm_s);
        log::debug!("Echo pulse {}us -> {:.2} cm", pulse.as_micros(), distance.reported());
        Ok(distance)
    }

    fn wait_edge(&mut self, edge: EchoEdge) -> Result<Instant> {
        self.pins
            .wait_for_echo(edge.target_level(), self.echo_timeout)?
            .ok_or(Error::SensorTimeout {
                edge,
                waited_ms: self.echo_timeout.as_millis() as u64,
            })
    }
}
