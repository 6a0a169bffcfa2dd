//! Raspberry Pi GPIO backend
//!
//! Wiring (BCM numbering, see [`PinConfig`] for defaults):
//!
//! | Part | Pins | Drive |
//! |------|------|-------|
//! | HC-SR04 | trigger out, echo in | edge interrupts with kernel timestamps |
//! | SG90 pan servo | signal | software PWM, 50 Hz, 0.5-2.5 ms pulse |
//! | L298N | ENA/ENB PWM, IN1-IN4 | software PWM on the enables, IN pins set direction |
//!
//! The HC-SR04 echo output is 5 V; it needs a divider before the Pi input.

use crate::config::PinConfig;
use crate::core::driver::{EchoPins, Hardware, MotorChannels, ServoChannel};
use crate::core::types::{Heading, Level, WheelDirection, WheelDrive};
use crate::error::{Error, Result};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use std::thread;
use std::time::{Duration, Instant};

const SERVO_PERIOD: Duration = Duration::from_millis(20);
const SERVO_MIN_PULSE_US: f32 = 500.0;
const SERVO_SPAN_US: f32 = 2000.0;

/// Claim every configured pin
pub fn create(pins: &PinConfig) -> Result<Hardware> {
    let gpio = Gpio::new().map_err(|e| {
        Error::InitializationFailed(format!("GPIO unavailable (not a Raspberry Pi?): {}", e))
    })?;

    log::info!(
        "GPIO: trigger={} echo={} servo={} ENA={} IN1={} IN2={} IN3={} IN4={} ENB={}",
        pins.trigger,
        pins.echo,
        pins.servo,
        pins.left_enable,
        pins.left_forward,
        pins.left_reverse,
        pins.right_forward,
        pins.right_reverse,
        pins.right_enable
    );

    let mut trigger = gpio.get(pins.trigger)?.into_output();
    trigger.set_low();
    let mut echo = gpio.get(pins.echo)?.into_input();
    echo.set_interrupt(Trigger::Both, None)?;

    let servo = gpio.get(pins.servo)?.into_output();

    let left = HBridgeSide {
        enable: gpio.get(pins.left_enable)?.into_output(),
        forward: gpio.get(pins.left_forward)?.into_output(),
        reverse: gpio.get(pins.left_reverse)?.into_output(),
    };
    let right = HBridgeSide {
        enable: gpio.get(pins.right_enable)?.into_output(),
        forward: gpio.get(pins.right_forward)?.into_output(),
        reverse: gpio.get(pins.right_reverse)?.into_output(),
    };
    let mut motors = L298nMotors {
        left,
        right,
        pwm_hz: pins.motor_pwm_hz,
    };
    // Enables start at 0% so the first command never lurches
    motors.drive(WheelDrive::OFF, WheelDrive::OFF)?;

    Ok(Hardware {
        echo: Box::new(GpioEcho {
            trigger,
            echo,
            rise: None,
        }),
        servo: Box::new(PwmServo { pin: servo }),
        motors: Box::new(motors),
    })
}

/// Echo line watched through edge interrupts
///
/// Event timestamps come from the kernel, so the pulse width does not depend
/// on how quickly this thread wakes up.
struct GpioEcho {
    trigger: OutputPin,
    echo: InputPin,
    /// Host instant and kernel timestamp of the last rising edge
    rise: Option<(Instant, Duration)>,
}

impl EchoPins for GpioEcho {
    fn send_trigger(&mut self, width: Duration) -> Result<()> {
        // Drop edges left over from the previous ping
        while self.echo.poll_interrupt(false, Some(Duration::ZERO))?.is_some() {}
        self.rise = None;

        self.trigger.set_low();
        thread::sleep(Duration::from_micros(2));
        self.trigger.set_high();
        let start = Instant::now();
        while start.elapsed() < width {
            std::hint::spin_loop();
        }
        self.trigger.set_low();
        Ok(())
    }

    fn wait_for_echo(&mut self, level: Level, timeout: Duration) -> Result<Option<Instant>> {
        let wanted = match level {
            Level::High => Trigger::RisingEdge,
            Level::Low => Trigger::FallingEdge,
        };
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let Some(event) = self.echo.poll_interrupt(false, Some(remaining))? else {
                return Ok(None);
            };
            if event.trigger != wanted {
                continue;
            }
            let now = Instant::now();
            return Ok(Some(match level {
                Level::High => {
                    self.rise = Some((now, event.timestamp));
                    now
                }
                Level::Low => fall_instant(self.rise, event.timestamp, now),
            }));
        }
    }
}

/// Place a falling edge on the host clock, one pulse width after the rise
fn fall_instant(rise: Option<(Instant, Duration)>, fall_ts: Duration, now: Instant) -> Instant {
    match rise {
        Some((rise_at, rise_ts)) => rise_at + fall_ts.saturating_sub(rise_ts),
        None => now,
    }
}

struct PwmServo {
    pin: OutputPin,
}

impl ServoChannel for PwmServo {
    fn set_angle(&mut self, heading: Heading) -> Result<()> {
        let pulse_us = SERVO_MIN_PULSE_US + heading.degrees() / Heading::MAX * SERVO_SPAN_US;
        self.pin
            .set_pwm(SERVO_PERIOD, Duration::from_micros(pulse_us.round() as u64))?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.pin.clear_pwm()?;
        self.pin.set_low();
        Ok(())
    }
}

struct HBridgeSide {
    enable: OutputPin,
    forward: OutputPin,
    reverse: OutputPin,
}

impl HBridgeSide {
    fn apply(&mut self, drive: WheelDrive, pwm_hz: f64) -> Result<()> {
        match drive.direction {
            WheelDirection::Forward => {
                self.forward.set_high();
                self.reverse.set_low();
            }
            WheelDirection::Reverse => {
                self.forward.set_low();
                self.reverse.set_high();
            }
            WheelDirection::Coast => {
                self.forward.set_low();
                self.reverse.set_low();
            }
        }
        let duty = match drive.direction {
            WheelDirection::Coast => 0.0,
            _ => drive.duty.min(100) as f64 / 100.0,
        };
        self.enable.set_pwm_frequency(pwm_hz, duty)?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.enable.clear_pwm()?;
        self.enable.set_low();
        self.forward.set_low();
        self.reverse.set_low();
        Ok(())
    }
}

struct L298nMotors {
    left: HBridgeSide,
    right: HBridgeSide,
    pwm_hz: f64,
}

impl MotorChannels for L298nMotors {
    fn drive(&mut self, left: WheelDrive, right: WheelDrive) -> Result<()> {
        self.left.apply(left, self.pwm_hz)?;
        self.right.apply(right, self.pwm_hz)
    }

    fn release(&mut self) -> Result<()> {
        let left = self.left.release();
        let right = self.right.release();
        left.and(right)
    }
}
