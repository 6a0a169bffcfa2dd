//! Obstacle-avoidance state machine
//!
//! ```text
//!            d >= threshold: Forward
//!              ┌──────┐
//!              ▼      │
//!          ┌──────────┴┐  d < threshold: Stop   ┌────────────────┐
//!   ──────▶│ Cruising  │───────────────────────▶│ HaltedScanning │
//!          └───────────┘                        └───────┬────────┘
//!                ▲                                      │ left > right: TurnLeft
//!                │ hold elapsed: Stop                   │ otherwise:    TurnRight
//!                │                              ┌───────▼────────┐
//!                └──────────────────────────────│ Turning(dir)   │
//!                                               └────────────────┘
//! ```
//!
//! Every iteration starts with a cancellation check and every wait (servo
//! settle, turn hold, pauses) wakes on cancellation. Whatever ends the loop,
//! [`NavigationLoop::shutdown`] stops the motors, parks the pan servo and
//! releases the motor channels; `Drop` runs it too if `run` never got there.

use crate::config::{Config, NavigationConfig, TimeoutPolicy};
use crate::core::cancel::CancelToken;
use crate::core::driver::Hardware;
use crate::core::types::{Distance, MotionCommand, ScanResult, TurnDirection};
use crate::error::{Error, Result};
use crate::motion::{DriveActuator, PanMechanism};
use crate::sensors::RangeSensor;

/// Decision state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Cruising,
    HaltedScanning,
    Turning(TurnDirection),
}

/// Counters reported at shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Forward readings taken
    pub cycles: u64,
    pub obstacles: u64,
    pub sensor_timeouts: u64,
    pub left_turns: u64,
    pub right_turns: u64,
}

pub struct NavigationLoop {
    ranger: RangeSensor,
    pan: PanMechanism,
    drive: DriveActuator,
    config: NavigationConfig,
    timeout_policy: TimeoutPolicy,
    max_range: Distance,
    cancel: CancelToken,
    state: NavState,
    stats: LoopStats,
    shut_down: bool,
}

impl NavigationLoop {
    /// Take ownership of the hardware and start in `Cruising`
    pub fn new(hardware: Hardware, config: &Config, cancel: CancelToken) -> Self {
        let Hardware {
            echo,
            servo,
            motors,
        } = hardware;
        Self {
            ranger: RangeSensor::new(echo, &config.sensor),
            pan: PanMechanism::new(servo, config.navigation.settle(), cancel.clone()),
            drive: DriveActuator::new(motors),
            config: config.navigation.clone(),
            timeout_policy: config.sensor.on_timeout,
            max_range: config.sensor.max_range(),
            cancel,
            state: NavState::Cruising,
            stats: LoopStats::default(),
            shut_down: false,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run until cancelled or an unrecoverable error, then shut down.
    ///
    /// Cancellation is a normal exit. Any other error is returned after the
    /// shutdown sequence has run.
    pub fn run(mut self) -> Result<LoopStats> {
        log::info!(
            "Navigation loop running (threshold {:.1} cm, cruise {}%, turn {}%)",
            self.config.obstacle_threshold_cm,
            self.config.cruise_speed,
            self.config.turn_speed
        );

        let outcome = loop {
            match self.step() {
                Ok(()) => {}
                Err(Error::Cancelled) => {
                    log::info!(
                        "Cancellation requested in state {:?} (pan at {:?})",
                        self.state,
                        self.pan.heading()
                    );
                    break Ok(());
                }
                Err(e) => break Err(e),
            }
        };

        self.shutdown();

        let stats = self.stats;
        log::info!(
            "Loop statistics: {} readings, {} obstacles, {} sensor timeouts, {} left / {} right turns",
            stats.cycles,
            stats.obstacles,
            stats.sensor_timeouts,
            stats.left_turns,
            stats.right_turns
        );

        match outcome {
            Ok(()) => Ok(stats),
            Err(e) => {
                log::error!("Navigation loop aborted: {}", e);
                Err(e)
            }
        }
    }

    /// Execute the current state's actions once
    pub fn step(&mut self) -> Result<()> {
        self.cancel.check()?;
        match self.state {
            NavState::Cruising => self.cruise(),
            NavState::HaltedScanning => self.scan(),
            NavState::Turning(direction) => self.finish_turn(direction),
        }
    }

    fn cruise(&mut self) -> Result<()> {
        self.pan.aim(self.config.center_heading)?;
        let reading = self.read("front")?;
        self.stats.cycles += 1;

        match reading {
            Some(distance) if distance.is_clear(self.config.obstacle_threshold()) => {
                log::debug!("Front clear at {}", distance);
                self.drive.apply(MotionCommand::Forward(self.config.cruise_speed))?;
                self.cancel.sleep(self.config.poll())
            }
            Some(distance) => {
                log::info!("Obstacle at {}, stopping to scan", distance);
                self.stats.obstacles += 1;
                self.drive.apply(MotionCommand::Stop)?;
                self.transition(NavState::HaltedScanning);
                self.cancel.sleep(self.config.pause())
            }
            None => {
                // No usable reading: hold position and retry
                self.drive.apply(MotionCommand::Stop)?;
                self.cancel.sleep(self.config.poll())
            }
        }
    }

    fn scan(&mut self) -> Result<()> {
        self.pan.aim(self.config.left_heading)?;
        let left = self.read("left")?.unwrap_or(Distance::ZERO);

        self.pan.aim(self.config.right_heading)?;
        let right = self.read("right")?.unwrap_or(Distance::ZERO);

        let scan = ScanResult { left, right };
        let direction = scan.preferred_turn();
        log::info!(
            "Scan: left {}, right {} -> turning {}",
            scan.left,
            scan.right,
            direction
        );

        self.drive.apply(MotionCommand::turn(direction, self.config.turn_speed))?;
        match direction {
            TurnDirection::Left => self.stats.left_turns += 1,
            TurnDirection::Right => self.stats.right_turns += 1,
        }
        self.transition(NavState::Turning(direction));
        Ok(())
    }

    fn finish_turn(&mut self, direction: TurnDirection) -> Result<()> {
        self.cancel.sleep(self.config.turn_hold())?;
        self.drive.apply(MotionCommand::Stop)?;
        log::debug!("Turn {} complete", direction);
        self.transition(NavState::Cruising);
        self.cancel.sleep(self.config.pause())?;
        self.cancel.sleep(self.config.poll())
    }

    /// Measure, folding a sensor timeout into the configured policy.
    ///
    /// `None` means "no usable reading" (hold policy).
    fn read(&mut self, label: &str) -> Result<Option<Distance>> {
        let reading = match self.ranger.measure() {
            Ok(distance) => Some(distance),
            Err(e) if e.is_recoverable() => {
                self.stats.sensor_timeouts += 1;
                log::warn!("{} reading unavailable: {}", label, e);
                match self.timeout_policy {
                    TimeoutPolicy::Hold => None,
                    TimeoutPolicy::Clear => Some(self.max_range),
                }
            }
            Err(e) => return Err(e),
        };
        // Echo waits do not watch the token; no command may follow a stop
        // that arrived during one
        self.cancel.check()?;
        Ok(reading)
    }

    fn transition(&mut self, next: NavState) {
        if next != self.state {
            log::info!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Stop motors, park the pan servo, release the motor channels.
    ///
    /// Runs once; every step is attempted and failures are only logged.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        log::info!(
            "Stopping motors (last command {:?}) and parking sensor",
            self.drive.last_command()
        );

        if let Err(e) = self.drive.apply(MotionCommand::Stop) {
            log::error!("Failed to stop motors: {}", e);
        }
        if let Err(e) = self.pan.park() {
            log::error!("Failed to park pan servo: {}", e);
        }
        if let Err(e) = self.drive.release() {
            log::error!("Failed to release motor channels: {}", e);
        }
    }
}

impl Drop for NavigationLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Heading, WheelDrive};
    use crate::devices::testing::{
        Echo, HwEvent, Recorder, ScriptedEcho, hardware_with_echo, scripted_hardware,
        scripted_hardware_cancel_on_turn, scripted_hardware_failing_forward,
    };
    use std::time::Duration;

    /// Stock decisions, no waiting
    fn fast_config() -> Config {
        let mut config = Config::default();
        config.navigation.settle_ms = 0;
        config.navigation.turn_ms = 0;
        config.navigation.pause_ms = 0;
        config.navigation.poll_ms = 0;
        config
    }

    fn nav(script: Vec<Echo>) -> (NavigationLoop, Recorder) {
        let (hw, recorder) = scripted_hardware(script);
        (NavigationLoop::new(hw, &fast_config(), CancelToken::new()), recorder)
    }

    const STOP: (WheelDrive, WheelDrive) = (WheelDrive::OFF, WheelDrive::OFF);

    #[test]
    fn test_clear_path_drives_forward() {
        let (mut nav, recorder) = nav(vec![Echo::cm(16.0)]);
        nav.step().unwrap();

        assert_eq!(nav.state(), NavState::Cruising);
        assert_eq!(
            recorder.events(),
            vec![
                HwEvent::Servo(Heading::CENTER),
                HwEvent::Trigger(Duration::from_micros(10)),
                HwEvent::Drive(WheelDrive::forward(50), WheelDrive::forward(50)),
            ]
        );
        assert_eq!(nav.stats().cycles, 1);
    }

    #[test]
    fn test_obstacle_stops_and_scans() {
        let (mut nav, recorder) = nav(vec![Echo::cm(10.0)]);
        nav.step().unwrap();

        assert_eq!(nav.state(), NavState::HaltedScanning);
        assert_eq!(
            recorder.actions(),
            vec![HwEvent::Servo(Heading::CENTER), HwEvent::Drive(STOP.0, STOP.1)]
        );
        assert_eq!(nav.stats().obstacles, 1);
    }

    #[test]
    fn test_scan_turns_toward_more_clearance() {
        let (mut nav, recorder) = nav(vec![Echo::cm(10.0), Echo::cm(40.0), Echo::cm(25.0)]);
        nav.step().unwrap();
        recorder.clear();
        nav.step().unwrap();

        assert_eq!(nav.state(), NavState::Turning(TurnDirection::Left));
        assert_eq!(
            recorder.actions(),
            vec![
                HwEvent::Servo(Heading::LEFT_SCAN),
                HwEvent::Servo(Heading::RIGHT_SCAN),
                HwEvent::Drive(WheelDrive::reverse(50), WheelDrive::forward(50)),
            ]
        );
        assert_eq!(nav.stats().left_turns, 1);
    }

    #[test]
    fn test_scan_tie_turns_right() {
        let (mut nav, recorder) = nav(vec![Echo::cm(10.0), Echo::cm(30.0), Echo::cm(30.0)]);
        nav.step().unwrap();
        nav.step().unwrap();

        assert_eq!(nav.state(), NavState::Turning(TurnDirection::Right));
        assert_eq!(
            recorder.drives().last().copied(),
            Some((WheelDrive::forward(50), WheelDrive::reverse(50)))
        );
    }

    #[test]
    fn test_turn_completes_back_to_cruising() {
        let (mut nav, recorder) = nav(vec![Echo::cm(10.0), Echo::cm(20.0), Echo::cm(60.0)]);
        nav.step().unwrap();
        nav.step().unwrap();
        nav.step().unwrap();

        assert_eq!(nav.state(), NavState::Cruising);
        assert_eq!(
            recorder.drives(),
            vec![
                STOP,
                (WheelDrive::forward(50), WheelDrive::reverse(50)),
                STOP
            ]
        );

        // Fallback echo is 100 cm: next cycle cruises
        nav.step().unwrap();
        assert_eq!(
            recorder.drives().last().copied(),
            Some((WheelDrive::forward(50), WheelDrive::forward(50)))
        );
    }

    #[test]
    fn test_front_timeout_holds_position() {
        let (mut nav, recorder) = nav(vec![Echo::NoRise]);
        nav.step().unwrap();

        assert_eq!(nav.state(), NavState::Cruising);
        assert_eq!(recorder.drives(), vec![STOP]);
        assert_eq!(nav.stats().sensor_timeouts, 1);

        // Loop continues with the next reading
        nav.step().unwrap();
        assert_eq!(recorder.drives().len(), 2);
        assert_eq!(recorder.drives()[1].0, WheelDrive::forward(50));
    }

    #[test]
    fn test_front_timeout_clear_policy_drives_on() {
        let (hw, recorder) = scripted_hardware(vec![Echo::NoFall]);
        let mut config = fast_config();
        config.sensor.on_timeout = TimeoutPolicy::Clear;
        let mut nav = NavigationLoop::new(hw, &config, CancelToken::new());

        nav.step().unwrap();
        assert_eq!(nav.state(), NavState::Cruising);
        assert_eq!(
            recorder.drives(),
            vec![(WheelDrive::forward(50), WheelDrive::forward(50))]
        );
    }

    #[test]
    fn test_side_timeout_counts_as_blocked() {
        let (mut nav, _) = nav(vec![Echo::cm(10.0), Echo::NoRise, Echo::cm(20.0)]);
        nav.step().unwrap();
        nav.step().unwrap();
        assert_eq!(nav.state(), NavState::Turning(TurnDirection::Right));
    }

    #[test]
    fn test_side_timeout_clear_policy_counts_as_open() {
        let (hw, _) = scripted_hardware(vec![Echo::cm(10.0), Echo::NoRise, Echo::cm(300.0)]);
        let mut config = fast_config();
        config.sensor.on_timeout = TimeoutPolicy::Clear;
        let mut nav = NavigationLoop::new(hw, &config, CancelToken::new());

        nav.step().unwrap();
        nav.step().unwrap();
        // Timed-out left reads as 400 cm
        assert_eq!(nav.state(), NavState::Turning(TurnDirection::Left));
    }

    #[test]
    fn test_cancel_while_turning_runs_shutdown() {
        let token = CancelToken::new();
        let (hw, recorder) = scripted_hardware_cancel_on_turn(
            vec![Echo::cm(10.0), Echo::cm(40.0), Echo::cm(25.0)],
            token.clone(),
        );
        let nav = NavigationLoop::new(hw, &fast_config(), token);

        let stats = nav.run().unwrap();
        assert_eq!(stats.left_turns, 1);

        let events = recorder.actions();
        let tail = &events[events.len() - 5..];
        assert_eq!(
            tail,
            &[
                HwEvent::Drive(WheelDrive::reverse(50), WheelDrive::forward(50)),
                HwEvent::Drive(STOP.0, STOP.1),
                HwEvent::Servo(Heading::CENTER),
                HwEvent::ServoReleased,
                HwEvent::MotorsReleased,
            ]
        );
    }

    #[test]
    fn test_cancel_during_front_echo_never_drives_forward() {
        let token = CancelToken::new();
        let echo = ScriptedEcho::new(vec![Echo::Pulse(Duration::from_millis(6))], Recorder::new())
            .cancel_during_ping(1, token.clone());
        let (hw, recorder) = hardware_with_echo(echo);
        let nav = NavigationLoop::new(hw, &fast_config(), token);

        nav.run().unwrap();
        assert!(recorder.drives().iter().all(|(l, r)| l.duty == 0 && r.duty == 0));
        assert_eq!(
            recorder.events(),
            vec![
                HwEvent::Servo(Heading::CENTER),
                HwEvent::Trigger(Duration::from_micros(10)),
                HwEvent::Drive(STOP.0, STOP.1),
                HwEvent::Servo(Heading::CENTER),
                HwEvent::ServoReleased,
                HwEvent::MotorsReleased,
            ]
        );
    }

    #[test]
    fn test_cancel_during_side_echo_never_turns() {
        let token = CancelToken::new();
        let echo = ScriptedEcho::new(
            vec![Echo::cm(10.0), Echo::cm(40.0), Echo::cm(25.0)],
            Recorder::new(),
        )
        .cancel_during_ping(3, token.clone());
        let (hw, recorder) = hardware_with_echo(echo);
        let nav = NavigationLoop::new(hw, &fast_config(), token);

        let stats = nav.run().unwrap();
        assert_eq!(stats.obstacles, 1);
        assert_eq!(stats.left_turns + stats.right_turns, 0);
        assert_eq!(recorder.drives(), vec![STOP, STOP]);
    }

    #[test]
    fn test_cancelled_before_start_only_cleans_up() {
        let token = CancelToken::new();
        token.cancel();
        let (hw, recorder) = scripted_hardware(vec![]);
        let nav = NavigationLoop::new(hw, &fast_config(), token);

        let stats = nav.run().unwrap();
        assert_eq!(stats, LoopStats::default());
        assert_eq!(
            recorder.events(),
            vec![
                HwEvent::Drive(STOP.0, STOP.1),
                HwEvent::Servo(Heading::CENTER),
                HwEvent::ServoReleased,
                HwEvent::MotorsReleased,
            ]
        );
    }

    #[test]
    fn test_actuator_fault_still_cleans_up() {
        let (hw, recorder) = scripted_hardware_failing_forward(vec![Echo::cm(90.0)]);
        let nav = NavigationLoop::new(hw, &fast_config(), CancelToken::new());

        assert!(matches!(nav.run(), Err(Error::Other(_))));
        let events = recorder.actions();
        assert!(events.contains(&HwEvent::Drive(STOP.0, STOP.1)));
        assert_eq!(events.last(), Some(&HwEvent::MotorsReleased));
    }

    #[test]
    fn test_drop_runs_shutdown_once() {
        let echo = ScriptedEcho::new(vec![], Recorder::new()).with_fallback(Echo::cm(50.0));
        let (hw, recorder) = hardware_with_echo(echo);
        let mut nav = NavigationLoop::new(hw, &fast_config(), CancelToken::new());
        nav.step().unwrap();
        nav.shutdown();
        drop(nav);

        let released = recorder
            .events()
            .into_iter()
            .filter(|e| *e == HwEvent::MotorsReleased)
            .count();
        assert_eq!(released, 1);
    }
}
