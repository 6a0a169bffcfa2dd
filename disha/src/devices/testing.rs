//! Scripted and recording hardware doubles for unit tests

use crate::core::cancel::CancelToken;
use crate::core::driver::{EchoPins, Hardware, MotorChannels, ServoChannel};
use crate::core::types::{Heading, Level, SPEED_OF_SOUND_CM_S, WheelDirection, WheelDrive};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything the doubles saw, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum HwEvent {
    Trigger(Duration),
    Servo(Heading),
    ServoReleased,
    Drive(WheelDrive, WheelDrive),
    MotorsReleased,
}

/// Shared event log
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<HwEvent>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: HwEvent) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<HwEvent> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Events other than trigger pulses
    pub fn actions(&self) -> Vec<HwEvent> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, HwEvent::Trigger(_)))
            .collect()
    }

    pub fn drives(&self) -> Vec<(WheelDrive, WheelDrive)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                HwEvent::Drive(l, r) => Some((l, r)),
                _ => None,
            })
            .collect()
    }
}

/// Echo pulse width that encodes `cm`
pub fn pulse_for_cm(cm: f64) -> Duration {
    Duration::from_secs_f64(cm * 2.0 / SPEED_OF_SOUND_CM_S)
}

/// One scripted ping outcome
#[derive(Debug, Clone, Copy)]
pub enum Echo {
    Pulse(Duration),
    NoRise,
    NoFall,
}

impl Echo {
    pub fn cm(cm: f64) -> Self {
        Echo::Pulse(pulse_for_cm(cm))
    }
}

/// Replays a queue of echoes, then repeats the fallback
pub struct ScriptedEcho {
    script: VecDeque<Echo>,
    fallback: Echo,
    current: Echo,
    rise: Option<Instant>,
    recorder: Recorder,
    pings: usize,
    /// Cancel this token while waiting on the given ping (1-based)
    cancel_during: Option<(usize, CancelToken)>,
}

impl ScriptedEcho {
    pub fn new(script: Vec<Echo>, recorder: Recorder) -> Self {
        Self {
            script: script.into(),
            fallback: Echo::cm(100.0),
            current: Echo::NoRise,
            rise: None,
            recorder,
            pings: 0,
            cancel_during: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Echo) -> Self {
        self.fallback = fallback;
        self
    }

    /// Fire `token` from inside the echo wait of ping number `ping`
    pub fn cancel_during_ping(mut self, ping: usize, token: CancelToken) -> Self {
        self.cancel_during = Some((ping, token));
        self
    }
}

impl EchoPins for ScriptedEcho {
    fn send_trigger(&mut self, width: Duration) -> Result<()> {
        self.recorder.push(HwEvent::Trigger(width));
        self.current = self.script.pop_front().unwrap_or(self.fallback);
        self.rise = None;
        self.pings += 1;
        Ok(())
    }

    fn wait_for_echo(&mut self, level: Level, _timeout: Duration) -> Result<Option<Instant>> {
        if let Some((ping, token)) = &self.cancel_during
            && *ping == self.pings
        {
            token.cancel();
        }
        match (level, self.current) {
            (Level::High, Echo::NoRise) => Ok(None),
            (Level::High, _) => {
                let now = Instant::now();
                self.rise = Some(now);
                Ok(Some(now))
            }
            (Level::Low, Echo::Pulse(width)) => Ok(self.rise.map(|r| r + width)),
            (Level::Low, _) => Ok(None),
        }
    }
}

pub struct RecordingServo {
    recorder: Recorder,
}

impl ServoChannel for RecordingServo {
    fn set_angle(&mut self, heading: Heading) -> Result<()> {
        self.recorder.push(HwEvent::Servo(heading));
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.recorder.push(HwEvent::ServoReleased);
        Ok(())
    }
}

pub struct RecordingMotors {
    recorder: Recorder,
    cancel_on_turn: Option<CancelToken>,
    fail_forward: bool,
}

impl MotorChannels for RecordingMotors {
    fn drive(&mut self, left: WheelDrive, right: WheelDrive) -> Result<()> {
        if self.fail_forward
            && left.direction == WheelDirection::Forward
            && right.direction == WheelDirection::Forward
        {
            return Err(Error::Other("left H-bridge fault".to_string()));
        }
        self.recorder.push(HwEvent::Drive(left, right));
        let turning = left.direction != right.direction
            && left.direction != WheelDirection::Coast
            && right.direction != WheelDirection::Coast;
        if turning && let Some(token) = &self.cancel_on_turn {
            token.cancel();
        }
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.recorder.push(HwEvent::MotorsReleased);
        Ok(())
    }
}

/// Scripted echo, recording servo and motors sharing one log
pub fn scripted_hardware(script: Vec<Echo>) -> (Hardware, Recorder) {
    build(ScriptedEcho::new(script, Recorder::new()), None, false)
}

/// Like [`scripted_hardware`], but cancels `token` as soon as a turn is driven
pub fn scripted_hardware_cancel_on_turn(
    script: Vec<Echo>,
    token: CancelToken,
) -> (Hardware, Recorder) {
    build(ScriptedEcho::new(script, Recorder::new()), Some(token), false)
}

/// Motors that reject any forward drive
pub fn scripted_hardware_failing_forward(script: Vec<Echo>) -> (Hardware, Recorder) {
    build(ScriptedEcho::new(script, Recorder::new()), None, true)
}

/// Use a prepared echo double (e.g. with a custom fallback)
pub fn hardware_with_echo(echo: ScriptedEcho) -> (Hardware, Recorder) {
    build(echo, None, false)
}

fn build(
    echo: ScriptedEcho,
    cancel_on_turn: Option<CancelToken>,
    fail_forward: bool,
) -> (Hardware, Recorder) {
    let recorder = echo.recorder.clone();
    let hardware = Hardware {
        echo: Box::new(echo),
        servo: Box::new(RecordingServo {
            recorder: recorder.clone(),
        }),
        motors: Box::new(RecordingMotors {
            recorder: recorder.clone(),
            cancel_on_turn,
            fail_forward,
        }),
    };
    (hardware, recorder)
}
