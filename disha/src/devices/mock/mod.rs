//! Mock device for hardware-free runs
//!
//! Simulates the rover in a rectangular arena with round obstacles:
//!
//! | Component | Simulation Method |
//! |-----------|-------------------|
//! | HC-SR04 echo | Ray-cast from the panned sensor + Gaussian jitter, random dropouts |
//! | Pan servo | Instant move (the pan mechanism still waits its settle time) |
//! | Motors | Differential drive kinematics, stop-on-collision |
//!
//! The world is advanced lazily: every hardware call integrates the wheel
//! motion since the previous call using wall-clock time scaled by
//! `speed_factor`. No background thread is needed.
//!
//! Echoes farther than `max_range_cm` never come back, so the range sensor
//! times out exactly as it would on real hardware pointed at open space.
//!
//! # Configuration
//!
//! Enabled by the default `mock` feature:
//!
//! ```toml
//! [device]
//! type = "mock"
//!
//! [device.simulation]
//! start_x_cm = 60.0
//! random_seed = 42
//! ```

pub mod config;
mod noise;
pub mod world;

use crate::core::driver::{EchoPins, Hardware, MotorChannels, ServoChannel};
use crate::core::types::{Heading, Level, SPEED_OF_SOUND_CM_S, WheelDrive};
use crate::error::{Error, Result};

use config::SimulationConfig;
use noise::EchoNoise;
use world::{Pose, World};

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// World plus the wall-clock instant it was last advanced to
struct SimState {
    world: World,
    last_update: Instant,
    speed_factor: f32,
}

impl SimState {
    fn advance(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update).as_secs_f32() * self.speed_factor;
        self.last_update = now;
        self.world.step(dt);
    }
}

type SharedSim = Arc<Mutex<SimState>>;

/// Read-only view into the simulation for tests and tooling
#[derive(Clone)]
pub struct SimulationProbe {
    sim: SharedSim,
}

impl SimulationProbe {
    /// Current pose (advances the simulation first)
    pub fn pose(&self) -> Pose {
        let mut sim = self.sim.lock();
        sim.advance();
        sim.world.pose()
    }

    pub fn wheels(&self) -> (WheelDrive, WheelDrive) {
        self.sim.lock().world.wheels()
    }

    pub fn pan(&self) -> Heading {
        self.sim.lock().world.pan()
    }

    pub fn collisions(&self) -> u32 {
        self.sim.lock().world.collisions()
    }

    /// Noise-free range the sensor would see right now
    pub fn true_range_cm(&self) -> Option<f32> {
        let mut sim = self.sim.lock();
        sim.advance();
        sim.world.sensor_range()
    }
}

/// Build simulated hardware
pub fn create(config: &SimulationConfig) -> Result<Hardware> {
    create_with_probe(config).map(|(hardware, _)| hardware)
}

/// Build simulated hardware and keep a probe into the world
pub fn create_with_probe(config: &SimulationConfig) -> Result<(Hardware, SimulationProbe)> {
    if config.speed_factor <= 0.0 || config.wheel_base_cm <= 0.0 {
        return Err(Error::InitializationFailed(
            "simulation needs positive speed_factor and wheel_base_cm".to_string(),
        ));
    }
    let world = World::new(config);
    let start = world.pose();
    if world.collides(start.x, start.y) {
        return Err(Error::InitializationFailed(format!(
            "start position ({}, {}) overlaps a wall or obstacle",
            start.x, start.y
        )));
    }
    log::info!(
        "Mock arena {}x{} cm with {} obstacles, start ({}, {}) heading {}°",
        config.arena_width_cm,
        config.arena_height_cm,
        config.obstacles.len(),
        config.start_x_cm,
        config.start_y_cm,
        config.start_heading_deg
    );

    let sim: SharedSim = Arc::new(Mutex::new(SimState {
        world,
        last_update: Instant::now(),
        speed_factor: config.speed_factor,
    }));

    let hardware = Hardware {
        echo: Box::new(MockEcho {
            sim: Arc::clone(&sim),
            noise: EchoNoise::new(
                config.random_seed,
                config.range_stddev_cm,
                config.echo_dropout,
            ),
            pending: None,
            rise: None,
        }),
        servo: Box::new(MockServo {
            sim: Arc::clone(&sim),
        }),
        motors: Box::new(MockMotors {
            sim: Arc::clone(&sim),
        }),
    };
    Ok((hardware, SimulationProbe { sim }))
}

struct MockEcho {
    sim: SharedSim,
    noise: EchoNoise,
    /// Echo width for the ping in flight, `None` if nothing will come back
    pending: Option<Duration>,
    rise: Option<Instant>,
}

impl EchoPins for MockEcho {
    fn send_trigger(&mut self, _width: Duration) -> Result<()> {
        let range = {
            let mut sim = self.sim.lock();
            sim.advance();
            sim.world.sensor_range()
        };
        self.rise = None;
        self.pending = match range {
            Some(_) if self.noise.drops_echo() => None,
            Some(cm) => {
                let cm = self.noise.perturb(cm) as f64;
                Some(Duration::from_secs_f64(cm * 2.0 / SPEED_OF_SOUND_CM_S))
            }
            None => None,
        };
        Ok(())
    }

    fn wait_for_echo(&mut self, level: Level, timeout: Duration) -> Result<Option<Instant>> {
        match (level, self.pending) {
            (Level::High, Some(_)) => {
                let now = Instant::now();
                self.rise = Some(now);
                Ok(Some(now))
            }
            (Level::Low, Some(width)) if width <= timeout => {
                Ok(self.rise.map(|rise| rise + width))
            }
            _ => {
                // Nothing coming back: a real line would sit idle this long
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

struct MockServo {
    sim: SharedSim,
}

impl ServoChannel for MockServo {
    fn set_angle(&mut self, heading: Heading) -> Result<()> {
        self.sim.lock().world.set_pan(heading);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        log::debug!("Mock servo released");
        Ok(())
    }
}

struct MockMotors {
    sim: SharedSim,
}

impl MotorChannels for MockMotors {
    fn drive(&mut self, left: WheelDrive, right: WheelDrive) -> Result<()> {
        let mut sim = self.sim.lock();
        sim.advance();
        sim.world.set_wheels(left, right);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        let mut sim = self.sim.lock();
        sim.advance();
        sim.world.set_wheels(WheelDrive::OFF, WheelDrive::OFF);
        Ok(())
    }
}
