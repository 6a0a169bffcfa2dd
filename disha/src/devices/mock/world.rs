//! Simulated arena: differential-drive kinematics and echo ray-casting
//!
//! Units are centimeters and radians; orientation is CCW from +X.

use super::config::SimulationConfig;
use crate::core::types::{Heading, WheelDrive};
use std::f32::consts::{PI, TAU};

/// Robot pose in the arena frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

struct Obstacle {
    x: f32,
    y: f32,
    radius: f32,
}

pub struct World {
    width: f32,
    height: f32,
    obstacles: Vec<Obstacle>,
    pose: Pose,
    wheel_base: f32,
    max_wheel_speed: f32,
    robot_radius: f32,
    sensor_offset: f32,
    max_range: f32,
    left: WheelDrive,
    right: WheelDrive,
    pan: Heading,
    collisions: u32,
}

impl World {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            width: config.arena_width_cm,
            height: config.arena_height_cm,
            obstacles: config
                .obstacles
                .iter()
                .map(|o| Obstacle {
                    x: o.x_cm,
                    y: o.y_cm,
                    radius: o.radius_cm,
                })
                .collect(),
            pose: Pose {
                x: config.start_x_cm,
                y: config.start_y_cm,
                theta: normalize_angle(config.start_heading_deg.to_radians()),
            },
            wheel_base: config.wheel_base_cm,
            max_wheel_speed: config.max_wheel_speed_cm_s,
            robot_radius: config.robot_radius_cm,
            sensor_offset: config.sensor_offset_cm,
            max_range: config.max_range_cm,
            left: WheelDrive::OFF,
            right: WheelDrive::OFF,
            pan: Heading::CENTER,
            collisions: 0,
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn wheels(&self) -> (WheelDrive, WheelDrive) {
        (self.left, self.right)
    }

    pub fn pan(&self) -> Heading {
        self.pan
    }

    /// Times the robot was blocked by a wall or obstacle
    pub fn collisions(&self) -> u32 {
        self.collisions
    }

    pub fn set_wheels(&mut self, left: WheelDrive, right: WheelDrive) {
        self.left = left;
        self.right = right;
    }

    pub fn set_pan(&mut self, heading: Heading) {
        self.pan = heading;
    }

    /// Whether a robot centered at (x, y) overlaps a wall or obstacle
    pub fn collides(&self, x: f32, y: f32) -> bool {
        let r = self.robot_radius;
        if x - r < 0.0 || y - r < 0.0 || x + r > self.width || y + r > self.height {
            return true;
        }
        self.obstacles.iter().any(|o| {
            let (dx, dy) = (x - o.x, y - o.y);
            dx * dx + dy * dy < (o.radius + r) * (o.radius + r)
        })
    }

    /// Integrate wheel motion over `dt` seconds.
    ///
    /// A move that would collide keeps the position and applies only the
    /// rotation. Returns true on collision.
    pub fn step(&mut self, dt: f32) -> bool {
        if dt <= 0.0 {
            return false;
        }
        let v_left = self.left.signed_duty() as f32 / 100.0 * self.max_wheel_speed;
        let v_right = self.right.signed_duty() as f32 / 100.0 * self.max_wheel_speed;
        let linear = (v_left + v_right) / 2.0;
        let angular = (v_right - v_left) / self.wheel_base;

        let Pose { x, y, theta } = self.pose;
        let (new_x, new_y, new_theta) = if angular.abs() < 1e-6 {
            (
                x + linear * theta.cos() * dt,
                y + linear * theta.sin() * dt,
                theta,
            )
        } else {
            let r = linear / angular;
            let new_theta = theta + angular * dt;
            (
                x + r * (new_theta.sin() - theta.sin()),
                y + r * (theta.cos() - new_theta.cos()),
                new_theta,
            )
        };

        self.pose.theta = normalize_angle(new_theta);
        if (new_x, new_y) != (x, y) && self.collides(new_x, new_y) {
            self.collisions += 1;
            log::debug!("Simulated bump at ({:.1}, {:.1}) cm", x, y);
            return true;
        }
        self.pose.x = new_x;
        self.pose.y = new_y;
        false
    }

    /// Distance from (x, y) along `angle` to the first surface, `None` past
    /// max range
    pub fn ray_cast(&self, x: f32, y: f32, angle: f32) -> Option<f32> {
        let (dx, dy) = (angle.cos(), angle.sin());

        let wall_t = |pos: f32, dir: f32, extent: f32| {
            if dir > 1e-9 {
                (extent - pos) / dir
            } else if dir < -1e-9 {
                -pos / dir
            } else {
                f32::INFINITY
            }
        };
        let mut nearest = wall_t(x, dx, self.width).min(wall_t(y, dy, self.height));

        for o in &self.obstacles {
            let (px, py) = (x - o.x, y - o.y);
            let b = px * dx + py * dy;
            let c = px * px + py * py - o.radius * o.radius;
            let disc = b * b - c;
            if disc < 0.0 {
                continue;
            }
            let sqrt = disc.sqrt();
            let t = if -b - sqrt >= 0.0 { -b - sqrt } else { -b + sqrt };
            if t >= 0.0 && t < nearest {
                nearest = t;
            }
        }

        let nearest = nearest.max(0.0);
        (nearest <= self.max_range).then_some(nearest)
    }

    /// What the panned ultrasonic sensor would see right now
    pub fn sensor_range(&self) -> Option<f32> {
        let Pose { x, y, theta } = self.pose;
        let sx = x + self.sensor_offset * theta.cos();
        let sy = y + self.sensor_offset * theta.sin();
        self.ray_cast(sx, sy, theta + self.pan.offset_from_center_rad())
    }
}

/// Normalize angle to [-π, π)
fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TAU;
    if a >= PI {
        a -= TAU;
    } else if a < -PI {
        a += TAU;
    }
    a
}
