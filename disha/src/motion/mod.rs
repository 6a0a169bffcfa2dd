//! Actuator front-ends: wheel drive and sensor pan

pub mod drive;
pub mod pan;

pub use drive::DriveActuator;
pub use pan::PanMechanism;
