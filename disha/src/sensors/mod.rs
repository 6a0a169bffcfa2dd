//! Sensor front-ends built on the hardware traits

pub mod range;

pub use range::RangeSensor;
