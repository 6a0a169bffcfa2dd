//! Sense-decide-act loop

pub mod controller;

pub use controller::{LoopStats, NavState, NavigationLoop};
