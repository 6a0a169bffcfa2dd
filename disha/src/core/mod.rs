//! Core abstractions for device drivers.
//!
//! - [`driver`]: Traits to implement for new hardware
//! - [`types`]: Distances, headings, commands, and wheel signals
//! - [`cancel`]: Cancellation token observed by every blocking wait

pub mod cancel;
pub mod driver;
pub mod types;
