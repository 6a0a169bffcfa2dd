//! Device implementations

#[cfg(feature = "mock")]
pub mod mock;
#[cfg(feature = "rpi")]
pub mod rpi;
#[cfg(test)]
pub(crate) mod testing;

use crate::config::DeviceConfig;
use crate::core::driver::Hardware;
use crate::error::{Error, Result};

/// Bring up the hardware backend named in the configuration
pub fn create_device(config: &DeviceConfig) -> Result<Hardware> {
    match config.device_type.as_str() {
        #[cfg(feature = "mock")]
        "mock" => mock::create(&config.simulation),
        #[cfg(feature = "rpi")]
        "rpi" => rpi::create(&config.pins),
        other => Err(Error::InitializationFailed(format!(
            "unknown or disabled device type '{}'",
            other
        ))),
    }
}
