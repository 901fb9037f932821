//! High level abstraction for Porcupine Electronics LR4 laser rangefinders.
//!
//! The LR4 speaks a tiny protocol of 8-byte HID reports. The host sends a
//! command packet and the device answers with status packets tagged as
//! measurement data, config data or product info:
//!
//! - Opening a session reads the configuration and switches the device to
//!   single shot mode, triggered by the run bit of the config word.
//! - A measurement raises the run bit, waits for a measurement packet, then
//!   clears the run bit again.
//! - The serial number lives in the product info structure and is read in
//!   two chunks.
//!
//! Sessions are generic over [`Transport`], with [`hid::HidTransport`]
//! providing the real thing.

use rangefinder_core::{Rangefinder, Result, SensorInfo, Transport, TransportError};
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::config::ConfigManager;
use crate::measure::ActiveMeasurement;
use crate::types::{DeviceConfig, SerialNumber, Timings};

pub mod abi;
mod channel;
pub mod config;
pub mod hid;
pub mod identity;
pub mod measure;
#[cfg(test)]
mod sim;
pub mod types;

pub use identity::{find_by_serial, first_available, get_device, list_devices, open_device};

pub mod consts {
    pub const VENDOR_ID: u16 = 0x0417;
    pub const PRODUCT_ID: u16 = 0xDD03;
    /// HID usage page of the keyboard interface the device also exposes
    pub const KEYBOARD_USAGE_PAGE: u16 = 0x01;
    /// HID usage of the keyboard interface the device also exposes
    pub const KEYBOARD_USAGE: u16 = 0x06;
}

/// Static sensor info for detection
pub static INFO: SensorInfo = SensorInfo {
    name: "Porcupine Electronics LR4",
    cli_name: "lr4",
    vendor_id: consts::VENDOR_ID,
    product_id: consts::PRODUCT_ID,
};

/// An open session with one LR4
pub struct Lr4<T: Transport> {
    channel: Channel<T>,
    config: ConfigManager,
}

impl<T: Transport> Lr4<T> {
    /// Take ownership of an opened transport, read the configuration and
    /// switch the device to single shot mode.
    ///
    /// If initialization fails the transport is closed before the error is returned.
    pub fn open(transport: T, timings: Timings) -> Result<Self> {
        let mut channel = Channel::new(transport, timings);
        match Self::initialize(&mut channel) {
            Ok(config) => {
                info!(config = %config.current(), "session open");
                Ok(Self { channel, config })
            },
            Err(e) => {
                if let Err(close_err) = channel.into_transport().close() {
                    warn!("failed to release device after failed open: {close_err}");
                }
                Err(e)
            },
        }
    }

    fn initialize(channel: &mut Channel<T>) -> Result<ConfigManager> {
        match channel.flush_input() {
            Ok(()) => {},
            Err(TransportError::Unsupported(_)) => debug!("transport cannot flush input"),
            Err(e) => return Err(e.into()),
        }
        let mut config = ConfigManager::load(channel)?;
        config.configure_single_shot(channel)?;
        Ok(config)
    }

    /// Release the transport, ending the session
    pub fn close(self) -> Result<()> {
        info!("session closed");
        self.channel.into_transport().close()?;
        Ok(())
    }

    /// Last configuration reported by the device
    #[inline]
    pub fn config(&self) -> &DeviceConfig {
        self.config.current()
    }

    /// Re-read the configuration from the device
    pub fn read_config(&mut self) -> Result<DeviceConfig> {
        self.config.read(&mut self.channel)
    }

    /// Write a `SetConfig` packet and wait until the device echoes it back
    pub fn write_config(&mut self, desired: abi::Packet) -> Result<()> {
        self.config.write(&mut self.channel, desired)
    }

    /// Persist the active configuration to the device's non-volatile storage
    pub fn commit_config(&mut self) -> Result<()> {
        self.config.commit(&mut self.channel)
    }

    /// Take a single distance reading in millimeters
    pub fn measure(&mut self) -> Result<u16> {
        measure::measure(&mut self.channel, *self.config.current())
    }

    /// Raise the run bit and hand out the measuring state for manual polling
    pub fn start_measurement(&mut self) -> Result<ActiveMeasurement<'_, T>> {
        ActiveMeasurement::start(&mut self.channel, *self.config.current())
    }

    /// Read the serial number from the product info structure
    pub fn serial_number(&mut self) -> Result<SerialNumber> {
        identity::read_serial_number(&mut self.channel)
    }
}

// === Trait Implementations ===

impl<T: Transport + Send> Rangefinder for Lr4<T> {
    fn info(&self) -> &'static SensorInfo {
        &INFO
    }

    fn measure(&mut self) -> Result<u16> {
        Lr4::measure(self)
    }

    fn serial_number(&mut self) -> Result<String> {
        Lr4::serial_number(self).map(String::from)
    }
}
