//! Core Rangefinder trait and related types.

use crate::Result;

/// Static information about a sensor type for detection and CLI
#[derive(Debug, Clone, Copy)]
pub struct SensorInfo {
    pub name: &'static str,
    pub cli_name: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
}

/// Core sensor trait - object-safe for `dyn Rangefinder`
///
/// Sensors should provide a static `INFO` constant and their open/discovery
/// functions separately.
pub trait Rangefinder: Send {
    /// Get sensor info (instance method for object safety)
    fn info(&self) -> &'static SensorInfo;

    /// Take a single distance reading in millimeters
    fn measure(&mut self) -> Result<u16>;

    /// Read the serial number stored on the device
    fn serial_number(&mut self) -> Result<String>;
}
