//! Core traits and types for rangefinder sensor abstraction.
//!
//! This crate provides:
//! - The `Transport` and `Discovery` traits that carry fixed-size packets to a sensor
//! - The `Rangefinder` trait implemented by each sensor driver
//! - Common types like `SensorInfo` and the shared `SensorError`

mod error;
mod sensor;
mod transport;

pub use error::{Result, SensorError, TransportError};
pub use sensor::{Rangefinder, SensorInfo};
pub use transport::{Discovery, Transport, PACKET_SIZE};
