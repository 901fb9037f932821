//! Transport traits for packet based sensors.
//!
//! Drivers never open devices themselves. A `Discovery` implementation lists
//! and opens handles, and the resulting `Transport` is moved into a driver
//! session which owns it exclusively until it is closed.

use std::fmt::{Debug, Display};
use std::time::Duration;

use crate::TransportError;

/// Size of every packet in either direction
pub const PACKET_SIZE: usize = 8;

/// Blocking packet channel to a single opened device
pub trait Transport {
    /// Write one packet to the device
    fn send(&mut self, packet: &[u8; PACKET_SIZE]) -> Result<(), TransportError>;

    /// Block for up to `timeout` waiting for one packet from the device.
    /// Returns [`TransportError::Timeout`] if nothing arrived.
    fn receive(&mut self, timeout: Duration) -> Result<[u8; PACKET_SIZE], TransportError>;

    /// Discard any input queued before the session started.
    /// Transports without an input queue may return [`TransportError::Unsupported`].
    fn flush_input(&mut self) -> Result<(), TransportError> {
        Err(TransportError::Unsupported("flush_input"))
    }

    /// Release the handle
    fn close(self) -> Result<(), TransportError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Enumeration and opening of candidate devices
pub trait Discovery {
    /// Identifier of a candidate, such as a hidraw path
    type Id: Clone + Debug + Display;
    /// Transport produced by [`Discovery::open`]
    type Transport: Transport;

    /// List every present device matching the sensor's signature
    fn enumerate(&mut self) -> Result<Vec<Self::Id>, TransportError>;

    /// Open a candidate returned by [`Discovery::enumerate`]
    fn open(&mut self, id: &Self::Id) -> Result<Self::Transport, TransportError>;
}
