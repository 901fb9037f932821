//! Request/response plumbing shared by the protocol components.

use std::thread;
use std::time::{Duration, Instant};

use rangefinder_core::{Result, SensorError, Transport, TransportError};
use tracing::{debug, trace};

use crate::abi::Packet;
use crate::types::{StatusTag, Timings};

/// How long [`Channel::await_status`] keeps discarding packets
#[derive(Clone, Copy, Debug)]
pub(crate) enum Limit {
    /// Give up after this many receives
    Attempts(u32),
    /// Give up once this much time has passed
    Within(Duration),
}

/// Exclusively owned transport plus the timings that govern it
pub(crate) struct Channel<T> {
    transport: T,
    timings: Timings,
}

impl<T: Transport> Channel<T> {
    pub fn new(transport: T, timings: Timings) -> Self {
        Self { transport, timings }
    }

    #[inline]
    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn flush_input(&mut self) -> std::result::Result<(), TransportError> {
        self.transport.flush_input()
    }

    /// Write a single packet
    pub fn send(&mut self, packet: Packet) -> Result<()> {
        debug!(bytes = %hex::encode(packet.as_bytes()), "write");
        self.transport.send(packet.as_bytes())?;
        Ok(())
    }

    /// Receive until a packet tagged `expected` shows up, discarding anything else.
    ///
    /// Receive timeouts count as an attempt. Any other transport failure is
    /// returned immediately.
    pub fn await_status(&mut self, expected: StatusTag, limit: Limit) -> Result<Packet> {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            let timeout = match limit {
                Limit::Attempts(max) if attempts >= max => break,
                Limit::Attempts(_) => self.timings.receive_timeout,
                Limit::Within(window) => {
                    let remaining = window.saturating_sub(started.elapsed());
                    if attempts > 0 && remaining.is_zero() {
                        break;
                    }
                    remaining.min(self.timings.receive_timeout)
                },
            };
            attempts += 1;

            match self.transport.receive(timeout) {
                Ok(raw) => {
                    let packet = Packet::from(raw);
                    debug!(bytes = %hex::encode(packet.as_bytes()), "read");
                    if packet.status() == Some(expected) {
                        return Ok(packet);
                    }
                    trace!(tag = packet.tag(), expected = expected.name(), "discarding packet");
                },
                Err(TransportError::Timeout) => {
                    trace!(expected = expected.name(), attempts, "nothing received");
                },
                Err(e) => return Err(e.into()),
            }

            if let Limit::Within(_) = limit {
                if !self.timings.poll_interval.is_zero() {
                    thread::sleep(self.timings.poll_interval);
                }
            }
        }

        Err(SensorError::ProtocolTimeout {
            expected: expected.name(),
            attempts,
        })
    }
}
