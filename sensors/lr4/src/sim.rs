//! Simulated LR4 used by the unit tests.
//!
//! The simulation answers commands the way the hardware does: config reads
//! echo the stored config packet, config writes replace it, raising the run
//! bit queues a measurement and product info reads return six bytes of the
//! product info structure. Tests keep a [`SimHandle`] to script faults and
//! inspect traffic after the transport has been moved into a session.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rangefinder_core::{Discovery, Transport, TransportError, PACKET_SIZE};

use crate::types::{Timings, SERIAL_OFFSET};

type Raw = [u8; PACKET_SIZE];

/// Timings that keep the tests fast
pub(crate) fn fast_timings() -> Timings {
    Timings {
        receive_timeout: Duration::from_millis(1),
        max_discards: 8,
        write_retries: 5,
        write_retry_delay: Duration::ZERO,
        measure_timeout: Duration::from_millis(20),
        poll_interval: Duration::ZERO,
    }
}

#[derive(Debug)]
pub(crate) struct SimState {
    /// Stored config, returned verbatim as a `ConfigData` status
    pub config: Raw,
    pub product_info: [u8; 128],
    pub distance: u16,
    /// Emit a measurement when the run bit is raised
    pub respond_to_run: bool,
    /// Number of upcoming `SetConfig` commands to ignore
    pub ignore_writes: u32,
    /// Number of upcoming replies to lose
    pub drop_replies: u32,
    /// Never reply to anything
    pub silent: bool,
    /// Fail every receive as if the device was unplugged
    pub unplugged: bool,
    pub persisted: u32,
    pub flushed: u32,
    pub closed: u32,
    pub sent: Vec<Raw>,
    noise: VecDeque<Raw>,
    outbox: VecDeque<Raw>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            // continuous mode, so single shot configuration is a real change
            config: [0x01, 0x10, 0x00, 0x00, 0x00, 0, 0, 0],
            product_info: [0u8; 128],
            distance: 1000,
            respond_to_run: true,
            ignore_writes: 0,
            drop_replies: 0,
            silent: false,
            unplugged: false,
            persisted: 0,
            flushed: 0,
            closed: 0,
            sent: Vec::new(),
            noise: VecDeque::new(),
            outbox: VecDeque::new(),
        }
    }
}

impl SimState {
    fn reply(&mut self, packet: Raw) {
        if self.silent {
            return;
        }
        self.outbox.extend(self.noise.drain(..));
        if self.drop_replies > 0 {
            self.drop_replies -= 1;
            return;
        }
        self.outbox.push_back(packet);
    }

    fn handle(&mut self, cmd: Raw) {
        self.sent.push(cmd);
        match cmd[0] {
            0x00 => self.reply(self.config),
            0x01 => {
                if self.ignore_writes > 0 {
                    self.ignore_writes -= 1;
                } else {
                    let was_running = self.config[2] & 0x80 != 0;
                    self.config = cmd;
                    if !was_running && cmd[2] & 0x80 != 0 && self.respond_to_run {
                        let [lsb, msb] = self.distance.to_le_bytes();
                        self.reply([0x00, lsb, msb, 0, 0, 0, 0, 0]);
                    }
                }
            },
            0x02 => self.persisted += 1,
            0x03 => {
                let offset = cmd[1] as usize;
                let mut packet = [0x02, cmd[1], 0, 0, 0, 0, 0, 0];
                packet[2..].copy_from_slice(&self.product_info[offset..offset + 6]);
                self.reply(packet);
            },
            _ => {},
        }
    }
}

/// Test side of a simulated device
#[derive(Clone)]
pub(crate) struct SimHandle(Arc<Mutex<SimState>>);

impl SimHandle {
    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.0.lock().unwrap()
    }

    /// Queue a packet to be delivered ahead of the next reply
    pub fn inject(&self, packet: Raw) {
        self.state().noise.push_back(packet);
    }

    /// Queue an additional measurement right away
    pub fn queue_measurement(&self, distance: u16) {
        let [lsb, msb] = distance.to_le_bytes();
        self.state().outbox.push_back([0x00, lsb, msb, 0, 0, 0, 0, 0]);
    }

    /// Store a serial number in the product info structure
    pub fn set_serial(&self, serial: &[u8]) {
        let start = SERIAL_OFFSET as usize;
        let mut state = self.state();
        state.product_info[start..start + 12].fill(0);
        state.product_info[start..start + serial.len()].copy_from_slice(serial);
    }

    pub fn sent(&self) -> Vec<Raw> {
        self.state().sent.clone()
    }

    pub fn sent_with_tag(&self, tag: u8) -> Vec<Raw> {
        self.state()
            .sent
            .iter()
            .filter(|p| p[0] == tag)
            .copied()
            .collect()
    }
}

/// Transport side of a simulated device
pub(crate) struct SimTransport(Arc<Mutex<SimState>>);

pub(crate) fn sim() -> (SimTransport, SimHandle) {
    let state = Arc::new(Mutex::new(SimState::default()));
    (SimTransport(state.clone()), SimHandle(state))
}

impl Transport for SimTransport {
    fn send(&mut self, packet: &Raw) -> Result<(), TransportError> {
        self.0.lock().unwrap().handle(*packet);
        Ok(())
    }

    fn receive(&mut self, _timeout: Duration) -> Result<Raw, TransportError> {
        let mut state = self.0.lock().unwrap();
        if state.unplugged {
            return Err(TransportError::Disconnected);
        }
        state.outbox.pop_front().ok_or(TransportError::Timeout)
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        let mut state = self.0.lock().unwrap();
        state.outbox.clear();
        state.flushed += 1;
        Ok(())
    }

    fn close(self) -> Result<(), TransportError> {
        self.0.lock().unwrap().closed += 1;
        Ok(())
    }
}

/// Simulated bus of several devices, keyed by a fake path
#[derive(Default)]
pub(crate) struct SimBus {
    devices: Vec<(String, Option<SimTransport>)>,
}

impl SimBus {
    /// Plug in a device with the given serial
    pub fn plug(&mut self, path: &str, serial: &[u8]) -> SimHandle {
        let (transport, handle) = sim();
        handle.set_serial(serial);
        self.devices.push((path.to_string(), Some(transport)));
        handle
    }

    /// Plug in a candidate that cannot be opened
    pub fn plug_broken(&mut self, path: &str) {
        self.devices.push((path.to_string(), None));
    }
}

impl Discovery for SimBus {
    type Id = String;
    type Transport = SimTransport;

    fn enumerate(&mut self) -> Result<Vec<String>, TransportError> {
        Ok(self.devices.iter().map(|(path, _)| path.clone()).collect())
    }

    fn open(&mut self, id: &String) -> Result<SimTransport, TransportError> {
        self.devices
            .iter_mut()
            .find(|(path, _)| path == id)
            .and_then(|(_, transport)| transport.take())
            .ok_or(TransportError::Disconnected)
    }
}
