//! Single shot measurement state machine.
//!
//! A session is idle until [`ActiveMeasurement::start`] raises the run bit.
//! The returned guard mutably borrows the session's channel, so a second
//! measurement cannot be started until the first one is stopped or dropped.

use rangefinder_core::{Result, Transport};
use tracing::{debug, warn};

use crate::channel::{Channel, Limit};
use crate::types::{DeviceConfig, StatusTag};

/// A session in the measuring state
pub struct ActiveMeasurement<'a, T: Transport> {
    channel: &'a mut Channel<T>,
    config: DeviceConfig,
    stopped: bool,
}

impl<'a, T: Transport> ActiveMeasurement<'a, T> {
    /// Raise the run bit on top of the last known configuration.
    /// The device does not acknowledge this.
    pub(crate) fn start(channel: &'a mut Channel<T>, config: DeviceConfig) -> Result<Self> {
        channel.send(config.with_run(true))?;
        Ok(Self {
            channel,
            config,
            stopped: false,
        })
    }

    /// Wait for the next measurement packet and return the distance in millimeters
    pub fn poll(&mut self) -> Result<u16> {
        let window = self.channel.timings().measure_timeout;
        let packet = self
            .channel
            .await_status(StatusTag::MeasurementData, Limit::Within(window))?;
        let mm = packet.distance_mm();
        debug!(mm, "measurement");
        Ok(mm)
    }

    /// Clear the run bit, returning the session to idle
    pub fn stop(mut self) -> Result<()> {
        self.stopped = true;
        self.channel.send(self.config.with_run(false))
    }
}

impl<T: Transport> Drop for ActiveMeasurement<'_, T> {
    fn drop(&mut self) {
        if !self.stopped {
            if let Err(e) = self.channel.send(self.config.with_run(false)) {
                warn!("failed to stop abandoned measurement: {e}");
            }
        }
    }
}

/// Start, wait for one reading, stop.
///
/// The stop is sent even if no reading arrived, in which case the poll
/// error takes precedence.
pub(crate) fn measure<T: Transport>(channel: &mut Channel<T>, config: DeviceConfig) -> Result<u16> {
    let mut active = ActiveMeasurement::start(channel, config)?;
    let reading = active.poll();
    let stopped = active.stop();
    let mm = reading?;
    stopped?;
    Ok(mm)
}
