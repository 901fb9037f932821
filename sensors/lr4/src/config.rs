//! Configuration read, write-and-verify and persistence.

use std::thread;

use rangefinder_core::{Result, SensorError, Transport};
use tracing::{debug, warn};

use crate::abi::{self, Packet};
use crate::channel::{Channel, Limit};
use crate::types::{DeviceConfig, StatusTag};

/// Owner of the last configuration the device reported for a session
#[derive(Debug)]
pub struct ConfigManager {
    current: DeviceConfig,
}

impl ConfigManager {
    /// Perform the initial configuration read for a session
    pub(crate) fn load<T: Transport>(channel: &mut Channel<T>) -> Result<Self> {
        Ok(Self {
            current: fetch(channel)?,
        })
    }

    /// Last known configuration
    #[inline]
    pub fn current(&self) -> &DeviceConfig {
        &self.current
    }

    /// Request the configuration from the device and remember it
    pub(crate) fn read<T: Transport>(&mut self, channel: &mut Channel<T>) -> Result<DeviceConfig> {
        self.current = fetch(channel)?;
        Ok(self.current)
    }

    /// Write `desired` and read it back until the device reports the exact
    /// same eight bytes.
    ///
    /// The comparison works because the device answers with a `ConfigData`
    /// status whose tag is numerically equal to `SetConfig`, followed by the
    /// accepted config bytes.
    pub(crate) fn write<T: Transport>(
        &mut self,
        channel: &mut Channel<T>,
        desired: Packet,
    ) -> Result<()> {
        let retries = channel.timings().write_attempts();
        let delay = channel.timings().write_retry_delay;

        for attempt in 1..=retries {
            channel.send(desired)?;
            match fetch(channel) {
                Ok(config) if *config.packet() == desired => {
                    debug!(attempt, %config, "configuration accepted");
                    self.current = config;
                    return Ok(());
                },
                Ok(config) => {
                    warn!(attempt, got = ?config.packet(), want = ?desired, "configuration mismatch");
                },
                Err(e @ SensorError::ProtocolTimeout { .. }) => {
                    warn!(attempt, "no configuration read back: {e}");
                },
                Err(e) => return Err(e),
            }
            if attempt < retries && !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        Err(SensorError::ConfigWriteFailed { attempts: retries })
    }

    /// Persist the active configuration. The device does not acknowledge this.
    pub(crate) fn commit<T: Transport>(&self, channel: &mut Channel<T>) -> Result<()> {
        channel.send(abi::write_config_persist())
    }

    /// Switch the device to single shot mode triggered by the run bit, then persist it
    pub(crate) fn configure_single_shot<T: Transport>(
        &mut self,
        channel: &mut Channel<T>,
    ) -> Result<()> {
        self.write(channel, abi::single_shot_config())?;
        self.commit(channel)
    }
}

fn fetch<T: Transport>(channel: &mut Channel<T>) -> Result<DeviceConfig> {
    channel.send(abi::get_config())?;
    let limit = Limit::Attempts(channel.timings().discard_limit());
    let packet = channel.await_status(StatusTag::ConfigData, limit)?;
    Ok(DeviceConfig::new(packet))
}
