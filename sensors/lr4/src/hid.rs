//! hidapi backed transport and discovery.

use std::ffi::{CStr, CString};
use std::fmt::{self, Display};
use std::time::Duration;

use hidapi::{DeviceInfo, HidApi, HidDevice};
use rangefinder_core::{Discovery, SensorInfo, Transport, TransportError, PACKET_SIZE};
use tracing::trace;

use crate::{consts, INFO};

/// Reads performed by a flush before giving up on an endlessly chatty device
const MAX_FLUSH_READS: usize = 64;

/// Platform path of a HID interface, e.g. `/dev/hidraw3` on linux
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DevicePath(CString);

impl DevicePath {
    #[inline]
    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }
}

impl From<&CStr> for DevicePath {
    fn from(value: &CStr) -> Self {
        Self(value.to_owned())
    }
}

impl Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_string_lossy())
    }
}

/// Check if a HID interface belongs to an LR4.
/// The device also exposes a keyboard interface which is never the one we talk to.
fn matches(device: &DeviceInfo, info: &SensorInfo) -> bool {
    is_sensor_interface(
        info,
        (device.vendor_id(), device.product_id()),
        (device.usage_page(), device.usage()),
    )
}

fn is_sensor_interface(info: &SensorInfo, (vid, pid): (u16, u16), usage: (u16, u16)) -> bool {
    vid == info.vendor_id
        && pid == info.product_id
        && usage != (consts::KEYBOARD_USAGE_PAGE, consts::KEYBOARD_USAGE)
}

/// Enumerates LR4 interfaces through hidapi
pub struct HidDiscovery {
    api: HidApi,
}

impl HidDiscovery {
    pub fn new() -> Result<Self, TransportError> {
        Ok(Self {
            api: HidApi::new()?,
        })
    }
}

impl Discovery for HidDiscovery {
    type Id = DevicePath;
    type Transport = HidTransport;

    fn enumerate(&mut self) -> Result<Vec<DevicePath>, TransportError> {
        self.api.refresh_devices()?;
        let mut paths: Vec<DevicePath> = self
            .api
            .device_list()
            .filter(|d| matches(d, &INFO))
            .map(|d| DevicePath::from(d.path()))
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    fn open(&mut self, id: &DevicePath) -> Result<HidTransport, TransportError> {
        let device = self.api.open_path(id.as_c_str())?;
        Ok(HidTransport {
            device,
            path: id.clone(),
        })
    }
}

/// An opened LR4 HID interface
pub struct HidTransport {
    device: HidDevice,
    path: DevicePath,
}

impl Transport for HidTransport {
    fn send(&mut self, packet: &[u8; PACKET_SIZE]) -> Result<(), TransportError> {
        // report id 0, the device does not use numbered reports
        let mut buf = [0u8; PACKET_SIZE + 1];
        buf[1..].copy_from_slice(packet);
        self.device.write(&buf)?;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<[u8; PACKET_SIZE], TransportError> {
        let mut buf = [0u8; PACKET_SIZE];
        let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
        match self.device.read_timeout(&mut buf, millis)? {
            0 => Err(TransportError::Timeout),
            PACKET_SIZE => Ok(buf),
            len => Err(TransportError::ShortPacket(len)),
        }
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        let mut buf = [0u8; PACKET_SIZE];
        for _ in 0..MAX_FLUSH_READS {
            if self.device.read_timeout(&mut buf, 0)? == 0 {
                break;
            }
            trace!(path = %self.path, bytes = %hex::encode(buf), "flushed stale input");
        }
        Ok(())
    }

    fn close(self) -> Result<(), TransportError> {
        trace!(path = %self.path, "closing");
        drop(self.device);
        Ok(())
    }
}
