//! Sensor detection and selection logic.

use lr4::hid::{DevicePath, HidDiscovery, HidTransport};
use lr4::types::{SerialNumber, Timings};
use lr4::Lr4;
use rangefinder_core::Result;
use tracing::debug;

/// Open the rangefinder with the given serial, or the first one found
pub fn open_sensor(serial: Option<&str>, timings: &Timings) -> Result<Lr4<HidTransport>> {
    let mut discovery = HidDiscovery::new()?;
    lr4::get_device(&mut discovery, serial, timings)
}

/// Open every connected rangefinder once and collect its serial number
pub fn survey(timings: &Timings) -> Result<Vec<(DevicePath, Result<SerialNumber>)>> {
    let mut discovery = HidDiscovery::new()?;
    let ids = lr4::list_devices(&mut discovery)?;
    debug!(count = ids.len(), "found candidates");

    let mut found = Vec::with_capacity(ids.len());
    for id in ids {
        let serial = read_serial(&mut discovery, &id, timings);
        found.push((id, serial));
    }
    Ok(found)
}

fn read_serial(
    discovery: &mut HidDiscovery,
    id: &DevicePath,
    timings: &Timings,
) -> Result<SerialNumber> {
    let mut sensor = lr4::open_device(discovery, id, timings)?;
    let serial = sensor.serial_number();
    sensor.close()?;
    serial
}
