//! Serial number retrieval and device selection.

use rangefinder_core::{Discovery, Result, SensorError, Transport};
use tracing::{debug, info, warn};

use crate::abi;
use crate::channel::{Channel, Limit};
use crate::types::{SerialNumber, StatusTag, Timings, SERIAL_OFFSET, SERIAL_TAIL_OFFSET};
use crate::Lr4;

/// Read the two product info chunks holding the serial number
pub(crate) fn read_serial_number<T: Transport>(channel: &mut Channel<T>) -> Result<SerialNumber> {
    let head = read_product_info(channel, SERIAL_OFFSET)?;
    let tail = read_product_info(channel, SERIAL_TAIL_OFFSET)?;
    Ok(SerialNumber::from_chunks(&head, &tail))
}

fn read_product_info<T: Transport>(channel: &mut Channel<T>, offset: u8) -> Result<abi::Packet> {
    channel.send(abi::get_product_info(offset))?;
    let limit = Limit::Attempts(channel.timings().discard_limit());
    channel.await_status(StatusTag::ProductInfo, limit)
}

/// List every candidate device
pub fn list_devices<D: Discovery>(discovery: &mut D) -> Result<Vec<D::Id>> {
    Ok(discovery.enumerate()?)
}

/// Open every candidate in turn and return the session whose serial matches `target`.
///
/// Sessions that do not match are closed. Candidates that fail to open or to
/// report a serial are skipped.
pub fn find_by_serial<D: Discovery>(
    discovery: &mut D,
    target: &str,
    timings: &Timings,
) -> Result<Lr4<D::Transport>> {
    for id in discovery.enumerate()? {
        let mut session = match open_device(discovery, &id, timings) {
            Ok(session) => session,
            Err(e) => {
                warn!(%id, "skipping device: {e}");
                continue;
            },
        };
        match session.serial_number() {
            Ok(serial) if serial.matches(target) => {
                info!(%id, %serial, "found device");
                return Ok(session);
            },
            Ok(serial) => debug!(%id, %serial, "serial does not match"),
            Err(e) => warn!(%id, "failed to read serial number: {e}"),
        }
        if let Err(e) = session.close() {
            warn!(%id, "failed to close device: {e}");
        }
    }
    Err(SensorError::DeviceNotFound)
}

/// Return the first candidate that opens successfully
pub fn first_available<D: Discovery>(
    discovery: &mut D,
    timings: &Timings,
) -> Result<Lr4<D::Transport>> {
    for id in discovery.enumerate()? {
        match open_device(discovery, &id, timings) {
            Ok(session) => {
                info!(%id, "using device");
                return Ok(session);
            },
            Err(e) => warn!(%id, "skipping device: {e}"),
        }
    }
    Err(SensorError::DeviceNotFound)
}

/// Select by serial when one is given, otherwise take the first device
pub fn get_device<D: Discovery>(
    discovery: &mut D,
    serial: Option<&str>,
    timings: &Timings,
) -> Result<Lr4<D::Transport>> {
    match serial {
        Some(target) => find_by_serial(discovery, target, timings),
        None => first_available(discovery, timings),
    }
}

/// Open a session on one enumerated candidate
pub fn open_device<D: Discovery>(
    discovery: &mut D,
    id: &D::Id,
    timings: &Timings,
) -> Result<Lr4<D::Transport>> {
    let transport = discovery.open(id)?;
    Lr4::open(transport, timings.clone())
}
