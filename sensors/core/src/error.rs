//! Errors shared by every sensor driver and transport.

/// Failures raised by the packet transport underneath a driver
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Nothing arrived within the receive timeout
    #[error("receive timed out")]
    Timeout,

    /// The device returned fewer bytes than a full packet
    #[error("short packet: got {0} bytes")]
    ShortPacket(usize),

    /// The device went away while a handle was open
    #[error("device disconnected")]
    Disconnected,

    /// The transport does not implement an optional operation
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// HID communication error
    #[error("hid error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during sensor operations
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// The transport failed, propagated verbatim
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The expected status packet never showed up
    #[error("timed out waiting for {expected} after {attempts} attempts")]
    ProtocolTimeout {
        expected: &'static str,
        attempts: u32,
    },

    /// The device never echoed back the configuration we wrote
    #[error("configuration not accepted after {attempts} attempts")]
    ConfigWriteFailed { attempts: u32 },

    /// No device matched, or none were connected
    #[error("device not found")]
    DeviceNotFound,
}

impl From<hidapi::HidError> for SensorError {
    fn from(err: hidapi::HidError) -> Self {
        SensorError::Transport(err.into())
    }
}

pub type Result<T> = std::result::Result<T, SensorError>;
