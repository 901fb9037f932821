use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::abi::{self, Packet};

/// Tag of a host to device command packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandTag {
    GetConfig = 0x00,
    SetConfig = 0x01,
    WriteConfigPersist = 0x02,
    GetProductInfo = 0x03,
}

/// Tag of a device to host status packet.
///
/// Shares its numeric range with [`CommandTag`], but is only ever
/// interpreted on received packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusTag {
    MeasurementData = 0x00,
    ConfigData = 0x01,
    ProductInfo = 0x02,
}

impl StatusTag {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::MeasurementData),
            0x01 => Some(Self::ConfigData),
            0x02 => Some(Self::ProductInfo),
            _ => None,
        }
    }

    /// Human readable name used in errors and logs
    pub fn name(self) -> &'static str {
        match self {
            Self::MeasurementData => "measurement data",
            Self::ConfigData => "config data",
            Self::ProductInfo => "product info",
        }
    }
}

/// Bits of the 16-bit configuration word
pub mod flags {
    /// Take one reading each time the run bit is raised
    pub const TRIGGER_ON_RUN: u16 = 1 << 3;
    /// Stream readings while the run bit is held
    pub const CONTINUOUS: u16 = 1 << 4;
    /// Measurement cycle active
    pub const RUN: u16 = 1 << 15;
}

/// Last configuration reported by the device, kept verbatim.
///
/// Bytes 1-2 are the little endian config word, bytes 3-4 the little endian
/// measurement interval. The run bit is byte 2 bit 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceConfig(Packet);

impl DeviceConfig {
    pub fn new(packet: Packet) -> Self {
        Self(packet)
    }

    #[inline]
    pub fn packet(&self) -> &Packet {
        &self.0
    }

    pub fn config_word(&self) -> u16 {
        let b = self.0.as_bytes();
        u16::from_le_bytes([b[1], b[2]])
    }

    pub fn interval(&self) -> u16 {
        let b = self.0.as_bytes();
        u16::from_le_bytes([b[3], b[4]])
    }

    pub fn is_running(&self) -> bool {
        self.config_word() & flags::RUN != 0
    }

    pub fn is_single_shot(&self) -> bool {
        let word = self.config_word();
        word & flags::TRIGGER_ON_RUN != 0 && word & flags::CONTINUOUS == 0
    }

    /// Build the `SetConfig` command that rewrites this configuration with
    /// the run bit raised or cleared
    pub fn with_run(&self, run: bool) -> Packet {
        let word = if run {
            self.config_word() | flags::RUN
        } else {
            self.config_word() & !flags::RUN
        };
        abi::set_config(word, self.interval())
    }
}

impl Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config={:#06x} interval={} single_shot={} running={}",
            self.config_word(),
            self.interval(),
            self.is_single_shot(),
            self.is_running()
        )
    }
}

/// Offset of the serial number inside the product info structure
pub const SERIAL_OFFSET: u8 = 70;
/// Offset of the second serial number chunk
pub const SERIAL_TAIL_OFFSET: u8 = SERIAL_OFFSET + 6;

/// ASCII serial number read from the product info structure
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SerialNumber(String);

impl SerialNumber {
    /// Assemble the serial from the two product info replies.
    ///
    /// The head chunk contributes its bytes 2..8, the tail chunk its bytes
    /// 2..5. Trailing whitespace and NUL padding are trimmed.
    pub fn from_chunks(head: &Packet, tail: &Packet) -> Self {
        let mut raw = Vec::with_capacity(9);
        raw.extend_from_slice(&head.as_bytes()[2..8]);
        raw.extend_from_slice(&tail.as_bytes()[2..5]);
        let text = String::from_utf8_lossy(&raw);
        Self(
            text.trim_end_matches(|c: char| c.is_ascii_whitespace() || c == '\0')
                .to_string(),
        )
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a user supplied serial, ignoring surrounding whitespace
    pub fn matches(&self, target: &str) -> bool {
        self.0.trim() == target.trim()
    }
}

impl Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SerialNumber> for String {
    fn from(value: SerialNumber) -> Self {
        value.0
    }
}

/// Timeouts, delays and retry ceilings used by the protocol engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timings {
    /// Upper bound for a single transport receive
    #[serde(with = "humantime_serde")]
    pub receive_timeout: Duration,
    /// Receive attempts allowed while waiting for a config or product info reply
    pub max_discards: u32,
    /// Send and read-back cycles allowed when writing a configuration
    pub write_retries: u32,
    /// Pause between configuration write attempts
    #[serde(with = "humantime_serde")]
    pub write_retry_delay: Duration,
    /// Upper bound for a measurement to arrive after the run bit is raised
    #[serde(with = "humantime_serde")]
    pub measure_timeout: Duration,
    /// Pause between empty polls while measuring
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            receive_timeout: Duration::from_millis(100),
            max_discards: 16,
            write_retries: 50,
            write_retry_delay: Duration::from_millis(100),
            measure_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl Timings {
    /// Receive attempts per wait, never less than one
    #[inline]
    pub fn discard_limit(&self) -> u32 {
        self.max_discards.max(1)
    }

    /// Write cycles per configuration write, never less than one
    #[inline]
    pub fn write_attempts(&self) -> u32 {
        self.write_retries.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tags_decode() {
        assert_eq!(StatusTag::from_u8(0), Some(StatusTag::MeasurementData));
        assert_eq!(StatusTag::from_u8(1), Some(StatusTag::ConfigData));
        assert_eq!(StatusTag::from_u8(2), Some(StatusTag::ProductInfo));
        assert_eq!(StatusTag::from_u8(3), None);
        assert_eq!(StatusTag::from_u8(0xff), None);
    }

    #[test]
    fn config_words_are_little_endian() {
        let config = DeviceConfig::new(Packet::from([0x01, 0x08, 0x80, 0x34, 0x12, 0, 0, 0]));
        assert_eq!(config.config_word(), 0x8008);
        assert_eq!(config.interval(), 0x1234);
        assert!(config.is_running());
        assert!(config.is_single_shot());
    }

    #[test]
    fn run_bit_only_touches_byte_two() {
        let config = DeviceConfig::new(Packet::from([0x01, 0x18, 0x42, 0x05, 0x00, 9, 9, 9]));
        let start = config.with_run(true);
        assert_eq!(start.as_bytes(), &[0x01, 0x18, 0xc2, 0x05, 0x00, 0, 0, 0]);
        let stop = config.with_run(false);
        assert_eq!(stop.as_bytes(), &[0x01, 0x18, 0x42, 0x05, 0x00, 0, 0, 0]);
    }

    #[test]
    fn serial_number_concatenates_nine_bytes() {
        let head = Packet::from([0x02, 70, b'A', b'B', b'C', b'D', b'E', b'F']);
        let tail = Packet::from([0x02, 76, b'0', b'0', b'0', 0, 0, 0]);
        assert_eq!(SerialNumber::from_chunks(&head, &tail).as_str(), "ABCDEF000");
    }

    #[test]
    fn serial_number_ignores_tail_padding_bytes() {
        let head = Packet::from([0x02, 70, b'L', b'R', b'4', b'-', b'0', b'1']);
        let tail = Packet::from([0x02, 76, b'7', 0, b' ', b'X', b'Y', b'Z']);
        assert_eq!(SerialNumber::from_chunks(&head, &tail).as_str(), "LR4-017");
    }

    #[test]
    fn serial_number_trims_whitespace_and_nul() {
        let head = Packet::from([0x02, 70, b'S', b'N', b'1', b' ', b'\t', 0]);
        let tail = Packet::from([0x02, 76, b'\r', b'\n', 0, 0, 0, 0]);
        let serial = SerialNumber::from_chunks(&head, &tail);
        assert_eq!(serial.as_str(), "SN1");
        assert!(serial.matches("  SN1 "));
        assert!(!serial.matches("SN10"));
    }

    #[test]
    fn zero_attempt_limits_are_raised_to_one() {
        let timings = Timings {
            max_discards: 0,
            write_retries: 0,
            ..Timings::default()
        };
        assert_eq!(timings.discard_limit(), 1);
        assert_eq!(timings.write_attempts(), 1);
        assert_eq!(Timings::default().discard_limit(), 16);
        assert_eq!(Timings::default().write_attempts(), 50);
    }

    #[test]
    fn timings_parse_humantime() {
        let timings: Timings = toml::from_str(
            r#"
            receive_timeout = "250ms"
            write_retries = 3
            measure_timeout = "5s"
            "#,
        )
        .unwrap();
        assert_eq!(timings.receive_timeout, Duration::from_millis(250));
        assert_eq!(timings.write_retries, 3);
        assert_eq!(timings.measure_timeout, Duration::from_secs(5));
        // unset fields fall back to defaults
        assert_eq!(timings.max_discards, Timings::default().max_discards);
        assert_eq!(timings.write_retry_delay, Duration::from_millis(100));
    }
}
