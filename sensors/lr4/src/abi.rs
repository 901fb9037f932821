use std::fmt;

use rangefinder_core::PACKET_SIZE;

use crate::types::{CommandTag, StatusTag};

/// Number of payload bytes following the tag
pub const PAYLOAD_SIZE: usize = PACKET_SIZE - 1;

/// A raw 8-byte packet in either direction. Byte 0 is the tag.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Packet([u8; PACKET_SIZE]);

impl Packet {
    /// Build a packet from a tag and up to 7 payload bytes, zero padding the rest.
    /// Payload beyond 7 bytes is ignored.
    pub fn encode(tag: u8, payload: &[u8]) -> Self {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0] = tag;
        let len = payload.len().min(PAYLOAD_SIZE);
        buf[1..1 + len].copy_from_slice(&payload[..len]);
        Self(buf)
    }

    /// Split into tag and payload
    pub fn decode(&self) -> (u8, [u8; PAYLOAD_SIZE]) {
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&self.0[1..]);
        (self.0[0], payload)
    }

    #[inline(always)]
    pub fn tag(&self) -> u8 {
        self.0[0]
    }

    /// Interpret the tag as a device status tag
    #[inline]
    pub fn status(&self) -> Option<StatusTag> {
        StatusTag::from_u8(self.0[0])
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }

    /// Distance carried by a measurement packet, bytes 1 (lsb) and 2 (msb)
    #[inline]
    pub fn distance_mm(&self) -> u16 {
        u16::from_le_bytes([self.0[1], self.0[2]])
    }
}

impl From<[u8; PACKET_SIZE]> for Packet {
    fn from(value: [u8; PACKET_SIZE]) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", hex::encode(self.0))
    }
}

pub trait Arg {
    const SIZE: usize;
    fn write(&self, buf: &mut [u8]);
}

impl Arg for u8 {
    const SIZE: usize = 1;
    fn write(&self, buf: &mut [u8]) {
        buf[0] = *self;
    }
}

impl Arg for u16 {
    const SIZE: usize = 2;
    fn write(&self, buf: &mut [u8]) {
        buf.copy_from_slice(&self.to_le_bytes());
    }
}

macro_rules! impl_command_abi {
    [$(
        $( #[doc = $( $doc:tt )* ] )*
        fn $name:ident [ $tag:ident $(, $hardcode:expr )* ] ( $( $arg:ident: $type:ty ),* );
    )+] => {
        $(
            $(#[doc = concat!("Construct a packet for ", $($doc)*)])*
            #[allow(unused_mut, unused_variables, unused_assignments)]
            pub fn $name( $( $arg: $type ),* ) -> Packet {
                let mut buf = [0u8; PACKET_SIZE];
                buf[0] = CommandTag::$tag as u8;
                let mut cur = 1;
                $(
                    buf[cur] = $hardcode;
                    cur += 1;
                )*
                $(
                    let start = cur;
                    cur += <$type as Arg>::SIZE;
                    $arg.write(&mut buf[start..cur]);
                )*
                Packet(buf)
            }
        )*
    };
}

impl_command_abi![
    /* CONFIGURATION */

    /// requesting the current configuration
    fn get_config[GetConfig]();

    /// writing a config word and measurement interval
    fn set_config[SetConfig](config: u16, interval: u16);

    /// selecting single shot mode triggered by the run bit, default range and units, no interval
    fn single_shot_config[SetConfig, 0b0000_1000, 0x00, 0x00, 0x00]();

    /// persisting the active configuration to non-volatile storage
    fn write_config_persist[WriteConfigPersist]();

    /* PRODUCT INFO */

    /// reading six bytes of the product info structure at an offset
    fn get_product_info[GetProductInfo](offset: u8);
];
