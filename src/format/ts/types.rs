use crate::error::Result;
use bytes::{BufMut, Bytes, BytesMut};

// Constants
pub const SYNC_BYTE: u8 = 0x47;
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_HEADER_SIZE: usize = 4;

// PIDs
pub const PID_NULL: u16 = 0x1FFF;
pub const PID_MAX: u16 = 0x1FFF;

// Adaptation field control values
pub const AFC_RESERVED: u8 = 0b00;
pub const AFC_PAYLOAD_ONLY: u8 = 0b01;
pub const AFC_ADAPTATION_ONLY: u8 = 0b10;
pub const AFC_ADAPTATION_AND_PAYLOAD: u8 = 0b11;

/// Decoded fixed 4-byte transport packet header.
///
/// Only constructed for positions already confirmed to start with
/// [`SYNC_BYTE`], so the sync byte itself is not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TSHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    pub transport_priority: bool,
    /// 13-bit packet identifier.
    pub pid: u16,
    /// 2-bit scrambling control, stored verbatim.
    pub scrambling_control: u8,
    /// 2-bit adaptation field control, stored verbatim.
    pub adaptation_field_control: u8,
    /// 4-bit continuity counter, stored verbatim and never validated.
    pub continuity_counter: u8,
}

impl TSHeader {
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & AFC_ADAPTATION_ONLY != 0
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & AFC_PAYLOAD_ONLY != 0
    }

    pub fn is_scrambled(&self) -> bool {
        self.scrambling_control != 0
    }

    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(SYNC_BYTE);

        let mut b1 = 0u8;
        if self.transport_error {
            b1 |= 0x80;
        }
        if self.payload_unit_start {
            b1 |= 0x40;
        }
        if self.transport_priority {
            b1 |= 0x20;
        }
        b1 |= ((self.pid >> 8) & 0x1f) as u8;
        buf.put_u8(b1);

        buf.put_u8((self.pid & 0xff) as u8);

        let b3 = (self.scrambling_control & 0x03) << 6
            | (self.adaptation_field_control & 0x03) << 4
            | (self.continuity_counter & 0x0f);
        buf.put_u8(b3);

        Ok(())
    }
}

/// One transport packet observed during the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Absolute offset of the packet's sync byte in the source file.
    pub file_offset: u64,
    pub header: TSHeader,
    /// Full packet bytes, present only when raw retention is enabled.
    pub data: Option<Bytes>,
}

impl Packet {
    pub fn new(file_offset: u64, header: TSHeader) -> Self {
        Self {
            file_offset,
            header,
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn pid(&self) -> u16 {
        self.header.pid
    }
}

/// All packets of one PID, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidStream {
    pub pid: u16,
    pub packet_count: u64,
    pub packets: Vec<Packet>,
}

impl PidStream {
    pub fn new(pid: u16) -> Self {
        Self {
            pid,
            packet_count: 0,
            packets: Vec::new(),
        }
    }
}

/// Listing entry: a PID and how many packets carried it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidSummary {
    pub pid: u16,
    pub packet_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_header() {
        let header = TSHeader {
            transport_error: true,
            payload_unit_start: true,
            transport_priority: false,
            pid: 0x1ABC,
            scrambling_control: 2,
            adaptation_field_control: AFC_ADAPTATION_AND_PAYLOAD,
            continuity_counter: 0x0F,
        };

        let mut buf = BytesMut::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x47, 0xDA, 0xBC, 0xBF]);
    }

    #[test]
    fn test_adaptation_field_control_flags() {
        let mut header = TSHeader {
            adaptation_field_control: AFC_PAYLOAD_ONLY,
            ..Default::default()
        };
        assert!(header.has_payload());
        assert!(!header.has_adaptation_field());

        header.adaptation_field_control = AFC_ADAPTATION_ONLY;
        assert!(!header.has_payload());
        assert!(header.has_adaptation_field());

        header.adaptation_field_control = AFC_RESERVED;
        assert!(!header.has_payload());
        assert!(!header.has_adaptation_field());
    }
}
