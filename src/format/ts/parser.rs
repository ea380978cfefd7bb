use super::types::*;

/// Decodes the fixed 4-byte packet header.
///
/// `data[0]` is expected to be [`SYNC_BYTE`]; callers check it before
/// decoding. The function is total: every bit pattern yields a header.
pub fn decode_header(data: &[u8; TS_HEADER_SIZE]) -> TSHeader {
    TSHeader {
        transport_error: (data[1] & 0x80) != 0,
        payload_unit_start: (data[1] & 0x40) != 0,
        transport_priority: (data[1] & 0x20) != 0,
        pid: (((data[1] & 0x1F) as u16) << 8) | data[2] as u16,
        scrambling_control: (data[3] & 0xC0) >> 6,
        adaptation_field_control: (data[3] & 0x30) >> 4,
        continuity_counter: data[3] & 0x0F,
    }
}

/// Decodes the header at the start of `packet`, if it is long enough and
/// begins with the sync byte.
pub fn decode_packet_header(packet: &[u8]) -> Option<TSHeader> {
    let header: &[u8; TS_HEADER_SIZE] = packet.get(..TS_HEADER_SIZE)?.try_into().ok()?;
    if header[0] != SYNC_BYTE {
        return None;
    }
    Some(decode_header(header))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_parse_ts_header() {
        let data = [
            0x47, // Sync byte
            0x40, // Payload unit start indicator set
            0x11, // PID low bits
            0x10, // Payload only, continuity counter 0
        ];

        let header = decode_header(&data);
        assert_eq!(
            header,
            TSHeader {
                transport_error: false,
                payload_unit_start: true,
                transport_priority: false,
                pid: 0x0011,
                scrambling_control: 0,
                adaptation_field_control: AFC_PAYLOAD_ONLY,
                continuity_counter: 0,
            }
        );
    }

    #[test]
    fn test_parse_all_bits_set() {
        let header = decode_header(&[0x47, 0xFF, 0xFF, 0xFF]);
        assert!(header.transport_error);
        assert!(header.payload_unit_start);
        assert!(header.transport_priority);
        assert_eq!(header.pid, PID_NULL);
        assert_eq!(header.scrambling_control, 3);
        assert_eq!(header.adaptation_field_control, AFC_ADAPTATION_AND_PAYLOAD);
        assert_eq!(header.continuity_counter, 0x0F);
    }

    #[test]
    fn test_decode_packet_header_rejects_bad_input() {
        assert_eq!(decode_packet_header(&[0x47, 0x00]), None);
        assert_eq!(decode_packet_header(&[0x48, 0x00, 0x00, 0x10]), None);
        assert_eq!(
            decode_packet_header(&[0x47, 0x1F, 0xFF, 0x10, 0xAA]).map(|h| h.pid),
            Some(PID_NULL)
        );
    }

    #[quickcheck]
    fn prop_decode_inverts_write(b1: u8, b2: u8, b3: u8) -> bool {
        let header = decode_header(&[SYNC_BYTE, b1, b2, b3]);
        let mut buf = BytesMut::new();
        header.write_to(&mut buf).unwrap();
        buf[..] == [SYNC_BYTE, b1, b2, b3]
    }
}
