use super::types::SYNC_BYTE;
use crate::config::DEFAULT_READ_BUFFER_SIZE;
use crate::error::{Result, TsError};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

/// Extra marker positions (at 2x and 3x the stride) a candidate stride must
/// hit before it is accepted. Filters out payload bytes that happen to be 0x47.
const CANDIDATE_CONFIRMATIONS: u64 = 2;

/// Outcome of a successful stride detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Offset of the first sync byte in the file.
    pub first_packet: u64,
    /// Detected uniform packet size.
    pub packet_size: usize,
    /// Number of packets whose boundaries were validated.
    pub packets_checked: u64,
    /// Distinct strides observed, including a short trailing one.
    pub stride_histogram: BTreeMap<u64, u64>,
    /// Length of a truncated final packet, if the file ends mid-packet.
    pub truncated_tail: Option<u64>,
}

/// Random-access byte reader over a buffered source.
///
/// Keeps its own position so that nearby jumps use `seek_relative` and stay
/// inside the read buffer.
struct MarkerReader<R> {
    inner: BufReader<R>,
    pos: u64,
    len: u64,
}

impl<R: Read + Seek> MarkerReader<R> {
    fn new(inner: R, len: u64, capacity: usize) -> io::Result<Self> {
        let mut inner = BufReader::with_capacity(capacity, inner);
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, pos: 0, len })
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn byte_at(&mut self, offset: u64) -> io::Result<Option<u8>> {
        if offset >= self.len {
            return Ok(None);
        }
        if offset != self.pos {
            self.inner.seek_relative(offset as i64 - self.pos as i64)?;
            self.pos = offset;
        }

        let mut byte = [0u8; 1];
        match self.inner.read_exact(&mut byte) {
            Ok(()) => {
                self.pos += 1;
                Ok(Some(byte[0]))
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // Source is shorter than its reported size.
                self.len = offset;
                self.pos = self.inner.stream_position()?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn find_marker(&mut self, from: u64) -> io::Result<Option<u64>> {
        let mut offset = from;
        while let Some(byte) = self.byte_at(offset)? {
            if byte == SYNC_BYTE {
                return Ok(Some(offset));
            }
            offset += 1;
        }
        Ok(None)
    }
}

/// Infers the packet stride of a transport stream from its sync bytes.
#[derive(Debug, Clone)]
pub struct SizeProber {
    packet_limit: Option<u64>,
    read_buffer_size: usize,
}

impl Default for SizeProber {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeProber {
    pub fn new() -> Self {
        Self {
            packet_limit: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Validates at most `limit` packets instead of the whole file.
    pub fn with_packet_limit(mut self, limit: Option<u64>) -> Self {
        self.packet_limit = limit.filter(|&l| l > 0);
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Detects the packet size of the `file_size` bytes readable from `reader`.
    ///
    /// Fails with [`TsError::AmbiguousPacketSize`] when no sync byte exists or
    /// when any stride other than a short trailing one disagrees with the
    /// first.
    pub fn probe<R: Read + Seek>(&self, reader: R, file_size: u64) -> Result<ProbeReport> {
        let mut reader = MarkerReader::new(reader, file_size, self.read_buffer_size)?;

        let first_packet = match reader.find_marker(0)? {
            Some(offset) => offset,
            None => {
                warn!("No sync byte found in {} bytes", file_size);
                return Err(TsError::AmbiguousPacketSize("no sync byte found".into()));
            }
        };
        debug!("First sync byte at offset {}", first_packet);

        let stride = self.candidate_stride(&mut reader, first_packet)?;
        let packet_size = usize::try_from(stride).map_err(|_| {
            TsError::AmbiguousPacketSize(format!("stride {} does not fit in memory", stride))
        })?;
        debug!("Candidate packet size {}", packet_size);

        let mut stride_histogram = BTreeMap::new();
        let mut truncated_tail = None;
        let mut packets_checked = 0u64;
        let mut pos = first_packet;

        loop {
            packets_checked += 1;

            let remaining = reader.len() - pos;
            if remaining <= stride {
                *stride_histogram.entry(remaining).or_insert(0) += 1;
                if remaining < stride {
                    debug!("Truncated final packet of {} bytes at offset {}", remaining, pos);
                    truncated_tail = Some(remaining);
                }
                break;
            }

            if self.packet_limit.is_some_and(|limit| packets_checked >= limit) {
                debug!("Stopping stride validation after {} packets", packets_checked);
                break;
            }

            let next = pos + stride;
            if reader.byte_at(next)? == Some(SYNC_BYTE) {
                *stride_histogram.entry(stride).or_insert(0) += 1;
                pos = next;
                continue;
            }

            let delta = match reader.find_marker(pos + 1)? {
                Some(marker) => marker - pos,
                None if remaining - stride < stride => {
                    // Padding after the last packet, too short to hold another one.
                    let tail = remaining - stride;
                    *stride_histogram.entry(stride).or_insert(0) += 1;
                    debug!("Ignoring {} trailing bytes at offset {}", tail, pos + stride);
                    truncated_tail = Some(tail);
                    break;
                }
                None => remaining,
            };
            *stride_histogram.entry(delta).or_insert(0) += 1;
            warn!(
                "Stride {} after packet at offset {} disagrees with packet size {}",
                delta, pos, packet_size
            );
            return Err(TsError::AmbiguousPacketSize(format!(
                "stride {} at offset {} disagrees with packet size {}",
                delta, pos, packet_size
            )));
        }

        info!(
            "Detected packet size {} ({} packets checked, first at offset {})",
            packet_size, packets_checked, first_packet
        );

        Ok(ProbeReport {
            first_packet,
            packet_size,
            packets_checked,
            stride_histogram,
            truncated_tail,
        })
    }

    /// First distance from `first` to a later marker that keeps repeating.
    ///
    /// Falls back to the first distance seen when none repeats. A file
    /// holding a single packet has no second marker; the end of the file
    /// closes it instead.
    fn candidate_stride<R: Read + Seek>(
        &self,
        reader: &mut MarkerReader<R>,
        first: u64,
    ) -> io::Result<u64> {
        let mut first_seen = None;
        let mut from = first + 1;
        while let Some(marker) = reader.find_marker(from)? {
            let stride = marker - first;
            if Self::confirms(reader, first, stride)? {
                return Ok(stride);
            }
            debug!("Sync byte at {} does not repeat every {} bytes", marker, stride);
            first_seen.get_or_insert(stride);
            from = marker + 1;
        }
        Ok(first_seen.unwrap_or(reader.len() - first))
    }

    fn confirms<R: Read + Seek>(
        reader: &mut MarkerReader<R>,
        first: u64,
        stride: u64,
    ) -> io::Result<bool> {
        for k in 2..=CANDIDATE_CONFIRMATIONS + 1 {
            match reader.byte_at(first + k * stride)? {
                Some(SYNC_BYTE) => continue,
                Some(_) => return Ok(false),
                None => break,
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::tests::{build_stream, PAYLOAD_FILL};
    use pretty_assertions::assert_eq;
    use quickcheck::TestResult;
    use quickcheck_macros::quickcheck;
    use std::io::Cursor;

    fn probe(data: &[u8]) -> Result<ProbeReport> {
        SizeProber::new().probe(Cursor::new(data), data.len() as u64)
    }

    #[test]
    fn test_probe_188() {
        let data = build_stream(&[0x0000, 0x0100, 0x0101, 0x0100], 188);
        let report = probe(&data).unwrap();
        assert_eq!(report.first_packet, 0);
        assert_eq!(report.packet_size, 188);
        assert_eq!(report.packets_checked, 4);
        assert_eq!(report.stride_histogram, BTreeMap::from([(188, 4)]));
        assert_eq!(report.truncated_tail, None);
    }

    #[test]
    fn test_probe_single_packet() {
        let data = build_stream(&[0x0011], 204);
        assert_eq!(probe(&data).unwrap().packet_size, 204);
    }

    #[test]
    fn test_probe_skips_leading_garbage() {
        let mut data = vec![0x00, 0x12, 0x34];
        data.extend(build_stream(&[0x11; 5], 188));
        let report = probe(&data).unwrap();
        assert_eq!(report.first_packet, 3);
        assert_eq!(report.packet_size, 188);
    }

    #[test]
    fn test_probe_truncated_tail() {
        let mut data = build_stream(&[0x11; 6], 188);
        data.truncate(5 * 188 + 100);
        let report = probe(&data).unwrap();
        assert_eq!(report.packet_size, 188);
        assert_eq!(report.truncated_tail, Some(100));
        assert_eq!(report.stride_histogram, BTreeMap::from([(100, 1), (188, 5)]));
    }

    #[test]
    fn test_probe_ignores_sync_byte_in_payload() {
        let mut data = build_stream(&[0x11; 8], 188);
        data[40] = SYNC_BYTE;
        data[188 + 17] = SYNC_BYTE;
        assert_eq!(probe(&data).unwrap().packet_size, 188);
    }

    #[test]
    fn test_probe_no_sync_byte() {
        let data = vec![PAYLOAD_FILL; 1000];
        assert!(matches!(probe(&data), Err(TsError::AmbiguousPacketSize(_))));
        assert!(matches!(probe(&[]), Err(TsError::AmbiguousPacketSize(_))));
    }

    #[test]
    fn test_probe_mixed_sizes_fail() {
        let mut data = build_stream(&[0x11; 5], 188);
        data.extend(build_stream(&[0x11; 5], 204));
        assert!(matches!(probe(&data), Err(TsError::AmbiguousPacketSize(_))));
    }

    #[test]
    fn test_probe_inserted_byte_fails_whole_file_validation() {
        let mut data = build_stream(&[0x11; 10], 188);
        data.insert(5 * 188 + 30, 0x00);
        assert!(matches!(probe(&data), Err(TsError::AmbiguousPacketSize(_))));
    }

    #[test]
    fn test_probe_packet_limit_stops_early() {
        let mut data = build_stream(&[0x11; 10], 188);
        data.insert(5 * 188 + 30, 0x00);
        let report = SizeProber::new()
            .with_packet_limit(Some(3))
            .probe(Cursor::new(&data), data.len() as u64)
            .unwrap();
        assert_eq!(report.packet_size, 188);
        assert_eq!(report.packets_checked, 3);
    }

    #[test]
    fn test_probe_trailing_junk_longer_than_packet_fails() {
        let mut data = build_stream(&[0x11; 4], 188);
        data.extend(vec![PAYLOAD_FILL; 300]);
        assert!(matches!(probe(&data), Err(TsError::AmbiguousPacketSize(_))));
    }

    #[test]
    fn test_probe_short_padding_without_sync_byte() {
        let mut data = build_stream(&[0x11; 5], 188);
        data.extend(vec![PAYLOAD_FILL; 100]);
        let report = probe(&data).unwrap();
        assert_eq!(report.packet_size, 188);
        assert_eq!(report.packets_checked, 5);
        assert_eq!(report.truncated_tail, Some(100));
        assert_eq!(report.stride_histogram, BTreeMap::from([(188, 5)]));
    }

    #[test]
    fn test_probe_short_padding_with_misplaced_sync_byte_fails() {
        let mut data = build_stream(&[0x11; 5], 188);
        data.extend(vec![PAYLOAD_FILL; 100]);
        data[5 * 188 + 40] = SYNC_BYTE;
        assert!(matches!(probe(&data), Err(TsError::AmbiguousPacketSize(_))));
    }

    #[quickcheck]
    fn prop_probe_reports_uniform_size(count: u16, size_index: u8) -> TestResult {
        let count = (count % 300) as usize + 1;
        let size = [188, 204, 208][size_index as usize % 3];
        let pids: Vec<u16> = (0..count).map(|i| (i % 7) as u16 * 0x100).collect();
        let data = build_stream(&pids, size);

        match probe(&data) {
            Ok(report) => TestResult::from_bool(
                report.packet_size == size && report.packets_checked == count as u64,
            ),
            Err(e) => TestResult::error(e.to_string()),
        }
    }
}
