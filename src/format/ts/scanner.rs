use super::index::StreamIndex;
use super::parser::decode_header;
use super::types::*;
use crate::config::DEFAULT_READ_BUFFER_SIZE;
use crate::error::{Result, TsError};
use bytes::{Bytes, BytesMut};
use log::{debug, info};
use std::io::{BufReader, Read, Seek, SeekFrom};

/// Counters gathered during one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub packets: u64,
    /// Times the walk lost the sync byte and fell back to byte-wise search.
    pub resyncs: u64,
    /// Bytes skipped while resynchronizing.
    pub skipped_bytes: u64,
}

/// Walks a source at a fixed stride and builds the PID index.
#[derive(Debug, Clone)]
pub struct StreamScanner {
    packet_size: usize,
    retain_packet_bytes: bool,
    read_buffer_size: usize,
}

impl StreamScanner {
    pub fn new(packet_size: usize) -> Self {
        Self {
            packet_size,
            retain_packet_bytes: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Stores each packet's bytes in the index alongside its offset.
    pub fn with_retained_bytes(mut self, retain: bool) -> Self {
        self.retain_packet_bytes = retain;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Scans the first `file_size` bytes of `reader` from offset 0.
    ///
    /// Whenever the byte at the expected boundary is not the sync byte the
    /// scanner advances one byte at a time until it finds one, then resumes
    /// the fixed stride from there. Trailing bytes shorter than a packet are
    /// never indexed.
    pub fn scan<R: Read + Seek>(&self, reader: R, file_size: u64) -> Result<(StreamIndex, ScanStats)> {
        if self.packet_size < TS_HEADER_SIZE {
            return Err(TsError::AmbiguousPacketSize(format!(
                "packet size {} is smaller than a packet header",
                self.packet_size
            )));
        }

        let mut reader = BufReader::with_capacity(self.read_buffer_size, reader);
        reader.seek(SeekFrom::Start(0))?;

        let packet_size = self.packet_size as u64;
        let mut index = StreamIndex::new();
        let mut stats = ScanStats::default();
        let mut packet = BytesMut::zeroed(self.packet_size);
        let mut in_sync = true;
        let mut offset = 0u64;

        // The reader position always equals `offset` at the top of the loop.
        while offset + packet_size <= file_size {
            reader.read_exact(&mut packet[..1])?;
            if packet[0] != SYNC_BYTE {
                if in_sync {
                    debug!("Lost sync at offset {}, searching byte by byte", offset);
                    stats.resyncs += 1;
                    in_sync = false;
                }
                stats.skipped_bytes += 1;
                offset += 1;
                continue;
            }
            if !in_sync {
                debug!("Resynchronized at offset {}", offset);
                in_sync = true;
            }

            reader.read_exact(&mut packet[1..])?;
            let mut header = [0u8; TS_HEADER_SIZE];
            header.copy_from_slice(&packet[..TS_HEADER_SIZE]);
            let header = decode_header(&header);

            let mut entry = Packet::new(offset, header);
            if self.retain_packet_bytes {
                entry = entry.with_data(Bytes::copy_from_slice(&packet));
            }
            index.insert(entry.pid(), entry);

            stats.packets += 1;
            offset += packet_size;
        }

        info!(
            "Indexed {} packets across {} pids ({} resyncs, {} bytes skipped)",
            stats.packets,
            index.len(),
            stats.resyncs,
            stats.skipped_bytes
        );

        Ok((index, stats))
    }
}
