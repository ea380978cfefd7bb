use super::index::StreamIndex;
use super::types::PidStream;
use crate::error::{Result, TsError};
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Output file used when the caller gives none:
/// `<source dir>/Pid_0x<pid as 4 lowercase hex digits>_<source file name>`.
pub fn default_output_path(source: &Path, pid: u16) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = format!("Pid_0x{:04x}_{}", pid, name);
    match source.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Copies every packet of one PID out of the source, in original order.
pub struct Extractor<'a> {
    index: &'a StreamIndex,
    packet_size: usize,
}

impl<'a> Extractor<'a> {
    pub fn new(index: &'a StreamIndex, packet_size: usize) -> Self {
        Self { index, packet_size }
    }

    /// Looks up `pid`, failing with [`TsError::PidNotFound`] when it has no packets.
    pub fn stream(&self, pid: u16) -> Result<&'a PidStream> {
        self.index
            .lookup(pid)
            .filter(|s| !s.packets.is_empty())
            .ok_or(TsError::PidNotFound(pid))
    }

    /// Writes all packets of `pid` to `output`, truncating it first.
    ///
    /// Nothing is created when the PID is unknown. On a short read the output
    /// is left holding the packets written so far and the error is returned.
    pub fn extract<R: Read + Seek>(
        &self,
        source: &mut R,
        pid: u16,
        output: &Path,
    ) -> Result<u64> {
        let stream = self.stream(pid)?;
        info!(
            "Extracting pid 0x{:04X} ({} packets) to {}",
            pid,
            stream.packet_count,
            output.display()
        );

        let mut writer = BufWriter::new(File::create(output)?);
        let written = self.write_stream(source, stream, &mut writer)?;
        writer.flush()?;

        debug!("Wrote {} bytes for pid 0x{:04X}", written * self.packet_size as u64, pid);
        Ok(written)
    }

    /// Appends the packets of `stream` to `writer`, returning the packet count.
    pub fn write_stream<R: Read + Seek, W: Write>(
        &self,
        source: &mut R,
        stream: &PidStream,
        writer: &mut W,
    ) -> Result<u64> {
        let mut buf = vec![0u8; self.packet_size];
        let mut written = 0u64;

        for packet in &stream.packets {
            if let Some(data) = &packet.data {
                writer.write_all(data)?;
                written += 1;
                continue;
            }

            source.seek(SeekFrom::Start(packet.file_offset))?;
            let actual = read_full(source, &mut buf)?;
            if actual < self.packet_size {
                return Err(TsError::ShortRead {
                    offset: packet.file_offset,
                    expected: self.packet_size,
                    actual,
                });
            }
            writer.write_all(&buf)?;
            written += 1;
        }

        Ok(written)
    }
}

/// Reads until `buf` is full or the source ends.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ts::scanner::StreamScanner;
    use crate::format::ts::tests::build_stream;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn index_of(data: &[u8], size: usize, retain: bool) -> StreamIndex {
        StreamScanner::new(size)
            .with_retained_bytes(retain)
            .scan(Cursor::new(data), data.len() as u64)
            .unwrap()
            .0
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/capture/stream.ts"), 0x11),
            PathBuf::from("/data/capture/Pid_0x0011_stream.ts")
        );
        assert_eq!(
            default_output_path(Path::new("stream.ts"), 0x1FFF),
            PathBuf::from("Pid_0x1fff_stream.ts")
        );
    }

    #[test]
    fn test_write_stream_concatenates_in_order() {
        let data = build_stream(&[0x100, 0x101, 0x100, 0x100, 0x101], 204);
        let index = index_of(&data, 204, false);
        let extractor = Extractor::new(&index, 204);

        let mut out = Vec::new();
        let stream = extractor.stream(0x100).unwrap();
        let written = extractor
            .write_stream(&mut Cursor::new(&data), stream, &mut out)
            .unwrap();

        assert_eq!(written, 3);
        let expected = [&data[0..204], &data[408..612], &data[612..816]].concat();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_retained_bytes_skip_source() {
        let data = build_stream(&[0x100, 0x101, 0x100], 188);
        let index = index_of(&data, 188, true);
        let extractor = Extractor::new(&index, 188);

        // An empty source proves the retained copy is used.
        let mut out = Vec::new();
        let stream = extractor.stream(0x100).unwrap();
        extractor
            .write_stream(&mut Cursor::new(Vec::new()), stream, &mut out)
            .unwrap();
        assert_eq!(out, [&data[0..188], &data[376..564]].concat());
    }

    #[test]
    fn test_short_read() {
        let data = build_stream(&[0x100, 0x101, 0x100], 188);
        let index = index_of(&data, 188, false);
        let extractor = Extractor::new(&index, 188);

        let truncated = &data[..376 + 100];
        let mut out = Vec::new();
        let stream = extractor.stream(0x100).unwrap();
        let err = extractor
            .write_stream(&mut Cursor::new(truncated), stream, &mut out)
            .unwrap_err();

        assert!(matches!(
            err,
            TsError::ShortRead { offset: 376, expected: 188, actual: 100 }
        ));
        // The first packet was already written.
        assert_eq!(out, &data[0..188]);
    }

    #[test]
    fn test_unknown_pid_creates_nothing() {
        let data = build_stream(&[0x100], 188);
        let index = index_of(&data, 188, false);
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.ts");

        let err = Extractor::new(&index, 188)
            .extract(&mut Cursor::new(&data), 0x200, &output)
            .unwrap_err();
        assert!(matches!(err, TsError::PidNotFound(0x200)));
        assert!(!output.exists());
    }
}
