use super::extractor::{default_output_path, Extractor};
use super::index::StreamIndex;
use super::probe::{ProbeReport, SizeProber};
use super::scanner::{ScanStats, StreamScanner};
use super::types::PidSummary;
use crate::config::Config;
use crate::error::{Result, TsError};
use futures::future::try_join_all;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An open transport stream file and everything derived from it.
///
/// The file handle is held until the source is dropped; the index is built
/// once by [`TSSource::parse`] and only read afterwards.
#[derive(Debug)]
pub struct TSSource {
    path: PathBuf,
    file: File,
    file_size: u64,
    packet_size: usize,
    config: Config,
    index: Arc<StreamIndex>,
    probe: Option<ProbeReport>,
    stats: ScanStats,
}

impl TSSource {
    /// Opens `path` with default settings.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, Config::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| open_error(&path, e))?;
        let metadata = file.metadata().map_err(|e| open_error(&path, e))?;
        if !metadata.is_file() {
            warn!("{} is not a regular file", path.display());
            return Err(TsError::NotReadable {
                path,
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }
        let file_size = metadata.len();
        info!("Opened {} ({} bytes)", path.display(), file_size);

        Ok(Self {
            path,
            file,
            file_size,
            packet_size: 0,
            config,
            index: Arc::new(StreamIndex::new()),
            probe: None,
            stats: ScanStats::default(),
        })
    }

    /// Detects the packet size and builds the PID index.
    ///
    /// On failure the previous state is kept: the packet size stays 0 and the
    /// index stays empty.
    pub fn parse(&mut self) -> Result<&StreamIndex> {
        let probe = SizeProber::new()
            .with_packet_limit(self.config.probe_packet_limit)
            .with_read_buffer_size(self.config.read_buffer_size)
            .probe(&mut self.file, self.file_size)?;

        let (index, stats) = StreamScanner::new(probe.packet_size)
            .with_retained_bytes(self.config.retain_packet_bytes)
            .with_read_buffer_size(self.config.read_buffer_size)
            .scan(&mut self.file, self.file_size)?;

        self.packet_size = probe.packet_size;
        self.index = Arc::new(index);
        self.probe = Some(probe);
        self.stats = stats;
        Ok(self.index.as_ref())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Detected packet size, or 0 before a successful [`TSSource::parse`].
    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    pub fn index(&self) -> &StreamIndex {
        &self.index
    }

    pub fn probe_report(&self) -> Option<&ProbeReport> {
        self.probe.as_ref()
    }

    pub fn scan_stats(&self) -> ScanStats {
        self.stats
    }

    /// PIDs and packet counts in ascending PID order.
    pub fn list_pids(&self) -> Vec<PidSummary> {
        self.index.list()
    }

    /// Writes every packet of `pid` to `output`, or to
    /// [`default_output_path`] when `output` is `None`.
    pub fn extract_pid(&mut self, pid: u16, output: Option<&Path>) -> Result<PathBuf> {
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(&self.path, pid));
        let extractor = Extractor::new(&self.index, self.packet_size);
        extractor.stream(pid)?;
        self.check_output(&output)?;

        extractor.extract(&mut self.file, pid, &output)?;
        Ok(output)
    }

    /// Extracts several PIDs concurrently, one blocking task per PID.
    ///
    /// Each task opens its own read handle onto the source. Every PID is
    /// checked before any output is created. Files go to `output_dir` when
    /// given, otherwise next to the source, and are returned in request order.
    pub async fn extract_pids(
        &self,
        pids: &[u16],
        output_dir: Option<&Path>,
    ) -> Result<Vec<PathBuf>> {
        let extractor = Extractor::new(&self.index, self.packet_size);
        for &pid in pids {
            extractor.stream(pid)?;
        }

        let outputs = pids
            .iter()
            .map(|&pid| {
                let output = default_output_path(&self.path, pid);
                let output = match output_dir {
                    Some(dir) => dir.join(output.file_name().unwrap_or_default()),
                    None => output,
                };
                self.check_output(&output)?;
                Ok((pid, output))
            })
            .collect::<Result<Vec<_>>>()?;

        let tasks = outputs.into_iter().map(|(pid, output)| {
            let index = Arc::clone(&self.index);
            let source = self.path.clone();
            let packet_size = self.packet_size;

            tokio::task::spawn_blocking(move || -> Result<PathBuf> {
                let mut file = File::open(&source).map_err(|e| open_error(&source, e))?;
                Extractor::new(&index, packet_size).extract(&mut file, pid, &output)?;
                Ok(output)
            })
        });

        let results = try_join_all(tasks).await?;
        debug!("Finished {} parallel extractions", results.len());
        results.into_iter().collect()
    }

    /// Fails when `output` is the source file itself.
    fn check_output(&self, output: &Path) -> Result<()> {
        let same = match (fs::canonicalize(&self.path), fs::canonicalize(output)) {
            (Ok(source), Ok(output)) => source == output,
            _ => false,
        };
        if same {
            warn!("Refusing to overwrite source {}", self.path.display());
            return Err(TsError::OutputIsSource(output.to_path_buf()));
        }
        Ok(())
    }
}

fn open_error(path: &Path, e: io::Error) -> TsError {
    if e.kind() == io::ErrorKind::NotFound {
        warn!("{} does not exist", path.display());
        TsError::FileNotFound(path.to_path_buf())
    } else {
        warn!("Cannot read {}: {}", path.display(), e);
        TsError::NotReadable {
            path: path.to_path_buf(),
            source: e,
        }
    }
}
