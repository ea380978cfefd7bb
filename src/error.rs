use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while opening, scanning or extracting a transport stream.
#[derive(Error, Debug)]
pub enum TsError {
    /// Generic I/O failure outside of open/short-read handling.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The source file does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The source file exists but could not be opened or sized.
    #[error("file not readable: {}: {source}", path.display())]
    NotReadable {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No sync byte was found, or the stride between sync bytes is not uniform.
    #[error("ambiguous packet size: {0}")]
    AmbiguousPacketSize(String),

    /// The requested PID was never observed during the scan.
    #[error("no pid 0x{0:04X} [{0}] in the stream")]
    PidNotFound(u16),

    /// A previously indexed packet could not be read back in full.
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Offset of the packet's sync byte.
        offset: u64,
        /// Detected packet size.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The extraction output resolves to the source file itself.
    #[error("output {} would overwrite the source", .0.display())]
    OutputIsSource(PathBuf),

    /// A config file is not valid TOML or holds a value of the wrong type.
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    /// A background extraction task panicked or was cancelled.
    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TsError>;
