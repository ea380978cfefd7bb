//! # MPEG Transport Stream (TS) scanning and PID extraction
//!
//! This module indexes a transport stream file by Packet Identifier and
//! copies single PIDs back out byte-for-byte:
//!
//! - **Header decoding**: the fixed 4-byte packet header ([`decode_header`])
//! - **Stride detection**: inferring the packet size from repeating sync bytes ([`SizeProber`])
//! - **Scanning**: one linear pass that groups packets by PID, resynchronizing on corrupt input ([`StreamScanner`])
//! - **Indexing**: ordered per-PID packet lists ([`StreamIndex`])
//! - **Extraction**: order-preserving re-emission of one PID ([`Extractor`])
//!
//! Payload content (PES, PSI/SI tables, PCR) is never decoded.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tspid::format::ts::TSSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut source = TSSource::open("capture.ts")?;
//! source.parse()?;
//!
//! for entry in source.list_pids() {
//!     println!("0x{:04X}: {} packets", entry.pid, entry.packet_count);
//! }
//!
//! // Writes Pid_0x0100_capture.ts next to the source
//! let written = source.extract_pid(0x0100, None)?;
//! println!("wrote {}", written.display());
//! # Ok(())
//! # }
//! ```

/// Order-preserving PID extraction
pub mod extractor;

/// PID → packet list index
pub mod index;

/// Fixed header decoding
pub mod parser;

/// Packet size detection
pub mod probe;

/// Fixed-stride scanning with resynchronization
pub mod scanner;

/// Open file façade tying the pieces together
pub mod source;

/// Core TS types and constants
pub mod types;


// Re-export commonly used types and constants
pub use extractor::{default_output_path, Extractor};
pub use index::StreamIndex;
pub use parser::{decode_header, decode_packet_header};
pub use probe::{ProbeReport, SizeProber};
pub use scanner::{ScanStats, StreamScanner};
pub use source::TSSource;
pub use types::{
    Packet,
    PidStream,
    PidSummary,
    TSHeader,
    PID_NULL,
    SYNC_BYTE,
    TS_HEADER_SIZE,
    TS_PACKET_SIZE,
};
