#![doc(html_root_url = "https://docs.rs/tspid/0.1.0")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::missing_crate_level_docs)]

//! # tspid - MPEG Transport Stream PID scanner
//!
//! `tspid` indexes an MPEG Transport Stream file by Packet Identifier (PID)
//! and re-emits the packets of a single PID, byte-for-byte and in their
//! original order, into a new file.
//!
//! ## Features
//!
//! - Packet size detection from the repeating 0x47 sync byte; 188, 204,
//!   208 or any other uniform stride, with a truncated final packet tolerated
//! - Fixed 4-byte header decoding (TEI, PUSI, priority, PID, TSC, AFC, CC)
//! - Single-pass indexing with silent resynchronization after corrupt bytes
//! - Offset-only index by default, optional in-memory packet retention
//! - Sequential or parallel per-PID extraction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tspid::format::ts::TSSource;
//!
//! # fn main() -> tspid::Result<()> {
//! let mut source = TSSource::open("capture.ts")?;
//! source.parse()?;
//! println!("packet size: {}", source.packet_size());
//!
//! for entry in source.list_pids() {
//!     println!("0x{:04X} [{:4}] - {}", entry.pid, entry.pid, entry.packet_count);
//! }
//!
//! source.extract_pid(0x0011, Some(std::path::Path::new("sdt.ts")))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `format::ts`: header decoding, stride detection, scanning, the PID
//!   index and extraction
//! - `config`: scanner settings from the environment and `tspid.toml`
//! - `error`: the crate error type and `Result` alias

/// Scanner and extractor configuration
pub mod config;

/// Error types and utilities
pub mod error;

/// Container format implementations
pub mod format;

pub use config::Config;
pub use error::{Result, TsError};
