use crate::error::Result;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Default read-ahead used by the prober and the scanner.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

const CONFIG_PATHS: [&str; 2] = ["./tspid.toml", "./tspid_config.toml"];

/// Scanner and extractor settings.
///
/// [`Config::load`] starts from the defaults, applies `TSPID_*` environment
/// variables and then the first config file found in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Keep each packet's raw bytes in the index so extraction never seeks the source.
    pub retain_packet_bytes: bool,
    /// Stop stride validation after this many packets. `None` validates the whole file.
    pub probe_packet_limit: Option<u64>,
    /// Buffer size for sequential reads of the source.
    pub read_buffer_size: usize,
}

/// On-disk form of `tspid.toml`. Absent keys keep their current value.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    retain_packet_bytes: Option<bool>,
    probe_packet_limit: Option<u64>,
    read_buffer_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retain_packet_bytes: false,
            probe_packet_limit: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Loads configuration from the environment and the working directory.
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Ok(value) = env::var("TSPID_RETAIN_PACKETS") {
            config.apply_env("retain_packet_bytes", &value);
        }
        if let Ok(value) = env::var("TSPID_PROBE_PACKETS") {
            config.apply_env("probe_packet_limit", &value);
        }
        if let Ok(value) = env::var("TSPID_READ_BUFFER") {
            config.apply_env("read_buffer_size", &value);
        }

        for path in &CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                log::debug!("Loading configuration from {}", path);
                if let Err(e) = config.apply_file(&content) {
                    log::warn!("Ignoring {}: {}", path, e);
                }
                break;
            }
        }

        config
    }

    /// Applies the settings of a TOML config file.
    ///
    /// Unknown keys are ignored. On a parse error nothing is applied.
    pub fn apply_file(&mut self, content: &str) -> Result<()> {
        let file: ConfigFile = toml::from_str(content)?;

        if let Some(retain) = file.retain_packet_bytes {
            self.retain_packet_bytes = retain;
        }
        if let Some(limit) = file.probe_packet_limit {
            self.probe_packet_limit = Some(limit).filter(|&l| l > 0);
        }
        match file.read_buffer_size {
            Some(0) => log::warn!("Ignoring read_buffer_size = 0"),
            Some(size) => self.read_buffer_size = size,
            None => {}
        }
        Ok(())
    }

    fn apply_env(&mut self, key: &str, value: &str) {
        let value = value.trim();
        match key {
            "retain_packet_bytes" => match value {
                "1" | "true" | "yes" | "on" => self.retain_packet_bytes = true,
                "0" | "false" | "no" | "off" => self.retain_packet_bytes = false,
                _ => log::warn!("Ignoring invalid {} value '{}'", key, value),
            },
            "probe_packet_limit" => match value.parse::<u64>() {
                Ok(0) => self.probe_packet_limit = None,
                Ok(limit) => self.probe_packet_limit = Some(limit),
                Err(e) => log::warn!("Ignoring invalid {} value '{}': {}", key, value, e),
            },
            "read_buffer_size" => match value.parse::<usize>() {
                Ok(size) if size > 0 => self.read_buffer_size = size,
                _ => log::warn!("Ignoring invalid {} value '{}'", key, value),
            },
            _ => log::debug!("Unknown configuration key '{}'", key),
        }
    }

    /// Enables or disables raw packet retention.
    pub fn with_retain_packet_bytes(mut self, retain: bool) -> Self {
        self.retain_packet_bytes = retain;
        self
    }

    /// Limits stride validation to the first `limit` packets.
    pub fn with_probe_packet_limit(mut self, limit: Option<u64>) -> Self {
        self.probe_packet_limit = limit.filter(|&l| l > 0);
        self
    }

    /// Sets the sequential read buffer size.
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        let template = r#"# tspid configuration

# Keep raw packet bytes in memory so extraction does not re-read the source
retain_packet_bytes = false

# Validate the packet stride over at most this many packets (0 = whole file)
probe_packet_limit = 0

# Read buffer size in bytes
read_buffer_size = 65536
"#;
        fs::write(path, template)?;
    }
    Ok(())
}
