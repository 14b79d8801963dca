use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Top-level application configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Where and how rules are persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub file_name: String,
    pub compression: CompressionConfig,
    /// Create the directory and data file when missing.
    pub create: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionConfig {
    #[default]
    None,
    Lz4,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Upper bound for a single store operation. `0` disables the bound.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Full `EnvFilter` directive; wins over `level` when set.
    pub filter: Option<String>,
    pub console: bool,
    pub format: LogFormatConfig,
    pub directory: Option<PathBuf>,
    pub file_format: LogFormatConfig,
    pub max_files: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatConfig {
    #[default]
    Compact,
    Pretty,
    Json,
}

impl fmt::Display for LogFormatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

// --- Default ---

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            file_name: "fixers.db".to_owned(),
            compression: CompressionConfig::None,
            create: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            console: true,
            format: LogFormatConfig::Compact,
            directory: None,
            file_format: LogFormatConfig::Json,
            max_files: 7,
        }
    }
}
