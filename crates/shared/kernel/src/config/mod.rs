mod model;

pub use model::{
    AppConfig, CompressionConfig, LogFormatConfig, LoggingConfig, StorageConfig, StoreConfig,
};

use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub const ENV_PREFIX: &str = "LINKFIX";

/// Custom error type for config loading.
#[linkfix_derive::linkfix_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Layered configuration loader.
///
/// 1. **Defaults**: every field of `T` not set by a later layer keeps its `Default` value.
/// 2. **File**: when `path` is given, the file is required and its format is inferred from
///    the extension (`linkfix.toml`).
/// 3. **Environment**: variables prefixed with `LINKFIX__` override both. Nested keys use
///    double underscores, so `LINKFIX__STORAGE__DATA_DIR` maps to `storage.data_dir`.
///
/// # Errors
/// Returns [`ConfigError::Config`] if the file is missing or unreadable, or if the merged
/// values do not fit `T`.
///
/// # Example
/// ```rust
/// use linkfix_kernel::config::{AppConfig, load_config};
///
/// let cfg: AppConfig = load_config(Some("linkfix.toml")).unwrap_or_default();
/// assert!(cfg.storage.create);
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layered(path.as_ref().map(AsRef::as_ref), None)
}

fn load_layered<T>(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let mut builder = Config::builder();

    if let Some(path) = path {
        info!(path = %path.display(), "Loading config file");
        builder = builder.add_source(File::from(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
