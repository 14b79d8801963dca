use crate::engine::Storage;
use crate::error::{StorageError, StorageErrorExt};
use crate::format::{self, Compression, Partitions};
use private::Sealed;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::info;

pub const DEFAULT_FILE_NAME: &str = "fixers.db";

#[derive(Debug, Clone)]
struct StorageConfig {
    file_name: String,
    compression: Compression,
    create: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { file_name: DEFAULT_FILE_NAME.to_owned(), compression: Compression::None, create: true }
    }
}

#[derive(Debug, Default)]
pub struct NoRoot;
#[derive(Debug)]
pub struct WithRoot(PathBuf);

mod private {
    pub(super) trait Sealed {}
}
impl Sealed for NoRoot {}
impl Sealed for WithRoot {}

#[allow(private_bounds)]
#[derive(Debug, Default)]
pub struct StorageBuilder<S: Sealed = NoRoot> {
    state: S,
    config: StorageConfig,
}

#[allow(private_bounds)]
impl<S: Sealed> StorageBuilder<S> {
    #[must_use = "Sets compression for new commits"]
    pub const fn compression(mut self, compression: Compression) -> Self {
        self.config.compression = compression;
        self
    }

    #[must_use = "Sets whether a missing root and data file should be created"]
    pub const fn create(mut self, enable: bool) -> Self {
        self.config.create = enable;
        self
    }

    #[must_use = "Sets the data file name inside the root directory"]
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.config.file_name = name.into();
        self
    }

    fn transition<N: Sealed>(self, state: N) -> StorageBuilder<N> {
        StorageBuilder { state, config: self.config }
    }
}

impl StorageBuilder<NoRoot> {
    #[must_use = "Creates a new storage builder with default configuration"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the directory holding the data file"]
    pub fn root(self, path: impl Into<PathBuf>) -> StorageBuilder<WithRoot> {
        self.transition(WithRoot(path.into()))
    }
}

impl StorageBuilder<WithRoot> {
    /// Consumes the configuration and opens the data file.
    ///
    /// Boot sequence:
    /// 1. **Bootstrapping**: creates the root directory if `create(true)` was set.
    /// 2. **Canonicalization**: resolves the root to an absolute physical path.
    /// 3. **Self-Healing**: removes temp files orphaned by earlier crashes.
    /// 4. **Loading**: reads and validates the data file into memory.
    ///
    /// A missing data file is treated as empty when `create` is set; the file itself
    /// appears on the first commit.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidName`] if the file name is not a plain file name.
    /// - [`StorageError::NotFound`] if the data file is missing and `create` is false.
    /// - [`StorageError::Corrupted`], [`StorageError::Codec`] or [`StorageError::Decompress`]
    ///   if the existing file cannot be decoded.
    /// - [`StorageError::Io`] for filesystem failures.
    pub async fn connect(self) -> Result<Storage, StorageError> {
        let root = &self.state.0;
        let file_name = plain_file_name(&self.config.file_name)?;

        if self.config.create {
            fs::create_dir_all(root)
                .await
                .context(format!("Failed to bootstrap storage root: {}", root.display()))?;
        }

        let canonical = fs::canonicalize(root)
            .await
            .context(format!("Failed to resolve storage root: {}", root.display()))?;
        let path = canonical.join(file_name);

        crate::maintenance::purge_tmp(&path).await;

        let partitions = load(&path, self.config.create).await?;
        info!(
            path = %path.display(),
            partitions = partitions.len(),
            compression = ?self.config.compression,
            "Storage opened"
        );

        Ok(Storage::from_parts(path, self.config.compression, partitions))
    }
}

fn plain_file_name(name: &str) -> Result<&str, StorageError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(StorageError::InvalidName {
            message: format!("Data file name must be a plain file name, got '{name}'").into(),
            context: None,
        }),
    }
}

async fn load(path: &Path, create: bool) -> Result<Partitions, StorageError> {
    match fs::read(path).await {
        Ok(bytes) => format::decode(&bytes).context(format!("Loading {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if create {
                Ok(Partitions::new())
            } else {
                Err(StorageError::NotFound {
                    message: path.display().to_string().into(),
                    context: Some("create is disabled".into()),
                })
            }
        },
        Err(err) => Err(StorageError::Io {
            source: err,
            context: Some(format!("Failed to read data file: {}", path.display()).into()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_must_be_plain() {
        assert!(plain_file_name("fixers.db").is_ok());
        assert!(plain_file_name("../fixers.db").is_err());
        assert!(plain_file_name("nested/fixers.db").is_err());
        assert!(plain_file_name("/etc/passwd").is_err());
        assert!(plain_file_name("").is_err());
    }
}
