//! Core storage engine: a single durable data file mirrored by an in-memory snapshot.
//!
//! Readers only ever see a fully committed snapshot. Writers are serialized, rewrite the
//! whole file through an atomic swap and publish the new snapshot once the file is on disk.

use crate::builder::StorageBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::format::{self, Compression, Partitions};
use crate::maintenance;
use crate::partition::{Partition, PartitionName};
use parking_lot::RwLock;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// The internal shared state of a [`Storage`] instance.
#[derive(Debug)]
pub struct StorageInner {
    /// The canonicalized data file.
    pub(crate) path: PathBuf,
    /// Compression applied to new commits. Existing files carry their own flag.
    pub(crate) compression: Compression,
    /// A unique counter used to generate temporary file names.
    pub(crate) tmp_counter: AtomicU64,
    /// Last committed state.
    snapshot: RwLock<Arc<Partitions>>,
    /// Serializes commits.
    writer: Mutex<()>,
}

/// A thread-safe handle to the storage engine.
///
/// All data lives in one file split into named partitions, each a map from string keys
/// to opaque byte values. The handle is reference-counted and cheap to clone across tasks.
///
/// # Guarantees
///
/// * **Atomic commits**: every write produces a complete new file (temp write, `fsync`,
///   `rename`); a crash leaves either the old or the new file.
/// * **Snapshot reads**: readers never observe a partially applied commit.
/// * **Linearized writes**: commits run one at a time, in lock acquisition order.
/// * **Cancellation safety**: commits run on a detached task, so dropping the caller's
///   future never interrupts a write half-way.
///
/// # Example
///
/// ```rust
/// use linkfix_storage::{Compression, Storage, StorageError};
///
/// #[tokio::main]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     let storage = Storage::builder()
///         .root(tmp.path())
///         .compression(Compression::Lz4)
///         .connect()
///         .await?;
///
///     let guild = storage.partition("guild_42")?;
///     guild.put("twitter.com", b"payload".to_vec()).await?;
///     assert_eq!(guild.get("twitter.com").as_deref(), Some(&b"payload"[..]));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Storage {
    pub(crate) inner: Arc<StorageInner>,
}

impl Deref for Storage {
    type Target = StorageInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Storage {
    #[must_use = "The storage engine is not initialized until you call .connect()"]
    pub fn builder() -> StorageBuilder {
        StorageBuilder::new()
    }

    pub(crate) fn from_parts(path: PathBuf, compression: Compression, partitions: Partitions) -> Self {
        Self {
            inner: Arc::new(StorageInner {
                path,
                compression,
                tmp_counter: AtomicU64::new(1),
                snapshot: RwLock::new(Arc::new(partitions)),
                writer: Mutex::new(()),
            }),
        }
    }

    /// Returns a view of one partition.
    ///
    /// Partitions spring into existence on their first write and disappear when their
    /// last key is deleted; asking for a view never touches the disk.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidName`] if the name is empty, longer than 128 bytes
    /// or contains control characters.
    pub fn partition<N>(&self, name: N) -> Result<Partition, StorageError>
    where
        N: TryInto<PartitionName, Error = StorageError>,
    {
        Ok(Partition::new(self.clone(), name.try_into()?))
    }

    /// Names of all partitions holding at least one key.
    #[must_use]
    pub fn partitions(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// Physical location of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub(crate) fn snapshot(&self) -> Arc<Partitions> {
        Arc::clone(&self.inner.snapshot.read())
    }

    /// Applies `mutation` to a copy of the current state and commits it.
    ///
    /// The mutation returns `false` when it changed nothing; no file is written then.
    /// Resolves to whether a commit happened.
    pub(crate) async fn commit<F>(&self, mutation: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&mut Partitions) -> bool + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.apply(mutation).await }).await.map_err(|e| {
            StorageError::Internal {
                message: e.to_string().into(),
                context: Some("Commit task did not finish".into()),
            }
        })?
    }
}

impl StorageInner {
    async fn apply<F>(&self, mutation: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&mut Partitions) -> bool,
    {
        let _writer = self.writer.lock().await;

        let mut next = Partitions::clone(&self.snapshot.read());
        if !mutation(&mut next) {
            return Ok(false);
        }

        let bytes = format::encode(&next, self.compression)?;
        self.persist(&bytes).await?;
        *self.snapshot.write() = Arc::new(next);

        Ok(true)
    }

    /// Writes `data` over the data file using an atomic swap:
    /// 1. Data is written to a unique temporary file next to the target.
    /// 2. The temporary file is synced to hardware.
    /// 3. The temporary file is renamed over the target and the directory is synced.
    ///
    /// On platforms without atomic replace of an existing target, falls back to
    /// remove-then-rename.
    async fn persist(&self, data: &[u8]) -> Result<(), StorageError> {
        let temp = unique_tmp_path(&self.path, &self.tmp_counter);

        if let Err(err) = write_synced(&temp, data).await {
            discard(&temp).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&temp, &self.path).await {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(&self.path)
                    .await
                    .context(format!("Failed to replace data file: {}", self.path.display()))?;
                fs::rename(&temp, &self.path).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    self.path.display()
                ))?;
            } else {
                discard(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), self.path.display())
                            .into(),
                    ),
                });
            }
        }

        if let Some(parent) = self.path.parent() {
            sync_dir(parent).await;
        }

        debug!(path = %self.path.display(), bytes = data.len(), "Data file committed atomically");
        Ok(())
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(path)
        .await
        .context(format!("Temp creation failed: {}", path.display()))?;
    file.write_all(data).await.context("Write failed")?;
    file.sync_all().await.context("Hardware sync failed")?;
    Ok(())
}

async fn discard(temp: &Path) {
    if let Err(err) = fs::remove_file(temp).await {
        warn!(path = %temp.display(), error = %err, "Failed to remove temp file");
    }
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    let file_name = target.file_name().and_then(|s| s.to_str()).unwrap_or("storage");
    let tmp_name = format!("{file_name}{}{}.{counter}", maintenance::TMP_MARKER, std::process::id());
    target.with_file_name(tmp_name)
}
