use crate::codec;
use crate::error::{StoreError, StoreErrorExt};
use crate::fixer::Fixer;
use linkfix_kernel::config::{AppConfig, CompressionConfig};
use linkfix_storage::{Compression, Partition, Storage};
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Persistent mapping `namespace → (domain → Fixer)`.
///
/// Each namespace is a partition of the underlying [`Storage`]; it appears on the first
/// `put` and disappears with its last rule. Reads are served from memory and never wait
/// on a writer. Writes to the whole store are linearized, and a write that exceeds the
/// configured timeout still runs to completion in the background, so callers never see
/// half of one.
///
/// Cloning is cheap and every clone shares the same engine.
#[derive(Debug, Clone)]
pub struct RuleStore {
    storage: Storage,
    timeout: Option<Duration>,
}

impl RuleStore {
    #[must_use]
    pub const fn new(storage: Storage) -> Self {
        Self { storage, timeout: None }
    }

    /// Opens the engine described by `config.storage` and applies `config.store`.
    ///
    /// # Errors
    /// [`StoreError::Storage`] when the data file cannot be opened or decoded.
    pub async fn open(config: &AppConfig) -> Result<Self, StoreError> {
        let compression = match config.storage.compression {
            CompressionConfig::None => Compression::None,
            CompressionConfig::Lz4 => Compression::Lz4,
        };

        let storage = Storage::builder()
            .root(&config.storage.data_dir)
            .file_name(config.storage.file_name.as_str())
            .compression(compression)
            .create(config.storage.create)
            .connect()
            .await
            .context("Failed to open rule store")?;

        let store = Self::new(storage);
        info!(path = %store.storage.path().display(), "Rule store ready");

        Ok(match config.store.timeout_ms {
            0 => store,
            ms => store.with_timeout(Duration::from_millis(ms)),
        })
    }

    /// Bounds how long a caller waits for a write.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Stores `fixer` under (`namespace`, `domain`), replacing any previous rule.
    ///
    /// # Errors
    /// [`StoreError::Storage`] for invalid names or I/O failures,
    /// [`StoreError::Timeout`] when the caller stopped waiting.
    pub async fn put(&self, namespace: &str, domain: &str, fixer: &Fixer) -> Result<(), StoreError> {
        let record = codec::encode(fixer).context(format!("encoding rule for '{domain}'"))?;
        let partition = self.partition(namespace)?;

        self.bounded(partition.put(domain, record)).await?;
        debug!(namespace, domain, kind = %fixer.kind(), "Rule stored");
        Ok(())
    }

    /// The rule for (`namespace`, `domain`), or `None` if either is unknown, including
    /// namespaces too long or malformed to ever be written.
    ///
    /// # Errors
    /// [`StoreError::Encoding`] when the stored record is unreadable.
    pub fn get(&self, namespace: &str, domain: &str) -> Result<Option<Fixer>, StoreError> {
        let Some(partition) = self.existing(namespace) else { return Ok(None) };
        partition
            .get(domain)
            .map(|record| codec::decode(&record).context(format!("rule for '{domain}' is unreadable")))
            .transpose()
    }

    /// Removes the rule. Missing rules are not an error.
    ///
    /// # Errors
    /// [`StoreError::Storage`] for I/O failures, [`StoreError::Timeout`] as for `put`.
    pub async fn delete(&self, namespace: &str, domain: &str) -> Result<(), StoreError> {
        let partition = self.partition(namespace)?;
        let existed = self.bounded(partition.delete(domain)).await?;
        debug!(namespace, domain, existed, "Rule deleted");
        Ok(())
    }

    /// Every rule of `namespace`, ordered by domain. Unknown namespaces yield an empty map.
    ///
    /// # Errors
    /// [`StoreError::Encoding`] naming the first unreadable key.
    pub fn list(&self, namespace: &str) -> Result<BTreeMap<String, Fixer>, StoreError> {
        let Some(partition) = self.existing(namespace) else { return Ok(BTreeMap::new()) };
        partition
            .entries()
            .into_iter()
            .map(|(domain, record)| {
                let fixer =
                    codec::decode(&record).context(format!("rule for '{domain}' is unreadable"))?;
                Ok((domain, fixer))
            })
            .collect()
    }

    /// Stores all `rules` in one commit: either every rule becomes visible or none does.
    /// Later entries for the same domain win. Resolves to the number of distinct domains.
    ///
    /// # Errors
    /// As for `put`; nothing is stored on error.
    pub async fn put_many(
        &self,
        namespace: &str,
        rules: Vec<(String, Fixer)>,
    ) -> Result<usize, StoreError> {
        let records = rules
            .into_iter()
            .map(|(domain, fixer)| {
                let record =
                    codec::encode(&fixer).context(format!("encoding rule for '{domain}'"))?;
                Ok((domain, record))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        let partition = self.partition(namespace)?;
        let count = self.bounded(partition.put_all(records)).await?;
        debug!(namespace, count, "Rules stored in batch");
        Ok(count)
    }

    /// Namespaces holding at least one rule.
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.storage.partitions()
    }

    fn partition(&self, namespace: &str) -> Result<Partition, StoreError> {
        self.storage.partition(namespace).context(format!("namespace '{namespace}'"))
    }

    /// Read handle for `namespace`. A name the engine rejects can hold no rules.
    fn existing(&self, namespace: &str) -> Option<Partition> {
        self.storage.partition(namespace).ok()
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, linkfix_storage::StorageError>>,
    {
        let Some(limit) = self.timeout else {
            return Ok(op.await?);
        };

        match tokio::time::timeout(limit, op).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StoreError::Timeout {
                after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                context: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store(temp: &TempDir) -> RuleStore {
        RuleStore::new(Storage::builder().root(temp.path()).connect().await.unwrap())
    }

    #[tokio::test]
    async fn unknown_namespace_reads_empty() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;

        assert_eq!(store.get("guild", "example.com").unwrap(), None);
        assert!(store.list("guild").unwrap().is_empty());
        assert!(store.namespaces().is_empty());
    }

    #[tokio::test]
    async fn corrupt_record_names_its_key() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;
        store.storage().partition("guild").unwrap().put("bad.com", b"{}".to_vec()).await.unwrap();

        let err = store.list("guild").unwrap_err();
        assert!(matches!(err, StoreError::Encoding { .. }));
        assert!(err.to_string().contains("bad.com"));
        assert!(store.get("guild", "bad.com").is_err());
    }

    #[tokio::test]
    async fn empty_namespace_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;

        let result = store.put("", "a.com", &Fixer::Prepend { prefix: "x".to_owned() }).await;
        assert!(matches!(result, Err(StoreError::Storage { .. })));
    }

    #[tokio::test]
    async fn unstorable_namespace_reads_absent() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp).await;
        let long = "n".repeat(200);

        for namespace in [long.as_str(), "bad\u{7}name", ""] {
            assert_eq!(store.get(namespace, "a.com").unwrap(), None);
            assert!(store.list(namespace).unwrap().is_empty());
        }

        let result = store.put(&long, "a.com", &Fixer::Prepend { prefix: "x".to_owned() }).await;
        assert!(matches!(result, Err(StoreError::Storage { .. })));
    }

    #[tokio::test]
    async fn open_uses_config() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_dir = temp.path().join("nested");
        config.storage.compression = CompressionConfig::Lz4;

        let store = RuleStore::open(&config).await.unwrap();
        store.put("guild", "a.com", &Fixer::Prepend { prefix: "x".to_owned() }).await.unwrap();

        assert!(temp.path().join("nested").join("fixers.db").exists());
        assert_eq!(store.timeout, Some(Duration::from_millis(5_000)));
    }
}
