use crate::engine::Storage;
use crate::error::StorageError;
use std::collections::BTreeMap;
use std::fmt;

const MAX_NAME_LEN: usize = 128;
const MAX_KEY_LEN: usize = 512;

/// A validated partition name.
///
/// Names are compared byte-for-byte; `Guild` and `guild` are different partitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionName(String);

impl PartitionName {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PartitionName {
    type Error = StorageError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        validate(&name, "Partition name", MAX_NAME_LEN)?;
        Ok(Self(name))
    }
}

impl TryFrom<&str> for PartitionName {
    type Error = StorageError;

    fn try_from(name: &str) -> Result<Self, Self::Error> {
        Self::try_from(name.to_owned())
    }
}

impl TryFrom<&String> for PartitionName {
    type Error = StorageError;

    fn try_from(name: &String) -> Result<Self, Self::Error> {
        Self::try_from(name.clone())
    }
}

fn validate(value: &str, what: &str, max_len: usize) -> Result<(), StorageError> {
    let problem = if value.is_empty() {
        "must not be empty".to_owned()
    } else if value.len() > max_len {
        format!("exceeds {max_len} bytes")
    } else if value.chars().any(char::is_control) {
        "contains control characters".to_owned()
    } else {
        return Ok(());
    };

    Err(StorageError::InvalidName { message: format!("{what} {problem}").into(), context: None })
}

pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(StorageError::InvalidName {
            message: format!("Key must be 1..={MAX_KEY_LEN} bytes, got {}", key.len()).into(),
            context: None,
        });
    }
    Ok(())
}

/// A view of one partition of a [`Storage`].
///
/// Reads are synchronous and served from the last committed snapshot. Writes commit the
/// whole data file before they resolve.
#[derive(Debug, Clone)]
pub struct Partition {
    storage: Storage,
    name: PartitionName,
}

impl Partition {
    pub(crate) const fn new(storage: Storage, name: PartitionName) -> Self {
        Self { storage, name }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.storage.snapshot().get(self.name.as_str()).and_then(|p| p.get(key)).cloned()
    }

    /// All entries, ordered by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Vec<u8>)> {
        self.storage
            .snapshot()
            .get(self.name.as_str())
            .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.snapshot().get(self.name.as_str()).map_or(0, BTreeMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or overwrites `key`.
    ///
    /// # Errors
    /// [`StorageError::InvalidName`] for an empty or oversized key, or any commit failure.
    pub async fn put(&self, key: impl Into<String>, value: Vec<u8>) -> Result<(), StorageError> {
        let key = key.into();
        validate_key(&key)?;

        let name = self.name.0.clone();
        self.storage
            .commit(move |partitions| {
                partitions.entry(name).or_default().insert(key, value);
                true
            })
            .await?;
        Ok(())
    }

    /// Inserts every entry in a single commit. Later duplicates of a key win.
    ///
    /// Either all entries become visible or none do. Resolves to the number of distinct
    /// keys written.
    ///
    /// # Errors
    /// Fails before touching the disk if any key is invalid.
    pub async fn put_all(&self, entries: Vec<(String, Vec<u8>)>) -> Result<usize, StorageError> {
        for (key, _) in &entries {
            validate_key(key)?;
        }

        let batch: BTreeMap<String, Vec<u8>> = entries.into_iter().collect();
        let count = batch.len();
        if count == 0 {
            return Ok(0);
        }

        let name = self.name.0.clone();
        self.storage
            .commit(move |partitions| {
                partitions.entry(name).or_default().extend(batch);
                true
            })
            .await?;
        Ok(count)
    }

    /// Removes `key`. Resolves to whether it existed; a missing key writes nothing.
    ///
    /// # Errors
    /// Any commit failure.
    pub async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let name = self.name.0.clone();
        let key = key.to_owned();
        self.storage
            .commit(move |partitions| {
                let Some(partition) = partitions.get_mut(&name) else {
                    return false;
                };
                let existed = partition.remove(&key).is_some();
                if partition.is_empty() {
                    partitions.remove(&name);
                }
                existed
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_validated() {
        assert!(PartitionName::try_from("guild_1").is_ok());
        assert!(PartitionName::try_from("Guild 1/ü").is_ok());
        assert!(PartitionName::try_from("").is_err());
        assert!(PartitionName::try_from("a\nb").is_err());
        assert!(PartitionName::try_from("x".repeat(129)).is_err());
    }

    #[test]
    fn names_keep_case() {
        let upper = PartitionName::try_from("Guild").unwrap();
        let lower = PartitionName::try_from("guild").unwrap();
        assert_ne!(upper, lower);
        assert_eq!(upper.to_string(), "Guild");
    }

    #[test]
    fn keys_are_bounded() {
        assert!(validate_key("twitter.com").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(&"k".repeat(513)).is_err());
    }
}
