//! A small embedded key-value engine backed by a single durable file.
//!
//! Data is grouped into named partitions, each a map from string keys to opaque bytes.
//! The whole state is held in memory and every write rewrites the file atomically.
//!
//! # Core Features
//!
//! - **Atomic Writes**: unique temp write + `fsync` + `rename`, so a crash never leaves a torn file.
//! - **Snapshot Reads**: readers see the last committed state and never block on disk I/O.
//! - **Batch Commits**: [`Partition::put_all`] makes many entries visible at once or not at all.
//! - **Transparent Compression**: optional LZ4 body compression, flagged in the file header.
//! - **Self-Healing**: orphaned temp files are removed when the engine opens.
//!
//! # Examples
//!
//! ```rust
//! use linkfix_storage::{Storage, StorageError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), StorageError> {
//!     # let tmp = tempfile::tempdir().unwrap();
//!     let storage = Storage::builder().root(tmp.path()).file_name("rules.db").connect().await?;
//!
//!     let a = storage.partition("guild_a")?;
//!     let b = storage.partition("guild_b")?;
//!     a.put("twitter.com", b"one".to_vec()).await?;
//!
//!     assert!(b.get("twitter.com").is_none());
//!     assert!(a.delete("twitter.com").await?);
//!     assert!(!a.delete("twitter.com").await?);
//!     Ok(())
//! }
//! ```

mod builder;
mod engine;
mod error;
mod format;
mod maintenance;
mod partition;

pub use builder::{DEFAULT_FILE_NAME, StorageBuilder};
pub use engine::Storage;
pub use error::{StorageError, StorageErrorExt};
pub use format::Compression;
pub use partition::{Partition, PartitionName};
