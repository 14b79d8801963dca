//! # Link fixing rules
//!
//! Operators register per-namespace rules that rewrite links to a given domain, and
//! incoming text is checked against them.
//!
//! ## Architecture
//!
//! 1.  **[`Fixer`]**: the closed set of URL transformations.
//! 2.  **[`url`]**: finds URLs in text and derives the domain used as the lookup key.
//! 3.  **[`RuleStore`]**: persistent `namespace → (domain → Fixer)` mapping on top of
//!     `linkfix-storage`, with each fixer stored as a tagged [`codec`] record.
//! 4.  **[`LinkFixer`]**: the operations a chat adapter or CLI drives.
//! 5.  **[`CommandTable`]**: named administrative commands with their response texts.
//!
//! ## Example
//!
//! ```rust
//! use linkfix_core::{LinkFixer, RuleRequest, RuleStore};
//! use linkfix_storage::Storage;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let tmp = tempfile::tempdir()?;
//! let storage = Storage::builder().root(tmp.path()).connect().await?;
//! let fixer = LinkFixer::new(RuleStore::new(storage));
//!
//! let request = RuleRequest::Replace { old: "twitter.com".into(), new: "fxtwitter.com".into() };
//! fixer.register_rule("guild_1", "twitter.com", request).await?;
//!
//! let link = fixer.fix_message("guild_1", "see https://twitter.com/u/status/1")?.unwrap();
//! assert_eq!(link.fixed, "https://fxtwitter.com/u/status/1");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod commands;
mod error;
pub mod fixer;
pub mod import;
mod service;
mod store;
pub mod url;

pub use crate::commands::{CommandSpec, CommandTable, OptionSpec, Options};
pub use crate::error::{FixerError, FixerErrorExt, StoreError, StoreErrorExt};
pub use crate::fixer::{Fixer, FixerKind};
pub use crate::service::{FixedLink, LinkFixer, Rule, RuleRequest};
pub use crate::store::RuleStore;
