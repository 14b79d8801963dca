//! Kernel utilities shared across crates.
//! Keep this crate lightweight; it owns the configuration model and its loader.
//!
//! ```rust
//! use linkfix_kernel::config::{AppConfig, load_config};
//!
//! let cfg: AppConfig = load_config(None::<&str>).unwrap();
//! assert_eq!(cfg.storage.file_name, "fixers.db");
//! ```
pub mod config;
