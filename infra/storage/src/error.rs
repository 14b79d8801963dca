use std::borrow::Cow;

/// A specialized [`StorageError`] enum of this crate.
#[linkfix_derive::linkfix_error]
pub enum StorageError {
    #[error("Data file not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid name{}: {message}", format_context(.context))]
    InvalidName { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The data file exists but its header or body cannot be trusted.
    #[error("Corrupted data file{}: {message}", format_context(.context))]
    Corrupted { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Hardware I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Codec failure{}: {source}", format_context(.context))]
    Codec { source: postcard::Error, context: Option<Cow<'static, str>> },

    #[error("Decompression failure{}: {source}", format_context(.context))]
    Decompress { source: lz4_flex::block::DecompressError, context: Option<Cow<'static, str>> },

    #[error("Internal storage error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
