use linkfix_storage::StorageError;
use std::borrow::Cow;

/// Failures of the persistent rule store.
#[linkfix_derive::linkfix_error]
pub enum StoreError {
    #[error("Storage engine error{}: {source}", format_context(.context))]
    Storage { source: StorageError, context: Option<Cow<'static, str>> },

    /// A stored record could not be encoded or decoded. The context names the key.
    #[error("Fixer encoding error{}: {source}", format_context(.context))]
    Encoding { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Store operation timed out after {after_ms} ms{}", format_context(.context))]
    Timeout { after_ms: u64, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Errors surfaced to rule administration and message fixing.
#[linkfix_derive::linkfix_error]
pub enum FixerError {
    /// A required field is empty or a request is malformed. Nothing was stored.
    #[error("Invalid rule{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid regular expression{}: {source}", format_context(.context))]
    Pattern { source: regex::Error, context: Option<Cow<'static, str>> },

    /// A bulk import line was rejected; the whole batch was discarded.
    #[error("Import failed at line {line}{}: {message}", format_context(.context))]
    Import { line: usize, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Rule store error{}: {source}", format_context(.context))]
    Store { source: StoreError, context: Option<Cow<'static, str>> },
}

impl FixerError {
    pub(crate) fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation { message: message.into(), context: None }
    }
}
