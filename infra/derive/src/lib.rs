#![allow(unreachable_pub)]

//! # Macros
//!
//! Procedural macros used across the linkfix workspace.
//!
//! Only one macro lives here today: [`macro@linkfix_error`], which turns a plain enum
//! into a context-aware error type.

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// Each crate declares its error enums with this attribute.
///
/// # Generated items
///
/// * `#[derive(Debug, thiserror::Error)]`, unless the enum already derives them.
/// * A companion `<Name>Ext` trait providing `.context(..)` on `Result<T, Name>` and on
///   `Result<T, Source>` for every variant that wraps a source error.
/// * `From<Source>` for every variant with a `source` field (or a `#[source]`/`#[from]` field).
/// * `From<&'static str>` and `From<String>` when an `Internal` variant exists.
/// * A hidden associated `format_context` helper, called as `format_context(.context)` inside
///   `#[error(..)]` strings. Several annotated enums may share one module.
///
/// # Requirements
///
/// * Applied to an enum with struct variants only.
/// * Variants carrying a source must also carry `context: Option<Cow<'static, str>>`.
/// * Two variants may not wrap the same source type.
///
/// # Example
///
/// ```rust,ignore
/// use linkfix_derive::linkfix_error;
/// use std::borrow::Cow;
///
/// #[linkfix_error]
/// pub enum StoreError {
///     #[error("Storage failure{}: {source}", format_context(.context))]
///     Storage { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<Vec<u8>, StoreError> {
///     std::fs::read("fixers.db").context("Reading rule file")
/// }
/// ```
#[proc_macro_attribute]
pub fn linkfix_error(args: TokenStream, item: TokenStream) -> TokenStream {
    if !args.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "linkfix_error does not take arguments",
        )
        .to_compile_error()
        .into();
    }

    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
