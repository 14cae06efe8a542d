#![allow(unreachable_pub)]

//! # Macros
//!
//! Procedural macros shared by the configuration admin crates.
//!
//! The only macro exported today is [`macro@cadmin_error`], which every crate of
//! the workspace uses to declare its error enum.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! cadmin-derive.workspace = true
//! thiserror.workspace = true
//! ```

mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for declaring the error enum of a crate.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context(..)`
///   to `Result<T, Name>` and to `Result<T, Source>` for every wrapped source type.
/// * **Conversions**: Implements `From<Source>` for variants with a `source` field (or a field
///   marked `#[source]`/`#[from]`), so `?` works on upstream errors.
/// * **Internal Fallback**: Implements `From<&'static str>` and `From<String>` when an
///   `Internal` variant exists.
/// * **Kind**: Adds `kind(&self) -> &'static str` returning the variant name, meant for
///   structured log fields.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants.
/// 2. A `context` field, when present, must be `Option<Cow<'static, str>>`.
/// 3. Variants wrapping a source must also carry a `context` field.
/// 4. A source type may be wrapped by at most one variant, otherwise `From` would be ambiguous.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[cadmin_derive::cadmin_error]
/// pub enum StoreError {
///     #[error("Record not found{}: {message}", format_context(.context))]
///     NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Internal store error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn lookup() -> Result<(), StoreError> {
///     Err("index poisoned".into())
/// }
///
/// assert_eq!(lookup().unwrap_err().kind(), "Internal");
/// ```
#[proc_macro_attribute]
pub fn cadmin_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    error::expand(input).into()
}
