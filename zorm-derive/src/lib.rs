//! Derive macros for zorm
//!
//! Provides `#[derive(Record)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive `zorm::Record` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use zorm::Record;
///
/// #[derive(Debug, Default, Record)]
/// struct UserInfo {
///     #[sql = "uid,auto_increment"]
///     pub uid: i64,
///     #[sql("username")]
///     pub username: String,
///     pub departname: String,
///     retries: u32,
/// }
/// ```
///
/// # Attributes
///
/// - `#[sql = "column,directives"]` or `#[sql("column,directives")]` - the
///   first comma segment names the column (the field name when empty); an
///   `auto_increment` directive keeps the field out of INSERT / REPLACE
///
/// Only fields visible outside the struct (`pub`, `pub(crate)`, ...) are
/// mapped. Private fields are ignored by every statement and need `Default`.
#[proc_macro_derive(Record, attributes(sql))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
