//! Derive macros for spanorm
//!
//! Provides `#[derive(Model)]` and `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod fields;
mod from_row;
mod model;

/// Derive `FromRow` for a struct with named fields.
///
/// Columns absent from the row (for example after a narrowed select) leave
/// the field at `Default::default()`.
///
/// # Example
///
/// ```ignore
/// use spanorm::FromRow;
///
/// #[derive(FromRow)]
/// #[orm(rename_all = "PascalCase")]
/// struct UserName {
///     user_id: String,
///     name: String,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(rename_all = "...")]` - Column naming rule for every field
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Never read; always `Default::default()`
#[proc_macro_derive(FromRow, attributes(orm))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derive `Model` (and `FromRow`) for a struct.
///
/// # Example
///
/// ```ignore
/// use spanorm::Model;
///
/// #[derive(Model)]
/// #[orm(table = "users", rename_all = "PascalCase")]
/// struct User {
///     #[orm(id)]
///     user_id: String,
///     name: String,
///     age: i64,
/// }
/// ```
///
/// # Generated
///
/// - `Model::TABLE` / `Model::COLUMNS`
/// - `params()`: every mapped field, in declaration order
/// - `primary_keys()` / `store_key()`: the `#[orm(id)]` fields, in declaration order
/// - a `FromRow` impl (do not also derive `FromRow`)
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (required)
/// - `#[orm(rename_all = "...")]` - `snake_case`, `camelCase`, `PascalCase`,
///   `SCREAMING_SNAKE_CASE` or `kebab-case`
/// - `#[orm(id)]` - Mark field as (part of) the primary key
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(skip)]` - Field is not a column
#[proc_macro_derive(Model, attributes(orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    model::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
