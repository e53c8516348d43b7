//! Derive macro for arbor-state `Model` trait.
//!
//! This crate provides the `#[derive(Model)]` macro that generates:
//! - `{Name}Node`: Typed node view with a getter and a setter per field
//! - `impl Model for {Name}`: Trait implementation
//!
//! # Usage
//!
//! ```ignore
//! use arbor_state::Model;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Model)]
//! struct Todo {
//!     #[arbor(id)]
//!     id: String,
//!     text: String,
//!     #[arbor(nested)]
//!     author: User,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod field_kind;
mod parse;

/// Derive the `Model` trait for a struct.
///
/// This macro generates:
/// - A node view `{StructName}Node` with typed getter and setter methods
/// - `impl Model for {StructName}`
///
/// The struct must also implement `Serialize` and `Deserialize`. Keys used by
/// the generated accessors follow `#[arbor(rename)]`, falling back to a
/// field-level `#[serde(rename)]`. The two must agree when both are given.
/// Container-level `#[serde(rename_all)]` is not followed.
///
/// # Attributes
///
/// ## Field Attributes
///
/// - `#[arbor(id)]`: The record identifier. Used by `Collection::for_model`.
///   Renaming it with `#[arbor(rename)]` alone is an error, since records
///   would serialize the id under a different key than `ID_KEY`.
/// - `#[arbor(rename = "json_name")]`: Use a different attribute name
/// - `#[arbor(default = "expr")]`: Value returned when the attribute is missing
/// - `#[arbor(skip)]`: No accessors for this field
/// - `#[arbor(nested)]`: The field is itself a `Model`. Its getter returns the
///   nested typed node instead of a deserialized copy.
///
/// # Examples
///
/// ```ignore
/// let todo = Todo::view(store.get_node_at(&path!("todo")).unwrap())?;
///
/// // Read from the snapshot
/// let text = todo.text()?;
/// let author = todo.author()?.name()?;
///
/// // Write through the store; setters return the fresh node
/// let todo = todo.set_text("Updated".to_string())?;
/// ```
#[proc_macro_derive(Model, attributes(arbor))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match codegen::expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
