//! Code generation for Model derive macro.

mod model_node;
mod utils;

use crate::field_kind::FieldKind;
use crate::parse::ModelInput;
use darling::FromDeriveInput;
use proc_macro2::TokenStream;
use syn::DeriveInput;

/// Main entry point for code generation.
pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let parsed = ModelInput::from_derive_input(input)
        .map_err(|e| syn::Error::new_spanned(input, e.to_string()))?;

    if !parsed.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &parsed.generics,
            "#[derive(Model)] does not support generic structs",
        ));
    }

    let mut id_fields = parsed.fields().into_iter().filter(|f| f.id);
    if let (Some(_), Some(second)) = (id_fields.next(), id_fields.next()) {
        return Err(syn::Error::new_spanned(
            second.ident(),
            "only one field can be marked #[arbor(id)]",
        ));
    }

    // Validate field attributes
    for field in parsed.fields() {
        let serde_rename = field.serde_rename()?;
        if let (Some(ours), Some(theirs)) = (&field.rename, &serde_rename) {
            if ours != theirs {
                return Err(syn::Error::new_spanned(
                    field.ident(),
                    format!(
                        "#[arbor(rename = \"{ours}\")] disagrees with #[serde(rename = \"{theirs}\")]"
                    ),
                ));
            }
        }
        if field.id && field.rename.is_some() && serde_rename.is_none() {
            return Err(syn::Error::new_spanned(
                field.ident(),
                "a renamed #[arbor(id)] field needs a matching #[serde(rename)] so records serialize under the same key",
            ));
        }

        if field.skip && (field.id || field.nested || field.rename.is_some()) {
            return Err(syn::Error::new_spanned(
                field.ident(),
                "#[arbor(skip)] cannot be combined with id, nested or rename",
            ));
        }

        if field.nested {
            match FieldKind::from_type(&field.ty, true) {
                FieldKind::Nested => {}
                FieldKind::Option(inner) if inner.is_nested() => {}
                _ => {
                    return Err(syn::Error::new_spanned(
                        &field.ty,
                        "#[arbor(nested)] only supports struct fields and Option of a struct. \
                         The field must be a type that implements Model.",
                    ));
                }
            }
            if field.default.is_some() {
                return Err(syn::Error::new_spanned(
                    field.ident(),
                    "#[arbor(default)] cannot be used on nested fields",
                ));
            }
        }
    }

    model_node::generate(&parsed)
}
