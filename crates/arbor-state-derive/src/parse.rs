//! Parsing logic for Model derive macro.

use darling::{ast, FromDeriveInput, FromField};
use syn::{Attribute, Generics, Ident, LitStr, Type, Visibility};

/// Parsed struct-level options.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(arbor), supports(struct_named))]
pub struct ModelInput {
    /// The struct identifier.
    pub ident: Ident,

    /// The struct visibility.
    pub vis: Visibility,

    /// Generic parameters.
    pub generics: Generics,

    /// Struct data (fields).
    pub data: ast::Data<(), FieldInput>,
}

impl ModelInput {
    /// Get the fields as a vector.
    pub fn fields(&self) -> Vec<&FieldInput> {
        self.data
            .as_ref()
            .take_struct()
            .map(|s| s.fields.to_vec())
            .unwrap_or_default()
    }

    /// The field marked `#[arbor(id)]`, if any.
    pub fn id_field(&self) -> Option<&FieldInput> {
        self.fields().into_iter().find(|f| f.id)
    }
}

/// Parsed field-level options.
#[derive(Debug, FromField)]
#[darling(attributes(arbor), forward_attrs(serde))]
pub struct FieldInput {
    /// Field identifier.
    pub ident: Option<Ident>,

    /// Field type.
    pub ty: Type,

    /// Rename the attribute.
    #[darling(default)]
    pub rename: Option<String>,

    /// Default value expression if the attribute is missing.
    #[darling(default)]
    pub default: Option<String>,

    /// No accessors for this field.
    #[darling(default)]
    pub skip: bool,

    /// Treat as nested Model type.
    #[darling(default)]
    pub nested: bool,

    /// Record identifier.
    #[darling(default)]
    pub id: bool,

    /// Forwarded `#[serde(...)]` attributes.
    pub attrs: Vec<Attribute>,
}

impl FieldInput {
    /// Get the field identifier. Only named structs are accepted, so every
    /// field has one.
    pub fn ident(&self) -> &Ident {
        self.ident.as_ref().expect("named field required")
    }

    /// Get the attribute name for this field: `#[arbor(rename)]`, then
    /// `#[serde(rename)]`, then the identifier.
    pub fn key(&self) -> String {
        self.rename
            .clone()
            .or_else(|| self.serde_rename().ok().flatten())
            .unwrap_or_else(|| self.ident().to_string())
    }

    /// The name given by `#[serde(rename = "...")]`, if any.
    ///
    /// The `rename(serialize = "...", deserialize = "...")` form only
    /// counts when both directions agree.
    pub fn serde_rename(&self) -> syn::Result<Option<String>> {
        let mut found = None;
        for attr in self.attrs.iter().filter(|a| a.path().is_ident("serde")) {
            attr.parse_nested_meta(|meta| {
                if !meta.path.is_ident("rename") {
                    return skip_meta(&meta);
                }
                if meta.input.peek(syn::Token![=]) {
                    let name: LitStr = meta.value()?.parse()?;
                    found = Some(name.value());
                    return Ok(());
                }
                let (mut ser, mut de) = (None, None);
                meta.parse_nested_meta(|inner| {
                    let name: LitStr = inner.value()?.parse()?;
                    if inner.path.is_ident("serialize") {
                        ser = Some(name.value());
                    } else if inner.path.is_ident("deserialize") {
                        de = Some(name.value());
                    }
                    Ok(())
                })?;
                if ser.is_some() && ser == de {
                    found = ser;
                }
                Ok(())
            })?;
        }
        Ok(found)
    }

    /// Check if this field gets accessors.
    pub fn is_included(&self) -> bool {
        !self.skip
    }
}

/// Consume a serde option the derive does not care about.
fn skip_meta(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}
