//! Model node code generation.
//!
//! Generates a typed node view that reads fields from the node's snapshot
//! and writes them through the store.

use super::utils::extract_inner_type;
use crate::field_kind::FieldKind;
use crate::parse::{FieldInput, ModelInput};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Generate the `{Name}Node` struct and `Model` trait implementation.
pub fn generate(input: &ModelInput) -> syn::Result<TokenStream> {
    let struct_name = &input.ident;
    let node_name = format_ident!("{}Node", struct_name);
    let vis = &input.vis;

    let fields: Vec<_> = input
        .fields()
        .into_iter()
        .filter(|f| f.is_included())
        .collect();

    let id_key = match input.id_field() {
        Some(field) => {
            let key = field.key();
            quote! { ::core::option::Option::Some(#key) }
        }
        None => quote! { ::core::option::Option::None },
    };

    let mut accessors = TokenStream::new();
    for field in &fields {
        accessors.extend(generate_read_method(field)?);
        accessors.extend(generate_write_method(field));
    }

    let doc = format!("Typed node view over a stored [`{}`].", struct_name);

    Ok(quote! {
        #[doc = #doc]
        #[derive(Clone, Debug)]
        #vis struct #node_name {
            node: ::arbor_state::Node,
        }

        impl #node_name {
            /// The underlying node.
            pub fn as_node(&self) -> &::arbor_state::Node {
                &self.node
            }

            pub fn into_node(self) -> ::arbor_state::Node {
                self.node
            }

            /// Deserialize the whole snapshot.
            pub fn get(&self) -> ::arbor_state::ArborResult<#struct_name> {
                <#struct_name as ::arbor_state::Model>::from_value(self.node.value())
            }

            #accessors
        }

        impl ::arbor_state::Lifecycle for #node_name {
            fn node(&self) -> &::arbor_state::Node {
                &self.node
            }
        }

        impl ::arbor_state::Model for #struct_name {
            type Node = #node_name;

            const ID_KEY: ::core::option::Option<&'static str> = #id_key;

            fn view(node: ::arbor_state::Node) -> ::arbor_state::ArborResult<#node_name> {
                ::arbor_state::model::expect_object(&node)?;
                Ok(#node_name { node })
            }
        }
    })
}

/// Generate a read method for a single field.
fn generate_read_method(field: &FieldInput) -> syn::Result<TokenStream> {
    let field_name = field.ident();
    let field_ty = &field.ty;
    let key = field.key();
    let kind = FieldKind::from_type(field_ty, field.nested);

    let method = match &kind {
        FieldKind::Nested => quote! {
            /// Typed node for the nested field.
            pub fn #field_name(&self) -> ::arbor_state::ArborResult<<#field_ty as ::arbor_state::Model>::Node> {
                ::arbor_state::model::nested_field::<#field_ty>(&self.node, #key)
            }
        },
        FieldKind::Option(inner) if inner.is_nested() => {
            let inner_ty = extract_inner_type(field_ty);
            quote! {
                /// Typed node for the optional nested field.
                pub fn #field_name(
                    &self,
                ) -> ::arbor_state::ArborResult<::core::option::Option<<#inner_ty as ::arbor_state::Model>::Node>> {
                    ::arbor_state::model::nested_optional_field::<#inner_ty>(&self.node, #key)
                }
            }
        }
        _ => match &field.default {
            Some(default) => {
                let expr: syn::Expr = syn::parse_str(default).map_err(|e| {
                    syn::Error::new_spanned(field_ty, format!("invalid default expression: {}", e))
                })?;
                quote! {
                    /// Read the field value.
                    pub fn #field_name(&self) -> ::arbor_state::ArborResult<#field_ty> {
                        match ::arbor_state::model::read_optional_field::<#field_ty>(&self.node, #key)? {
                            ::core::option::Option::Some(value) => Ok(value),
                            ::core::option::Option::None => Ok(#expr),
                        }
                    }
                }
            }
            None => quote! {
                /// Read the field value.
                pub fn #field_name(&self) -> ::arbor_state::ArborResult<#field_ty> {
                    ::arbor_state::model::read_field::<#field_ty>(&self.node, #key)
                }
            },
        },
    };

    Ok(method)
}

/// Generate the setter, plus a delete method for `Option` fields.
fn generate_write_method(field: &FieldInput) -> TokenStream {
    let field_name = field.ident();
    let field_ty = &field.ty;
    let key = field.key();
    let setter_name = format_ident!("set_{}", field_name);

    let setter = quote! {
        /// Write the field and return the fresh node.
        pub fn #setter_name(&self, value: #field_ty) -> ::arbor_state::ArborResult<Self> {
            let node = ::arbor_state::model::write_field(&self.node, #key, &value)?;
            Ok(Self { node })
        }
    };

    if !matches!(FieldKind::from_type(field_ty, false), FieldKind::Option(_)) {
        return setter;
    }

    let delete_name = format_ident!("delete_{}", field_name);
    quote! {
        #setter

        /// Remove the field and return the fresh node.
        pub fn #delete_name(&self) -> ::arbor_state::ArborResult<Self> {
            let node = ::arbor_state::model::delete_field(&self.node, #key)?;
            Ok(Self { node })
        }
    }
}
