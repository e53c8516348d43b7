//! Field type analysis for code generation.

use syn::{GenericArgument, PathArguments, Type, TypePath};

/// The kind of a field, determining which accessors to generate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Any type read and written as a serialized value.
    Plain,

    /// An Option<T> type
    Option(Box<FieldKind>),

    /// A Vec<T>, BTreeMap<K, V>, HashMap<K, V> or IndexMap<K, V> type
    Container,

    /// A nested Model type
    Nested,
}

impl FieldKind {
    /// Analyze a type and determine its kind.
    ///
    /// The `is_nested_attr` flag marks the **leaf type** as nested, looking
    /// through one `Option` layer.
    ///
    /// Examples:
    /// - `Option<Profile>` with `nested=true` → `Option(Nested)`
    /// - `Vec<Profile>` with `nested=true` → `Container`
    /// - `Profile` with `nested=true` → `Nested`
    pub fn from_type(ty: &Type, is_nested_attr: bool) -> Self {
        match ty {
            Type::Path(type_path) => Self::from_type_path(type_path, is_nested_attr),
            _ => FieldKind::Plain,
        }
    }

    fn from_type_path(type_path: &TypePath, is_nested_attr: bool) -> Self {
        let Some(segment) = type_path.path.segments.last() else {
            return FieldKind::Plain;
        };

        match segment.ident.to_string().as_str() {
            "Option" => match extract_single_generic_arg(&segment.arguments) {
                Some(inner) => FieldKind::Option(Box::new(Self::from_type(inner, is_nested_attr))),
                None => FieldKind::Plain,
            },
            "Vec" | "BTreeMap" | "HashMap" | "IndexMap" => FieldKind::Container,
            // Common primitive types
            "String" | "str" | "bool" | "char" | "i8" | "i16" | "i32" | "i64" | "i128"
            | "isize" | "u8" | "u16" | "u32" | "u64" | "u128" | "usize" | "f32" | "f64" => {
                FieldKind::Plain
            }
            _ if is_nested_attr => FieldKind::Nested,
            _ => FieldKind::Plain,
        }
    }

    /// Check if this is a nested type.
    pub fn is_nested(&self) -> bool {
        matches!(self, FieldKind::Nested)
    }
}

/// Extract a single generic type argument from path arguments.
fn extract_single_generic_arg(args: &PathArguments) -> Option<&Type> {
    match args {
        PathArguments::AngleBracketed(ab) if ab.args.len() == 1 => match ab.args.first()? {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        },
        _ => None,
    }
}
