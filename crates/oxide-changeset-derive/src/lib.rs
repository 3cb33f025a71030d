//! Derive macros for changeset records.
//!
//! This crate provides the `#[derive(Record)]` macro, which builds the explicit
//! field table plus the dynamic getters and setters that `oxide-changeset`
//! uses to cast input into a struct and load adapter rows back into it.

use proc_macro::TokenStream;
use proc_macro2::{Literal, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Ident, Lit,
    Meta, PathArguments, Type,
};

/// Derives `Record` and `Destination` for a struct with named fields.
///
/// # Field Attributes
///
/// - `#[field(name = "field_name")]` - Name used in params, changes and rows
///   (optional, defaults to the Rust field name)
/// - `#[field(primary_key)]` - Marks the field as primary key
/// - `#[field(skip)]` - Leaves the field out of the field table entirely
///
/// # Field Types
///
/// | Rust type | Field type |
/// |---|---|
/// | `bool` | `Bool` |
/// | `i8`, `i16`, `i32`, `i64`, `u8`, `u16`, `u32` | `Int` |
/// | `f32`, `f64` | `Float` |
/// | `String` | `Text` |
/// | `DateTime<Utc>` | `Timestamp` |
/// | `Vec<T>` | `Many` |
/// | anything else | `One` |
///
/// `Option<T>` marks the field nullable and is classified by `T`.
/// Integer types narrower than `i64` record their range in `Field::bounds`,
/// so casting rejects values the struct could not hold.
/// Association fields (`One`, `Many`) are declared in the field table but
/// are not reachable through `get`/`set`.
#[proc_macro_derive(Record, attributes(field))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut field_infos: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let (kind, nullable, bounds) = classify(&field.ty)?;

        field_infos.push(FieldInfo {
            ident: ident.clone(),
            name: attrs.name.unwrap_or_else(|| ident.unraw().to_string()),
            kind,
            nullable,
            primary_key: attrs.primary_key,
            bounds,
        });
    }

    if field_infos.iter().filter(|f| f.primary_key).count() > 1 {
        return Err(syn::Error::new_spanned(
            &input,
            "Record derive supports at most one #[field(primary_key)]",
        ));
    }

    let descriptors: Vec<TokenStream2> = field_infos
        .iter()
        .map(|info| {
            let name = &info.name;
            let variant = format_ident!("{}", info.kind.variant());
            let nullable = info.nullable;
            let primary_key = info.primary_key;
            let bounds = match info.bounds {
                Some((min, max)) => {
                    let (min, max) = (int_literal(min), int_literal(max));
                    quote!(::core::option::Option::Some((#min, #max)))
                }
                None => quote!(::core::option::Option::None),
            };
            quote! {
                ::oxide_changeset::Field {
                    name: #name,
                    ty: ::oxide_changeset::FieldType::#variant,
                    nullable: #nullable,
                    primary_key: #primary_key,
                    bounds: #bounds,
                }
            }
        })
        .collect();

    let scalars: Vec<&FieldInfo> = field_infos.iter().filter(|f| !f.kind.is_assoc()).collect();

    let getters: Vec<TokenStream2> = scalars
        .iter()
        .map(|info| {
            let name = &info.name;
            let ident = &info.ident;
            quote! {
                #name => ::core::option::Option::Some(
                    ::oxide_changeset::IntoValue::into_value(
                        ::core::clone::Clone::clone(&self.#ident),
                    ),
                ),
            }
        })
        .collect();

    let setters: Vec<TokenStream2> = scalars
        .iter()
        .map(|info| {
            let name = &info.name;
            let ident = &info.ident;
            quote! {
                #name => {
                    self.#ident = ::oxide_changeset::FromValue::from_value(value)?;
                }
            }
        })
        .collect();

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::oxide_changeset::Record for #struct_name #ty_generics #where_clause {
            const FIELDS: &'static [::oxide_changeset::Field] = &[
                #(#descriptors),*
            ];

            #[allow(clippy::match_single_binding)]
            fn get(&self, field: &str) -> ::core::option::Option<::oxide_changeset::Value> {
                match field {
                    #(#getters)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables, unreachable_code, clippy::match_single_binding)]
            fn set(
                &mut self,
                field: &str,
                value: ::oxide_changeset::Value,
            ) -> ::core::result::Result<(), ::oxide_changeset::ValueError> {
                match field {
                    #(#setters)*
                    _ => {
                        return ::core::result::Result::Err(
                            ::oxide_changeset::ValueError::UnknownField(
                                ::std::string::ToString::to_string(field),
                            ),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::oxide_changeset::Destination for #struct_name #ty_generics #where_clause {
            fn fields(&self) -> &'static [::oxide_changeset::Field] {
                <Self as ::oxide_changeset::Record>::FIELDS
            }

            fn is_many(&self) -> bool {
                false
            }

            fn rows(&self) -> ::std::vec::Vec<::oxide_changeset::Map> {
                ::std::vec![::oxide_changeset::record::to_row(self)]
            }

            fn load(
                &mut self,
                rows: ::std::vec::Vec<::oxide_changeset::Map>,
            ) -> ::core::result::Result<(), ::oxide_changeset::ValueError> {
                ::oxide_changeset::record::load_one(self, rows)
            }
        }
    };

    Ok(expanded)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
    One,
    Many,
}

impl FieldKind {
    const fn variant(self) -> &'static str {
        match self {
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Text => "Text",
            Self::Timestamp => "Timestamp",
            Self::One => "One",
            Self::Many => "Many",
        }
    }

    const fn is_assoc(self) -> bool {
        matches!(self, Self::One | Self::Many)
    }
}

struct FieldInfo {
    ident: Ident,
    name: String,
    kind: FieldKind,
    nullable: bool,
    primary_key: bool,
    bounds: Option<(i64, i64)>,
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    primary_key: bool,
    skip: bool,
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("field") {
            // Handle empty attribute like #[field]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    result.primary_key = true;
                } else if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("name") {
                    let value: Expr = meta.value()?.parse()?;
                    match value {
                        Expr::Lit(lit) => match lit.lit {
                            Lit::Str(s) => result.name = Some(s.value()),
                            other => {
                                return Err(syn::Error::new_spanned(other, "expected a string"));
                            }
                        },
                        other => return Err(syn::Error::new_spanned(other, "expected a string")),
                    }
                } else {
                    return Err(meta.error("unknown field attribute"));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}

/// Returns the single generic argument of `Wrapper<T>` when the last path
/// segment is named `wrapper`.
fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            path.path.segments.last().map(|s| s.ident.to_string())
        }
        _ => None,
    }
}

/// Classifies a field type, returning its kind, nullability and integer
/// bounds.
fn classify(ty: &Type) -> syn::Result<(FieldKind, bool, Option<(i64, i64)>)> {
    if let Some(inner) = generic_arg(ty, "Option") {
        let (kind, _, bounds) = classify(inner)?;
        return Ok((kind, true, bounds));
    }
    if let Some(inner) = generic_arg(ty, "Vec") {
        if type_name(inner).as_deref() == Some("u8") {
            return Err(syn::Error::new_spanned(ty, "byte fields are not supported"));
        }
        return Ok((FieldKind::Many, false, None));
    }

    let ident = type_name(ty);
    let bounds = ident.as_deref().and_then(int_bounds);
    let kind = match ident.as_deref() {
        Some("bool") => FieldKind::Bool,
        Some("i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32") => FieldKind::Int,
        Some("f32" | "f64") => FieldKind::Float,
        Some("String") => FieldKind::Text,
        Some("DateTime") => FieldKind::Timestamp,
        Some(name @ ("u64" | "usize" | "isize" | "i128" | "u128")) => {
            return Err(syn::Error::new_spanned(
                ty,
                format!("{name} does not fit a 64-bit signed integer field"),
            ));
        }
        _ => FieldKind::One,
    };
    Ok((kind, false, bounds))
}

/// Range of an integer type narrower than `i64`.
fn int_bounds(name: &str) -> Option<(i64, i64)> {
    let bounds = match name {
        "i8" => (i8::MIN.into(), i8::MAX.into()),
        "i16" => (i16::MIN.into(), i16::MAX.into()),
        "i32" => (i32::MIN.into(), i32::MAX.into()),
        "u8" => (0, u8::MAX.into()),
        "u16" => (0, u16::MAX.into()),
        "u32" => (0, u32::MAX.into()),
        _ => return None,
    };
    Some(bounds)
}

/// Emits an `i64` literal, keeping the sign outside the literal token.
fn int_literal(n: i64) -> TokenStream2 {
    let lit = Literal::u64_unsuffixed(n.unsigned_abs());
    if n < 0 {
        quote!(-#lit)
    } else {
        quote!(#lit)
    }
}
