use heck::{ToLowerCamelCase, ToSnakeCase};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Type};

use crate::errors::EntityDeriveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Int,
    Text,
}

impl Kind {
    fn tokens(self) -> TokenStream {
        match self {
            Kind::Bool => quote! { ::relfilter::FieldKind::Bool },
            Kind::Int => quote! { ::relfilter::FieldKind::Int },
            Kind::Text => quote! { ::relfilter::FieldKind::Text },
        }
    }
}

#[derive(Debug, Default)]
struct StructAttrs {
    name: Option<String>,
    table: Option<String>,
}

#[derive(Debug, Default)]
struct FieldAttrs {
    primary_key: bool,
    autoincrement: bool,
    unique: bool,
    rename: Option<String>,
    column: Option<String>,
    many_to_one: Option<String>,
    one_to_many: Option<String>,
    mapped_by: Option<String>,
}

fn string_value(meta: &ParseNestedMeta) -> syn::Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

fn parse_struct_attrs(input: &DeriveInput) -> syn::Result<StructAttrs> {
    let mut attrs = StructAttrs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                attrs.name = Some(string_value(&meta)?);
            } else if meta.path.is_ident("table") {
                attrs.table = Some(string_value(&meta)?);
            } else {
                return Err(meta.error("unknown entity attribute, expected `name` or `table`"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn parse_field_attrs(field: &syn::Field) -> syn::Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                attrs.primary_key = true;
            } else if meta.path.is_ident("autoincrement") {
                attrs.autoincrement = true;
            } else if meta.path.is_ident("unique") {
                attrs.unique = true;
            } else if meta.path.is_ident("rename") {
                attrs.rename = Some(string_value(&meta)?);
            } else if meta.path.is_ident("column") {
                attrs.column = Some(string_value(&meta)?);
            } else if meta.path.is_ident("many_to_one") {
                attrs.many_to_one = Some(string_value(&meta)?);
            } else if meta.path.is_ident("one_to_many") {
                attrs.one_to_many = Some(string_value(&meta)?);
            } else if meta.path.is_ident("mapped_by") {
                attrs.mapped_by = Some(string_value(&meta)?);
            } else {
                return Err(meta.error("unknown entity field attribute"));
            }
            Ok(())
        })?;
    }
    Ok(attrs)
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn scalar_kind(ty: &Type) -> Option<Kind> {
    let Type::Path(path) = ty else {
        return None;
    };
    match path.path.segments.last()?.ident.to_string().as_str() {
        "bool" => Some(Kind::Bool),
        "i32" | "i64" | "u32" => Some(Kind::Int),
        "String" => Some(Kind::Text),
        _ => None,
    }
}

pub fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let vis = &input.vis;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let struct_attrs = parse_struct_attrs(&input)?;
    let entity_name = struct_attrs.name.unwrap_or_else(|| ident.to_string());
    let table_name = struct_attrs
        .table
        .unwrap_or_else(|| entity_name.to_snake_case());

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(EntityDeriveError::NotNamedStruct.into_syn(ident.span())),
        },
        _ => return Err(EntityDeriveError::NotNamedStruct.into_syn(ident.span())),
    };

    let mut field_schemas = Vec::new();
    let mut relation_schemas = Vec::new();
    let mut row_values = Vec::new();
    let mut field_modules = Vec::new();
    let mut primary_key: Vec<String> = Vec::new();
    let mut id_field: Option<String> = None;

    for field in named {
        let Some(field_ident) = field.ident.as_ref() else {
            return Err(EntityDeriveError::NotNamedStruct.into_syn(field.span()));
        };
        let rust_name = field_ident.to_string();
        let attrs = parse_field_attrs(field)?;
        let name = attrs
            .rename
            .clone()
            .unwrap_or_else(|| rust_name.to_lower_camel_case());

        if let Some(target) = &attrs.one_to_many {
            if attrs.many_to_one.is_some() {
                return Err(EntityDeriveError::ConflictingRelation { field: rust_name }
                    .into_syn(field_ident.span()));
            }
            let Some(mapped_by) = attrs.mapped_by.as_ref() else {
                return Err(EntityDeriveError::MissingMappedBy {
                    field: rust_name,
                    target: target.clone(),
                }
                .into_syn(field_ident.span()));
            };
            relation_schemas.push(quote! {
                ::relfilter::RelationSchema {
                    name: #name,
                    target: #target,
                    kind: ::relfilter::RelationKind::OneToMany { mapped_by: #mapped_by },
                }
            });
            field_modules.push(collection_module(field_ident, &name));
            continue;
        }

        let (inner, is_option) = match option_inner(&field.ty) {
            Some(inner) => (inner, true),
            None => (&field.ty, false),
        };
        let ty = &field.ty;
        let Some(kind) = scalar_kind(inner) else {
            return Err(EntityDeriveError::UnsupportedFieldType {
                field: rust_name,
                ty: quote!(#ty).to_string(),
            }
            .into_syn(ty.span()));
        };
        if attrs.autoincrement && kind != Kind::Int {
            return Err(EntityDeriveError::AutoincrementNotInteger { field: rust_name }
                .into_syn(field_ident.span()));
        }

        let column = attrs
            .column
            .clone()
            .unwrap_or_else(|| rust_name.to_snake_case());
        let kind_tokens = kind.tokens();
        let nullable = is_option && !attrs.autoincrement;
        let unique = attrs.unique;
        let autoincrement = attrs.autoincrement;
        field_schemas.push(quote! {
            ::relfilter::FieldSchema {
                name: #name,
                column_name: #column,
                kind: #kind_tokens,
                nullable: #nullable,
                unique: #unique,
                autoincrement: #autoincrement,
            }
        });
        row_values.push(quote! { .with(#name, self.#field_ident) });

        if attrs.primary_key {
            primary_key.push(name.clone());
        }
        if rust_name == "id" {
            id_field = Some(name.clone());
        }
        if let Some(target) = &attrs.many_to_one {
            relation_schemas.push(quote! {
                ::relfilter::RelationSchema {
                    name: #name,
                    target: #target,
                    kind: ::relfilter::RelationKind::ManyToOne { column: #name },
                }
            });
        }
        field_modules.push(scalar_module(field_ident, &name, kind, attrs.many_to_one.is_some()));
    }

    // Conventional `id` field when nothing is marked
    if primary_key.is_empty() {
        match id_field {
            Some(name) => primary_key.push(name),
            None => {
                return Err(EntityDeriveError::NoPrimaryKey {
                    entity: entity_name,
                }
                .into_syn(ident.span()))
            }
        }
    }

    let module_ident = format_ident!("{}", ident.to_string().to_snake_case());

    Ok(quote! {
        impl #impl_generics ::relfilter::Entity for #ident #ty_generics #where_clause {
            const SCHEMA: &'static ::relfilter::EntitySchema = &::relfilter::EntitySchema {
                name: #entity_name,
                table_name: #table_name,
                primary_key: &[#(#primary_key),*],
                fields: &[#(#field_schemas),*],
                relations: &[#(#relation_schemas),*],
            };

            fn into_row(self) -> ::relfilter::Row {
                ::relfilter::Row::new(#entity_name)
                    #(#row_values)*
            }
        }

        /// Typed filter constructors, one module per field
        #[allow(dead_code)]
        #vis mod #module_ident {
            pub const ENTITY: &str = #entity_name;

            #(#field_modules)*
        }
    })
}

/// Operators on a stored scalar; references additionally get `is`
fn scalar_module(field_ident: &Ident, name: &str, kind: Kind, reference: bool) -> TokenStream {
    let text_ops = if kind == Kind::Text {
        quote! {
            pub fn like(pattern: impl Into<String>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Like(pattern.into()))
            }
            pub fn ilike(pattern: impl Into<String>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::ILike(pattern.into()))
            }
        }
    } else {
        quote! {}
    };
    let reference_ops = if reference {
        quote! {
            pub fn is(filters: Vec<::relfilter::Filter>) -> ::relfilter::Filter {
                ::relfilter::Filter::is(NAME, ::relfilter::Filter::all(filters))
            }
        }
    } else {
        quote! {}
    };

    quote! {
        pub mod #field_ident {
            pub const NAME: &str = #name;

            pub fn equals(value: impl Into<::relfilter::Value>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Eq(value.into()))
            }
            pub fn not_equals(value: impl Into<::relfilter::Value>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Ne(value.into()))
            }
            pub fn gt(value: impl Into<::relfilter::Value>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Gt(value.into()))
            }
            pub fn gte(value: impl Into<::relfilter::Value>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Gte(value.into()))
            }
            pub fn lt(value: impl Into<::relfilter::Value>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Lt(value.into()))
            }
            pub fn lte(value: impl Into<::relfilter::Value>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Lte(value.into()))
            }
            pub fn in_vec<T: Into<::relfilter::Value>>(values: Vec<T>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(
                    NAME,
                    ::relfilter::FieldOp::In(values.into_iter().map(Into::into).collect()),
                )
            }
            pub fn not_in_vec<T: Into<::relfilter::Value>>(values: Vec<T>) -> ::relfilter::Filter {
                ::relfilter::Filter::field(
                    NAME,
                    ::relfilter::FieldOp::NotIn(values.into_iter().map(Into::into).collect()),
                )
            }
            pub fn is_null() -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Eq(::relfilter::Value::Null))
            }
            pub fn is_not_null() -> ::relfilter::Filter {
                ::relfilter::Filter::field(NAME, ::relfilter::FieldOp::Ne(::relfilter::Value::Null))
            }

            #text_ops
            #reference_ops
        }
    }
}

/// Quantifiers over a one-to-many relation
fn collection_module(field_ident: &Ident, name: &str) -> TokenStream {
    quote! {
        pub mod #field_ident {
            pub const NAME: &str = #name;

            pub fn some(filters: Vec<::relfilter::Filter>) -> ::relfilter::Filter {
                ::relfilter::Filter::some(NAME, ::relfilter::Filter::all(filters))
            }
            pub fn none(filters: Vec<::relfilter::Filter>) -> ::relfilter::Filter {
                ::relfilter::Filter::none(NAME, ::relfilter::Filter::all(filters))
            }
            pub fn every(filters: Vec<::relfilter::Filter>) -> ::relfilter::Filter {
                ::relfilter::Filter::every(NAME, ::relfilter::Filter::all(filters))
            }
        }
    }
}
