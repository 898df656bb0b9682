//! Record derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Expr, ExprLit, Fields, Lit, LitStr, Meta, Result, Visibility};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut defs = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();

    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_name = ident.unraw().to_string();

        if matches!(field.vis, Visibility::Inherited) {
            defs.push(quote! { ::zorm::FieldDef::hidden(#field_name) });
            continue;
        }

        let ty = &field.ty;
        let tag = match sql_tag(field)? {
            Some(tag) => quote! { ::core::option::Option::Some(#tag) },
            None => quote! { ::core::option::Option::None },
        };
        defs.push(quote! {
            ::zorm::FieldDef::new(#field_name, #tag, <#ty as ::zorm::SqlField>::KIND)
        });
        getters.push(quote! {
            #index => ::zorm::SqlField::to_value(&self.#ident)
        });
        setters.push(quote! {
            #index => self.#ident = ::zorm::SqlField::from_value(value)?
        });
    }

    Ok(quote! {
        impl ::zorm::Record for #name {
            fn descriptor() -> &'static ::zorm::RecordDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<::zorm::RecordDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| ::zorm::RecordDescriptor::resolve(&[#(#defs),*]))
            }

            fn field_value(&self, index: usize) -> ::zorm::Value {
                match index {
                    #(#getters,)*
                    _ => ::zorm::Value::Null,
                }
            }

            #[allow(unused_variables)]
            fn set_field(
                &mut self,
                index: usize,
                value: ::zorm::Value,
            ) -> ::core::result::Result<(), ::zorm::ConversionError> {
                match index {
                    #(#setters,)*
                    _ => {}
                }
                ::core::result::Result::Ok(())
            }
        }
    })
}

// `#[sql = "..."]` or `#[sql("...")]`
fn sql_tag(field: &syn::Field) -> Result<Option<LitStr>> {
    let mut tag = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("sql") {
            continue;
        }
        if tag.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate `sql` attribute"));
        }
        let lit = match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit), ..
                }) => lit.clone(),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "expected a string literal: #[sql = \"column\"]",
                    ));
                }
            },
            Meta::List(_) => attr.parse_args::<LitStr>()?,
            Meta::Path(_) => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "expected #[sql = \"column\"] or #[sql(\"column\")]",
                ));
            }
        };
        tag = Some(lit);
    }
    Ok(tag)
}
