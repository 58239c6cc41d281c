//! FromRow derive macro implementation

use crate::attrs::ContainerAttrs;
use crate::fields::{self, MappedField};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let container = ContainerAttrs::parse(&input.attrs)?;
    let fields = fields::collect(&input, &container, "FromRow")?;
    Ok(generate(&input, &fields))
}

/// `impl FromRow`; shared with the Model derive.
pub(crate) fn generate(input: &DeriveInput, fields: &[MappedField<'_>]) -> TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let field_extracts = fields.iter().map(|f| {
        let ident = f.ident;
        let ty = f.ty;
        let column = &f.column;
        if f.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! {
                #ident: row.try_get_opt::<#ty>(#column)?.unwrap_or_default()
            }
        }
    });

    quote! {
        impl #impl_generics ::spanorm::FromRow for #name #ty_generics #where_clause {
            fn from_row(row: &::spanorm::Row) -> ::spanorm::OrmResult<Self> {
                ::core::result::Result::Ok(Self {
                    #(#field_extracts),*
                })
            }
        }
    }
}
