//! Model derive macro implementation

use crate::attrs::ContainerAttrs;
use crate::fields::{self, MappedField};
use crate::from_row;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Result};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let container = ContainerAttrs::parse(&input.attrs)?;
    let Some(table) = container.table.clone() else {
        return Err(syn::Error::new_spanned(
            &input,
            "Model requires #[orm(table = \"table_name\")] attribute",
        ));
    };
    let fields = fields::collect(&input, &container, "Model")?;

    let columns: Vec<&MappedField<'_>> = fields.iter().filter(|f| !f.skip).collect();
    let keys: Vec<&MappedField<'_>> = columns.iter().copied().filter(|f| f.is_id).collect();
    if keys.is_empty() {
        return Err(syn::Error::new_spanned(
            &input,
            "Model requires at least one #[orm(id)] field",
        ));
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let column_names = columns.iter().map(|f| &f.column);
    let param_inserts = columns.iter().map(|f| insert_param(f));
    let key_inserts = keys.iter().map(|f| insert_param(f));
    let key_parts = keys.iter().map(|f| {
        let ident = f.ident;
        quote! { ::spanorm::Value::from(::core::clone::Clone::clone(&self.#ident)) }
    });

    let from_row = from_row::generate(&input, &fields);

    Ok(quote! {
        impl #impl_generics ::spanorm::Model for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            const COLUMNS: &'static [&'static str] = &[#(#column_names),*];

            fn params(&self) -> ::spanorm::Params {
                let mut params = ::spanorm::Params::new();
                #(#param_inserts)*
                params
            }

            fn primary_keys(&self) -> ::spanorm::Params {
                let mut params = ::spanorm::Params::new();
                #(#key_inserts)*
                params
            }

            fn store_key(&self) -> ::spanorm::Key {
                ::spanorm::Key::new(::std::vec![#(#key_parts),*])
            }
        }

        #from_row
    })
}

fn insert_param(f: &MappedField<'_>) -> TokenStream {
    let ident = f.ident;
    let column = &f.column;
    quote! {
        params.insert(#column, ::spanorm::Value::from(::core::clone::Clone::clone(&self.#ident)));
    }
}
