//! Field collection shared by both derives.

use crate::attrs::{ContainerAttrs, FieldAttrs};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Ident, Result, Type};

/// One struct field and the column it maps to.
pub(crate) struct MappedField<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
    pub column: String,
    pub is_id: bool,
    pub skip: bool,
}

pub(crate) fn collect<'a>(
    input: &'a DeriveInput,
    container: &ContainerAttrs,
    derive: &str,
) -> Result<Vec<MappedField<'a>>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    format!("{derive} can only be derived for structs with named fields"),
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                format!("{derive} can only be derived for structs"),
            ));
        }
    };

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip && attrs.id {
            return Err(syn::Error::new_spanned(
                field,
                "a skipped field cannot be part of the primary key",
            ));
        }
        let name = ident.unraw().to_string();
        let column = match (attrs.column, container.rename_all) {
            (Some(column), _) => column,
            (None, Some(rule)) => rule.apply(&name),
            (None, None) => name,
        };
        out.push(MappedField {
            ident,
            ty: &field.ty,
            column,
            is_id: attrs.id,
            skip: attrs.skip,
        });
    }

    for (i, f) in out.iter().enumerate() {
        if !f.skip && out[..i].iter().any(|g| !g.skip && g.column == f.column) {
            return Err(syn::Error::new_spanned(
                f.ident,
                format!("column `{}` is mapped twice", f.column),
            ));
        }
    }
    Ok(out)
}
