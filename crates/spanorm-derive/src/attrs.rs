//! `#[orm(...)]` attribute parsing.

use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use syn::{Attribute, LitStr, Result};

/// Column naming rule from `#[orm(rename_all = "...")]`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RenameRule {
    Snake,
    LowerCamel,
    Pascal,
    ScreamingSnake,
    Kebab,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> Result<Self> {
        match lit.value().as_str() {
            "snake_case" => Ok(Self::Snake),
            "camelCase" => Ok(Self::LowerCamel),
            "PascalCase" => Ok(Self::Pascal),
            "SCREAMING_SNAKE_CASE" => Ok(Self::ScreamingSnake),
            "kebab-case" => Ok(Self::Kebab),
            other => Err(syn::Error::new(
                lit.span(),
                format!("unknown rename_all rule `{other}`"),
            )),
        }
    }

    pub(crate) fn apply(self, name: &str) -> String {
        match self {
            Self::Snake => name.to_snake_case(),
            Self::LowerCamel => name.to_lower_camel_case(),
            Self::Pascal => name.to_upper_camel_case(),
            Self::ScreamingSnake => name.to_shouty_snake_case(),
            Self::Kebab => name.to_kebab_case(),
        }
    }
}

/// Struct-level attributes.
#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub table: Option<String>,
    pub rename_all: Option<RenameRule>,
}

impl ContainerAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    out.table = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else if meta.path.is_ident("rename_all") {
                    out.rename_all = Some(RenameRule::parse(&meta.value()?.parse::<LitStr>()?)?);
                    Ok(())
                } else {
                    Err(meta.error("unknown struct attribute; expected `table` or `rename_all`"))
                }
            })?;
        }
        Ok(out)
    }
}

/// Field-level attributes.
#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub id: bool,
    pub skip: bool,
    pub column: Option<String>,
}

impl FieldAttrs {
    pub(crate) fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    out.id = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                    Ok(())
                } else if meta.path.is_ident("column") {
                    out.column = Some(meta.value()?.parse::<LitStr>()?.value());
                    Ok(())
                } else {
                    Err(meta.error("unknown field attribute; expected `id`, `column` or `skip`"))
                }
            })?;
        }
        Ok(out)
    }
}
