//! SELECT list builder.

use super::quote_ident;

/// Column projection. Merging is a set union; empty means `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectBuilder {
    columns: Vec<String>,
}

impl SelectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Union with `other`, folding duplicates (first mention keeps its position).
    pub fn merge<I, S>(&self, other: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns = self.columns.clone();
        for col in other {
            let col = col.into();
            if !columns.contains(&col) {
                columns.push(col);
            }
        }
        Self { columns }
    }

    /// Render the projection (`*` when empty).
    pub fn build(&self) -> String {
        if self.columns.is_empty() {
            return "*".to_string();
        }
        self.columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
