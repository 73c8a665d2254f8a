use proc_macro2::TokenStream;
use quote::quote;
use repogen::{Dialect, Quoting};

use super::{profile, render_repository, Backend};
use crate::schema::Schema;

/// `?` placeholders, arrays as JSON text and the identity from
/// `last_insert_id`. Identifiers are unquoted unless configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteBackend {
    filename: String,
    quoting: Option<Quoting>,
}

impl Default for SqliteBackend {
    fn default() -> Self {
        Self {
            filename: "sqlite.rs".to_string(),
            quoting: None,
        }
    }
}

impl SqliteBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn with_quoting(mut self, quoting: Quoting) -> Self {
        self.quoting = Some(quoting);
        self
    }
}

impl Backend for SqliteBackend {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn render(&self, schema: &Schema) -> TokenStream {
        let (dialect, tokens) =
            profile(Dialect::sqlite(), quote!(Dialect::sqlite()), self.quoting);
        render_repository(schema, &self.filename, dialect, tokens)
    }
}
