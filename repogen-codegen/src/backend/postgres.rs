use proc_macro2::TokenStream;
use quote::quote;
use repogen::{Dialect, Quoting};

use super::{profile, render_repository, Backend};
use crate::schema::Schema;

/// `$N` placeholders, double-quoted identifiers, native arrays and
/// `RETURNING` for the created identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresBackend {
    filename: String,
    quoting: Option<Quoting>,
}

impl Default for PostgresBackend {
    fn default() -> Self {
        Self {
            filename: "postgres.rs".to_string(),
            quoting: None,
        }
    }
}

impl PostgresBackend {
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

impl Backend for PostgresBackend {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn render(&self, schema: &Schema) -> TokenStream {
        let (dialect, tokens) =
            profile(Dialect::postgres(), quote!(Dialect::postgres()), self.quoting);
        render_repository(schema, &self.filename, dialect, tokens)
    }
}
