//! repogen code generation - emits typed repositories from an entity descriptor.
//!
//! The main entry point is [`generate`], which turns a validated [`Schema`]
//! into a fixed set of Rust module files: `meta.rs`, `predicates.rs`,
//! `sorts.rs`, `aggregates.rs`, `repository.rs`, one file per backend and a
//! `mod.rs` declaring them as siblings.
//!
//! # Example
//!
//! ```no_run
//! // In build.rs: writes $OUT_DIR/<package>/*.rs
//! let out_dir = std::env::var("OUT_DIR").unwrap();
//! repogen_codegen::generate_from_descriptor("user.yaml", out_dir).unwrap();
//! ```

mod aggregate_gen;
pub mod backend;
pub mod error;
mod generator;
mod meta_gen;
mod predicate_gen;
mod repository_gen;
pub mod schema;
mod sort_gen;
pub mod type_utils;

pub use backend::{Backend, PostgresBackend, SqliteBackend};
pub use error::{EmitError, Error, Result, SchemaError};
pub use generator::HEADER;
pub use schema::{build_schema, parse_descriptor, parse_descriptor_str, Schema};

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A rendered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    name: String,
    content: String,
}

impl File {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Write the file into `dir`, creating it if needed.
    pub fn render(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.name);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// Generate every file for `schema`, with one backend per declared template.
pub fn generate(schema: &Schema) -> std::result::Result<Vec<File>, EmitError> {
    generate_with(schema, &backend::backends_for(schema.templates()))
}

/// Generate every file for `schema` with the given backends.
///
/// Files come back in a fixed order: meta, predicates, sorts, aggregates,
/// repository, the backends in the order given, then `mod.rs`. The first
/// failing artifact aborts the run and no files are returned.
pub fn generate_with(
    schema: &Schema,
    backends: &[Box<dyn Backend>],
) -> std::result::Result<Vec<File>, EmitError> {
    let mut artifacts: Vec<(String, TokenStream)> = vec![
        ("meta".into(), meta_gen::generate_meta(schema)),
        ("predicates".into(), predicate_gen::generate_predicates(schema)),
        ("sorts".into(), sort_gen::generate_sorts()),
        ("aggregates".into(), aggregate_gen::generate_aggregates()),
        ("repository".into(), repository_gen::generate_repository(schema)),
    ];
    for backend in backends {
        let filename = backend.filename();
        let module = module_name(filename).ok_or_else(|| EmitError::Template {
            stage: format!("{filename} backend"),
            message: "backend filename must be `<identifier>.rs`".to_string(),
        })?;
        artifacts.push((module, backend.render(schema)));
    }

    let mut names = HashSet::new();
    let mut modules = Vec::with_capacity(artifacts.len());
    let mut files = Vec::with_capacity(artifacts.len() + 1);
    for (module, tokens) in artifacts {
        let name = format!("{module}.rs");
        if !names.insert(name.clone()) {
            return Err(EmitError::DuplicateFile { name });
        }
        let content = generator::format_file(&format!("{module} file"), tokens)?;
        log::debug!(
            "rendered {name} for `{}` ({} bytes)",
            schema.collection(),
            content.len()
        );
        modules.push(module);
        files.push(File { name, content });
    }

    // `mod` is a keyword, so no backend can claim this name
    let content = generator::format_file("mod file", module_file(schema, &modules))?;
    files.push(File {
        name: "mod.rs".to_string(),
        content,
    });

    Ok(files)
}

/// Module name of a `<identifier>.rs` filename.
fn module_name(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".rs")?;
    syn::parse_str::<syn::Ident>(stem).ok()?;
    Some(stem.to_string())
}

fn module_file(schema: &Schema, modules: &[String]) -> TokenStream {
    let modules = modules.iter().map(|m| format_ident!("{}", m));
    let entity = format_ident!("{}", schema.type_name());
    let doc = format!(
        " `{}` module: repository for `{}`.",
        schema.package(),
        schema.collection()
    );
    quote! {
        #![doc = #doc]

        #(pub mod #modules;)*

        pub use meta::{Column, #entity, COLLECTION, COLUMNS};
        pub use repository::{Aggregator, Creator, Deleter, Queryer, Repository, Updater};
    }
}

/// Parse, validate and generate from a YAML descriptor string.
pub fn generate_from_descriptor_str(yaml: &str) -> Result<Vec<File>> {
    let desc = parse_descriptor_str(yaml)?;
    let schema = build_schema(&desc)?;
    Ok(generate(&schema)?)
}

/// Generate from the descriptor at `path` and write every file into
/// `out_dir/<package>`. Nothing is written unless every artifact rendered.
///
/// Intended to be called from a `build.rs` build script.
pub fn generate_from_descriptor(
    path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let desc = parse_descriptor(path.as_ref())?;
    let schema = build_schema(&desc)?;
    let files = generate(&schema)?;
    let dir = out_dir.as_ref().join(schema.package());
    let mut written = Vec::with_capacity(files.len());
    for file in &files {
        written.push(file.render(&dir)?);
    }
    log::debug!("wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}
