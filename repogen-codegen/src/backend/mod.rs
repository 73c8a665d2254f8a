//! Dialect backends: one repository implementation file per template.

mod postgres;
mod sqlite;

pub use postgres::PostgresBackend;
pub use sqlite::SqliteBackend;

use heck::ToPascalCase;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use repogen::dialect::ArrayEncoding;
use repogen::{Dialect, Quoting};

use crate::generator::imports;
use crate::schema::{DialectName, Field, Schema, TemplateDescriptor};

/// Emits the `Repository` implementation for one SQL dialect.
///
/// Implement this to add a dialect template of your own; the emitter only
/// needs the output filename and the rendered tokens.
pub trait Backend {
    /// Output filename, `<module>.rs`.
    fn filename(&self) -> &str;

    fn render(&self, schema: &Schema) -> TokenStream;
}

/// The built-in backend for a declared template.
pub fn backend_for(template: &TemplateDescriptor) -> Box<dyn Backend> {
    let (filename, quoting) = match template {
        TemplateDescriptor::Dialect(_) => (None, None),
        TemplateDescriptor::Custom {
            filename, quoting, ..
        } => (filename.clone(), *quoting),
    };
    match template.dialect() {
        DialectName::Postgres => {
            let mut backend = PostgresBackend::new();
            if let Some(filename) = filename {
                backend = backend.with_filename(filename);
            }
            if let Some(quoting) = quoting {
                backend = backend.with_quoting(quoting);
            }
            Box::new(backend)
        }
        DialectName::Sqlite => {
            let mut backend = SqliteBackend::new();
            if let Some(filename) = filename {
                backend = backend.with_filename(filename);
            }
            if let Some(quoting) = quoting {
                backend = backend.with_quoting(quoting);
            }
            Box::new(backend)
        }
    }
}

/// Backends for the schema's declared templates, in declaration order.
pub fn backends_for(templates: &[TemplateDescriptor]) -> Vec<Box<dyn Backend>> {
    templates.iter().map(backend_for).collect()
}

/// Repository struct name for a backend file, e.g. `sqlite_quoted.rs` ->
/// `SqliteQuotedRepository`.
pub fn struct_name(filename: &str) -> String {
    let stem = filename.strip_suffix(".rs").unwrap_or(filename);
    format!("{}Repository", stem.to_pascal_case())
}

/// `base` with an optional quoting override, and the expression that builds
/// the same dialect in generated code.
fn profile(
    base: Dialect,
    base_tokens: TokenStream,
    quoting: Option<Quoting>,
) -> (Dialect, TokenStream) {
    match quoting {
        Some(quoting) if quoting != base.quoting() => {
            let variant = match quoting {
                Quoting::None => quote!(Quoting::None),
                Quoting::DoubleQuote => quote!(Quoting::DoubleQuote),
                Quoting::Backtick => quote!(Quoting::Backtick),
            };
            (
                base.with_quoting(quoting),
                quote!(#base_tokens.with_quoting(#variant)),
            )
        }
        _ => (base, base_tokens),
    }
}

/// Bound value of a creator field, stored as `Option<base>`.
fn creator_value(field: &Field, dialect: Dialect) -> TokenStream {
    let ident = field.ident();
    if native_array(field, dialect) {
        quote! { c.#ident.as_deref().map(Array).to_value() }
    } else {
        quote! { c.#ident.to_value() }
    }
}

/// Bound value of a set updater field, borrowed as `value`.
fn updater_value(field: &Field, dialect: Dialect) -> TokenStream {
    if !native_array(field, dialect) {
        return quote! { value.to_value() };
    }
    if field.is_nillable() {
        quote! { value.as_deref().map(Array).to_value() }
    } else {
        quote! { Array(value.as_slice()).to_value() }
    }
}

fn native_array(field: &Field, dialect: Dialect) -> bool {
    field.wraps_array() && dialect.array_encoding() == ArrayEncoding::Native
}

fn render_repository(
    schema: &Schema,
    filename: &str,
    dialect: Dialect,
    profile: TokenStream,
) -> TokenStream {
    let imports = imports(schema);
    let entity = format_ident!("{}", schema.type_name());
    let repo = format_ident!("{}", struct_name(filename));
    let identity = schema.identity();
    let id_ty = identity.base_type();
    let id_col = identity.name();

    let columns: Vec<&str> = schema.writable().map(Field::name).collect();
    let values: Vec<TokenStream> = schema
        .writable()
        .map(|f| creator_value(f, dialect))
        .collect();
    let sets = schema.writable().map(|f| {
        let ident = f.ident();
        let col = f.name();
        let value = updater_value(f, dialect);
        quote! {
            if let Some(value) = &u.#ident {
                sets.push((#col, #value));
            }
        }
    });

    let create_body = if dialect.supports_returning() {
        quote! {
            let stmt = Self::DIALECT.insert(
                COLLECTION,
                &[#(#columns),*],
                Vec::from([Vec::from([#(#values),*])]),
                Some(#id_col),
            );
            report(self.hook(), "create", stmt.as_ref());
            let rows = tx.query(ctx, &stmt?)?;
            rows.first().ok_or(Error::NoRows)?.get(0)
        }
    } else {
        let identity_value = if identity.is_auto() {
            quote! { <#id_ty as FromValue>::from_value(Value::I64(tx.last_insert_id()?)) }
        } else {
            let id_ident = identity.ident();
            let id_name = identity.identifier();
            quote! { ValidationError::required(c.#id_ident, #id_name) }
        };
        quote! {
            let stmt = Self::DIALECT.insert(
                COLLECTION,
                &[#(#columns),*],
                Vec::from([Vec::from([#(#values),*])]),
                None,
            );
            report(self.hook(), "create", stmt.as_ref());
            tx.execute(ctx, &stmt?)?;
            #identity_value
        }
    };

    let doc = format!(
        " [`Repository`] for `{}` over a {} database.",
        schema.collection(),
        dialect.name()
    );

    quote! {
        #imports

        use std::sync::Arc;

        use super::meta::{Column, #entity, COLLECTION, COLUMNS};
        use super::repository::{Aggregator, Creator, Deleter, Queryer, Repository, Updater};
        #[allow(unused_imports)]
        use repogen::aggregate::{AggregateSink, Aggregates};
        use repogen::debug::{report, LogHook, StatementHook};
        use repogen::predicate::Predicates;
        use repogen::sort::Sorts;
        use repogen::tx::{downcast, within};
        #[allow(unused_imports)]
        use repogen::value::{Array, FromRow, FromValue};
        #[allow(unused_imports)]
        use repogen::{Context, Database, Dialect, Error, Quoting, Result, ToValue, Tx, ValidationError, Value};

        #[doc = #doc]
        pub struct #repo<D: Database> {
            db: D,
            hook: Option<Arc<dyn StatementHook>>,
        }

        impl<D: Database> #repo<D> {
            const DIALECT: Dialect = #profile;

            pub fn new(db: D) -> Self {
                Self { db, hook: None }
            }

            /// Log every compiled statement at debug level.
            pub fn debug(self) -> Self {
                self.with_hook(Arc::new(LogHook))
            }

            pub fn with_hook(mut self, hook: Arc<dyn StatementHook>) -> Self {
                self.hook = Some(hook);
                self
            }

            fn hook(&self) -> Option<&dyn StatementHook> {
                self.hook.as_deref()
            }

            fn select(
                &self,
                ctx: &Context,
                tx: &mut D::Tx,
                op: &'static str,
                q: Queryer,
            ) -> Result<Vec<#entity>> {
                let preds = Predicates::collect(q.pfs);
                let sorts = Sorts::collect(q.sfs);
                let stmt = Self::DIALECT.select(
                    COLLECTION,
                    &COLUMNS,
                    preds.all(),
                    sorts.all(),
                    q.limit,
                    q.offset,
                );
                report(self.hook(), op, Ok(&stmt));
                tx.query(ctx, &stmt)?.iter().map(#entity::from_row).collect()
            }
        }

        impl<D: Database> Repository for #repo<D> {
            fn tx(&self, ctx: &Context) -> Result<Box<dyn Tx>> {
                Ok(Box::new(self.db.begin(ctx)?))
            }

            fn create(&self, ctx: &Context, c: Creator) -> Result<#id_ty> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.create_tx(ctx, tx, c))
            }

            fn create_tx(&self, ctx: &Context, tx: &mut dyn Tx, c: Creator) -> Result<#id_ty> {
                let tx = downcast::<D::Tx>(tx)?;
                c.validate()?;
                #create_body
            }

            fn create_many(&self, ctx: &Context, cs: Vec<Creator>) -> Result<()> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.create_many_tx(ctx, tx, cs))
            }

            fn create_many_tx(&self, ctx: &Context, tx: &mut dyn Tx, cs: Vec<Creator>) -> Result<()> {
                if cs.is_empty() {
                    return Ok(());
                }
                let tx = downcast::<D::Tx>(tx)?;
                let mut rows = Vec::with_capacity(cs.len());
                for c in &cs {
                    c.validate()?;
                    rows.push(Vec::from([#(#values),*]));
                }
                let stmt = Self::DIALECT.insert(COLLECTION, &[#(#columns),*], rows, None);
                report(self.hook(), "create_many", stmt.as_ref());
                tx.execute(ctx, &stmt?)?;
                Ok(())
            }

            fn query(&self, ctx: &Context, q: Queryer) -> Result<Vec<#entity>> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.query_tx(ctx, tx, q))
            }

            fn query_tx(&self, ctx: &Context, tx: &mut dyn Tx, q: Queryer) -> Result<Vec<#entity>> {
                let tx = downcast::<D::Tx>(tx)?;
                self.select(ctx, tx, "query", q)
            }

            fn query_one(&self, ctx: &Context, q: Queryer) -> Result<#entity> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.query_one_tx(ctx, tx, q))
            }

            fn query_one_tx(&self, ctx: &Context, tx: &mut dyn Tx, q: Queryer) -> Result<#entity> {
                let tx = downcast::<D::Tx>(tx)?;
                self.select(ctx, tx, "query_one", q.limit(1))?
                    .into_iter()
                    .next()
                    .ok_or(Error::NoRows)
            }

            fn update(&self, ctx: &Context, u: Updater) -> Result<u64> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.update_tx(ctx, tx, u))
            }

            fn update_tx(&self, ctx: &Context, tx: &mut dyn Tx, u: Updater) -> Result<u64> {
                #[allow(unused_mut)]
                let mut sets: Vec<(&str, Value)> = Vec::new();
                #(#sets)*
                if sets.is_empty() {
                    return Ok(0);
                }
                let tx = downcast::<D::Tx>(tx)?;
                let preds = Predicates::collect(u.pfs);
                let stmt = Self::DIALECT.update(COLLECTION, sets, preds.all());
                report(self.hook(), "update", Ok(&stmt));
                tx.execute(ctx, &stmt)
            }

            fn delete(&self, ctx: &Context, d: Deleter) -> Result<u64> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.delete_tx(ctx, tx, d))
            }

            fn delete_tx(&self, ctx: &Context, tx: &mut dyn Tx, d: Deleter) -> Result<u64> {
                let tx = downcast::<D::Tx>(tx)?;
                let preds = Predicates::collect(d.pfs);
                let stmt = Self::DIALECT.delete(COLLECTION, preds.all());
                report(self.hook(), "delete", Ok(&stmt));
                tx.execute(ctx, &stmt)
            }

            fn aggregate(&self, ctx: &Context, a: Aggregator<'_>) -> Result<()> {
                let tx = self.tx(ctx)?;
                within(tx, |tx| self.aggregate_tx(ctx, tx, a))
            }

            fn aggregate_tx(&self, ctx: &Context, tx: &mut dyn Tx, a: Aggregator<'_>) -> Result<()> {
                let tx = downcast::<D::Tx>(tx)?;
                let aggs = Aggregates::collect(a.aggfs);
                a.dest.check_arity(aggs.len())?;
                let preds = Predicates::collect(a.pfs);
                let sorts = Sorts::collect(a.sfs);
                let groups: Vec<&str> = a.groups.iter().map(Column::as_str).collect();
                let stmt = Self::DIALECT.aggregate(
                    COLLECTION,
                    aggs.all(),
                    preds.all(),
                    sorts.all(),
                    &groups,
                );
                report(self.hook(), "aggregate", Ok(&stmt));
                for row in tx.query(ctx, &stmt)? {
                    a.dest.push_row(&row)?;
                }
                Ok(())
            }
        }
    }
}
