use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::generator::imports;
use crate::schema::Schema;

/// Generate the repository file: the `Repository` trait and the builders
/// passed to its operations.
pub fn generate_repository(schema: &Schema) -> TokenStream {
    let imports = imports(schema);
    let entity = format_ident!("{}", schema.type_name());
    let id_ty = schema.identity().base_type();
    let plural = schema.type_name_plural();

    let trait_doc = format!(" Typed access to `{}`.", schema.collection());
    let create_doc = format!(" Insert one {} and return its identity.", schema.type_name());
    let create_many_doc = " Insert every creator in a single statement. No-op when empty.";
    let query_doc = format!(" {plural} matching the queryer.");
    let query_one_doc = " The first match, or `Error::NoRows`.".to_string();

    let creator = creator(schema);
    let updater = updater(schema);

    quote! {
        #imports

        use super::meta::{Column, #entity};
        use repogen::aggregate::{AggFunc, AggregateSink};
        use repogen::predicate::PredFunc;
        use repogen::sort::SortFunc;
        use repogen::{Context, Result, Tx, ValidationError};

        #[doc = #trait_doc]
        ///
        /// Every operation has a `_tx` variant that runs inside a caller-owned
        /// transaction. The plain variant opens its own transaction, commits on
        /// success and rolls back on failure.
        pub trait Repository: Send + Sync {
            /// Begin a transaction on the underlying database.
            fn tx(&self, ctx: &Context) -> Result<Box<dyn Tx>>;

            #[doc = #create_doc]
            fn create(&self, ctx: &Context, c: Creator) -> Result<#id_ty>;

            fn create_tx(&self, ctx: &Context, tx: &mut dyn Tx, c: Creator) -> Result<#id_ty>;

            #[doc = #create_many_doc]
            fn create_many(&self, ctx: &Context, cs: Vec<Creator>) -> Result<()>;

            fn create_many_tx(&self, ctx: &Context, tx: &mut dyn Tx, cs: Vec<Creator>) -> Result<()>;

            #[doc = #query_doc]
            fn query(&self, ctx: &Context, q: Queryer) -> Result<Vec<#entity>>;

            fn query_tx(&self, ctx: &Context, tx: &mut dyn Tx, q: Queryer) -> Result<Vec<#entity>>;

            #[doc = #query_one_doc]
            fn query_one(&self, ctx: &Context, q: Queryer) -> Result<#entity>;

            fn query_one_tx(&self, ctx: &Context, tx: &mut dyn Tx, q: Queryer) -> Result<#entity>;

            /// Apply the set fields to every match. Returns the affected row count.
            fn update(&self, ctx: &Context, u: Updater) -> Result<u64>;

            fn update_tx(&self, ctx: &Context, tx: &mut dyn Tx, u: Updater) -> Result<u64>;

            /// Delete every match. Returns the affected row count.
            fn delete(&self, ctx: &Context, d: Deleter) -> Result<u64>;

            fn delete_tx(&self, ctx: &Context, tx: &mut dyn Tx, d: Deleter) -> Result<u64>;

            /// Run an aggregate query into the aggregator's destination.
            fn aggregate(&self, ctx: &Context, a: Aggregator<'_>) -> Result<()>;

            fn aggregate_tx(&self, ctx: &Context, tx: &mut dyn Tx, a: Aggregator<'_>) -> Result<()>;
        }

        #creator

        #updater

        /// Filters, sorts and paging of a query.
        #[derive(Default)]
        pub struct Queryer {
            pub(super) pfs: Vec<PredFunc>,
            pub(super) sfs: Vec<SortFunc>,
            pub(super) limit: u64,
            pub(super) offset: u64,
        }

        impl Queryer {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn filter(mut self, pfs: impl IntoIterator<Item = PredFunc>) -> Self {
                self.pfs.extend(pfs);
                self
            }

            pub fn sort(mut self, sfs: impl IntoIterator<Item = SortFunc>) -> Self {
                self.sfs.extend(sfs);
                self
            }

            /// Zero means no limit.
            pub fn limit(mut self, limit: u64) -> Self {
                self.limit = limit;
                self
            }

            pub fn offset(mut self, offset: u64) -> Self {
                self.offset = offset;
                self
            }
        }

        /// Filters of a delete. Without filters every row is deleted.
        #[derive(Default)]
        pub struct Deleter {
            pub(super) pfs: Vec<PredFunc>,
        }

        impl Deleter {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn filter(mut self, pfs: impl IntoIterator<Item = PredFunc>) -> Self {
                self.pfs.extend(pfs);
                self
            }
        }

        /// An aggregate query and the destination its rows are decoded into.
        pub struct Aggregator<'a> {
            pub(super) dest: &'a mut dyn AggregateSink,
            pub(super) aggfs: Vec<AggFunc>,
            pub(super) pfs: Vec<PredFunc>,
            pub(super) sfs: Vec<SortFunc>,
            pub(super) groups: Vec<Column>,
        }

        impl<'a> Aggregator<'a> {
            /// `dest` must have one slot per aggregate column.
            pub fn new(dest: &'a mut dyn AggregateSink) -> Self {
                Self {
                    dest,
                    aggfs: Vec::new(),
                    pfs: Vec::new(),
                    sfs: Vec::new(),
                    groups: Vec::new(),
                }
            }

            pub fn aggregate(mut self, aggfs: impl IntoIterator<Item = AggFunc>) -> Self {
                self.aggfs.extend(aggfs);
                self
            }

            pub fn filter(mut self, pfs: impl IntoIterator<Item = PredFunc>) -> Self {
                self.pfs.extend(pfs);
                self
            }

            pub fn sort(mut self, sfs: impl IntoIterator<Item = SortFunc>) -> Self {
                self.sfs.extend(sfs);
                self
            }

            pub fn group(mut self, groups: impl IntoIterator<Item = Column>) -> Self {
                self.groups.extend(groups);
                self
            }
        }
    }
}

fn creator(schema: &Schema) -> TokenStream {
    let fields = schema.writable().map(|f| {
        let ident = f.ident();
        let base = f.base_type();
        quote! { pub(super) #ident: Option<#base>, }
    });
    let setters = schema.writable().map(|f| {
        let ident = f.ident();
        let base = f.base_type();
        quote! {
            pub fn #ident(mut self, value: impl Into<#base>) -> Self {
                self.#ident = Some(value.into());
                self
            }
        }
    });
    let checks = schema.writable().filter(|f| !f.is_nillable()).map(|f| {
        let ident = f.ident();
        let name = f.identifier();
        quote! {
            if self.#ident.is_none() {
                err.require(#name);
            }
        }
    });
    let doc = format!(
        " Field values of a new {}. Nillable fields default to null.",
        schema.type_name()
    );

    quote! {
        #[doc = #doc]
        #[derive(Debug, Clone, Default)]
        pub struct Creator {
            #(#fields)*
        }

        impl Creator {
            pub fn new() -> Self {
                Self::default()
            }

            #(#setters)*

            /// Check that every required field is set, reporting all missing
            /// fields at once.
            pub fn validate(&self) -> std::result::Result<(), ValidationError> {
                #[allow(unused_mut)]
                let mut err = ValidationError::new();
                #(#checks)*
                err.into_result()
            }
        }
    }
}

fn updater(schema: &Schema) -> TokenStream {
    let fields = schema.writable().map(|f| {
        let ident = f.ident();
        let ty = f.field_type();
        quote! { pub(super) #ident: Option<#ty>, }
    });
    let setters = schema.writable().map(|f| {
        let ident = f.ident();
        let base = f.base_type();
        if !f.is_nillable() {
            return quote! {
                pub fn #ident(mut self, value: impl Into<#base>) -> Self {
                    self.#ident = Some(value.into());
                    self
                }
            };
        }
        let clear = f.clear_ident();
        let clear_doc = format!(" Set `{}` to null.", f.name());
        quote! {
            pub fn #ident(mut self, value: impl Into<#base>) -> Self {
                self.#ident = Some(Some(value.into()));
                self
            }

            #[doc = #clear_doc]
            pub fn #clear(mut self) -> Self {
                self.#ident = Some(None);
                self
            }
        }
    });

    quote! {
        /// Columns to set and the rows to set them on. Only fields that were
        /// set are written.
        #[derive(Default)]
        pub struct Updater {
            #(#fields)*
            pub(super) pfs: Vec<PredFunc>,
        }

        impl Updater {
            pub fn new() -> Self {
                Self::default()
            }

            #(#setters)*

            pub fn filter(mut self, pfs: impl IntoIterator<Item = PredFunc>) -> Self {
                self.pfs.extend(pfs);
                self
            }
        }
    }
}
