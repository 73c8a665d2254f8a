use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

use crate::generator::imports;
use crate::schema::Schema;
use crate::type_utils::column_variant;

/// Generate the meta file: collection name, column enum and entity struct.
pub fn generate_meta(schema: &Schema) -> TokenStream {
    let imports = imports(schema);
    let collection = schema.collection();
    let type_ident = format_ident!("{}", schema.type_name());
    let column_count = Literal::usize_unsuffixed(schema.columns().count());

    let column_names: Vec<&str> = schema.columns().map(|f| f.name()).collect();
    let variants: Vec<_> = schema
        .columns()
        .map(|f| column_variant(f.identifier()))
        .collect();

    let struct_fields = schema.columns().map(|f| {
        let ident = f.ident();
        let ty = f.field_type();
        let doc = format!(" Column `{}`.", f.name());
        quote! {
            #[doc = #doc]
            pub #ident: #ty,
        }
    });
    let row_fields = schema.columns().enumerate().map(|(i, f)| {
        let ident = f.ident();
        let i = Literal::usize_unsuffixed(i);
        quote! { #ident: row.get(#i)?, }
    });

    let collection_doc = format!(" Storage name of [`{}`] rows.", schema.type_name());
    let struct_doc = format!(" A row of `{collection}`.");

    quote! {
        #imports

        #[doc = #collection_doc]
        pub const COLLECTION: &str = #collection;

        /// Every column, identity first.
        pub const COLUMNS: [&str; #column_count] = [#(#column_names),*];

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Column {
            #(#variants,)*
        }

        impl Column {
            pub const ALL: [Column; #column_count] = [#(Column::#variants),*];

            pub const fn as_str(&self) -> &'static str {
                match self {
                    #(Column::#variants => #column_names,)*
                }
            }
        }

        impl std::fmt::Display for Column {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        #[doc = #struct_doc]
        #[derive(Debug, Clone, PartialEq)]
        pub struct #type_ident {
            #(#struct_fields)*
        }

        impl repogen::value::FromRow for #type_ident {
            const ARITY: usize = #column_count;

            fn from_row(row: &repogen::Row) -> repogen::Result<Self> {
                Ok(Self {
                    #(#row_fields)*
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::format_file;
    use crate::schema::{build_schema, parse_descriptor_str};

    #[test]
    fn test_generate_meta() {
        let yaml = r#"
package: user
collection: users
imports: ["chrono::{DateTime, Utc}"]
fields:
  - { name: id, type: i64, identity: true, auto: true }
  - { name: group_res, identifier: group, type: String }
  - { name: type, type: String }
  - { name: updated_at, type: "Option<DateTime<Utc>>" }
"#;
        let schema = build_schema(&parse_descriptor_str(yaml).unwrap()).unwrap();
        let code = format_file("meta file", generate_meta(&schema)).unwrap();
        assert!(syn::parse_file(&code).is_ok(), "Not valid Rust:\n{code}");

        assert!(code.contains("use chrono::{DateTime, Utc};"));
        assert!(code.contains(r#"pub const COLLECTION: &str = "users";"#));
        assert!(code.contains(r#"pub const COLUMNS: [&str; 4] = ["id", "group_res", "type", "updated_at"];"#));
        assert!(code.contains("Column::Group => \"group_res\""));
        assert!(code.contains("pub struct User {"));
        assert!(code.contains("pub r#type: String,"));
        assert!(code.contains("pub updated_at: Option<DateTime<Utc>>,"));
        assert!(code.contains("const ARITY: usize = 4;"));
    }
}
