use crate::error::EmitError;
use crate::schema::Schema;
use proc_macro2::TokenStream;
use quote::quote;

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by repogen, DO NOT EDIT.";

/// Parse and pretty-print one artifact, prefixed with [`HEADER`].
pub fn format_file(stage: &str, tokens: TokenStream) -> Result<String, EmitError> {
    let file = syn::parse2::<syn::File>(tokens).map_err(|e| EmitError::render(stage, e))?;
    Ok(format!("{HEADER}\n\n{}", prettyplease::unparse(&file)))
}

/// `use` items for the schema's external type imports.
pub fn imports(schema: &Schema) -> TokenStream {
    let trees = schema
        .imports()
        .iter()
        // validated when the schema was built
        .filter_map(|import| syn::parse_str::<syn::UseTree>(import).ok());
    quote! {
        #(
            #[allow(unused_imports)]
            use #trees;
        )*
    }
}
