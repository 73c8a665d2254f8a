use proc_macro2::TokenStream;
use quote::{format_ident, quote};

const REDUCERS: [(&str, &str, &str); 6] = [
    ("avg", "Avg", "Average of `col`."),
    ("count", "Count", "Number of non-null values of `col`."),
    ("max", "Max", "Largest value of `col`."),
    ("min", "Min", "Smallest value of `col`."),
    ("sum", "Sum", "Sum of `col`."),
    ("none", "None", "`col` itself, typically a group-by column."),
];

/// Generate the aggregates file: one builder per reducer.
pub fn generate_aggregates() -> TokenStream {
    let functions = REDUCERS.iter().map(|(name, variant, doc)| {
        let fn_ident = format_ident!("{}", name);
        let variant = format_ident!("{}", variant);
        let doc = format!(" {doc}");
        quote! {
            #[doc = #doc]
            pub fn #fn_ident(col: Column) -> AggFunc {
                Box::new(move |aggs: &mut Aggregates| {
                    aggs.add(Aggregate::new(col.as_str(), Reducer::#variant))
                })
            }
        }
    });

    quote! {
        use super::meta::Column;
        use repogen::aggregate::{AggFunc, Aggregate, Aggregates, Reducer};

        #(#functions)*
    }
}
