use proc_macro2::TokenStream;
use quote::quote;

/// Generate the sorts file. Sort builders take the generated `Column` enum,
/// so the file is the same for every schema.
pub fn generate_sorts() -> TokenStream {
    quote! {
        use super::meta::Column;
        use repogen::sort::{Direction, Sort, SortFunc, Sorts};

        /// Sort by `col` in ascending order.
        pub fn asc(col: Column) -> SortFunc {
            Box::new(move |sorts: &mut Sorts| sorts.add(Sort::new(col.as_str(), Direction::Asc)))
        }

        /// Sort by `col` in descending order.
        pub fn desc(col: Column) -> SortFunc {
            Box::new(move |sorts: &mut Sorts| sorts.add(Sort::new(col.as_str(), Direction::Desc)))
        }
    }
}
