use proc_macro2::TokenStream;
use quote::quote;
use repogen::predicate::{Arity, Operator};

use crate::generator::imports;
use crate::schema::{Field, Schema};
use crate::type_utils::predicate_fn_name;

/// Generate the predicates file: one builder function per field and
/// legal operator, plus column-compare variants for comparable fields.
pub fn generate_predicates(schema: &Schema) -> TokenStream {
    let imports = imports(schema);
    let functions = schema.columns().flat_map(|field| {
        let literal = field
            .operators()
            .into_iter()
            .map(move |op| literal_predicate(field, op));
        let column = field
            .compare_operators()
            .into_iter()
            .map(move |op| column_predicate(field, op));
        literal.chain(column)
    });

    quote! {
        #imports

        #[allow(unused_imports)]
        use super::meta::Column;
        #[allow(unused_imports)]
        use repogen::predicate::{Argument, Operator, PredFunc, Predicate, Predicates};
        #[allow(unused_imports)]
        use repogen::value::ToValue;

        #(#functions)*
    }
}

fn operator_path(op: Operator) -> TokenStream {
    match op {
        Operator::Eq => quote!(Operator::Eq),
        Operator::NotEq => quote!(Operator::NotEq),
        Operator::Gt => quote!(Operator::Gt),
        Operator::GtOrEq => quote!(Operator::GtOrEq),
        Operator::Lt => quote!(Operator::Lt),
        Operator::LtOrEq => quote!(Operator::LtOrEq),
        Operator::IsNull => quote!(Operator::IsNull),
        Operator::IsNotNull => quote!(Operator::IsNotNull),
        Operator::In => quote!(Operator::In),
        Operator::NotIn => quote!(Operator::NotIn),
    }
}

fn literal_predicate(field: &Field, op: Operator) -> TokenStream {
    let fn_ident = predicate_fn_name(field.identifier(), op, false);
    let col = field.name();
    let op_path = operator_path(op);
    let base = field.base_type();

    match op.arity() {
        Arity::Unary => {
            let doc = format!(" `{col}` {}.", op.desc());
            quote! {
                #[doc = #doc]
                pub fn #fn_ident() -> PredFunc {
                    Box::new(|preds: &mut Predicates| {
                        preds.add(Predicate::new(#col, #op_path, Argument::None))
                    })
                }
            }
        }
        Arity::Binary => {
            let doc = format!(" `{col}` {} the given value.", op.desc());
            quote! {
                #[doc = #doc]
                pub fn #fn_ident(value: #base) -> PredFunc {
                    let arg = Argument::Value(value.to_value());
                    Box::new(move |preds: &mut Predicates| {
                        preds.add(Predicate::new(#col, #op_path, arg))
                    })
                }
            }
        }
        Arity::List => {
            let doc = format!(
                " `{col}` {} the given values. An empty list adds no condition.",
                op.desc()
            );
            quote! {
                #[doc = #doc]
                pub fn #fn_ident(values: impl IntoIterator<Item = #base>) -> PredFunc {
                    let arg = Argument::List(values.into_iter().map(|v| v.to_value()).collect());
                    Box::new(move |preds: &mut Predicates| {
                        preds.add(Predicate::new(#col, #op_path, arg))
                    })
                }
            }
        }
    }
}

fn column_predicate(field: &Field, op: Operator) -> TokenStream {
    let fn_ident = predicate_fn_name(field.identifier(), op, true);
    let col = field.name();
    let op_path = operator_path(op);
    let doc = format!(" `{col}` {} another column.", op.desc());
    quote! {
        #[doc = #doc]
        pub fn #fn_ident(other: Column) -> PredFunc {
            let arg = Argument::Column(other.as_str().to_string());
            Box::new(move |preds: &mut Predicates| {
                preds.add(Predicate::new(#col, #op_path, arg))
            })
        }
    }
}
