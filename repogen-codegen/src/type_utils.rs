use heck::{ToPascalCase, ToSnakeCase};
use proc_macro2::{Ident, Span};
use quote::format_ident;
use repogen::predicate::Operator;

const NUMERIC_PRIMITIVES: &[&str] = &[
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64",
];

/// Integers wider than any SQL integer column.
const WIDE_INTEGERS: &[&str] = &["i128", "u128"];

/// Identifiers that cannot be written as raw identifiers.
const RESERVED: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Convert a collection name to its singular PascalCase struct name.
/// e.g. "users" -> "User", "categories" -> "Category"
pub fn collection_struct_name(collection: &str) -> String {
    singularize(collection).to_pascal_case()
}

/// Naive singularization of English words.
pub fn singularize(word: &str) -> String {
    let w = word.to_lowercase();
    if w.ends_with("ies") {
        format!("{}y", &w[..w.len() - 3])
    } else if w.ends_with("ses") || w.ends_with("xes") || w.ends_with("zes") {
        w[..w.len() - 2].to_string()
    } else if w.ends_with("ves") {
        format!("{}f", &w[..w.len() - 3])
    } else if w.ends_with('s') && !w.ends_with("ss") {
        w[..w.len() - 1].to_string()
    } else {
        w
    }
}

/// Naive pluralization, the inverse of [`singularize`] for regular nouns.
pub fn pluralize(word: &str) -> String {
    if word.ends_with('y')
        && !matches!(word.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u'))
    {
        format!("{}ies", &word[..word.len() - 1])
    } else if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Default code-facing identifier for a storage column.
pub fn default_identifier(column: &str) -> String {
    column.to_snake_case()
}

/// Whether `name` can be used as a field, parameter or function name.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&name)
}

/// Field identifier as a Rust ident, raw when it is a keyword.
pub fn safe_field_ident(name: &str) -> Ident {
    match name {
        "type" | "struct" | "enum" | "fn" | "let" | "mut" | "ref" | "mod" | "use" | "pub"
        | "impl" | "trait" | "for" | "loop" | "while" | "if" | "else" | "match" | "return"
        | "break" | "continue" | "as" | "in" | "where" | "async" | "await" | "dyn" | "move"
        | "static" | "const" | "unsafe" | "extern" | "true" | "false" | "abstract" | "become"
        | "box" | "do" | "final" | "macro" | "override" | "priv" | "typeof" | "unsized"
        | "virtual" | "yield" | "try" => Ident::new_raw(name, Span::call_site()),
        _ => format_ident!("{}", name),
    }
}

/// `Column` enum variant for a field identifier.
/// e.g. "group_res" -> "GroupRes"
pub fn column_variant(identifier: &str) -> Ident {
    format_ident!("{}", identifier.to_pascal_case())
}

/// Predicate builder function name.
/// e.g. ("age", GtOrEq, false) -> "age_gt_or_eq", ("age", Eq, true) -> "age_eq_col"
pub fn predicate_fn_name(identifier: &str, op: Operator, column: bool) -> Ident {
    if column {
        format_ident!("{}_{}_col", identifier, op.name())
    } else {
        format_ident!("{}_{}", identifier, op.name())
    }
}

/// Whether a type path names a numeric primitive.
pub fn is_numeric_primitive(ty: &syn::Type) -> bool {
    match last_segment(ty) {
        Some(seg) => {
            seg.arguments.is_none() && NUMERIC_PRIMITIVES.contains(&seg.ident.to_string().as_str())
        }
        None => false,
    }
}

/// Whether a type path names an integer too wide to store.
pub fn is_wide_integer(ty: &syn::Type) -> bool {
    match last_segment(ty) {
        Some(seg) => {
            seg.arguments.is_none() && WIDE_INTEGERS.contains(&seg.ident.to_string().as_str())
        }
        None => false,
    }
}

/// `Vec<u8>`, stored as bytes rather than as an array.
pub fn is_bytes(ty: &syn::Type) -> bool {
    match vec_inner(ty).and_then(last_segment) {
        Some(seg) => seg.arguments.is_none() && seg.ident == "u8",
        None => false,
    }
}

/// The `T` of `Option<T>`, if `ty` is an Option.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    generic_inner(ty, "Option")
}

/// The `T` of `Vec<T>`, if `ty` is a Vec.
pub fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    generic_inner(ty, "Vec")
}

fn generic_inner<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let seg = last_segment(ty)?;
    if seg.ident != wrapper {
        return None;
    }
    match &seg.arguments {
        syn::PathArguments::AngleBracketed(args) if args.args.len() == 1 => {
            match args.args.first()? {
                syn::GenericArgument::Type(inner) => Some(inner),
                _ => None,
            }
        }
        _ => None,
    }
}

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}
