use super::types::{EntityDescriptor, FieldDescriptor, TemplateDescriptor};
use crate::error::SchemaError;
use crate::type_utils::{
    collection_struct_name, default_identifier, is_bytes, is_numeric_primitive,
    is_valid_identifier, is_wide_integer, option_inner, pluralize, predicate_fn_name,
    safe_field_ident, vec_inner,
};
use heck::ToPascalCase;
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote, ToTokens};
use repogen::predicate::Operator;
use std::collections::HashSet;

/// Names taken by the generated creator and updater builders.
const BUILDER_NAMES: [&str; 4] = ["new", "validate", "filter", "pfs"];

/// Type traits that decide which operators and conversions a field gets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Traits {
    pub nillable: bool,
    pub numeric: bool,
    pub array: bool,
    pub comparable: bool,
    pub custom_scanner: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    identifier: String,
    /// Type without the `Option` wrapper of nillable fields.
    base: syn::Type,
    traits: Traits,
    auto: bool,
    identity: bool,
}

impl Field {
    /// Storage column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Code-facing name.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn ident(&self) -> Ident {
        safe_field_ident(&self.identifier)
    }

    pub fn base_type(&self) -> &syn::Type {
        &self.base
    }

    /// Type of the entity struct field.
    pub fn field_type(&self) -> TokenStream {
        let base = &self.base;
        if self.traits.nillable {
            quote! { Option<#base> }
        } else {
            base.to_token_stream()
        }
    }

    pub fn traits(&self) -> Traits {
        self.traits
    }

    pub fn is_auto(&self) -> bool {
        self.auto
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn is_nillable(&self) -> bool {
        self.traits.nillable
    }

    pub fn is_numeric(&self) -> bool {
        self.traits.numeric
    }

    pub fn is_array(&self) -> bool {
        self.traits.array
    }

    pub fn is_comparable(&self) -> bool {
        self.traits.comparable
    }

    /// `Vec` array fields bound through the explicit array wrapper. Custom
    /// scanners convert themselves and are never wrapped.
    pub fn wraps_array(&self) -> bool {
        self.traits.array
            && !self.traits.custom_scanner
            && vec_inner(&self.base).is_some()
            && !is_bytes(&self.base)
    }

    /// Updater method that sets a nillable field to null.
    pub fn clear_ident(&self) -> Ident {
        format_ident!("clear_{}", self.identifier)
    }

    /// Operators with a literal right-hand side, in declaration order of
    /// [`Operator::ALL`].
    pub fn operators(&self) -> Vec<Operator> {
        Operator::ALL
            .into_iter()
            .filter(|op| match op {
                Operator::Eq | Operator::NotEq | Operator::In | Operator::NotIn => true,
                Operator::Gt | Operator::GtOrEq | Operator::Lt | Operator::LtOrEq => {
                    self.traits.numeric
                }
                Operator::IsNull | Operator::IsNotNull => self.traits.nillable,
            })
            .collect()
    }

    /// Operators that also get a column-compare variant.
    pub fn compare_operators(&self) -> Vec<Operator> {
        if !self.traits.comparable {
            return Vec::new();
        }
        self.operators()
            .into_iter()
            .filter(|op| op.accepts_column())
            .collect()
    }
}

/// Validated, immutable description of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    package: String,
    collection: String,
    type_name: String,
    identity: Field,
    fields: Vec<Field>,
    imports: Vec<String>,
    templates: Vec<TemplateDescriptor>,
}

impl Schema {
    /// Module name of the generated files.
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Entity struct name, e.g. `User`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn type_name_plural(&self) -> String {
        pluralize(&self.type_name)
    }

    pub fn identity(&self) -> &Field {
        &self.identity
    }

    /// Non-identity fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Every field, identity first, then declaration order.
    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        std::iter::once(&self.identity).chain(self.fields.iter())
    }

    /// Fields written by create and update.
    pub fn writable(&self) -> impl Iterator<Item = &Field> {
        self.columns().filter(|f| !f.auto)
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    pub fn templates(&self) -> &[TemplateDescriptor] {
        &self.templates
    }
}

/// Validate a descriptor into a [`Schema`].
pub fn build_schema(desc: &EntityDescriptor) -> Result<Schema, SchemaError> {
    if desc.fields.is_empty() {
        return Err(SchemaError::NotStructured);
    }
    if desc.collection.trim().is_empty() {
        return Err(SchemaError::EmptyCollection);
    }
    if !is_valid_identifier(&desc.package) {
        return Err(SchemaError::InvalidIdentifier(desc.package.clone()));
    }

    let identities: Vec<String> = desc
        .fields
        .iter()
        .filter(|f| f.identity)
        .map(|f| f.name.clone())
        .collect();
    match identities.len() {
        0 => return Err(SchemaError::NoIdentity),
        1 => {}
        _ => return Err(SchemaError::MultipleIdentity(identities)),
    }

    let mut identifiers = HashSet::new();
    let mut columns = HashSet::new();
    let mut variants = HashSet::new();
    let mut identity = None;
    let mut fields = Vec::with_capacity(desc.fields.len() - 1);
    for fd in &desc.fields {
        let field = build_field(fd)?;
        if !columns.insert(field.name.clone()) {
            return Err(SchemaError::DuplicateColumn(field.name));
        }
        if !identifiers.insert(field.identifier.clone())
            || !variants.insert(field.identifier.to_pascal_case())
        {
            return Err(SchemaError::DuplicateIdentifier(field.identifier));
        }
        if field.identity {
            identity = Some(field);
        } else {
            fields.push(field);
        }
    }
    let identity = identity.ok_or(SchemaError::NoIdentity)?;
    check_generated_names(std::iter::once(&identity).chain(&fields))?;

    let type_name = match &desc.type_name {
        Some(name) => name.clone(),
        None => collection_struct_name(&desc.collection),
    };
    if !is_valid_identifier(&type_name) {
        return Err(SchemaError::InvalidIdentifier(type_name));
    }

    for import in &desc.imports {
        syn::parse_str::<syn::UseTree>(import).map_err(|e| SchemaError::InvalidImport {
            import: import.clone(),
            reason: e.to_string(),
        })?;
    }

    log::debug!(
        "built schema for `{}`: {} fields, identity `{}`",
        desc.collection,
        fields.len() + 1,
        identity.name
    );

    Ok(Schema {
        package: desc.package.clone(),
        collection: desc.collection.clone(),
        type_name,
        identity,
        fields,
        imports: desc.imports.clone(),
        templates: desc.templates.clone(),
    })
}

/// Different fields can still produce the same function name, e.g. `a` and
/// `a_not` both yield `a_not_eq`.
fn check_generated_names<'a>(
    fields: impl Iterator<Item = &'a Field> + Clone,
) -> Result<(), SchemaError> {
    let mut predicates = HashSet::new();
    for field in fields.clone() {
        let names = field
            .operators()
            .into_iter()
            .map(|op| predicate_fn_name(&field.identifier, op, false))
            .chain(
                field
                    .compare_operators()
                    .into_iter()
                    .map(|op| predicate_fn_name(&field.identifier, op, true)),
            );
        for name in names {
            let name = name.to_string();
            if !predicates.insert(name.clone()) {
                return Err(SchemaError::DuplicateIdentifier(name));
            }
        }
    }

    let writable: Vec<&Field> = fields.filter(|f| !f.auto).collect();
    for field in writable.iter().filter(|f| f.is_nillable()) {
        let clear = field.clear_ident().to_string();
        if writable.iter().any(|f| f.identifier == clear) {
            return Err(SchemaError::DuplicateIdentifier(clear));
        }
    }
    Ok(())
}

fn build_field(fd: &FieldDescriptor) -> Result<Field, SchemaError> {
    let unresolvable = |reason: String| SchemaError::UnresolvableType {
        field: fd.name.clone(),
        ty: fd.field_type.clone(),
        reason,
    };

    let ty: syn::Type =
        syn::parse_str(&fd.field_type).map_err(|e| unresolvable(e.to_string()))?;
    if !matches!(ty, syn::Type::Path(_)) {
        return Err(unresolvable("only named types are supported".into()));
    }

    let (base, optional) = match option_inner(&ty) {
        Some(inner) => (inner.clone(), true),
        None => (ty.clone(), false),
    };
    if optional && fd.nillable == Some(false) {
        return Err(unresolvable("an Option type is always nillable".into()));
    }
    if fd.identity && (optional || fd.nillable == Some(true)) {
        return Err(unresolvable("the identity field cannot be nillable".into()));
    }
    if optional && option_inner(&base).is_some() {
        return Err(unresolvable("nested Option types are not supported".into()));
    }
    if is_wide_integer(&base) || vec_inner(&base).is_some_and(is_wide_integer) {
        return Err(unresolvable("128-bit integers have no SQL column type".into()));
    }

    let traits = Traits {
        nillable: optional || fd.nillable.unwrap_or(false),
        numeric: fd.numeric.unwrap_or_else(|| is_numeric_primitive(&base)),
        array: fd
            .array
            .unwrap_or_else(|| vec_inner(&base).is_some() && !is_bytes(&base)),
        comparable: fd.comparable,
        custom_scanner: fd.custom_scanner,
    };

    let identifier = match &fd.identifier {
        Some(identifier) => identifier.clone(),
        None => default_identifier(&fd.name),
    };
    if !is_valid_identifier(&identifier) || BUILDER_NAMES.contains(&identifier.as_str()) {
        return Err(SchemaError::InvalidIdentifier(identifier));
    }

    Ok(Field {
        name: fd.name.clone(),
        identifier,
        base,
        traits,
        auto: fd.auto,
        identity: fd.identity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::parse_descriptor_str;

    fn schema(yaml: &str) -> Result<Schema, SchemaError> {
        build_schema(&parse_descriptor_str(yaml).unwrap())
    }

    const USERS: &str = r#"
package: user
collection: users
fields:
  - { name: id, type: i64, identity: true, auto: true }
  - { name: name, type: String }
  - { name: group_res, identifier: group, type: String }
  - { name: age, type: i32, comparable: true }
  - { name: email, type: Option<String> }
  - { name: tags, type: Vec<String> }
  - { name: updated_at, type: "Option<chrono::DateTime<chrono::Utc>>", auto: true }
"#;

    #[test]
    fn test_build_schema() {
        let s = schema(USERS).unwrap();
        assert_eq!(s.type_name(), "User");
        assert_eq!(s.type_name_plural(), "Users");
        assert_eq!(s.identity().name(), "id");
        let names: Vec<&str> = s.columns().map(Field::name).collect();
        assert_eq!(
            names,
            ["id", "name", "group_res", "age", "email", "tags", "updated_at"]
        );
        let writable: Vec<&str> = s.writable().map(Field::name).collect();
        assert_eq!(writable, ["name", "group_res", "age", "email", "tags"]);
    }

    #[test]
    fn test_identity_is_required_and_unique() {
        let none = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64 }\n";
        assert_eq!(schema(none).unwrap_err(), SchemaError::NoIdentity);

        let two = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: y, type: i64, identity: true }\n";
        assert_eq!(
            schema(two).unwrap_err(),
            SchemaError::MultipleIdentity(vec!["x".into(), "y".into()])
        );
    }

    #[test]
    fn test_trait_inference() {
        let s = schema(USERS).unwrap();
        let field = |name: &str| s.columns().find(|f| f.name() == name).unwrap().clone();

        assert!(field("id").is_numeric());
        assert!(!field("name").is_numeric());
        assert!(field("email").is_nillable());
        assert_eq!(field("email").base_type(), &syn::parse_str::<syn::Type>("String").unwrap());
        assert!(field("tags").is_array());
        assert!(field("age").is_comparable());
        assert_eq!(field("group_res").identifier(), "group");
    }

    #[test]
    fn test_capability_gating() {
        let s = schema(USERS).unwrap();
        let field = |name: &str| s.columns().find(|f| f.name() == name).unwrap().clone();

        assert_eq!(
            field("name").operators(),
            vec![Operator::Eq, Operator::NotEq, Operator::In, Operator::NotIn]
        );
        assert_eq!(field("age").operators().len(), 8);
        assert!(field("email").operators().contains(&Operator::IsNull));
        assert!(!field("email").operators().contains(&Operator::Gt));
        assert_eq!(
            field("age").compare_operators(),
            vec![
                Operator::Eq,
                Operator::NotEq,
                Operator::Gt,
                Operator::GtOrEq,
                Operator::Lt,
                Operator::LtOrEq
            ]
        );
        assert!(field("name").compare_operators().is_empty());
    }

    #[test]
    fn test_rejects_bad_descriptors() {
        let bad_type = "package: a\ncollection: b\nfields:\n  - { name: x, type: \"&str\", identity: true }\n";
        assert!(matches!(
            schema(bad_type).unwrap_err(),
            SchemaError::UnresolvableType { .. }
        ));

        let dup = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: y, identifier: x, type: i64 }\n";
        assert_eq!(
            schema(dup).unwrap_err(),
            SchemaError::DuplicateIdentifier("x".into())
        );

        let bad_ident = "package: a\ncollection: b\nfields:\n  - { name: x, identifier: \"self\", type: i64, identity: true }\n";
        assert_eq!(
            schema(bad_ident).unwrap_err(),
            SchemaError::InvalidIdentifier("self".into())
        );

        let empty = "package: a\ncollection: b\n";
        assert_eq!(schema(empty).unwrap_err(), SchemaError::NotStructured);

        let reserved = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: filter, type: String }\n";
        assert_eq!(
            schema(reserved).unwrap_err(),
            SchemaError::InvalidIdentifier("filter".into())
        );

        let bad_package = "package: my-users\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n";
        assert_eq!(
            schema(bad_package).unwrap_err(),
            SchemaError::InvalidIdentifier("my-users".into())
        );

        let bad_import = "package: a\ncollection: b\nimports: [\"not a path\"]\nfields:\n  - { name: x, type: i64, identity: true }\n";
        assert!(matches!(
            schema(bad_import).unwrap_err(),
            SchemaError::InvalidImport { .. }
        ));
    }

    #[test]
    fn test_wide_integers_are_unresolvable() {
        for ty in ["i128", "u128", "Option<u128>", "Vec<i128>"] {
            let yaml = format!(
                "package: a\ncollection: b\nfields:\n  - {{ name: x, type: i64, identity: true }}\n  - {{ name: big, type: \"{ty}\" }}\n"
            );
            assert!(
                matches!(schema(&yaml).unwrap_err(), SchemaError::UnresolvableType { ref field, .. } if field == "big"),
                "{ty} was accepted"
            );
        }

        let sizes = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: size, type: usize }\n";
        let s = schema(sizes).unwrap();
        assert!(s.fields()[0].is_numeric());
    }

    #[test]
    fn test_bytes_are_not_arrays() {
        let yaml = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: avatar, type: Option<Vec<u8>> }\n  - { name: scores, type: Vec<u8>, array: true }\n";
        let s = schema(yaml).unwrap();
        let avatar = &s.fields()[0];
        assert!(!avatar.is_array());
        assert!(!avatar.wraps_array());
        assert!(avatar.is_nillable());
        // forcing the array trait still binds bytes as one value
        assert!(s.fields()[1].is_array());
        assert!(!s.fields()[1].wraps_array());
    }

    #[test]
    fn test_generated_name_collisions() {
        let not_in = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: a, type: String }\n  - { name: a_not, type: String }\n";
        assert_eq!(
            schema(not_in).unwrap_err(),
            SchemaError::DuplicateIdentifier("a_not_eq".into())
        );

        let gt_or = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: a, type: i32 }\n  - { name: a_gt_or, type: i32 }\n";
        assert_eq!(
            schema(gt_or).unwrap_err(),
            SchemaError::DuplicateIdentifier("a_gt_or_eq".into())
        );

        let clear = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: email, type: Option<String> }\n  - { name: clear_email, type: bool }\n";
        assert_eq!(
            schema(clear).unwrap_err(),
            SchemaError::DuplicateIdentifier("clear_email".into())
        );

        // the same suffix on a field without the colliding operator is fine
        let fine = "package: a\ncollection: b\nfields:\n  - { name: x, type: i64, identity: true }\n  - { name: a, type: String }\n  - { name: a_gt, type: String }\n";
        assert!(schema(fine).is_ok());
    }
}
