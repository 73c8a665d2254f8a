use repogen::Quoting;
use serde::Deserialize;

/// Entity descriptor parsed from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDescriptor {
    /// Module name of the generated files.
    pub package: String,
    /// Storage name of the entity's rows.
    pub collection: String,
    /// Entity struct name. Defaults to the singular PascalCase collection.
    #[serde(default)]
    pub type_name: Option<String>,
    /// `use` trees added to every generated file, e.g. `chrono::{DateTime, Utc}`.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Fields in declaration order. The order is kept in every artifact.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub templates: Vec<TemplateDescriptor>,
}

/// Definition of a single field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    /// Storage column name.
    pub name: String,
    /// Code-facing name override.
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub identity: bool,
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub nillable: Option<bool>,
    #[serde(default)]
    pub numeric: Option<bool>,
    #[serde(default)]
    pub array: Option<bool>,
    #[serde(default)]
    pub comparable: bool,
    #[serde(default)]
    pub custom_scanner: bool,
}

/// A backend to emit: `postgres`, or a table with overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TemplateDescriptor {
    Dialect(DialectName),
    Custom {
        dialect: DialectName,
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        quoting: Option<Quoting>,
    },
}

impl TemplateDescriptor {
    pub fn dialect(&self) -> DialectName {
        match self {
            TemplateDescriptor::Dialect(dialect) => *dialect,
            TemplateDescriptor::Custom { dialect, .. } => *dialect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectName {
    #[serde(alias = "postgresql")]
    Postgres,
    Sqlite,
}
