use thiserror::Error;

/// A descriptor that cannot become a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity descriptor has no fields")]
    NotStructured,

    #[error("no field is marked as identity")]
    NoIdentity,

    #[error("more than one field is marked as identity: {}", .0.join(", "))]
    MultipleIdentity(Vec<String>),

    #[error("field `{field}` has unresolvable type `{ty}`: {reason}")]
    UnresolvableType {
        field: String,
        ty: String,
        reason: String,
    },

    #[error("duplicate field identifier `{0}`")]
    DuplicateIdentifier(String),

    #[error("duplicate column name `{0}`")]
    DuplicateColumn(String),

    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),

    #[error("invalid import `{import}`: {reason}")]
    InvalidImport { import: String, reason: String },

    #[error("collection name is empty")]
    EmptyCollection,
}

/// A failure while rendering one artifact. No file of the run is kept.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("failed to render {stage}: {source}")]
    Render {
        stage: String,
        #[source]
        source: syn::Error,
    },

    #[error("two artifacts are named `{name}`")]
    DuplicateFile { name: String },

    #[error("template error in {stage}: {message}")]
    Template { stage: String, message: String },
}

impl EmitError {
    pub(crate) fn render(stage: impl Into<String>, source: syn::Error) -> Self {
        EmitError::Render {
            stage: stage.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Emit error: {0}")]
    Emit(#[from] EmitError),

    #[error("Descriptor error: {0}")]
    Descriptor(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
