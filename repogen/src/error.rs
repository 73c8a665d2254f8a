use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("expecting tx to be {expected}")]
    TxTypeMismatch { expected: &'static str },

    #[error(transparent)]
    Dialect(#[from] DialectError),

    #[error(
        "aggregate columns and destination field count should match: \
         {columns} aggregate columns, {fields} destination fields"
    )]
    AggregateShapeMismatch { columns: usize, fields: usize },

    #[error("{source}: rollback error: {rollback}")]
    Rollback {
        source: Box<Error>,
        rollback: Box<Error>,
    },

    #[error("no rows in result set")]
    NoRows,

    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error("Postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn conversion(msg: impl Into<String>) -> Self {
        Error::Conversion(msg.into())
    }
}

/// A capability the active dialect does not have.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DialectError {
    #[error("{feature} is not supported by the {dialect} dialect")]
    UnsupportedFeature {
        dialect: &'static str,
        feature: &'static str,
    },
}

/// Every required field that was left unset on a creator.
///
/// All causes are collected before the error is returned, so a caller sees
/// the full list at once instead of fixing one field per round trip.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{}", self.describe())]
pub struct ValidationError {
    missing: Vec<String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a required field that has no value.
    pub fn require(&mut self, field: &str) {
        self.missing.push(field.to_string());
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    /// The value of a required field, or a single-cause error naming it.
    pub fn required<T>(value: Option<T>, field: &str) -> Result<T> {
        value.ok_or_else(|| {
            let mut err = ValidationError::new();
            err.require(field);
            Error::Validation(err)
        })
    }

    /// `Ok(())` when nothing was recorded, otherwise the aggregated error.
    pub fn into_result(self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn describe(&self) -> String {
        let causes: Vec<String> = self
            .missing
            .iter()
            .map(|field| format!("{field} is a required field"))
            .collect();
        format!("{} error(s) occurred: {}", causes.len(), causes.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_collects_every_field() {
        let mut err = ValidationError::new();
        err.require("email");
        err.require("name");

        assert_eq!(err.missing(), ["email", "name"]);
        assert_eq!(
            err.to_string(),
            "2 error(s) occurred: email is a required field; name is a required field"
        );
        assert!(err.into_result().is_err());
    }

    #[test]
    fn test_empty_validation_is_ok() {
        assert!(ValidationError::new().into_result().is_ok());
    }

    #[test]
    fn test_rollback_error_shows_both_failures() {
        let err = Error::Rollback {
            source: Box::new(Error::NoRows),
            rollback: Box::new(Error::Cancelled),
        };
        assert_eq!(
            err.to_string(),
            "no rows in result set: rollback error: context cancelled"
        );
    }
}
