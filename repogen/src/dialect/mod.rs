//! Backend profiles: quoting, placeholder style, array encoding and
//! `RETURNING` support.

mod compile;

pub use compile::Statement;

use crate::value::Value;
use serde::Deserialize;

/// How identifiers are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quoting {
    None,
    #[serde(alias = "double")]
    DoubleQuote,
    Backtick,
}

/// How bound parameters are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    Numbered,
    /// `?`
    Anonymous,
}

/// How array values reach the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayEncoding {
    /// Bound as one native array parameter.
    Native,
    /// Encoded as JSON text.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dialect {
    name: &'static str,
    quoting: Quoting,
    placeholder: PlaceholderStyle,
    arrays: ArrayEncoding,
    returning: bool,
    /// Spelling of "no limit" for an `OFFSET` that must follow a `LIMIT`.
    unbounded_limit: Option<&'static str>,
}

impl Dialect {
    pub const fn postgres() -> Dialect {
        Dialect {
            name: "postgres",
            quoting: Quoting::DoubleQuote,
            placeholder: PlaceholderStyle::Numbered,
            arrays: ArrayEncoding::Native,
            returning: true,
            unbounded_limit: None,
        }
    }

    /// SQLite profile. Identifiers are unquoted unless reconfigured with
    /// [`Dialect::with_quoting`].
    pub const fn sqlite() -> Dialect {
        Dialect {
            name: "sqlite",
            quoting: Quoting::None,
            placeholder: PlaceholderStyle::Anonymous,
            arrays: ArrayEncoding::Json,
            returning: false,
            unbounded_limit: Some("-1"),
        }
    }

    pub const fn with_quoting(self, quoting: Quoting) -> Dialect {
        Dialect { quoting, ..self }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn quoting(&self) -> Quoting {
        self.quoting
    }

    pub fn placeholder_style(&self) -> PlaceholderStyle {
        self.placeholder
    }

    pub fn array_encoding(&self) -> ArrayEncoding {
        self.arrays
    }

    pub fn supports_returning(&self) -> bool {
        self.returning
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote(&self, ident: &str) -> String {
        match self.quoting {
            Quoting::None => ident.to_string(),
            Quoting::DoubleQuote => format!("\"{}\"", ident.replace('"', "\"\"")),
            Quoting::Backtick => format!("`{}`", ident.replace('`', "``")),
        }
    }

    /// Placeholder for the `n`th bound parameter, 1-based.
    pub fn placeholder(&self, n: usize) -> String {
        match self.placeholder {
            PlaceholderStyle::Numbered => format!("${n}"),
            PlaceholderStyle::Anonymous => "?".to_string(),
        }
    }

    /// Prepare a value for binding.
    pub fn bind(&self, value: Value) -> Value {
        match (self.arrays, value) {
            (ArrayEncoding::Json, value @ Value::Array(_)) => {
                Value::Text(value.to_json().to_string())
            }
            (_, value) => value,
        }
    }
}
