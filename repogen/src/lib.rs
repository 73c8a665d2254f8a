//! Runtime for generated repositories.
//!
//! Generated code builds predicates, sorts and aggregates with composable
//! builder functions, compiles them to parameterized SQL through a
//! [`Dialect`], and runs the statements inside a [`Tx`].

pub mod aggregate;
pub mod debug;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod predicate;
pub mod sort;
pub mod tx;
pub mod value;

pub use dialect::{Dialect, Quoting, Statement};
pub use error::{DialectError, Error, Result, ValidationError};
pub use tx::{Context, Database, Tx};
pub use value::{FromValue, Row, ToValue, Value};
