//! Transaction implementations for concrete stores.

pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;
