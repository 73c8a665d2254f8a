//! Aggregate IR and the positional destinations aggregate rows scan into.

use crate::error::{Error, Result};
use crate::value::{FromRow, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reducer {
    /// Pass the column through, typically a group-by column.
    None,
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl Reducer {
    /// SQL function name, `None` for the pass-through reducer.
    pub fn sql(&self) -> Option<&'static str> {
        match self {
            Reducer::None => None,
            Reducer::Avg => Some("AVG"),
            Reducer::Count => Some("COUNT"),
            Reducer::Max => Some("MAX"),
            Reducer::Min => Some("MIN"),
            Reducer::Sum => Some("SUM"),
        }
    }

    /// Lowercase prefix of the output alias, e.g. `avg` in `avg_age`.
    pub fn alias_prefix(&self) -> Option<&'static str> {
        match self {
            Reducer::None => None,
            Reducer::Avg => Some("avg"),
            Reducer::Count => Some("count"),
            Reducer::Max => Some("max"),
            Reducer::Min => Some("min"),
            Reducer::Sum => Some("sum"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub col: String,
    pub reducer: Reducer,
}

impl Aggregate {
    pub fn new(col: impl Into<String>, reducer: Reducer) -> Self {
        Aggregate {
            col: col.into(),
            reducer,
        }
    }

    /// Output alias `<fn>_<column>`, or `None` for pass-through columns.
    pub fn alias(&self) -> Option<String> {
        self.reducer
            .alias_prefix()
            .map(|prefix| format!("{prefix}_{}", self.col))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregates {
    aggs: Vec<Aggregate>,
}

impl Aggregates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(afs: impl IntoIterator<Item = AggFunc>) -> Self {
        let mut aggs = Aggregates::new();
        for af in afs {
            af(&mut aggs);
        }
        aggs
    }

    pub fn add(&mut self, agg: Aggregate) {
        self.aggs.push(agg);
    }

    pub fn all(&self) -> &[Aggregate] {
        &self.aggs
    }

    pub fn len(&self) -> usize {
        self.aggs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggs.is_empty()
    }
}

pub type AggFunc = Box<dyn FnOnce(&mut Aggregates) + Send>;

/// Destination of an aggregate query.
///
/// `arity` is the number of typed slots per row. It must equal the number
/// of aggregate columns, which is checked before the statement runs.
pub trait AggregateSink {
    fn arity(&self) -> usize;

    fn push_row(&mut self, row: &Row) -> Result<()>;

    fn check_arity(&self, columns: usize) -> Result<()> {
        let fields = self.arity();
        if fields != columns {
            return Err(Error::AggregateShapeMismatch { columns, fields });
        }
        Ok(())
    }
}

impl<T: FromRow> AggregateSink for Vec<T> {
    fn arity(&self) -> usize {
        T::ARITY
    }

    fn push_row(&mut self, row: &Row) -> Result<()> {
        self.push(T::from_row(row)?);
        Ok(())
    }
}
