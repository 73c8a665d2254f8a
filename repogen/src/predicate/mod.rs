//! Predicate IR: one comparison, null test or membership test per entry.

use crate::value::Value;
use std::fmt;

/// Comparison operators. The set is closed; every dialect compiles all of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    GtOrEq,
    Lt,
    LtOrEq,
    IsNull,
    IsNotNull,
    In,
    NotIn,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Gt,
        Operator::GtOrEq,
        Operator::Lt,
        Operator::LtOrEq,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::In,
        Operator::NotIn,
    ];

    /// Snake-case name, used as the builder function suffix.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::NotEq => "not_eq",
            Operator::Gt => "gt",
            Operator::GtOrEq => "gt_or_eq",
            Operator::Lt => "lt",
            Operator::LtOrEq => "lt_or_eq",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
            Operator::In => "in",
            Operator::NotIn => "not_in",
        }
    }

    pub fn desc(&self) -> &'static str {
        match self {
            Operator::Eq => "equal",
            Operator::NotEq => "not equal",
            Operator::Gt => "greater than",
            Operator::GtOrEq => "greater than or equal",
            Operator::Lt => "less than",
            Operator::LtOrEq => "less than or equal",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }

    /// SQL spelling of the operator.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Gt => ">",
            Operator::GtOrEq => ">=",
            Operator::Lt => "<",
            Operator::LtOrEq => "<=",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            Operator::IsNull | Operator::IsNotNull => Arity::Unary,
            Operator::In | Operator::NotIn => Arity::List,
            _ => Arity::Binary,
        }
    }

    /// Eq/NotEq and the Gt/Lt family can compare against another column.
    pub fn accepts_column(&self) -> bool {
        self.arity() == Arity::Binary
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.desc())
    }
}

/// How many right-hand operands an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
    List,
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Null tests carry no operand.
    None,
    Value(Value),
    /// In/NotIn operands. May be empty.
    List(Vec<Value>),
    /// Another column, emitted as an identifier and never bound.
    Column(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub col: String,
    pub op: Operator,
    pub arg: Argument,
}

impl Predicate {
    pub fn new(col: impl Into<String>, op: Operator, arg: Argument) -> Self {
        Predicate {
            col: col.into(),
            op,
            arg,
        }
    }
}

/// Ordered, append-only accumulator of predicates for one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicates {
    preds: Vec<Predicate>,
}

impl Predicates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply each builder function in the order given.
    pub fn collect(pfs: impl IntoIterator<Item = PredFunc>) -> Self {
        let mut preds = Predicates::new();
        for pf in pfs {
            pf(&mut preds);
        }
        preds
    }

    pub fn add(&mut self, pred: Predicate) {
        self.preds.push(pred);
    }

    /// Entries in insertion order.
    pub fn all(&self) -> &[Predicate] {
        &self.preds
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }
}

/// A builder function: appends one predicate when applied.
pub type PredFunc = Box<dyn FnOnce(&mut Predicates) + Send>;
