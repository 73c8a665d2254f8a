use super::Dialect;
use crate::aggregate::Aggregate;
use crate::error::{DialectError, Result};
use crate::predicate::{Argument, Arity, Predicate};
use crate::sort::Sort;
use crate::value::Value;

/// Compiled SQL with its arguments in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Bound arguments of one statement. Placeholder numbers follow push order,
/// so SET arguments of an UPDATE precede its WHERE arguments.
struct Params<'a> {
    dialect: &'a Dialect,
    args: Vec<Value>,
}

impl<'a> Params<'a> {
    fn new(dialect: &'a Dialect) -> Self {
        Params {
            dialect,
            args: Vec::new(),
        }
    }

    fn push(&mut self, value: Value) -> String {
        self.args.push(self.dialect.bind(value));
        self.dialect.placeholder(self.args.len())
    }

    fn push_list(&mut self, values: Vec<Value>) -> String {
        values
            .into_iter()
            .map(|value| self.push(value))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Dialect {
    /// WHERE fragments in predicate order, plus their bound arguments.
    ///
    /// Membership tests with an empty list produce no fragment.
    pub fn compile_where(&self, preds: &[Predicate]) -> (Vec<String>, Vec<Value>) {
        let mut params = Params::new(self);
        let frags = self.where_fragments(preds, &mut params);
        (frags, params.args)
    }

    fn where_fragments(&self, preds: &[Predicate], params: &mut Params<'_>) -> Vec<String> {
        preds
            .iter()
            .filter_map(|pred| self.predicate_fragment(pred, params))
            .collect()
    }

    fn predicate_fragment(&self, pred: &Predicate, params: &mut Params<'_>) -> Option<String> {
        let col = self.quote(&pred.col);
        let op = pred.op.sql();
        let frag = match (pred.op.arity(), &pred.arg) {
            (Arity::Unary, _) => format!("{col} {op}"),
            (_, Argument::Column(other)) => match pred.op.arity() {
                Arity::List => format!("{col} {op} ({})", self.quote(other)),
                _ => format!("{col} {op} {}", self.quote(other)),
            },
            (Arity::List, Argument::List(values)) => {
                if values.is_empty() {
                    return None;
                }
                format!("{col} {op} ({})", params.push_list(values.clone()))
            }
            (Arity::List, Argument::Value(value)) => {
                format!("{col} {op} ({})", params.push(value.clone()))
            }
            (Arity::List, Argument::None) => return None,
            (Arity::Binary, Argument::Value(value)) => {
                format!("{col} {op} {}", params.push(value.clone()))
            }
            (Arity::Binary, Argument::List(values)) => {
                format!("{col} {op} {}", params.push(Value::Array(values.clone())))
            }
            (Arity::Binary, Argument::None) => format!("{col} {op} {}", params.push(Value::Null)),
        };
        Some(frag)
    }

    /// ORDER BY fragments, e.g. `"id" DESC`.
    pub fn compile_order_by(&self, sorts: &[Sort]) -> Vec<String> {
        sorts
            .iter()
            .map(|sort| format!("{} {}", self.quote(&sort.col), sort.direction.sql()))
            .collect()
    }

    /// `LIMIT n` / `OFFSET n`, each only when non-zero. SQLite only accepts
    /// `OFFSET` after a `LIMIT`, so it gets an unbounded one.
    pub fn compile_limit_offset(&self, limit: u64, offset: u64) -> Vec<String> {
        let mut frags = Vec::new();
        if limit > 0 {
            frags.push(format!("LIMIT {limit}"));
        } else if let (true, Some(unbounded)) = (offset > 0, self.unbounded_limit) {
            frags.push(format!("LIMIT {unbounded}"));
        }
        if offset > 0 {
            frags.push(format!("OFFSET {offset}"));
        }
        frags
    }

    /// Select-list entries, e.g. `AVG("age") avg_age`.
    pub fn compile_aggregates(&self, aggs: &[Aggregate]) -> Vec<String> {
        aggs.iter()
            .map(|agg| {
                let col = self.quote(&agg.col);
                match (agg.reducer.sql(), agg.alias()) {
                    (Some(func), Some(alias)) => format!("{func}({col}) {alias}"),
                    _ => col,
                }
            })
            .collect()
    }

    pub fn compile_group_by(&self, groups: &[&str]) -> Vec<String> {
        groups.iter().map(|group| self.quote(group)).collect()
    }

    pub fn select(
        &self,
        table: &str,
        columns: &[&str],
        preds: &[Predicate],
        sorts: &[Sort],
        limit: u64,
        offset: u64,
    ) -> Statement {
        let mut params = Params::new(self);
        let mut sql = format!("SELECT {} FROM {}", self.column_list(columns), self.quote(table));
        self.push_where(&mut sql, preds, &mut params);
        self.push_order_by(&mut sql, sorts);
        for frag in self.compile_limit_offset(limit, offset) {
            sql.push(' ');
            sql.push_str(&frag);
        }
        Statement {
            sql,
            args: params.args,
        }
    }

    /// Multi-row INSERT. `rows` must be non-empty and each row must match
    /// `columns` in length.
    ///
    /// Fails with `UnsupportedFeature` when `returning` is requested from a
    /// dialect without `RETURNING`.
    pub fn insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
        returning: Option<&str>,
    ) -> Result<Statement> {
        if returning.is_some() && !self.returning {
            return Err(DialectError::UnsupportedFeature {
                dialect: self.name,
                feature: "RETURNING",
            }
            .into());
        }

        let mut params = Params::new(self);
        let values: Vec<String> = rows
            .into_iter()
            .map(|row| format!("({})", params.push_list(row)))
            .collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote(table),
            self.column_list(columns),
            values.join(",")
        );
        if let Some(col) = returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.quote(col));
        }
        Ok(Statement {
            sql,
            args: params.args,
        })
    }

    pub fn update(&self, table: &str, sets: Vec<(&str, Value)>, preds: &[Predicate]) -> Statement {
        let mut params = Params::new(self);
        let assignments: Vec<String> = sets
            .into_iter()
            .map(|(col, value)| format!("{} = {}", self.quote(col), params.push(value)))
            .collect();
        let mut sql = format!("UPDATE {} SET {}", self.quote(table), assignments.join(", "));
        self.push_where(&mut sql, preds, &mut params);
        Statement {
            sql,
            args: params.args,
        }
    }

    pub fn delete(&self, table: &str, preds: &[Predicate]) -> Statement {
        let mut params = Params::new(self);
        let mut sql = format!("DELETE FROM {}", self.quote(table));
        self.push_where(&mut sql, preds, &mut params);
        Statement {
            sql,
            args: params.args,
        }
    }

    pub fn aggregate(
        &self,
        table: &str,
        aggs: &[Aggregate],
        preds: &[Predicate],
        sorts: &[Sort],
        groups: &[&str],
    ) -> Statement {
        let mut params = Params::new(self);
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.compile_aggregates(aggs).join(","),
            self.quote(table)
        );
        self.push_where(&mut sql, preds, &mut params);
        let groups = self.compile_group_by(groups);
        if !groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&groups.join(", "));
        }
        self.push_order_by(&mut sql, sorts);
        Statement {
            sql,
            args: params.args,
        }
    }

    fn column_list(&self, columns: &[&str]) -> String {
        columns
            .iter()
            .map(|col| self.quote(col))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn push_where(&self, sql: &mut String, preds: &[Predicate], params: &mut Params<'_>) {
        let frags = self.where_fragments(preds, params);
        if !frags.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&frags.join(" AND "));
        }
    }

    fn push_order_by(&self, sql: &mut String, sorts: &[Sort]) {
        let frags = self.compile_order_by(sorts);
        if !frags.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&frags.join(", "));
        }
    }
}
