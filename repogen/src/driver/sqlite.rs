use crate::dialect::Statement;
use crate::error::Result;
use crate::tx::{Context, Database, Tx};
use crate::value::{Row, Value};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Virtual machine steps between cancellation checks.
const PROGRESS_OPS: i32 = 1000;

/// A SQLite database file. Every transaction opens its own connection, so
/// concurrent callers never share one.
#[derive(Debug, Clone)]
pub struct SqliteDb {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteDb {
    pub fn open(path: impl AsRef<Path>) -> Self {
        SqliteDb {
            path: path.as_ref().to_path_buf(),
            busy_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run SQL outside of any transaction, e.g. to create tables.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}

impl Database for SqliteDb {
    type Tx = SqliteTx;

    fn begin(&self, ctx: &Context) -> Result<SqliteTx> {
        ctx.check()?;
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.execute_batch("BEGIN")?;
        log::debug!("began transaction on {}", self.path.display());
        Ok(SqliteTx { conn })
    }
}

pub struct SqliteTx {
    conn: Connection,
}

impl SqliteTx {
    /// Run `f` while a progress handler aborts it once `ctx` is done.
    /// An aborted statement reports the context error, not the SQLite one.
    fn run<T>(
        &mut self,
        ctx: &Context,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        ctx.check()?;
        let watched = ctx.clone();
        self.conn
            .progress_handler(PROGRESS_OPS, Some(move || watched.check().is_err()));
        let result = f(&self.conn);
        self.conn.progress_handler(PROGRESS_OPS, None::<fn() -> bool>);

        result.map_err(|err| match ctx.check() {
            Err(ctx_err) => ctx_err,
            Ok(()) => err.into(),
        })
    }
}

impl Tx for SqliteTx {
    fn execute(&mut self, ctx: &Context, stmt: &Statement) -> Result<u64> {
        self.run(ctx, |conn| {
            let mut prepared = conn.prepare(&stmt.sql)?;
            let affected = prepared.execute(params_from_iter(stmt.args.iter().map(Param)))?;
            Ok(affected as u64)
        })
    }

    fn query(&mut self, ctx: &Context, stmt: &Statement) -> Result<Vec<Row>> {
        self.run(ctx, |conn| {
            let mut prepared = conn.prepare(&stmt.sql)?;
            let width = prepared.column_count();
            let rows = prepared.query_map(params_from_iter(stmt.args.iter().map(Param)), |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(from_sql))
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map(Row::new)
            })?;
            rows.collect()
        })
    }

    fn last_insert_id(&mut self) -> Result<i64> {
        Ok(self.conn.last_insert_rowid())
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Param<'a>(&'a Value);

impl ToSql for Param<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let out = match self.0 {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Value::I64(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            // SQLite integers are signed 64-bit
            Value::U64(v) => ToSqlOutput::Owned(SqlValue::Integer(
                i64::try_from(*v).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?,
            )),
            Value::F64(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Bytes(v) => ToSqlOutput::Borrowed(ValueRef::Blob(&v[..])),
            Value::Timestamp(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_rfc3339())),
            // no native array type
            array @ Value::Array(_) => ToSqlOutput::Owned(SqlValue::Text(array.to_json().to_string())),
        };
        Ok(out)
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::I64(v),
        ValueRef::Real(v) => Value::F64(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Bytes(v.to_vec()),
    }
}
