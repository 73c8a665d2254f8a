use crate::dialect::Statement;
use crate::error::{DialectError, Error, Result};
use crate::tx::{Context, Database, Tx};
use crate::value::{Row, Value};
use chrono::{DateTime, NaiveDateTime, Utc};
use postgres::types::{to_sql_checked, IsNull, Kind, ToSql, Type};
use postgres::{Client, NoTls};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::any::Any;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Sync + Send>;

/// A Postgres server reached through a `postgres` connection string. Every
/// transaction opens its own client.
#[derive(Debug, Clone)]
pub struct PgDb {
    params: String,
}

impl PgDb {
    pub fn new(params: impl Into<String>) -> Self {
        PgDb {
            params: params.into(),
        }
    }
}

impl Database for PgDb {
    type Tx = PgTx;

    fn begin(&self, ctx: &Context) -> Result<PgTx> {
        ctx.check()?;
        let mut client = Client::connect(&self.params, NoTls)?;
        client.batch_execute("BEGIN")?;
        Ok(PgTx { client })
    }
}

pub struct PgTx {
    client: Client,
}

impl PgTx {
    /// Bound the next statement by the context deadline.
    fn arm(&mut self, ctx: &Context) -> Result<()> {
        ctx.check()?;
        if let Some(remaining) = ctx.remaining() {
            let millis = remaining.as_millis().max(1);
            self.client
                .batch_execute(&format!("SET LOCAL statement_timeout = {millis}"))?;
        }
        Ok(())
    }

    /// Run `f`, asking the server to cancel it once `ctx` is cancelled. An
    /// aborted statement reports the context error, not the server one.
    fn run<T>(
        &mut self,
        ctx: &Context,
        f: impl FnOnce(&mut Client) -> std::result::Result<T, postgres::Error>,
    ) -> Result<T> {
        self.arm(ctx)?;
        let token = self.client.cancel_token();
        let client = &mut self.client;
        let result = ctx.interrupt_on_cancel(
            move || {
                if let Err(err) = token.cancel_query(NoTls) {
                    log::warn!("failed to cancel postgres statement: {err}");
                }
            },
            || f(client),
        );
        result.map_err(|err| match ctx.check() {
            Err(ctx_err) => ctx_err,
            Ok(()) => err.into(),
        })
    }
}

impl Tx for PgTx {
    fn execute(&mut self, ctx: &Context, stmt: &Statement) -> Result<u64> {
        let params: Vec<Param<'_>> = stmt.args.iter().map(Param).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        self.run(ctx, |client| client.execute(stmt.sql.as_str(), &refs))
    }

    fn query(&mut self, ctx: &Context, stmt: &Statement) -> Result<Vec<Row>> {
        let params: Vec<Param<'_>> = stmt.args.iter().map(Param).collect();
        let refs: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self.run(ctx, |client| client.query(stmt.sql.as_str(), &refs))?;
        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| from_sql(row, i))
                    .collect::<Result<Vec<_>>>()
                    .map(Row::new)
            })
            .collect()
    }

    fn last_insert_id(&mut self) -> Result<i64> {
        Err(DialectError::UnsupportedFeature {
            dialect: "postgres",
            feature: "last insert id",
        }
        .into())
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.client.batch_execute("COMMIT")?;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.client.batch_execute("ROLLBACK")?;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Binds a [`Value`] by the parameter type the server inferred.
#[derive(Debug)]
struct Param<'a>(&'a Value);

impl ToSql for Param<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut postgres::types::private::BytesMut,
    ) -> std::result::Result<IsNull, BoxError> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::I64(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::BOOL => (*v != 0).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::U64(v) => match *ty {
                Type::NUMERIC => Decimal::from(*v).to_sql(ty, out),
                Type::FLOAT8 => (*v as f64).to_sql(ty, out),
                _ => i64::try_from(*v)?.to_sql(ty, out),
            },
            Value::F64(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                Type::NUMERIC => Decimal::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => match *ty {
                Type::UUID => uuid::Uuid::parse_str(v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => match *ty {
                Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Array(items) => match ty.kind() {
                Kind::Array(_) => {
                    let items: Vec<Param<'_>> = items.iter().map(Param).collect();
                    items.to_sql(ty, out)
                }
                _ => Err(format!("cannot bind an array to a parameter of type {ty}").into()),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn from_sql(row: &postgres::Row, index: usize) -> Result<Value> {
    let ty = row.columns()[index].type_().clone();
    let value = match ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(index)?.map(Value::Bool),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)?
            .map(|v| Value::I64(v.into())),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)?
            .map(|v| Value::I64(v.into())),
        Type::INT8 => row.try_get::<_, Option<i64>>(index)?.map(Value::I64),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)?
            .map(|v| Value::F64(v.into())),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(index)?.map(Value::F64),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(index)?
            .map(decimal_value)
            .transpose()?,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            row.try_get::<_, Option<String>>(index)?.map(Value::Text)
        }
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)?
            .map(Value::Timestamp),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(index)?
            .map(|v| Value::Timestamp(v.and_utc())),
        Type::UUID => row
            .try_get::<_, Option<uuid::Uuid>>(index)?
            .map(|v| Value::Text(v.to_string())),
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(Value::Bytes),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => row
            .try_get::<_, Option<Vec<Option<String>>>>(index)?
            .map(|items| array(items, Value::Text)),
        Type::INT4_ARRAY => row
            .try_get::<_, Option<Vec<Option<i32>>>>(index)?
            .map(|items| array(items, |v| Value::I64(v.into()))),
        Type::INT8_ARRAY => row
            .try_get::<_, Option<Vec<Option<i64>>>>(index)?
            .map(|items| array(items, Value::I64)),
        Type::FLOAT8_ARRAY => row
            .try_get::<_, Option<Vec<Option<f64>>>>(index)?
            .map(|items| array(items, Value::F64)),
        Type::BOOL_ARRAY => row
            .try_get::<_, Option<Vec<Option<bool>>>>(index)?
            .map(|items| array(items, Value::Bool)),
        other => {
            return Err(Error::conversion(format!(
                "unsupported postgres column type {other}"
            )))
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn array<T>(items: Vec<Option<T>>, f: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map(&f).unwrap_or(Value::Null))
            .collect(),
    )
}

/// Integral NUMERIC values decode as integers, the rest as floats.
fn decimal_value(v: Decimal) -> Result<Value> {
    if v.scale() == 0 {
        if let Some(i) = v.to_i64() {
            return Ok(Value::I64(i));
        }
        if let Some(u) = v.to_u64() {
            return Ok(Value::U64(u));
        }
    }
    v.to_f64()
        .map(Value::F64)
        .ok_or_else(|| Error::conversion(format!("numeric {v} does not fit in f64")))
}
