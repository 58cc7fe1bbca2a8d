//! Primary key values read back from the database and rendered as SQL
//! literals for DELETE statements.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use pgsubset_sql::Expr;
use rust_decimal::Decimal;
use tokio_postgres::Row;
use tokio_postgres::types::Type;
use uuid::Uuid;

/// A runtime SQL value.
///
/// Covers the scalar types primary keys are usually made of. Columns of any
/// other type (enums, `inet`, `interval`, ...) are read back as text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL
    Null,

    /// Boolean
    Bool(bool),

    /// 16-bit signed integer (SMALLINT)
    I16(i16),

    /// 32-bit signed integer (INTEGER)
    I32(i32),

    /// 64-bit signed integer (BIGINT)
    I64(i64),

    /// 32-bit float (REAL)
    F32(f32),

    /// 64-bit float (DOUBLE PRECISION)
    F64(f64),

    /// Decimal (NUMERIC)
    Decimal(Decimal),

    /// Text (TEXT, VARCHAR, etc.)
    String(String),

    /// Binary data (BYTEA)
    Bytes(Vec<u8>),

    /// UUID
    Uuid(Uuid),

    /// DATE
    Date(NaiveDate),

    /// TIME
    Time(NaiveTime),

    /// TIMESTAMP
    Timestamp(NaiveDateTime),

    /// TIMESTAMPTZ
    TimestampTz(DateTime<Utc>),
}

impl SqlValue {
    /// Returns true if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Whether values of `ty` can be decoded.
    pub fn supports(ty: &Type) -> bool {
        [
            Type::BOOL,
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT4,
            Type::FLOAT8,
            Type::NUMERIC,
            Type::TEXT,
            Type::VARCHAR,
            Type::BPCHAR,
            Type::NAME,
            Type::BYTEA,
            Type::UUID,
            Type::DATE,
            Type::TIME,
            Type::TIMESTAMP,
            Type::TIMESTAMPTZ,
        ]
        .contains(ty)
    }

    /// Decode column `idx` of `row`.
    ///
    /// Types outside [`supports`](Self::supports) are decoded as text, which
    /// only succeeds for text-like columns.
    pub fn from_column(row: &Row, idx: usize) -> Result<Self, tokio_postgres::Error> {
        let ty = row.columns()[idx].type_().clone();
        let value = match ty {
            Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(SqlValue::Bool),
            Type::INT2 => row.try_get::<_, Option<i16>>(idx)?.map(SqlValue::I16),
            Type::INT4 => row.try_get::<_, Option<i32>>(idx)?.map(SqlValue::I32),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(SqlValue::I64),
            Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx)?.map(SqlValue::F32),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(SqlValue::F64),
            Type::NUMERIC => row.try_get::<_, Option<Decimal>>(idx)?.map(SqlValue::Decimal),
            Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(idx)?.map(SqlValue::Bytes),
            Type::UUID => row.try_get::<_, Option<Uuid>>(idx)?.map(SqlValue::Uuid),
            Type::DATE => row.try_get::<_, Option<NaiveDate>>(idx)?.map(SqlValue::Date),
            Type::TIME => row.try_get::<_, Option<NaiveTime>>(idx)?.map(SqlValue::Time),
            Type::TIMESTAMP => row
                .try_get::<_, Option<NaiveDateTime>>(idx)?
                .map(SqlValue::Timestamp),
            Type::TIMESTAMPTZ => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)?
                .map(SqlValue::TimestampTz),
            _ => row.try_get::<_, Option<String>>(idx)?.map(SqlValue::String),
        };
        Ok(value.unwrap_or(SqlValue::Null))
    }

    /// Render as a SQL literal expression.
    ///
    /// Text-like values are single-quoted with embedded quotes doubled;
    /// numbers are written bare; bytes become a `bytea` hex literal.
    pub fn to_expr(&self) -> Expr {
        match self {
            SqlValue::Null => Expr::Null,
            SqlValue::Bool(b) => Expr::Bool(*b),
            SqlValue::I16(n) => Expr::Int(i64::from(*n)),
            SqlValue::I32(n) => Expr::Int(i64::from(*n)),
            SqlValue::I64(n) => Expr::Int(*n),
            SqlValue::F32(n) => float_expr(f64::from(*n), n.to_string()),
            SqlValue::F64(n) => float_expr(*n, n.to_string()),
            SqlValue::Decimal(d) => Expr::Numeric(d.to_string()),
            SqlValue::String(s) => Expr::String(s.clone()),
            SqlValue::Bytes(b) => Expr::Bytes(b.clone()),
            SqlValue::Uuid(u) => Expr::String(u.to_string()),
            SqlValue::Date(d) => Expr::String(d.to_string()),
            SqlValue::Time(t) => Expr::String(t.to_string()),
            SqlValue::Timestamp(ts) => Expr::String(ts.to_string()),
            SqlValue::TimestampTz(ts) => Expr::String(ts.to_rfc3339()),
        }
    }
}

/// Finite floats are bare numerics; NaN and infinities only exist as quoted
/// strings in Postgres.
fn float_expr(value: f64, text: String) -> Expr {
    if value.is_nan() {
        Expr::string("NaN")
    } else if value.is_infinite() {
        Expr::string(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        Expr::Numeric(text)
    }
}

// Convenient From impls
impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_owned())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}
