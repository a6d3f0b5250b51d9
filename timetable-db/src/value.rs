//! Bindable scalar values.
//!
//! `SqlValue` is the owned, detached form of a column value. Filters and
//! record field registries both speak it, so filter translation is a
//! lookup over typed values rather than reflection.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::Arguments;

/// Column type of a NULL value. Postgres infers a concrete type for
/// every placeholder, so NULLs have to carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Text,
    Timestamp,
}

/// An owned scalar ready to be bound onto a query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null(ValueKind),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Append onto a bind-argument list, consuming the value.
    pub fn add_to(self, args: &mut PgArguments) -> std::result::Result<(), sqlx::Error> {
        let result = match self {
            SqlValue::Null(ValueKind::Bool) => args.add(Option::<bool>::None),
            SqlValue::Null(ValueKind::Int) => args.add(Option::<i64>::None),
            SqlValue::Null(ValueKind::Float) => args.add(Option::<f64>::None),
            SqlValue::Null(ValueKind::Text) => args.add(Option::<String>::None),
            SqlValue::Null(ValueKind::Timestamp) => args.add(Option::<DateTime<Utc>>::None),
            SqlValue::Bool(v) => args.add(v),
            SqlValue::Int(v) => args.add(v),
            SqlValue::Float(v) => args.add(v),
            SqlValue::Text(v) => args.add(v),
            SqlValue::Timestamp(v) => args.add(v),
        };
        result.map_err(sqlx::Error::Encode)
    }

    /// The integer payload, if this value carries one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Build a bind-argument list from owned values, in order.
pub fn arguments_from(
    values: Vec<SqlValue>,
) -> std::result::Result<PgArguments, sqlx::Error> {
    let mut args = PgArguments::default();
    for value in values {
        value.add_to(&mut args)?;
    }
    Ok(args)
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(v) => SqlValue::Text(v),
            None => SqlValue::Null(ValueKind::Text),
        }
    }
}

impl From<Option<i64>> for SqlValue {
    fn from(v: Option<i64>) -> Self {
        match v {
            Some(v) => SqlValue::Int(v),
            None => SqlValue::Null(ValueKind::Int),
        }
    }
}
