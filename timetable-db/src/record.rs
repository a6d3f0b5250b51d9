//! The record contract.
//!
//! A `Record` is a persisted entity: integer id assigned by storage,
//! immutable creation timestamp, typed fields, and named relations.
//! Each kind declares its table, a column registry (so filter
//! translation is a lookup, not reflection), and relation metadata for
//! eager loading.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, FromRow, Row, TypeInfo};

use crate::value::SqlValue;

/// Direction of a named relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// This kind holds a column pointing at the related row's id
    ManyToOne { local_key: &'static str },
    /// The related table holds a column pointing back at this kind's id
    OneToMany { remote_key: &'static str },
}

/// Static description of a navigable relation
#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    pub name: &'static str,
    pub table: &'static str,
    pub kind: RelationKind,
}

/// A persisted entity kind.
///
/// `COLUMNS` lists the non-id columns in insert order, `created_at`
/// first; `values()` must yield matching values. `FIELDS` is the
/// filterable column registry, including `id`.
pub trait Record: for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const FIELDS: &'static [&'static str];
    const RELATIONS: &'static [RelationDef] = &[];

    /// Storage-assigned identifier; `None` until persisted.
    fn id(&self) -> Option<i64>;

    /// Owned values aligned with `COLUMNS`.
    fn values(&self) -> Vec<SqlValue>;

    /// Typed accessor into the field registry.
    fn field(&self, name: &str) -> Option<SqlValue>;

    fn relation(name: &str) -> Option<&'static RelationDef> {
        Self::RELATIONS.iter().find(|r| r.name == name)
    }
}

/// Decode a row into a detached JSON object.
///
/// Used to materialize eagerly loaded relation rows without knowing
/// their kind at compile time. Unrecognized column types decode to
/// null rather than failing the whole load.
pub fn row_to_json(row: &PgRow) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match column.type_info().name() {
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)
                .ok()
                .flatten()
                .map(|v| serde_json::Value::from(v))
                .unwrap_or(serde_json::Value::Null),
            "INT4" => row
                .try_get::<Option<i32>, _>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "INT8" => row
                .try_get::<Option<i64>, _>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "BOOL" => row
                .try_get::<Option<bool>, _>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(idx)
                .ok()
                .flatten()
                .map(serde_json::Value::from)
                .unwrap_or(serde_json::Value::Null),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| serde_json::Value::from(v.to_rfc3339()))
                .unwrap_or(serde_json::Value::Null),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .ok()
                .flatten()
                .map(|v| serde_json::Value::from(v.to_string()))
                .unwrap_or(serde_json::Value::Null),
            _ => serde_json::Value::Null,
        };
        map.insert(column.name().to_string(), value);
    }
    serde_json::Value::Object(map)
}
