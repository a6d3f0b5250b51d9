//! Filter translation.
//!
//! A `FilterSet` maps field names to either an equality value or a
//! `not_in` exclusion set. Rendering checks names against the kind's
//! static column registry: lenient mode (plain reads, deletes) skips
//! unknown fields with a warning, strict mode (availability lookups)
//! rejects them. Placeholders are `$n`, values travel as binds.

use crate::error::{DbError, Result};
use crate::value::SqlValue;

/// One filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `field = value`
    Eq(SqlValue),
    /// `field NOT IN (values)`; an empty set matches everything
    NotIn(Vec<SqlValue>),
}

impl Filter {
    /// Translate the wire shape used by the admin endpoints: a scalar
    /// means equality, `{"not_in": [..]}` means exclusion. Any other
    /// structured operator is rejected.
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Filter> {
        match value {
            serde_json::Value::Object(map) => {
                if let Some(values) = map.get("not_in") {
                    let values = values
                        .as_array()
                        .ok_or_else(|| DbError::UnsupportedFilter {
                            field: field.to_owned(),
                            operator: "not_in (expects a list)".to_owned(),
                        })?
                        .iter()
                        .map(|v| json_scalar(field, v))
                        .collect::<Result<Vec<_>>>()?;
                    Ok(Filter::NotIn(values))
                } else {
                    let operator = map.keys().next().cloned().unwrap_or_default();
                    Err(DbError::UnsupportedFilter {
                        field: field.to_owned(),
                        operator,
                    })
                }
            }
            scalar => Ok(Filter::Eq(json_scalar(field, scalar)?)),
        }
    }
}

fn json_scalar(field: &str, value: &serde_json::Value) -> Result<SqlValue> {
    match value {
        serde_json::Value::Bool(v) => Ok(SqlValue::Bool(*v)),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(SqlValue::Int(v))
            } else {
                Ok(SqlValue::Float(n.as_f64().unwrap_or_default()))
            }
        }
        serde_json::Value::String(v) => Ok(SqlValue::Text(v.clone())),
        other => Err(DbError::UnsupportedFilter {
            field: field.to_owned(),
            operator: other.to_string(),
        }),
    }
}

/// Ordered set of filter conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    entries: Vec<(String, Filter)>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.entries.push((field.into(), Filter::Eq(value.into())));
        self
    }

    /// Add a set-exclusion condition.
    pub fn not_in<V: Into<SqlValue>>(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.entries.push((field.into(), Filter::NotIn(values)));
        self
    }

    /// Build from the JSON mapping shape the admin endpoints send.
    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut set = Self::new();
        for (field, value) in map {
            let filter = Filter::from_json(field, value)?;
            set.entries.push((field.clone(), filter));
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Filter)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FilterMode {
    /// Skip fields outside the registry (logged)
    Lenient,
    /// Reject fields outside the registry
    Strict,
}

/// Render a WHERE clause against `fields`, the kind's column registry.
/// Returns the clause (empty when nothing applied, leading `" WHERE "`
/// otherwise) and the bind list for placeholders starting at `$1`.
pub(crate) fn render_where(
    table: &'static str,
    fields: &[&str],
    filters: &FilterSet,
    mode: FilterMode,
) -> Result<(String, Vec<SqlValue>)> {
    let mut clauses: Vec<String> = Vec::new();
    let mut binds: Vec<SqlValue> = Vec::new();

    for (field, filter) in filters.iter() {
        if !fields.contains(&field.as_str()) {
            match mode {
                FilterMode::Lenient => {
                    tracing::warn!(table, field = %field, "skipping unknown filter field");
                    continue;
                }
                FilterMode::Strict => {
                    return Err(DbError::UnknownField {
                        table,
                        field: field.clone(),
                    });
                }
            }
        }
        match filter {
            Filter::Eq(value) => {
                clauses.push(format!("{field} = ${}", binds.len() + 1));
                binds.push(value.clone());
            }
            Filter::NotIn(values) => {
                // empty exclusion set excludes nothing
                if values.is_empty() {
                    continue;
                }
                let placeholders: Vec<String> = (0..values.len())
                    .map(|i| format!("${}", binds.len() + i + 1))
                    .collect();
                clauses.push(format!("{field} NOT IN ({})", placeholders.join(", ")));
                binds.extend(values.iter().cloned());
            }
        }
    }

    let clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    Ok((clause, binds))
}
