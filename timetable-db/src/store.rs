//! Transactional data access.
//!
//! `Store` is the sole entry point to storage. Every operation runs
//! inside one scoped session: a transaction checked out of the pool,
//! committed on success and rolled back on any other exit path
//! (including task cancellation, via the transaction's drop guard).
//! The retrying executor wraps a fresh session around each attempt,
//! so transient pool and network failures self-heal without
//! caller-visible complexity.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use sqlx::{PgConnection, Row};

use crate::error::{DbError, Result};
use crate::filter::{render_where, FilterMode, FilterSet};
use crate::pool::ConnectionManager;
use crate::record::{row_to_json, Record, RelationDef, RelationKind};
use crate::retry::RetryPolicy;
use crate::value::{arguments_from, SqlValue};

/// A record with its eagerly loaded relations.
///
/// Relation rows are detached JSON copies of committed state, keyed by
/// relation name. Every requested relation has an entry, possibly
/// empty.
#[derive(Debug)]
pub struct Loaded<R> {
    pub record: R,
    pub related: BTreeMap<&'static str, Vec<serde_json::Value>>,
}

/// Transactional data-access layer over the shared pool
pub struct Store {
    manager: ConnectionManager,
    retry: RetryPolicy,
}

impl Store {
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(manager: ConnectionManager, retry: RetryPolicy) -> Self {
        Self { manager, retry }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Scoped session: one transaction handed to `op`, committed on
    /// `Ok`, rolled back otherwise. The only sanctioned way to touch
    /// storage; no retry happens here.
    pub async fn with_session<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T>>,
    {
        let pool = self.manager.acquire().await?;
        let mut tx = pool.begin().await.map_err(DbError::from)?;
        let value = op(&mut *tx).await?;
        tx.commit().await.map_err(DbError::from)?;
        Ok(value)
    }

    /// Retrying executor: each attempt runs `op` inside a fresh scoped
    /// session. Only transient failures are retried; constraint and
    /// usage errors surface on the first attempt.
    pub async fn execute<T, F>(&self, label: &str, op: F) -> Result<T>
    where
        F: for<'c> Fn(&'c mut PgConnection) -> BoxFuture<'c, Result<T>> + Sync,
    {
        self.retry.run(label, || self.with_session(&op)).await
    }

    /// Run an opaque statement under the retry policy.
    pub async fn execute_sql(&self, sql: &str) -> Result<u64> {
        self.execute("execute_sql", move |conn: &mut PgConnection| {
            let sql = sql.to_owned();
            Box::pin(async move {
                let done = sqlx::query(&sql)
                    .execute(conn)
                    .await
                    .map_err(DbError::from)?;
                Ok(done.rows_affected())
            })
        })
        .await
    }

    /// Insert a record and return its storage-assigned id.
    pub async fn add<R: Record>(&self, record: &R) -> Result<i64> {
        let label = format!("add {}", R::TABLE);
        let sql = insert_sql::<R>();
        let values = record.values();
        let id = self
            .execute(&label, move |conn: &mut PgConnection| {
                let sql = sql.clone();
                let values = values.clone();
                Box::pin(async move {
                    let args = arguments_from(values).map_err(DbError::from)?;
                    let row = sqlx::query_with(&sql, args)
                        .fetch_one(conn)
                        .await
                        .map_err(DbError::from)?;
                    row.try_get::<i64, _>(0).map_err(DbError::from)
                })
            })
            .await?;
        tracing::info!(table = R::TABLE, id, "record added");
        Ok(id)
    }

    /// Merge the record's state into the row keyed by its id. A row
    /// that does not exist yet is created (merge-as-insert); the
    /// creation timestamp is never overwritten.
    pub async fn update<R: Record>(&self, record: &R) -> Result<i64> {
        let id = record.id().ok_or(DbError::MissingId { table: R::TABLE })?;
        let label = format!("update {}", R::TABLE);
        let sql = upsert_sql::<R>();
        let mut values = vec![SqlValue::Int(id)];
        values.extend(record.values());
        let id = self
            .execute(&label, move |conn: &mut PgConnection| {
                let sql = sql.clone();
                let values = values.clone();
                Box::pin(async move {
                    let args = arguments_from(values).map_err(DbError::from)?;
                    let row = sqlx::query_with(&sql, args)
                        .fetch_one(conn)
                        .await
                        .map_err(DbError::from)?;
                    row.try_get::<i64, _>(0).map_err(DbError::from)
                })
            })
            .await?;
        tracing::info!(table = R::TABLE, id, "record updated");
        Ok(id)
    }

    /// Delete all rows matching the equality filters, atomically.
    /// Returns the count deleted; zero matches is not an error. A
    /// filter set with no recognized column is rejected rather than
    /// deleting the whole table.
    pub async fn delete<R: Record>(&self, filters: &FilterSet) -> Result<u64> {
        let (clause, binds) = render_where(R::TABLE, R::FIELDS, filters, FilterMode::Lenient)?;
        if clause.is_empty() {
            return Err(DbError::EmptyFilter { table: R::TABLE });
        }
        let label = format!("delete {}", R::TABLE);
        let sql = format!("DELETE FROM {}{}", R::TABLE, clause);
        let count = self
            .execute(&label, move |conn: &mut PgConnection| {
                let sql = sql.clone();
                let binds = binds.clone();
                Box::pin(async move {
                    let args = arguments_from(binds).map_err(DbError::from)?;
                    let done = sqlx::query_with(&sql, args)
                        .execute(conn)
                        .await
                        .map_err(DbError::from)?;
                    Ok(done.rows_affected())
                })
            })
            .await?;
        tracing::info!(table = R::TABLE, count, "records deleted");
        Ok(count)
    }

    /// Fetch records by equality filters. Unknown filter fields are
    /// skipped; result order is the storage engine's default.
    pub async fn get<R: Record>(
        &self,
        filters: Option<&FilterSet>,
        limit: Option<i64>,
    ) -> Result<Vec<R>> {
        self.fetch("get", filters, limit, FilterMode::Lenient).await
    }

    /// Fetch records for availability lookups: `not_in` exclusions are
    /// honored and unknown filter fields are rejected.
    pub async fn get_for_schedule<R: Record>(
        &self,
        filters: Option<&FilterSet>,
        limit: Option<i64>,
    ) -> Result<Vec<R>> {
        self.fetch("get_for_schedule", filters, limit, FilterMode::Strict)
            .await
    }

    async fn fetch<R: Record>(
        &self,
        operation: &str,
        filters: Option<&FilterSet>,
        limit: Option<i64>,
        mode: FilterMode,
    ) -> Result<Vec<R>> {
        let empty = FilterSet::new();
        let filters = filters.unwrap_or(&empty);
        let (clause, binds) = render_where(R::TABLE, R::FIELDS, filters, mode)?;
        if !filters.is_empty() && clause.is_empty() {
            tracing::warn!(table = R::TABLE, "no recognized filter fields applied");
        }
        let label = format!("{operation} {}", R::TABLE);
        let sql = select_sql::<R>(&clause, limit);
        let records = self
            .execute(&label, move |conn: &mut PgConnection| {
                let sql = sql.clone();
                let binds = binds.clone();
                Box::pin(async move {
                    let args = arguments_from(binds).map_err(DbError::from)?;
                    sqlx::query_as_with::<_, R, _>(&sql, args)
                        .fetch_all(conn)
                        .await
                        .map_err(DbError::from)
                })
            })
            .await?;
        tracing::debug!(table = R::TABLE, count = records.len(), "records fetched");
        Ok(records)
    }

    /// As `get`, but eagerly materializes the named relations: one
    /// batched lookup per relation, so callers traversing e.g.
    /// schedule → teacher → name do not fan out into per-row queries.
    /// The parent fetch and every relation batch run inside the same
    /// session, so all rows come from one consistent snapshot.
    pub async fn get_with_relations<R: Record>(
        &self,
        filters: Option<&FilterSet>,
        limit: Option<i64>,
        relations: &[&str],
    ) -> Result<Vec<Loaded<R>>> {
        // resolve names up front so a typo fails before touching storage
        let mut defs = Vec::with_capacity(relations.len());
        for name in relations {
            let def = R::relation(name).ok_or_else(|| DbError::UnknownRelation {
                table: R::TABLE,
                relation: (*name).to_owned(),
            })?;
            defs.push(def);
        }

        let empty = FilterSet::new();
        let filters = filters.unwrap_or(&empty);
        let (clause, binds) = render_where(R::TABLE, R::FIELDS, filters, FilterMode::Lenient)?;
        if !filters.is_empty() && clause.is_empty() {
            tracing::warn!(table = R::TABLE, "no recognized filter fields applied");
        }
        let sql = select_sql::<R>(&clause, limit);
        let label = format!("get_with_relations {}", R::TABLE);
        let loaded = self
            .execute(&label, move |conn: &mut PgConnection| {
                let sql = sql.clone();
                let binds = binds.clone();
                let defs = defs.clone();
                Box::pin(async move {
                    let args = arguments_from(binds).map_err(DbError::from)?;
                    let records: Vec<R> = sqlx::query_as_with::<_, R, _>(&sql, args)
                        .fetch_all(&mut *conn)
                        .await
                        .map_err(DbError::from)?;
                    let mut loaded: Vec<Loaded<R>> = records
                        .into_iter()
                        .map(|record| {
                            let mut related = BTreeMap::new();
                            for def in &defs {
                                related.insert(def.name, Vec::new());
                            }
                            Loaded { record, related }
                        })
                        .collect();
                    for def in defs {
                        attach_relation(&mut *conn, &mut loaded, def).await?;
                    }
                    Ok(loaded)
                })
            })
            .await?;
        tracing::debug!(
            table = R::TABLE,
            count = loaded.len(),
            "records fetched with relations"
        );
        Ok(loaded)
    }
}

/// Load one relation batch on the caller's session and attach the rows.
async fn attach_relation<R: Record>(
    conn: &mut PgConnection,
    loaded: &mut [Loaded<R>],
    def: &'static RelationDef,
) -> Result<()> {
    match def.kind {
        RelationKind::ManyToOne { local_key } => {
            let mut keys: Vec<i64> = loaded
                .iter()
                .filter_map(|item| item.record.field(local_key)?.as_int())
                .collect();
            keys.sort_unstable();
            keys.dedup();
            if keys.is_empty() {
                return Ok(());
            }
            let rows = related_rows(conn, def.table, "id", keys).await?;
            let by_id: BTreeMap<i64, serde_json::Value> = rows.into_iter().collect();
            for item in loaded.iter_mut() {
                let key = item.record.field(local_key).and_then(|v| v.as_int());
                if let Some(value) = key.and_then(|k| by_id.get(&k)) {
                    item.related
                        .entry(def.name)
                        .or_default()
                        .push(value.clone());
                }
            }
        }
        RelationKind::OneToMany { remote_key } => {
            let mut keys: Vec<i64> = loaded.iter().filter_map(|item| item.record.id()).collect();
            keys.sort_unstable();
            keys.dedup();
            if keys.is_empty() {
                return Ok(());
            }
            let rows = related_rows(conn, def.table, remote_key, keys).await?;
            let mut by_key: BTreeMap<i64, Vec<serde_json::Value>> = BTreeMap::new();
            for (key, value) in rows {
                by_key.entry(key).or_default().push(value);
            }
            for item in loaded.iter_mut() {
                if let Some(values) = item.record.id().and_then(|id| by_key.get(&id)) {
                    item.related
                        .entry(def.name)
                        .or_default()
                        .extend(values.iter().cloned());
                }
            }
        }
    }
    Ok(())
}

/// One batched relation lookup: rows of `table` whose `key_column` is
/// in `keys`, decoded to detached JSON alongside the key.
async fn related_rows(
    conn: &mut PgConnection,
    table: &'static str,
    key_column: &'static str,
    keys: Vec<i64>,
) -> Result<Vec<(i64, serde_json::Value)>> {
    let sql = format!("SELECT * FROM {table} WHERE {key_column} = ANY($1)");
    let rows = sqlx::query(&sql)
        .bind(keys)
        .fetch_all(conn)
        .await
        .map_err(DbError::from)?;
    rows.iter()
        .map(|row| {
            let key: i64 = row.try_get(key_column).map_err(DbError::from)?;
            Ok((key, row_to_json(row)))
        })
        .collect()
}

fn insert_sql<R: Record>() -> String {
    let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

fn upsert_sql<R: Record>() -> String {
    let mut columns = vec!["id"];
    columns.extend_from_slice(R::COLUMNS);
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    // created_at is immutable once persisted
    let assignments: Vec<String> = R::COLUMNS
        .iter()
        .filter(|c| **c != "created_at")
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT (id) DO UPDATE SET {} RETURNING id",
        R::TABLE,
        columns.join(", "),
        placeholders.join(", "),
        assignments.join(", ")
    )
}

fn select_sql<R: Record>(clause: &str, limit: Option<i64>) -> String {
    let mut sql = format!("SELECT * FROM {}{}", R::TABLE, clause);
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    sql
}
