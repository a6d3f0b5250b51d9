//! timetable-db: async transactional data access for the timetable backend
//!
//! Two layers: a [`ConnectionManager`] owning the process-wide pool,
//! and a [`Store`] exposing scoped sessions, a retrying executor, and
//! generic filtered CRUD over [`Record`] kinds.

pub mod config;
pub mod error;
pub mod filter;
pub mod pool;
pub mod record;
pub mod retry;
pub mod store;
pub mod value;

pub use config::DbConfig;
pub use error::{DbError, Result};
pub use filter::{Filter, FilterSet};
pub use pool::ConnectionManager;
pub use record::{row_to_json, Record, RelationDef, RelationKind};
pub use retry::RetryPolicy;
pub use store::{Loaded, Store};
pub use value::{SqlValue, ValueKind};
