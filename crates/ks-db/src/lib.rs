//! ks-db - Database abstraction layer for Keystone
//!
//! Provides the [`Database`] trait the engine executes against, the DuckDB
//! backend, and the registry of named database registrations with per-user
//! lazily created connections.

pub mod duckdb;
pub mod error;
pub mod registry;
pub mod traits;

pub use crate::duckdb::{DuckDbConnection, DuckDbConnector};
pub use error::{DbError, DbResult};
pub use registry::{Connector, DatabaseRegistration, DatabaseRegistry, DEFAULT_DATABASE};
pub use traits::{Database, RowSet, Value};
