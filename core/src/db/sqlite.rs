// FleetDocs
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Common utilities to interact with an SQLite database.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use async_trait::async_trait;
use log::warn;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions,
};
use std::ops::{Deref, DerefMut};
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;

/// Maximum time a connection waits for another one to release the write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        e if e.to_string().contains("FOREIGN KEY constraint failed") => DbError::NotFound,
        e if e.to_string().contains("UNIQUE constraint failed") => DbError::AlreadyExists,
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        e => DbError::BackendError(e.to_string()),
    }
}

/// Creates a new connection pool against the database at `conn_str`.
///
/// `conn_str` is an sqlx SQLite URL such as `sqlite://fleet.db?mode=rwc` or `sqlite::memory:`.
/// Connections wait up to `BUSY_TIMEOUT` for a competing writer instead of failing right away.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    let options = SqliteConnectOptions::from_str(conn_str)
        .map_err(map_sqlx_error)?
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);
    let pool = SqlitePoolOptions::new().connect_with(options).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// A generic database executor implementation for SQLite.
///
/// Dereferences to the underlying connection so that `&mut **ex` can be handed to sqlx queries
/// regardless of whether the executor is backed by a transaction or not.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// An executor backed by a pool.  Operations issued via this executor aren't guaranteed to
    /// happen on the same connection.
    PoolExec(PoolConnection<Sqlite>),

    /// An executor backed by a transaction.
    TxExec(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Commits the transaction if this executor is backed by one.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::PoolExec(_) => {
                Err(DbError::BackendError("Cannot commit a direct executor".to_owned()))
            }
            SqliteExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

impl Deref for SqliteExecutor {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        match self {
            SqliteExecutor::PoolExec(conn) => &**conn,
            SqliteExecutor::TxExec(tx) => &**tx,
        }
    }
}

impl DerefMut for SqliteExecutor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            SqliteExecutor::PoolExec(conn) => &mut **conn,
            SqliteExecutor::TxExec(tx) => &mut **tx,
        }
    }
}

/// A database instance backed by an SQLite database.
pub struct SqliteDb {
    /// Shared SQLite connection pool.  This is a cloneable type that all concurrent
    /// transactions can use concurrently.
    pool: SqlitePool,
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping connection without having called close() first");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Executor::Sqlite(SqliteExecutor::PoolExec(conn)))
    }

    /// Transactions take the write lock upfront.  A deferred transaction that reads and then
    /// writes cannot wait for a competing writer and would fail with a locked database.
    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Helper function to initialize the database with a schema.
pub async fn run_schema(e: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(&mut **e).await.map_err(map_sqlx_error)?;
    Ok(())
}

/// Converts a timestamp as extracted from the database into an `OffsetDateTime`.
///
/// SQLite has no native timestamp type, so timestamps are stored as the number of microseconds
/// since the epoch.  A single integer keeps relational operators in SQL queries meaningful.
pub fn build_timestamp(timestamp_us: i64) -> DbResult<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(timestamp_us) * 1000)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid timestamp: {}", e)))
}

/// Converts an optional timestamp as extracted from the database into an `OffsetDateTime`.
pub fn build_optional_timestamp(timestamp_us: Option<i64>) -> DbResult<Option<OffsetDateTime>> {
    timestamp_us.map(build_timestamp).transpose()
}

/// Converts a timestamp into the microseconds quantity stored in the database.
///
/// Any sub-microsecond precision in `ts` is discarded.
pub fn unpack_timestamp(ts: OffsetDateTime) -> i64 {
    ts.unix_timestamp() * 1_000_000 + i64::from(ts.microsecond())
}

/// Test utilities for the SQLite connection.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Initializes the test database.
    ///
    /// The pool is restricted to a single connection so that concurrent transactions serialize
    /// instead of tripping over shared-cache table locks.  Callers must therefore not hold a
    /// direct executor while running an operation that begins a transaction.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        SqliteDb { pool }
    }

    /// Initializes a test database stored in a file within `dir`.
    ///
    /// Unlike `setup`, the pool holds multiple connections, so transactions issued concurrently
    /// run on different connections and compete for the database locks.
    pub async fn setup_file(dir: &std::path::Path) -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        let url = format!("sqlite://{}?mode=rwc", dir.join("test.db").display());
        connect(&url).await.unwrap()
    }
}
