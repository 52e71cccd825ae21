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

//! Persistence gateway for users.
//!
//! Every read here only considers active users.  The only exception is `user_conflicts`, because
//! the uniqueness constraints in the store also cover deleted users.

use crate::model::{HashedPassword, User, UserId};
#[cfg(feature = "postgres")]
use fleetdocs_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use fleetdocs_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use fleetdocs_core::db::{DbError, DbResult, Executor, count_to_u64, expect_one_row};
use fleetdocs_core::model::{EmailAddress, Username};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
use time::OffsetDateTime;


/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for User {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let username: String = row.try_get("username").map_err(postgres::map_sqlx_error)?;
        let email: Option<String> = row.try_get("email").map_err(postgres::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(postgres::map_sqlx_error)?;
        let created_at: OffsetDateTime =
            row.try_get("created_at").map_err(postgres::map_sqlx_error)?;
        let updated_at: OffsetDateTime =
            row.try_get("updated_at").map_err(postgres::map_sqlx_error)?;

        Ok(User::new(
            UserId::new(id),
            Username::new(username)?,
            email.map(EmailAddress::new).transpose()?,
            HashedPassword::new(password),
            created_at,
            updated_at,
        ))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for User {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let username: String = row.try_get("username").map_err(sqlite::map_sqlx_error)?;
        let email: Option<String> = row.try_get("email").map_err(sqlite::map_sqlx_error)?;
        let password: String = row.try_get("password").map_err(sqlite::map_sqlx_error)?;
        let created_at_us: i64 = row.try_get("created_at_us").map_err(sqlite::map_sqlx_error)?;
        let updated_at_us: i64 = row.try_get("updated_at_us").map_err(sqlite::map_sqlx_error)?;

        Ok(User::new(
            UserId::new(id),
            Username::new(username)?,
            email.map(EmailAddress::new).transpose()?,
            HashedPassword::new(password),
            build_timestamp(created_at_us)?,
            build_timestamp(updated_at_us)?,
        ))
    }
}

/// Creates a new active user and returns it with its newly-assigned identifier.
pub async fn create_user(
    ex: &mut Executor,
    username: &Username,
    email: Option<&EmailAddress>,
    password: &HashedPassword,
    now: OffsetDateTime,
) -> DbResult<User> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO users (username, email, password, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(username.as_str())
                .bind(email.map(EmailAddress::as_str))
                .bind(password.as_str())
                .bind(now)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO users (username, email, password, created_at_us, updated_at_us)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id";
            let now_us = unpack_timestamp(now);
            let row = sqlx::query(query_str)
                .bind(username.as_str())
                .bind(email.map(EmailAddress::as_str))
                .bind(password.as_str())
                .bind(now_us)
                .bind(now_us)
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    Ok(User::new(UserId::new(id), username.clone(), email.cloned(), password.clone(), now, now))
}

/// Gets the active user identified by `id`.
pub async fn get_user(ex: &mut Executor, id: UserId) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE id = $1 AND is_active";
            match sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                Some(row) => User::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE id = ? AND is_active";
            match sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?
            {
                Some(row) => User::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the active user named `username`.
///
/// The `username` is a raw string because login attempts may carry names that do not satisfy
/// the username policy.  Those simply never match.
pub async fn get_user_by_username(ex: &mut Executor, username: &str) -> DbResult<User> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE username = $1 AND is_active";
            match sqlx::query(query_str)
                .bind(username)
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                Some(row) => User::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE username = ? AND is_active";
            match sqlx::query(query_str)
                .bind(username)
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?
            {
                Some(row) => User::try_from(row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets all active users sorted by their identifier.
pub async fn get_users(ex: &mut Executor) -> DbResult<Vec<User>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM users WHERE is_active ORDER BY id";
            let rows = sqlx::query(query_str)
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(User::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM users WHERE is_active ORDER BY id";
            let rows =
                sqlx::query(query_str).fetch_all(&mut **ex).await.map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(User::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Checks if any user other than `exclude`, active or not, already uses `username` or `email`.
pub async fn user_conflicts(
    ex: &mut Executor,
    username: Option<&Username>,
    email: Option<&EmailAddress>,
    exclude: Option<UserId>,
) -> DbResult<bool> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM users
                WHERE (username = $1 OR email = $2) AND ($3::BIGINT IS NULL OR id <> $3)";
            let row = sqlx::query(query_str)
                .bind(username.map(Username::as_str))
                .bind(email.map(EmailAddress::as_str))
                .bind(exclude.map(UserId::as_i64))
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM users
                WHERE (username = ? OR email = ?) AND (? IS NULL OR id <> ?)";
            let exclude = exclude.map(UserId::as_i64);
            let row = sqlx::query(query_str)
                .bind(username.map(Username::as_str))
                .bind(email.map(EmailAddress::as_str))
                .bind(exclude)
                .bind(exclude)
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(count > 0)
}

/// Persists the mutable attributes of an active `user`.
pub async fn update_user(ex: &mut Executor, user: &User) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE users SET username = $1, email = $2, password = $3, updated_at = $4
                WHERE id = $5 AND is_active";
            let done = sqlx::query(query_str)
                .bind(user.username().as_str())
                .bind(user.email().map(EmailAddress::as_str))
                .bind(user.password().as_str())
                .bind(user.updated_at())
                .bind(user.id().as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE users SET username = ?, email = ?, password = ?, updated_at_us = ?
                WHERE id = ? AND is_active";
            let done = sqlx::query(query_str)
                .bind(user.username().as_str())
                .bind(user.email().map(EmailAddress::as_str))
                .bind(user.password().as_str())
                .bind(unpack_timestamp(user.updated_at()))
                .bind(user.id().as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    expect_one_row(rows_affected)
}

/// Marks the active user identified by `id` as deleted.  The row stays in the database.
pub async fn deactivate_user(ex: &mut Executor, id: UserId, now: OffsetDateTime) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "UPDATE users SET is_active = FALSE, updated_at = $1 WHERE id = $2 AND is_active";
            let done = sqlx::query(query_str)
                .bind(now)
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "UPDATE users SET is_active = FALSE, updated_at_us = ? WHERE id = ? AND is_active";
            let done = sqlx::query(query_str)
                .bind(unpack_timestamp(now))
                .bind(id.as_i64())
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    expect_one_row(rows_affected)
}

/// Counts the active users.
pub async fn count_active_users(ex: &mut Executor) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM users WHERE is_active";
            let row = sqlx::query(query_str)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM users WHERE is_active";
            let row =
                sqlx::query(query_str).fetch_one(&mut **ex).await.map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    count_to_u64(count)
}
