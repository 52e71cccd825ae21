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

//! Persistence of buses.

#[cfg(feature = "postgres")]
use super::{PG_BUS_COLUMNS, pg_bus};
#[cfg(any(feature = "sqlite", test))]
use super::{SQLITE_BUS_COLUMNS, sqlite_bus};
use crate::db::sql_quantity;
use crate::model::{Bus, BusId, BusSummary, DocumentCount};
#[cfg(feature = "postgres")]
use fleetdocs_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use fleetdocs_core::db::sqlite::{self, unpack_timestamp};
use fleetdocs_core::db::{
    DbError, DbResult, Executor, count_to_u64, expect_one_row, in_use_on_delete, like_pattern,
};
use sqlx::Row;

/// Filter shared by the listing and counting of buses in PostgreSQL.  Matches every bus if the
/// search pattern is null.
#[cfg(feature = "postgres")]
const PG_SEARCH_FILTER: &str = "
    $1::TEXT IS NULL
    OR b.registration_no ILIKE $1 ESCAPE '\\' OR b.model ILIKE $1 ESCAPE '\\'
    OR b.manufacturer ILIKE $1 ESCAPE '\\' OR b.owner_name ILIKE $1 ESCAPE '\\'";

/// Filter shared by the listing and counting of buses in SQLite.  Matches every bus if the
/// search pattern is null.  `LIKE` is case insensitive for ASCII text in SQLite.
#[cfg(any(feature = "sqlite", test))]
const SQLITE_SEARCH_FILTER: &str = "
    ?1 IS NULL
    OR b.registration_no LIKE ?1 ESCAPE '\\' OR b.model LIKE ?1 ESCAPE '\\'
    OR b.manufacturer LIKE ?1 ESCAPE '\\' OR b.owner_name LIKE ?1 ESCAPE '\\'";

/// Creates a new `bus`.
pub async fn create_bus(ex: &mut Executor, bus: &Bus) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO buses
                    (id, registration_no, model, manufacturer, year_of_make, owner_name,
                    created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";
            sqlx::query(query_str)
                .bind(bus.id().as_str())
                .bind(bus.registration_no())
                .bind(bus.model())
                .bind(bus.manufacturer())
                .bind(bus.year_of_make())
                .bind(bus.owner_name())
                .bind(bus.created_at())
                .bind(bus.updated_at())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO buses
                    (id, registration_no, model, manufacturer, year_of_make, owner_name,
                    created_at_us, updated_at_us)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
            sqlx::query(query_str)
                .bind(bus.id().as_str())
                .bind(bus.registration_no())
                .bind(bus.model())
                .bind(bus.manufacturer())
                .bind(bus.year_of_make())
                .bind(bus.owner_name())
                .bind(unpack_timestamp(*bus.created_at()))
                .bind(unpack_timestamp(*bus.updated_at()))
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(())
}

/// Gets the bus identified by `id`.
pub async fn get_bus(ex: &mut Executor, id: &BusId) -> DbResult<Bus> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!("SELECT {} FROM buses b WHERE b.id = $1", PG_BUS_COLUMNS);
            match sqlx::query(&query_str)
                .bind(id.as_str())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                Some(row) => pg_bus(&row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!("SELECT {} FROM buses b WHERE b.id = ?", SQLITE_BUS_COLUMNS);
            match sqlx::query(&query_str)
                .bind(id.as_str())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?
            {
                Some(row) => sqlite_bus(&row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Checks if any bus other than `exclude` already uses `registration_no`.
pub async fn bus_registration_taken(
    ex: &mut Executor,
    registration_no: &str,
    exclude: Option<&BusId>,
) -> DbResult<bool> {
    let exclude = exclude.map(BusId::as_str);
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM buses
                WHERE registration_no = $1 AND ($2::TEXT IS NULL OR id <> $2)";
            let row = sqlx::query(query_str)
                .bind(registration_no)
                .bind(exclude)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM buses
                WHERE registration_no = ? AND (? IS NULL OR id <> ?)";
            let row = sqlx::query(query_str)
                .bind(registration_no)
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

/// Gets one page of buses, newest first, along with the number of documents of each.
///
/// If `search` is present, only returns buses whose registration number, model, manufacturer
/// or owner name contain it, ignoring case.
pub async fn list_buses(
    ex: &mut Executor,
    search: Option<&str>,
    offset: u64,
    limit: u64,
) -> DbResult<Vec<BusSummary>> {
    let pattern = search.map(like_pattern);
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT {},
                    (SELECT COUNT(*) FROM bus_documents d WHERE d.bus_id = b.id) AS documents
                FROM buses b
                WHERE {}
                ORDER BY b.created_at DESC, b.id
                LIMIT $2 OFFSET $3",
                PG_BUS_COLUMNS,
                PG_SEARCH_FILTER,
            );
            let rows = sqlx::query(&query_str)
                .bind(pattern)
                .bind(sql_quantity(limit))
                .bind(sql_quantity(offset))
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            let mut buses = Vec::with_capacity(rows.len());
            for row in rows {
                let documents: i64 = row.try_get("documents").map_err(postgres::map_sqlx_error)?;
                buses.push(BusSummary {
                    bus: pg_bus(&row)?,
                    count: DocumentCount { documents: count_to_u64(documents)? },
                });
            }
            Ok(buses)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT {},
                    (SELECT COUNT(*) FROM bus_documents d WHERE d.bus_id = b.id) AS documents
                FROM buses b
                WHERE {}
                ORDER BY b.created_at_us DESC, b.id
                LIMIT ?2 OFFSET ?3",
                SQLITE_BUS_COLUMNS,
                SQLITE_SEARCH_FILTER,
            );
            let rows = sqlx::query(&query_str)
                .bind(pattern)
                .bind(sql_quantity(limit))
                .bind(sql_quantity(offset))
                .fetch_all(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let mut buses = Vec::with_capacity(rows.len());
            for row in rows {
                let documents: i64 = row.try_get("documents").map_err(sqlite::map_sqlx_error)?;
                buses.push(BusSummary {
                    bus: sqlite_bus(&row)?,
                    count: DocumentCount { documents: count_to_u64(documents)? },
                });
            }
            Ok(buses)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Counts the buses that match `search`, with the same semantics as `list_buses`.
pub async fn count_buses(ex: &mut Executor, search: Option<&str>) -> DbResult<u64> {
    let pattern = search.map(like_pattern);
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                format!("SELECT COUNT(*) AS count FROM buses b WHERE {}", PG_SEARCH_FILTER);
            let row = sqlx::query(&query_str)
                .bind(pattern)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                format!("SELECT COUNT(*) AS count FROM buses b WHERE {}", SQLITE_SEARCH_FILTER);
            let row = sqlx::query(&query_str)
                .bind(pattern)
                .fetch_one(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    count_to_u64(count)
}

/// Gets every bus, newest first.
pub async fn list_all_buses(ex: &mut Executor) -> DbResult<Vec<Bus>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "SELECT {} FROM buses b ORDER BY b.created_at DESC, b.id",
                PG_BUS_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter().map(pg_bus).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "SELECT {} FROM buses b ORDER BY b.created_at_us DESC, b.id",
                SQLITE_BUS_COLUMNS
            );
            let rows =
                sqlx::query(&query_str).fetch_all(&mut **ex).await.map_err(sqlite::map_sqlx_error)?;
            rows.iter().map(sqlite_bus).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Persists the mutable attributes of `bus`.
pub async fn update_bus(ex: &mut Executor, bus: &Bus) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE buses
                SET registration_no = $1, model = $2, manufacturer = $3, year_of_make = $4,
                    owner_name = $5, updated_at = $6
                WHERE id = $7";
            let done = sqlx::query(query_str)
                .bind(bus.registration_no())
                .bind(bus.model())
                .bind(bus.manufacturer())
                .bind(bus.year_of_make())
                .bind(bus.owner_name())
                .bind(bus.updated_at())
                .bind(bus.id().as_str())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE buses
                SET registration_no = ?, model = ?, manufacturer = ?, year_of_make = ?,
                    owner_name = ?, updated_at_us = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(bus.registration_no())
                .bind(bus.model())
                .bind(bus.manufacturer())
                .bind(bus.year_of_make())
                .bind(bus.owner_name())
                .bind(unpack_timestamp(*bus.updated_at()))
                .bind(bus.id().as_str())
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

/// Deletes the bus identified by `id`.  Fails with `InUse` if any document references it.
pub async fn delete_bus(ex: &mut Executor, id: &BusId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM buses WHERE id = $1")
                .bind(id.as_str())
                .execute(&mut **ex)
                .await
                .map_err(|e| in_use_on_delete(postgres::map_sqlx_error(e)))?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM buses WHERE id = ?")
                .bind(id.as_str())
                .execute(&mut **ex)
                .await
                .map_err(|e| in_use_on_delete(sqlite::map_sqlx_error(e)))?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    expect_one_row(rows_affected)
}
