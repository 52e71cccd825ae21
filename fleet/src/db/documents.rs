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

//! Persistence of bus documents.

#[cfg(feature = "postgres")]
use super::{
    PG_BUS_COLUMNS, PG_DOC_TYPE_COLUMNS, PG_DOCUMENT_COLUMNS, pg_bus, pg_doc_type, pg_document,
};
#[cfg(any(feature = "sqlite", test))]
use super::{
    SQLITE_BUS_COLUMNS, SQLITE_DOC_TYPE_COLUMNS, SQLITE_DOCUMENT_COLUMNS, sqlite_bus,
    sqlite_doc_type, sqlite_document,
};
use crate::model::{BusId, Document, DocumentDetails, DocumentId, DocumentTypeId, DocumentWithType};
#[cfg(feature = "postgres")]
use fleetdocs_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use fleetdocs_core::db::sqlite::{self, unpack_timestamp};
use fleetdocs_core::db::{DbError, DbResult, Executor, count_to_u64, expect_one_row};
use sqlx::Row;
use time::OffsetDateTime;

/// Creates a new `document`.  Fails with `NotFound` if its bus or its type do not exist.
pub async fn create_document(ex: &mut Executor, document: &Document) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO bus_documents
                    (id, bus_id, doc_type_id, document_number, issue_date, expiry_date, file_url,
                    remarks, uploaded_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)";
            sqlx::query(query_str)
                .bind(document.id().as_str())
                .bind(document.bus_id().as_str())
                .bind(document.doc_type_id().as_str())
                .bind(document.document_number())
                .bind(document.issue_date())
                .bind(document.expiry_date())
                .bind(document.file_url())
                .bind(document.remarks())
                .bind(document.uploaded_at())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO bus_documents
                    (id, bus_id, doc_type_id, document_number, issue_date_us, expiry_date_us,
                    file_url, remarks, uploaded_at_us)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
            sqlx::query(query_str)
                .bind(document.id().as_str())
                .bind(document.bus_id().as_str())
                .bind(document.doc_type_id().as_str())
                .bind(document.document_number())
                .bind(document.issue_date().map(unpack_timestamp))
                .bind(document.expiry_date().map(unpack_timestamp))
                .bind(document.file_url())
                .bind(document.remarks())
                .bind(unpack_timestamp(*document.uploaded_at()))
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(())
}

/// Gets the document identified by `id` along with its bus and its type.
pub async fn get_document(ex: &mut Executor, id: &DocumentId) -> DbResult<DocumentDetails> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}, {}
                FROM bus_documents d
                    JOIN buses b ON b.id = d.bus_id
                    JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.id = $1",
                PG_DOCUMENT_COLUMNS, PG_BUS_COLUMNS, PG_DOC_TYPE_COLUMNS
            );
            match sqlx::query(&query_str)
                .bind(id.as_str())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                Some(row) => Ok(DocumentDetails {
                    document: pg_document(&row)?,
                    bus: pg_bus(&row)?,
                    doc_type: pg_doc_type(&row)?,
                }),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}, {}
                FROM bus_documents d
                    JOIN buses b ON b.id = d.bus_id
                    JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.id = ?",
                SQLITE_DOCUMENT_COLUMNS, SQLITE_BUS_COLUMNS, SQLITE_DOC_TYPE_COLUMNS
            );
            match sqlx::query(&query_str)
                .bind(id.as_str())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?
            {
                Some(row) => Ok(DocumentDetails {
                    document: sqlite_document(&row)?,
                    bus: sqlite_bus(&row)?,
                    doc_type: sqlite_doc_type(&row)?,
                }),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the documents of the bus identified by `bus_id` along with their types, newest first.
pub async fn list_bus_documents(
    ex: &mut Executor,
    bus_id: &BusId,
) -> DbResult<Vec<DocumentWithType>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}
                FROM bus_documents d JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.bus_id = $1
                ORDER BY d.uploaded_at DESC, d.id",
                PG_DOCUMENT_COLUMNS, PG_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .bind(bus_id.as_str())
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter()
                .map(|row| {
                    let document = pg_document(row)?;
                    Ok(DocumentWithType { document, doc_type: pg_doc_type(row)? })
                })
                .collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}
                FROM bus_documents d JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.bus_id = ?
                ORDER BY d.uploaded_at_us DESC, d.id",
                SQLITE_DOCUMENT_COLUMNS, SQLITE_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .bind(bus_id.as_str())
                .fetch_all(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.iter()
                .map(|row| {
                    Ok(DocumentWithType {
                        document: sqlite_document(row)?,
                        doc_type: sqlite_doc_type(row)?,
                    })
                })
                .collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the documents that expire at or before `cutoff`, including those that already expired,
/// sorted by expiry date.
///
/// If `cutoff` is none, returns every document that has an expiry date.  Documents without an
/// expiry date never match.
pub async fn list_expiring_documents(
    ex: &mut Executor,
    cutoff: Option<OffsetDateTime>,
) -> DbResult<Vec<DocumentDetails>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}, {}
                FROM bus_documents d
                    JOIN buses b ON b.id = d.bus_id
                    JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.expiry_date IS NOT NULL
                    AND ($1::TIMESTAMPTZ IS NULL OR d.expiry_date <= $1)
                ORDER BY d.expiry_date, d.id",
                PG_DOCUMENT_COLUMNS, PG_BUS_COLUMNS, PG_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .bind(cutoff)
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter()
                .map(|row| {
                    Ok(DocumentDetails {
                        document: pg_document(row)?,
                        bus: pg_bus(row)?,
                        doc_type: pg_doc_type(row)?,
                    })
                })
                .collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}, {}
                FROM bus_documents d
                    JOIN buses b ON b.id = d.bus_id
                    JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.expiry_date_us IS NOT NULL
                    AND (?1 IS NULL OR d.expiry_date_us <= ?1)
                ORDER BY d.expiry_date_us, d.id",
                SQLITE_DOCUMENT_COLUMNS, SQLITE_BUS_COLUMNS, SQLITE_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .bind(cutoff.map(unpack_timestamp))
                .fetch_all(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.iter()
                .map(|row| {
                    Ok(DocumentDetails {
                        document: sqlite_document(row)?,
                        bus: sqlite_bus(row)?,
                        doc_type: sqlite_doc_type(row)?,
                    })
                })
                .collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the documents of all buses that have not expired by `now` along with their types,
/// newest first.  Documents without an expiry date are always included.
pub async fn list_unexpired_documents(
    ex: &mut Executor,
    now: OffsetDateTime,
) -> DbResult<Vec<DocumentWithType>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}
                FROM bus_documents d JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.expiry_date IS NULL OR d.expiry_date >= $1
                ORDER BY d.uploaded_at DESC, d.id",
                PG_DOCUMENT_COLUMNS, PG_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .bind(now)
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter()
                .map(|row| {
                    let document = pg_document(row)?;
                    Ok(DocumentWithType { document, doc_type: pg_doc_type(row)? })
                })
                .collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT {}, {}
                FROM bus_documents d JOIN document_types t ON t.id = d.doc_type_id
                WHERE d.expiry_date_us IS NULL OR d.expiry_date_us >= ?
                ORDER BY d.uploaded_at_us DESC, d.id",
                SQLITE_DOCUMENT_COLUMNS, SQLITE_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .bind(unpack_timestamp(now))
                .fetch_all(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.iter()
                .map(|row| {
                    Ok(DocumentWithType {
                        document: sqlite_document(row)?,
                        doc_type: sqlite_doc_type(row)?,
                    })
                })
                .collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Counts the documents of the bus identified by `bus_id`.
pub async fn count_bus_documents(ex: &mut Executor, bus_id: &BusId) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM bus_documents WHERE bus_id = $1";
            let row = sqlx::query(query_str)
                .bind(bus_id.as_str())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM bus_documents WHERE bus_id = ?";
            let row = sqlx::query(query_str)
                .bind(bus_id.as_str())
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

/// Counts the documents of the type identified by `doc_type_id`.
pub async fn count_doc_type_documents(
    ex: &mut Executor,
    doc_type_id: &DocumentTypeId,
) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM bus_documents WHERE doc_type_id = $1";
            let row = sqlx::query(query_str)
                .bind(doc_type_id.as_str())
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM bus_documents WHERE doc_type_id = ?";
            let row = sqlx::query(query_str)
                .bind(doc_type_id.as_str())
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

/// Counts all documents.
pub async fn count_documents(ex: &mut Executor) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM bus_documents")
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM bus_documents")
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

/// Counts the documents that `list_expiring_documents` would return for `cutoff`.
pub async fn count_expiring_documents(
    ex: &mut Executor,
    cutoff: Option<OffsetDateTime>,
) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM bus_documents
                WHERE expiry_date IS NOT NULL
                    AND ($1::TIMESTAMPTZ IS NULL OR expiry_date <= $1)";
            let row = sqlx::query(query_str)
                .bind(cutoff)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM bus_documents
                WHERE expiry_date_us IS NOT NULL AND (?1 IS NULL OR expiry_date_us <= ?1)";
            let row = sqlx::query(query_str)
                .bind(cutoff.map(unpack_timestamp))
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

/// Counts the documents whose expiry date is strictly before `now`.
pub async fn count_expired_documents(ex: &mut Executor, now: OffsetDateTime) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM bus_documents WHERE expiry_date < $1";
            let row = sqlx::query(query_str)
                .bind(now)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT COUNT(*) AS count FROM bus_documents WHERE expiry_date_us < ?";
            let row = sqlx::query(query_str)
                .bind(unpack_timestamp(now))
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

/// Persists the mutable attributes of `document`.  Fails with `NotFound` if its new type does
/// not exist.
pub async fn update_document(ex: &mut Executor, document: &Document) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE bus_documents
                SET doc_type_id = $1, document_number = $2, issue_date = $3, expiry_date = $4,
                    file_url = $5, remarks = $6
                WHERE id = $7";
            let done = sqlx::query(query_str)
                .bind(document.doc_type_id().as_str())
                .bind(document.document_number())
                .bind(document.issue_date())
                .bind(document.expiry_date())
                .bind(document.file_url())
                .bind(document.remarks())
                .bind(document.id().as_str())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE bus_documents
                SET doc_type_id = ?, document_number = ?, issue_date_us = ?, expiry_date_us = ?,
                    file_url = ?, remarks = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(document.doc_type_id().as_str())
                .bind(document.document_number())
                .bind(document.issue_date().map(unpack_timestamp))
                .bind(document.expiry_date().map(unpack_timestamp))
                .bind(document.file_url())
                .bind(document.remarks())
                .bind(document.id().as_str())
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

/// Deletes the document identified by `id`.
pub async fn delete_document(ex: &mut Executor, id: &DocumentId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM bus_documents WHERE id = $1")
                .bind(id.as_str())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM bus_documents WHERE id = ?")
                .bind(id.as_str())
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
