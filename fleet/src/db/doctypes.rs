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

//! Persistence of document types.

#[cfg(feature = "postgres")]
use super::{PG_DOC_TYPE_COLUMNS, pg_doc_type};
#[cfg(any(feature = "sqlite", test))]
use super::{SQLITE_DOC_TYPE_COLUMNS, sqlite_doc_type};
use crate::model::{DocumentCount, DocumentType, DocumentTypeId, DocumentTypeSummary};
#[cfg(feature = "postgres")]
use fleetdocs_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use fleetdocs_core::db::sqlite::{self, unpack_timestamp};
use fleetdocs_core::db::{
    DbError, DbResult, Executor, count_to_u64, expect_one_row, in_use_on_delete,
};
use sqlx::Row;

/// Creates a new `doc_type`.
pub async fn create_doc_type(ex: &mut Executor, doc_type: &DocumentType) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO document_types (id, name, description, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)";
            sqlx::query(query_str)
                .bind(doc_type.id().as_str())
                .bind(doc_type.name())
                .bind(doc_type.description())
                .bind(doc_type.created_at())
                .bind(doc_type.updated_at())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                INSERT INTO document_types (id, name, description, created_at_us, updated_at_us)
                VALUES (?, ?, ?, ?, ?)";
            sqlx::query(query_str)
                .bind(doc_type.id().as_str())
                .bind(doc_type.name())
                .bind(doc_type.description())
                .bind(unpack_timestamp(*doc_type.created_at()))
                .bind(unpack_timestamp(*doc_type.updated_at()))
                .execute(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(())
}

/// Gets the document type identified by `id`.
pub async fn get_doc_type(ex: &mut Executor, id: &DocumentTypeId) -> DbResult<DocumentType> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                format!("SELECT {} FROM document_types t WHERE t.id = $1", PG_DOC_TYPE_COLUMNS);
            match sqlx::query(&query_str)
                .bind(id.as_str())
                .fetch_optional(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?
            {
                Some(row) => pg_doc_type(&row),
                None => Err(DbError::NotFound),
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                format!("SELECT {} FROM document_types t WHERE t.id = ?", SQLITE_DOC_TYPE_COLUMNS);
            match sqlx::query(&query_str)
                .bind(id.as_str())
                .fetch_optional(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?
            {
                Some(row) => sqlite_doc_type(&row),
                None => Err(DbError::NotFound),
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Checks if any document type other than `exclude` already uses `name`.
pub async fn doc_type_name_taken(
    ex: &mut Executor,
    name: &str,
    exclude: Option<&DocumentTypeId>,
) -> DbResult<bool> {
    let exclude = exclude.map(DocumentTypeId::as_str);
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM document_types
                WHERE name = $1 AND ($2::TEXT IS NULL OR id <> $2)";
            let row = sqlx::query(query_str)
                .bind(name)
                .bind(exclude)
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                SELECT COUNT(*) AS count FROM document_types
                WHERE name = ? AND (? IS NULL OR id <> ?)";
            let row = sqlx::query(query_str)
                .bind(name)
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

/// Gets all document types sorted by name, along with the number of documents of each.
pub async fn list_doc_types(ex: &mut Executor) -> DbResult<Vec<DocumentTypeSummary>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "
                SELECT {},
                    (SELECT COUNT(*) FROM bus_documents d WHERE d.doc_type_id = t.id) AS documents
                FROM document_types t
                ORDER BY t.name",
                PG_DOC_TYPE_COLUMNS
            );
            let rows = sqlx::query(&query_str)
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            let mut doc_types = Vec::with_capacity(rows.len());
            for row in rows {
                let documents: i64 = row.try_get("documents").map_err(postgres::map_sqlx_error)?;
                doc_types.push(DocumentTypeSummary {
                    doc_type: pg_doc_type(&row)?,
                    count: DocumentCount { documents: count_to_u64(documents)? },
                });
            }
            Ok(doc_types)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "
                SELECT {},
                    (SELECT COUNT(*) FROM bus_documents d WHERE d.doc_type_id = t.id) AS documents
                FROM document_types t
                ORDER BY t.name",
                SQLITE_DOC_TYPE_COLUMNS
            );
            let rows =
                sqlx::query(&query_str).fetch_all(&mut **ex).await.map_err(sqlite::map_sqlx_error)?;
            let mut doc_types = Vec::with_capacity(rows.len());
            for row in rows {
                let documents: i64 = row.try_get("documents").map_err(sqlite::map_sqlx_error)?;
                doc_types.push(DocumentTypeSummary {
                    doc_type: sqlite_doc_type(&row)?,
                    count: DocumentCount { documents: count_to_u64(documents)? },
                });
            }
            Ok(doc_types)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets the names of all document types in alphabetical order.
pub async fn list_doc_type_names(ex: &mut Executor) -> DbResult<Vec<String>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let rows = sqlx::query("SELECT name FROM document_types ORDER BY name")
                .fetch_all(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter()
                .map(|row| row.try_get("name").map_err(postgres::map_sqlx_error))
                .collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let rows = sqlx::query("SELECT name FROM document_types ORDER BY name")
                .fetch_all(&mut **ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.iter().map(|row| row.try_get("name").map_err(sqlite::map_sqlx_error)).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Counts all document types.
pub async fn count_doc_types(ex: &mut Executor) -> DbResult<u64> {
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM document_types")
                .fetch_one(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let row = sqlx::query("SELECT COUNT(*) AS count FROM document_types")
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

/// Persists the mutable attributes of `doc_type`.
pub async fn update_doc_type(ex: &mut Executor, doc_type: &DocumentType) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                UPDATE document_types SET name = $1, description = $2, updated_at = $3
                WHERE id = $4";
            let done = sqlx::query(query_str)
                .bind(doc_type.name())
                .bind(doc_type.description())
                .bind(doc_type.updated_at())
                .bind(doc_type.id().as_str())
                .execute(&mut **ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "
                UPDATE document_types SET name = ?, description = ?, updated_at_us = ?
                WHERE id = ?";
            let done = sqlx::query(query_str)
                .bind(doc_type.name())
                .bind(doc_type.description())
                .bind(unpack_timestamp(*doc_type.updated_at()))
                .bind(doc_type.id().as_str())
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

/// Deletes the document type identified by `id`.  Fails with `InUse` if any document
/// references it.
pub async fn delete_doc_type(ex: &mut Executor, id: &DocumentTypeId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let done = sqlx::query("DELETE FROM document_types WHERE id = $1")
                .bind(id.as_str())
                .execute(&mut **ex)
                .await
                .map_err(|e| in_use_on_delete(postgres::map_sqlx_error(e)))?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let done = sqlx::query("DELETE FROM document_types WHERE id = ?")
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
