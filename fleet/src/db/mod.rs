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

//! Persistence gateway for the fleet.
//!
//! Queries that return entities always project their columns with a per-entity prefix (`b_` for
//! buses, `t_` for document types and `d_` for documents) so that joined rows can be decoded
//! with the same helpers as single-table rows.

use crate::model::{
    Bus, BusId, Document, DocumentId, DocumentType, DocumentTypeId, NewBus, NewDocument,
    NewDocumentType,
};
#[cfg(feature = "postgres")]
use fleetdocs_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use fleetdocs_core::db::sqlite::{self, build_optional_timestamp, build_timestamp};
use fleetdocs_core::db::{DbResult, Executor};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
#[cfg(feature = "postgres")]
use time::OffsetDateTime;

mod buses;
pub use buses::{
    bus_registration_taken, count_buses, create_bus, delete_bus, get_bus, list_all_buses,
    list_buses, update_bus,
};
mod doctypes;
pub use doctypes::{
    count_doc_types, create_doc_type, delete_doc_type, doc_type_name_taken, get_doc_type,
    list_doc_type_names, list_doc_types, update_doc_type,
};
mod documents;
pub use documents::{
    count_bus_documents, count_doc_type_documents, count_documents, count_expired_documents,
    count_expiring_documents, create_document, delete_document, get_document,
    list_bus_documents, list_expiring_documents, list_unexpired_documents, update_document,
};

#[cfg(test)]
mod tests;

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

/// Converts a quantity coming from the API into a value that can be bound to `LIMIT`/`OFFSET`.
fn sql_quantity(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Bus columns with the `b_` prefix for PostgreSQL queries.
#[cfg(feature = "postgres")]
const PG_BUS_COLUMNS: &str = "
    b.id AS b_id, b.registration_no AS b_registration_no, b.model AS b_model,
    b.manufacturer AS b_manufacturer, b.year_of_make AS b_year_of_make,
    b.owner_name AS b_owner_name, b.created_at AS b_created_at, b.updated_at AS b_updated_at";

/// Bus columns with the `b_` prefix for SQLite queries.
#[cfg(any(feature = "sqlite", test))]
const SQLITE_BUS_COLUMNS: &str = "
    b.id AS b_id, b.registration_no AS b_registration_no, b.model AS b_model,
    b.manufacturer AS b_manufacturer, b.year_of_make AS b_year_of_make,
    b.owner_name AS b_owner_name, b.created_at_us AS b_created_at_us,
    b.updated_at_us AS b_updated_at_us";

/// Document type columns with the `t_` prefix for PostgreSQL queries.
#[cfg(feature = "postgres")]
const PG_DOC_TYPE_COLUMNS: &str = "
    t.id AS t_id, t.name AS t_name, t.description AS t_description,
    t.created_at AS t_created_at, t.updated_at AS t_updated_at";

/// Document type columns with the `t_` prefix for SQLite queries.
#[cfg(any(feature = "sqlite", test))]
const SQLITE_DOC_TYPE_COLUMNS: &str = "
    t.id AS t_id, t.name AS t_name, t.description AS t_description,
    t.created_at_us AS t_created_at_us, t.updated_at_us AS t_updated_at_us";

/// Document columns with the `d_` prefix for PostgreSQL queries.
#[cfg(feature = "postgres")]
const PG_DOCUMENT_COLUMNS: &str = "
    d.id AS d_id, d.bus_id AS d_bus_id, d.doc_type_id AS d_doc_type_id,
    d.document_number AS d_document_number, d.issue_date AS d_issue_date,
    d.expiry_date AS d_expiry_date, d.file_url AS d_file_url, d.remarks AS d_remarks,
    d.uploaded_at AS d_uploaded_at";

/// Document columns with the `d_` prefix for SQLite queries.
#[cfg(any(feature = "sqlite", test))]
const SQLITE_DOCUMENT_COLUMNS: &str = "
    d.id AS d_id, d.bus_id AS d_bus_id, d.doc_type_id AS d_doc_type_id,
    d.document_number AS d_document_number, d.issue_date_us AS d_issue_date_us,
    d.expiry_date_us AS d_expiry_date_us, d.file_url AS d_file_url, d.remarks AS d_remarks,
    d.uploaded_at_us AS d_uploaded_at_us";

/// Decodes the `b_` columns of a PostgreSQL row.
#[cfg(feature = "postgres")]
fn pg_bus(row: &PgRow) -> DbResult<Bus> {
    let id: String = row.try_get("b_id").map_err(postgres::map_sqlx_error)?;
    let registration_no: String =
        row.try_get("b_registration_no").map_err(postgres::map_sqlx_error)?;
    let model: Option<String> = row.try_get("b_model").map_err(postgres::map_sqlx_error)?;
    let manufacturer: Option<String> =
        row.try_get("b_manufacturer").map_err(postgres::map_sqlx_error)?;
    let year_of_make: Option<i32> =
        row.try_get("b_year_of_make").map_err(postgres::map_sqlx_error)?;
    let owner_name: Option<String> =
        row.try_get("b_owner_name").map_err(postgres::map_sqlx_error)?;
    let created_at: OffsetDateTime =
        row.try_get("b_created_at").map_err(postgres::map_sqlx_error)?;
    let updated_at: OffsetDateTime =
        row.try_get("b_updated_at").map_err(postgres::map_sqlx_error)?;

    let attrs = NewBus { registration_no, model, manufacturer, year_of_make, owner_name };
    Ok(Bus::new(BusId::new(id)?, attrs, created_at, updated_at))
}

/// Decodes the `b_` columns of an SQLite row.
#[cfg(any(feature = "sqlite", test))]
fn sqlite_bus(row: &SqliteRow) -> DbResult<Bus> {
    let id: String = row.try_get("b_id").map_err(sqlite::map_sqlx_error)?;
    let registration_no: String =
        row.try_get("b_registration_no").map_err(sqlite::map_sqlx_error)?;
    let model: Option<String> = row.try_get("b_model").map_err(sqlite::map_sqlx_error)?;
    let manufacturer: Option<String> =
        row.try_get("b_manufacturer").map_err(sqlite::map_sqlx_error)?;
    let year_of_make: Option<i32> =
        row.try_get("b_year_of_make").map_err(sqlite::map_sqlx_error)?;
    let owner_name: Option<String> =
        row.try_get("b_owner_name").map_err(sqlite::map_sqlx_error)?;
    let created_at_us: i64 = row.try_get("b_created_at_us").map_err(sqlite::map_sqlx_error)?;
    let updated_at_us: i64 = row.try_get("b_updated_at_us").map_err(sqlite::map_sqlx_error)?;

    let attrs = NewBus { registration_no, model, manufacturer, year_of_make, owner_name };
    Ok(Bus::new(
        BusId::new(id)?,
        attrs,
        build_timestamp(created_at_us)?,
        build_timestamp(updated_at_us)?,
    ))
}

/// Decodes the `t_` columns of a PostgreSQL row.
#[cfg(feature = "postgres")]
fn pg_doc_type(row: &PgRow) -> DbResult<DocumentType> {
    let id: String = row.try_get("t_id").map_err(postgres::map_sqlx_error)?;
    let name: String = row.try_get("t_name").map_err(postgres::map_sqlx_error)?;
    let description: Option<String> =
        row.try_get("t_description").map_err(postgres::map_sqlx_error)?;
    let created_at: OffsetDateTime =
        row.try_get("t_created_at").map_err(postgres::map_sqlx_error)?;
    let updated_at: OffsetDateTime =
        row.try_get("t_updated_at").map_err(postgres::map_sqlx_error)?;

    let attrs = NewDocumentType { name, description };
    Ok(DocumentType::new(DocumentTypeId::new(id)?, attrs, created_at, updated_at))
}

/// Decodes the `t_` columns of an SQLite row.
#[cfg(any(feature = "sqlite", test))]
fn sqlite_doc_type(row: &SqliteRow) -> DbResult<DocumentType> {
    let id: String = row.try_get("t_id").map_err(sqlite::map_sqlx_error)?;
    let name: String = row.try_get("t_name").map_err(sqlite::map_sqlx_error)?;
    let description: Option<String> =
        row.try_get("t_description").map_err(sqlite::map_sqlx_error)?;
    let created_at_us: i64 = row.try_get("t_created_at_us").map_err(sqlite::map_sqlx_error)?;
    let updated_at_us: i64 = row.try_get("t_updated_at_us").map_err(sqlite::map_sqlx_error)?;

    let attrs = NewDocumentType { name, description };
    Ok(DocumentType::new(
        DocumentTypeId::new(id)?,
        attrs,
        build_timestamp(created_at_us)?,
        build_timestamp(updated_at_us)?,
    ))
}

/// Decodes the `d_` columns of a PostgreSQL row.
#[cfg(feature = "postgres")]
fn pg_document(row: &PgRow) -> DbResult<Document> {
    let id: String = row.try_get("d_id").map_err(postgres::map_sqlx_error)?;
    let bus_id: String = row.try_get("d_bus_id").map_err(postgres::map_sqlx_error)?;
    let doc_type_id: String = row.try_get("d_doc_type_id").map_err(postgres::map_sqlx_error)?;
    let document_number: Option<String> =
        row.try_get("d_document_number").map_err(postgres::map_sqlx_error)?;
    let issue_date: Option<OffsetDateTime> =
        row.try_get("d_issue_date").map_err(postgres::map_sqlx_error)?;
    let expiry_date: Option<OffsetDateTime> =
        row.try_get("d_expiry_date").map_err(postgres::map_sqlx_error)?;
    let file_url: String = row.try_get("d_file_url").map_err(postgres::map_sqlx_error)?;
    let remarks: Option<String> = row.try_get("d_remarks").map_err(postgres::map_sqlx_error)?;
    let uploaded_at: OffsetDateTime =
        row.try_get("d_uploaded_at").map_err(postgres::map_sqlx_error)?;

    let attrs = NewDocument {
        doc_type_id: DocumentTypeId::new(doc_type_id)?,
        document_number,
        issue_date,
        expiry_date,
        file_url,
        remarks,
    };
    Ok(Document::new(DocumentId::new(id)?, BusId::new(bus_id)?, attrs, uploaded_at))
}

/// Decodes the `d_` columns of an SQLite row.
#[cfg(any(feature = "sqlite", test))]
fn sqlite_document(row: &SqliteRow) -> DbResult<Document> {
    let id: String = row.try_get("d_id").map_err(sqlite::map_sqlx_error)?;
    let bus_id: String = row.try_get("d_bus_id").map_err(sqlite::map_sqlx_error)?;
    let doc_type_id: String = row.try_get("d_doc_type_id").map_err(sqlite::map_sqlx_error)?;
    let document_number: Option<String> =
        row.try_get("d_document_number").map_err(sqlite::map_sqlx_error)?;
    let issue_date_us: Option<i64> =
        row.try_get("d_issue_date_us").map_err(sqlite::map_sqlx_error)?;
    let expiry_date_us: Option<i64> =
        row.try_get("d_expiry_date_us").map_err(sqlite::map_sqlx_error)?;
    let file_url: String = row.try_get("d_file_url").map_err(sqlite::map_sqlx_error)?;
    let remarks: Option<String> = row.try_get("d_remarks").map_err(sqlite::map_sqlx_error)?;
    let uploaded_at_us: i64 = row.try_get("d_uploaded_at_us").map_err(sqlite::map_sqlx_error)?;

    let attrs = NewDocument {
        doc_type_id: DocumentTypeId::new(doc_type_id)?,
        document_number,
        issue_date: build_optional_timestamp(issue_date_us)?,
        expiry_date: build_optional_timestamp(expiry_date_us)?,
        file_url,
        remarks,
    };
    Ok(Document::new(
        DocumentId::new(id)?,
        BusId::new(bus_id)?,
        attrs,
        build_timestamp(uploaded_at_us)?,
    ))
}
