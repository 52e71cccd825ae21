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

//! Extends the driver with the document type management operations.

use crate::db;
use crate::driver::FleetDriver;
use crate::model::{
    DocumentType, DocumentTypeId, DocumentTypeSummary, DocumentTypeUpdate, NewDocumentType,
};
use fleetdocs_core::db::DbError;
use fleetdocs_core::driver::{DriverError, DriverResult};
use log::info;

/// Converts a missing-row error into the document type-specific not found error.
pub(super) fn doc_type_not_found(e: DbError) -> DriverError {
    match e {
        DbError::NotFound => DriverError::NotFound("Document type not found".to_owned()),
        e => e.into(),
    }
}

/// Error returned when a document type name is already taken.
fn name_taken() -> DriverError {
    DriverError::AlreadyExists("Document type with this name already exists".to_owned())
}

/// Converts a unique violation into the document type-specific conflict error.
fn doc_type_conflict(e: DbError) -> DriverError {
    match e {
        DbError::AlreadyExists => name_taken(),
        e => doc_type_not_found(e),
    }
}

/// Error returned when deleting a document type that documents still use.
fn doc_type_in_use() -> DriverError {
    DriverError::InUse("Cannot delete document type that is in use".to_owned())
}

impl FleetDriver {
    /// Gets all document types sorted by name.
    pub async fn list_doc_types(self) -> DriverResult<Vec<DocumentTypeSummary>> {
        let mut tx = self.db.begin().await?;
        let doc_types = db::list_doc_types(tx.ex()).await?;
        tx.commit().await?;
        Ok(doc_types)
    }

    /// Registers a new document type.
    pub async fn create_doc_type(self, new: NewDocumentType) -> DriverResult<DocumentType> {
        let mut tx = self.db.begin().await?;
        if db::doc_type_name_taken(tx.ex(), &new.name, None).await? {
            return Err(name_taken());
        }
        let now = self.clock.now_utc();
        let doc_type = DocumentType::new(DocumentTypeId::generate(), new, now, now);
        db::create_doc_type(tx.ex(), &doc_type).await.map_err(doc_type_conflict)?;
        tx.commit().await.map_err(doc_type_conflict)?;

        info!("Document type created: id={} name={}", doc_type.id().as_str(), doc_type.name());
        Ok(doc_type)
    }

    /// Applies a partial `update` to the document type identified by `id`.
    pub async fn update_doc_type(
        self,
        id: DocumentTypeId,
        update: DocumentTypeUpdate,
    ) -> DriverResult<DocumentType> {
        let mut tx = self.db.begin().await?;
        let doc_type = db::get_doc_type(tx.ex(), &id).await.map_err(doc_type_not_found)?;

        if let Some(name) = update.name.as_deref() {
            if name != doc_type.name() && db::doc_type_name_taken(tx.ex(), name, Some(&id)).await? {
                return Err(name_taken());
            }
        }

        let doc_type = doc_type.apply(update, self.clock.now_utc());
        db::update_doc_type(tx.ex(), &doc_type).await.map_err(doc_type_conflict)?;
        tx.commit().await.map_err(doc_type_conflict)?;

        info!("Document type updated: id={} name={}", doc_type.id().as_str(), doc_type.name());
        Ok(doc_type)
    }

    /// Deletes the document type identified by `id`, which no document may use.
    pub async fn delete_doc_type(self, id: DocumentTypeId) -> DriverResult<()> {
        let mut tx = self.db.begin().await?;
        db::get_doc_type(tx.ex(), &id).await.map_err(doc_type_not_found)?;
        if db::count_doc_type_documents(tx.ex(), &id).await? > 0 {
            return Err(doc_type_in_use());
        }
        db::delete_doc_type(tx.ex(), &id).await.map_err(|e| match e {
            DbError::InUse => doc_type_in_use(),
            e => doc_type_not_found(e),
        })?;
        tx.commit().await?;

        info!("Document type deleted: id={}", id.as_str());
        Ok(())
    }
}
